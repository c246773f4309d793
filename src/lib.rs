//! `mailman-rss` — turn a Mailman web archive into an RSS 2.0 feed.
//!
//! The archive index page is scanned for monthly gzip'd mbox files, the most
//! recent months are fetched until enough messages are collected, and each
//! message is rendered as a feed item.

pub mod archive;
pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod select;

pub use pipeline::{build_feed, FeedOptions};
