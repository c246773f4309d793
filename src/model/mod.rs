//! Core data model types for archived messages and the feed built from them.

pub mod feed;
pub mod message;
