//! Reaching the list archive: the index page and the monthly mbox files.

pub mod index;
pub mod month;

pub use index::{Archive, MonthArchiveRef};
pub use month::MonthArchiveLoader;
