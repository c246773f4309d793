//! Email parsing: MBOX container parser, header decoding, body extraction and
//! message decoding.

pub mod decode;
pub mod header;
pub mod mbox;
pub mod mime;
