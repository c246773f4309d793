//! Streaming MBOX container parser.
//!
//! Reads a staged MBOX file line-by-line and hands each raw message to a
//! callback. Tolerant of malformed input: nothing here ever fails on content,
//! only on I/O.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{FeedError, Result};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Maximum bytes kept per message; the rest of an oversized body is dropped.
const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Sequential MBOX parser over a file on disk.
///
/// Handles:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - `>From ` escaped lines in bodies (left as-is, never a separator)
/// - Truncated final message without a trailing newline
/// - UTF-8 BOM at the start of the file
pub struct MboxParser {
    path: PathBuf,
    max_message_size: usize,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Open the file and return a reader over it.
    ///
    /// Once this returns, the path itself is no longer needed: the staging
    /// file can be unlinked while the handle stays readable.
    pub fn open(&self) -> Result<BufReader<File>> {
        let file = File::open(&self.path).map_err(|e| FeedError::io(&self.path, e))?;
        Ok(BufReader::with_capacity(READ_BUFFER_SIZE, file))
    }

    /// Walk every message in `reader`, calling `message_callback` with its
    /// raw bytes (separator line included). Returning `false` stops early.
    ///
    /// Returns the number of messages delivered.
    pub fn parse(
        &self,
        reader: &mut impl BufRead,
        message_callback: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<u64> {
        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);
        let mut prev_line_was_empty = true;
        let mut truncated = false;

        loop {
            line_buf.clear();
            let line_len = reader
                .read_until(b'\n', &mut line_buf)
                .map_err(|e| FeedError::io(&self.path, e))?;
            if line_len == 0 {
                break;
            }

            if is_mbox_separator(&line_buf) {
                if !prev_line_was_empty {
                    warn!(offset, "Found 'From ' separator without preceding blank line");
                }
                if !message_buf.is_empty() {
                    count += 1;
                    if !message_callback(&message_buf) {
                        return Ok(count);
                    }
                }
                message_buf.clear();
                message_buf.extend_from_slice(&line_buf);
                truncated = false;
            } else if message_buf.len() + line_buf.len() <= self.max_message_size {
                message_buf.extend_from_slice(&line_buf);
            } else if !truncated {
                warn!(
                    offset,
                    max_size = self.max_message_size,
                    "Message exceeds maximum size, truncating body"
                );
                truncated = true;
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            offset += line_len as u64;
        }

        if !message_buf.is_empty() {
            count += 1;
            message_callback(&message_buf);
        }

        Ok(count)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
