//! channel-archiver: incremental channel archiving with image OCR
//!
//! Walks a channel's history newest-first, archives every message newer than
//! the last archived one into a JSON document, and stores the text recognized
//! on attached images alongside each record.

pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod media;
pub mod normalize;
pub mod ocr;
pub mod progress;
pub mod source;
pub mod sync;

#[cfg(test)]
mod test_support;
