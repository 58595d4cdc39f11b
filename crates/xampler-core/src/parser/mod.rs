//! SFZ front-end.
//!
//! Turns SFZ text into an [`InstrumentDescriptor`]: the section hierarchy
//! `<global>` ⊃ `<master>` ⊃ `<group>` ⊃ `<region>` becomes the nested
//! region tree, and `<control> default_path` becomes the instrument's
//! default path.

use std::fs;
use std::path::Path;

use crate::descriptor::InstrumentDescriptor;
use crate::error::Result;

mod parse;
mod tree;

pub use parse::{tokenize_line, Token};

/// Parse SFZ text into an instrument descriptor
pub fn parse_sfz_str(content: &str) -> Result<InstrumentDescriptor> {
    let mut builder = tree::TreeBuilder::default();
    for (index, line) in content.lines().enumerate() {
        for token in tokenize_line(line, index + 1)? {
            builder.push(token);
        }
    }
    Ok(builder.finish())
}

/// Parse an SFZ file into an instrument descriptor
pub fn parse_sfz_file<P: AsRef<Path>>(path: P) -> Result<InstrumentDescriptor> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_sfz_str(&content)
}

/// Normalize path separators to forward slashes
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}
