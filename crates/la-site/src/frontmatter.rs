//! Frontmatter parsing for content files.
//!
//! A content file may start with a metadata block delimited by a run of at
//! least three identical characters:
//!
//! ```text
//! ---
//! title: Hello
//! ---
//! # Body
//! ```
//!
//! A run of `{` opens a JSON-flavored block closed by the same number of `}`.
//! Anything else opens a YAML block closed by the same run. Files without a
//! leading run have no metadata and the whole text is the raw body.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{LoadError, MetadataFormat};

/// Minimum length of a delimiter run.
const MIN_DELIMITER_LEN: usize = 3;

/// Metadata fields and body text split from a content file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frontmatter {
    pub fields: Map<String, Value>,
    pub raw_body: String,
}

/// Split a content file into metadata fields and raw body.
///
/// # Errors
///
/// Returns [`LoadError::MalformedDelimiters`] when the opening delimiter has no
/// closer and [`LoadError::Metadata`] when the block fails to parse.
pub fn parse(text: &str, filename: &Path) -> Result<Frontmatter, LoadError> {
    let Some(first) = text.chars().next() else {
        return Ok(Frontmatter::default());
    };

    let run_chars = text.chars().take_while(|&c| c == first).count();
    if run_chars < MIN_DELIMITER_LEN {
        return Ok(Frontmatter {
            fields: Map::new(),
            raw_body: text.to_owned(),
        });
    }
    let run_end = run_chars * first.len_utf8();

    let (closer, format) = if first == '{' {
        ("}".repeat(run_chars), MetadataFormat::Json)
    } else {
        (text[..run_end].to_owned(), MetadataFormat::Yaml)
    };

    let close_start = text[run_end..]
        .find(&closer)
        .map(|offset| run_end + offset)
        .ok_or_else(|| LoadError::MalformedDelimiters(filename.to_path_buf()))?;

    let block = &text[run_end..close_start];
    let raw_body = text[close_start + closer.len()..].trim().to_owned();

    let fields = match format {
        MetadataFormat::Json => parse_json_block(block),
        MetadataFormat::Yaml => parse_yaml_block(block),
    }
    .map_err(|message| LoadError::Metadata {
        filename: filename.to_path_buf(),
        format,
        message,
    })?;

    Ok(Frontmatter { fields, raw_body })
}

/// Parse the inside of a `{{{ ... }}}` block as an object literal.
///
/// Strict JSON is tried first; YAML flow mappings accept unquoted keys and
/// single-quoted strings as a fallback.
fn parse_json_block(block: &str) -> Result<Map<String, Value>, String> {
    let wrapped = format!("{{\n{block}\n}}");
    match serde_json::from_str::<Map<String, Value>>(&wrapped) {
        Ok(fields) => Ok(fields),
        Err(json_err) => serde_yaml::from_str::<Map<String, Value>>(&wrapped)
            .map_err(|_| json_err.to_string()),
    }
}

fn parse_yaml_block(block: &str) -> Result<Map<String, Value>, String> {
    if block.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<Value>(block).map_err(|e| e.to_string())? {
        Value::Null => Ok(Map::new()),
        Value::Object(fields) => Ok(fields),
        _ => Err("metadata must be a mapping of fields".to_owned()),
    }
}

/// Text before a line consisting of exactly `***`, or the whole body.
#[must_use]
pub fn summary(raw_body: &str) -> &str {
    let mut offset = 0;
    for line in raw_body.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "***" {
            return raw_body[..offset].trim_end();
        }
        offset += line.len();
    }
    raw_body
}
