// Probe metadata block parser
//
// A probe file opens with a triple-quoted block of `key: value` lines,
// followed by the executable body. Parsing never touches the body.

use std::collections::BTreeSet;

use super::error::{DomainError, Result};
use super::probe::{ProbeBody, ProbeMetadata};

const BLOCK_DELIMITER: &str = "\"\"\"";

const KEY_CATEGORIES: &str = "categories";
const KEY_DESCRIPTION: &str = "description";
const KEY_CAUSE: &str = "cause";
const KEY_WORKAROUND: &str = "workaround";

const KNOWN_KEYS: [&str; 4] = [KEY_CATEGORIES, KEY_DESCRIPTION, KEY_CAUSE, KEY_WORKAROUND];

fn parse_error(line: usize, reason: impl Into<String>) -> DomainError {
    DomainError::MetadataParse {
        line,
        reason: reason.into(),
    }
}

/// Split a probe file into its metadata and body
///
/// # Errors
/// - `DomainError::MetadataParse` if the block is missing, unterminated,
///   has unknown or duplicate keys, or lacks a required key
pub fn parse_probe_source(source: &str) -> Result<(ProbeMetadata, ProbeBody)> {
    let lines: Vec<&str> = source.lines().collect();

    let open = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .ok_or_else(|| parse_error(1, "empty probe source"))?;

    let first = lines[open].trim();
    if !first.starts_with(BLOCK_DELIMITER) {
        return Err(parse_error(open + 1, "expected metadata block opening \"\"\""));
    }

    // Block content may start on the opening line: `"""categories: ...`
    let mut block: Vec<(usize, &str)> = Vec::new();
    let opening_rest = &first[BLOCK_DELIMITER.len()..];
    let mut close = None;

    if let Some(end) = opening_rest.find(BLOCK_DELIMITER) {
        block.push((open + 1, &opening_rest[..end]));
        close = Some(open);
    } else {
        if !opening_rest.trim().is_empty() {
            block.push((open + 1, opening_rest));
        }
        for (idx, line) in lines.iter().enumerate().skip(open + 1) {
            if let Some(end) = line.find(BLOCK_DELIMITER) {
                let head = &line[..end];
                if !head.trim().is_empty() {
                    block.push((idx + 1, head));
                }
                close = Some(idx);
                break;
            }
            block.push((idx + 1, line));
        }
    }

    let close = close.ok_or_else(|| parse_error(open + 1, "unterminated metadata block"))?;

    let metadata = parse_block(&block, open + 1)?;

    let body = lines[close + 1..]
        .iter()
        .skip_while(|l| l.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");

    let body = if body.is_empty() {
        body
    } else {
        format!("{}\n", body)
    };

    Ok((metadata, ProbeBody::new(body)))
}

/// Parse only the metadata block; the body is ignored entirely
pub fn parse_metadata(source: &str) -> Result<ProbeMetadata> {
    parse_probe_source(source).map(|(metadata, _)| metadata)
}

fn split_key(line: &str) -> Option<(&'static str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    KNOWN_KEYS
        .iter()
        .find(|k| **k == key)
        .map(|k| (*k, value.trim()))
}

/// An unindented `name: value` line whose name is a bare identifier
///
/// Indented lines and URL-like lines (`https://...`) are continuations.
fn looks_like_key(raw: &str) -> bool {
    if raw.starts_with(char::is_whitespace) {
        return false;
    }
    match raw.split_once(':') {
        Some((key, value)) => {
            !key.is_empty()
                && key.chars().all(|c| c.is_ascii_lowercase() || c == '_')
                && !value.starts_with("//")
        }
        None => false,
    }
}

/// Split a `categories` value into tags
///
/// Accepts `Core, import` as well as the list form `[Core, "import"]`.
fn parse_categories(raw: &str, line: usize) -> Result<BTreeSet<String>> {
    let raw = raw.trim();
    let inner = match raw.strip_prefix('[') {
        Some(rest) => rest
            .strip_suffix(']')
            .ok_or_else(|| parse_error(line, "unterminated categories list"))?,
        None => raw,
    };

    let mut categories = BTreeSet::new();
    for entry in inner.split(',') {
        let entry = entry.trim();
        let entry = ['"', '\'']
            .iter()
            .find_map(|q| entry.strip_prefix(*q).and_then(|e| e.strip_suffix(*q)))
            .unwrap_or(entry)
            .trim();

        if entry.is_empty() {
            return Err(parse_error(line, "categories must be non-empty strings"));
        }
        if entry.contains(['[', ']', '"', '\'']) {
            return Err(parse_error(line, format!("malformed category '{}'", entry)));
        }
        categories.insert(entry.to_string());
    }
    Ok(categories)
}

fn parse_block(block: &[(usize, &str)], open_line: usize) -> Result<ProbeMetadata> {
    let mut entries: Vec<(&'static str, String)> = Vec::new();
    let mut categories_line = open_line;

    for (line_no, raw) in block {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((key, value)) = split_key(line) {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(parse_error(*line_no, format!("duplicate key '{}'", key)));
            }
            if key == KEY_CATEGORIES {
                categories_line = *line_no;
            }
            entries.push((key, value.to_string()));
            continue;
        }

        if looks_like_key(raw) {
            let key = line.split_once(':').map(|(k, _)| k.trim()).unwrap_or(line);
            return Err(parse_error(*line_no, format!("unknown key '{}'", key)));
        }
        if entries.is_empty() {
            return Err(parse_error(*line_no, "expected 'key: value' line"));
        }

        if let Some((_, value)) = entries.last_mut() {
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(line);
        }
    }

    let take = |key: &str| -> Result<String> {
        entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| parse_error(open_line, format!("missing required key '{}'", key)))
    };

    let categories = parse_categories(&take(KEY_CATEGORIES)?, categories_line)?;

    let metadata = ProbeMetadata {
        categories,
        description: take(KEY_DESCRIPTION)?,
        cause: take(KEY_CAUSE)?,
        workaround: take(KEY_WORKAROUND)?,
    };

    metadata
        .validate()
        .map_err(|e| parse_error(open_line, e.to_string()))?;

    Ok(metadata)
}

/// Render metadata back into block form
pub fn render_metadata_block(metadata: &ProbeMetadata) -> String {
    format!(
        "{delim}\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n{delim}\n",
        KEY_CATEGORIES,
        metadata.categories_line(),
        KEY_DESCRIPTION,
        metadata.description,
        KEY_CAUSE,
        metadata.cause,
        KEY_WORKAROUND,
        metadata.workaround,
        delim = BLOCK_DELIMITER,
    )
}

#[cfg(test)]
#[path = "metadata_test.rs"]
mod metadata_test;
