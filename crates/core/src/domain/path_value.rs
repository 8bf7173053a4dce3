// Package path attribute value
//
// `__path__` is a single string on constrained runtimes and a list of
// strings on the reference runtime. Shape is part of the value so
// assertions can match on it directly.

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};

/// Shape of a path attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathShape {
    Scalar,
    Sequence,
}

impl std::fmt::Display for PathShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathShape::Scalar => write!(f, "SCALAR"),
            PathShape::Sequence => write!(f, "SEQUENCE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathValue {
    Scalar(String),
    Sequence(Vec<String>),
}

impl PathValue {
    pub fn shape(&self) -> PathShape {
        match self {
            PathValue::Scalar(_) => PathShape::Scalar,
            PathValue::Sequence(_) => PathShape::Sequence,
        }
    }

    /// All locations regardless of shape
    pub fn locations(&self) -> Vec<&str> {
        match self {
            PathValue::Scalar(s) => vec![s.as_str()],
            PathValue::Sequence(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Text `print()` writes for this value (without trailing newline)
    ///
    /// A scalar prints bare; a sequence prints as a list of quoted strings.
    pub fn render(&self) -> String {
        match self {
            PathValue::Scalar(s) => s.clone(),
            PathValue::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(|s| quote_str(s)).collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }

    /// Recover a value from one line of probe output
    ///
    /// A line in `[...]` form is read as a sequence of quoted strings;
    /// anything else is a scalar.
    ///
    /// # Errors
    /// - `DomainError::InvalidPathValue` for a bracketed line that is not a
    ///   well-formed list of string literals
    pub fn parse_rendered(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            let inner = &trimmed[1..trimmed.len() - 1];
            return parse_string_list(inner).map(PathValue::Sequence);
        }

        Ok(PathValue::Scalar(line.to_string()))
    }
}

impl std::fmt::Display for PathValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Quote a string the way the reference runtime's `repr` does
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn parse_string_list(inner: &str) -> Result<Vec<String>> {
    let invalid = |reason: &str| DomainError::InvalidPathValue(format!("[{}]: {}", inner, reason));

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let quote = match chars.next() {
            None if items.is_empty() => return Ok(items),
            None => return Err(invalid("trailing comma")),
            Some(q @ ('\'' | '"')) => q,
            Some(_) => return Err(invalid("expected string literal")),
        };

        let mut item = String::new();
        loop {
            match chars.next() {
                None => return Err(invalid("unterminated string literal")),
                Some('\\') => match chars.next() {
                    Some('n') => item.push('\n'),
                    Some('r') => item.push('\r'),
                    Some('t') => item.push('\t'),
                    Some(c) => item.push(c),
                    None => return Err(invalid("dangling escape")),
                },
                Some(c) if c == quote => break,
                Some(c) => item.push(c),
            }
        }
        items.push(item);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => return Ok(items),
            Some(',') => continue,
            Some(_) => return Err(invalid("expected ',' between items")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_shapes() {
        let scalar = PathValue::Scalar("/fake/path/to/modules".to_string());
        let sequence = PathValue::Sequence(vec!["/fake/path/to/modules".to_string()]);

        assert_eq!(scalar.render(), "/fake/path/to/modules");
        assert_eq!(sequence.render(), "['/fake/path/to/modules']");
        assert_eq!(PathValue::Sequence(vec![]).render(), "[]");
    }

    #[test]
    fn test_parse_rendered_shapes() {
        let scalar = PathValue::parse_rendered("/fake/path/to/modules\n").unwrap();
        let sequence = PathValue::parse_rendered("['/a', \"/b\"]\n").unwrap();

        assert_eq!(scalar.shape(), PathShape::Scalar);
        assert_eq!(
            sequence,
            PathValue::Sequence(vec!["/a".to_string(), "/b".to_string()])
        );
    }

    #[test]
    fn test_quote_choice_and_escapes() {
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("a'b\"c"), "'a\\'b\"c'");
        assert_eq!(quote_str("C:\\mods"), "'C:\\\\mods'");

        let value = PathValue::Sequence(vec!["a'b\"c".to_string(), "C:\\mods".to_string()]);
        assert_eq!(PathValue::parse_rendered(&value.render()).unwrap(), value);
    }

    #[test]
    fn test_parse_rejects_malformed_list() {
        assert!(PathValue::parse_rendered("['/a',]").is_err());
        assert!(PathValue::parse_rendered("['/a' '/b']").is_err());
        assert!(PathValue::parse_rendered("[/a]").is_err());
        assert!(PathValue::parse_rendered("['/a").is_ok()); // no closing bracket: scalar
    }
}
