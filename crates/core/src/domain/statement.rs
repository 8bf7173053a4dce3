// Probe body statements understood by the model runtime

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};

/// Module attributes a body may print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleAttribute {
    Path,
    Name,
    File,
}

impl ModuleAttribute {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "__path__" => Some(Self::Path),
            "__name__" => Some(Self::Name),
            "__file__" => Some(Self::File),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "__path__",
            Self::Name => "__name__",
            Self::File => "__file__",
        }
    }
}

impl std::fmt::Display for ModuleAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One straight-line statement of a probe body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// `import <module>`
    Import { module: String },
    /// `print(<module>)` or `print(<module>.<attr>)`
    Print {
        module: String,
        attribute: Option<ModuleAttribute>,
    },
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_dotted_name(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

fn parse_line(line: &str, line_no: usize) -> Result<Statement> {
    let unsupported = || DomainError::UnsupportedStatement {
        line: line_no,
        statement: line.to_string(),
    };

    if let Some(rest) = line.strip_prefix("import ") {
        let module = rest.trim();
        if !is_dotted_name(module) {
            return Err(unsupported());
        }
        return Ok(Statement::Import {
            module: module.to_string(),
        });
    }

    if let Some(rest) = line.strip_prefix("print(") {
        let inner = rest.strip_suffix(')').ok_or_else(unsupported)?.trim();

        // Attribute is the last dotted component when it is a dunder we know
        if let Some((module, attr)) = inner.rsplit_once('.') {
            if let Some(attribute) = ModuleAttribute::parse(attr) {
                if !is_dotted_name(module) {
                    return Err(unsupported());
                }
                return Ok(Statement::Print {
                    module: module.to_string(),
                    attribute: Some(attribute),
                });
            }
        }

        if !is_dotted_name(inner) {
            return Err(unsupported());
        }
        return Ok(Statement::Print {
            module: inner.to_string(),
            attribute: None,
        });
    }

    Err(unsupported())
}

/// Parse body source into statements
///
/// Blank lines and `#` comments are skipped. Line numbers in errors are
/// relative to the body.
pub fn parse_statements(source: &str) -> Result<Vec<Statement>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                None
            } else {
                Some(parse_line(line, idx + 1))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_example_body() {
        let stmts = parse_statements("import modules\n\nprint(modules.__path__)\n").unwrap();

        assert_eq!(
            stmts,
            vec![
                Statement::Import {
                    module: "modules".to_string()
                },
                Statement::Print {
                    module: "modules".to_string(),
                    attribute: Some(ModuleAttribute::Path),
                },
            ]
        );
    }

    #[test]
    fn test_comments_and_dotted_names() {
        let stmts = parse_statements("# probe\nimport pkg.sub\nprint(pkg.sub)\n").unwrap();

        assert_eq!(stmts.len(), 2);
        assert_eq!(
            stmts[1],
            Statement::Print {
                module: "pkg.sub".to_string(),
                attribute: None,
            }
        );
    }

    #[test]
    fn test_unsupported_statement() {
        let err = parse_statements("import modules\nx = 1\n").unwrap_err();

        assert_eq!(
            err,
            DomainError::UnsupportedStatement {
                line: 2,
                statement: "x = 1".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_malformed_print() {
        assert!(parse_statements("print(modules.__path__").is_err());
        assert!(parse_statements("print(1 + 2)").is_err());
    }
}
