//! Errors produced while parsing a vasprun.xml document
//!
//! All structural violations are fatal for the whole `parse_file` call:
//! downstream numeric comparisons require complete documents, so a partial
//! result is never returned.

use std::path::PathBuf;

/// Errors that can occur while building the document model.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input path does not exist or is not readable.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// The offending input path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The input is not well-formed markup at the syntactic level.
    #[error("malformed XML in {}: {source}", .path.display())]
    Markup {
        /// The offending input path
        path: PathBuf,
        /// Underlying XML error
        source: quick_xml::Error,
    },

    /// The input ended before the root element was closed.
    #[error("malformed XML in {}: unexpected end of document", .path.display())]
    Truncated {
        /// The offending input path
        path: PathBuf,
    },

    /// A text token failed the integer or float grammar.
    #[error("malformed numeric token \"{token}\"{}", element_suffix(.element))]
    NumericFormat {
        /// The offending token
        token: String,
        /// Resolved name of the owning element, when known
        element: Option<String>,
    },

    /// An explicit `type` attribute has no registered conversion rule.
    #[error("unknown value type \"{0}\"")]
    UnknownType(String),

    /// The rectangularity assumption of a numeric table was violated, or a
    /// row's token count does not match the declared field count.
    #[error("jagged table: {0}")]
    ShapeMismatch(String),
}

impl ParseError {
    /// Numeric-format error for a token, element context not yet known.
    pub(crate) fn bad_token(token: &str) -> ParseError {
        ParseError::NumericFormat {
            token: token.to_string(),
            element: None,
        }
    }

    /// Attach the owning element's resolved name to a numeric-format error.
    pub(crate) fn in_element(self, name: Option<&str>) -> ParseError {
        match self {
            ParseError::NumericFormat {
                token,
                element: None,
            } => ParseError::NumericFormat {
                token,
                element: name.map(str::to_string),
            },
            other => other,
        }
    }
}

fn element_suffix(element: &Option<String>) -> String {
    match element {
        Some(name) => format!(" in element \"{name}\""),
        None => String::new(),
    }
}
