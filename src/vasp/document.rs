//! Top-level document parsing entry points

use std::collections::HashSet;
use std::path::Path;

use log::debug;

use crate::value::Value;

use super::error::ParseError;
use super::parser::parse_node;
use super::tree::Element;

/// Configurable document parser.
///
/// By default the whole document is parsed. A selection restricts the
/// result to the named subtrees: while the traversal is outside any
/// selected subtree, a child is skipped unless its resolved name is
/// selected or a descendant's is, so a selection can never lose content
/// the caller asked for. Skipped subtrees are not visited at all, so
/// callers that only need a few named subtrees out of a very large
/// document avoid most of the conversion work.
///
/// ```no_run
/// use dftxml::vasp::VaspParser;
///
/// let forces = VaspParser::new()
///     .with_selection(["calculation"])
///     .parse_file("vasprun.xml")?;
/// # Ok::<(), dftxml::vasp::ParseError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct VaspParser {
    selection: Option<HashSet<String>>,
}

impl VaspParser {
    /// Parser without any subtree selection.
    pub fn new() -> VaspParser {
        VaspParser::default()
    }

    /// Restrict parsing to the given resolved subtree names.
    pub fn with_selection<I, S>(mut self, names: I) -> VaspParser
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Parse one XML file into its document value.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Value, ParseError> {
        let path = path.as_ref();
        debug!("parsing {}", path.display());
        let root = Element::from_path(path)?;
        self.parse_element(&root)
    }

    /// Parse an XML string into its document value.
    pub fn parse_str(&self, xml: &str) -> Result<Value, ParseError> {
        let root = Element::from_xml(xml)?;
        self.parse_element(&root)
    }

    /// Parse an already loaded element tree.
    ///
    /// Returns the root element's own value, so for the usual composite
    /// root this is the mapping of its children.
    pub fn parse_element(&self, root: &Element) -> Result<Value, ParseError> {
        let (_, value) = parse_node(root, self.selection.as_ref())?;
        Ok(value)
    }
}

/// Parse one XML file without a selection.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Value, ParseError> {
    VaspParser::new().parse_file(path)
}

/// Parse an XML string without a selection.
pub fn parse_str(xml: &str) -> Result<Value, ParseError> {
    VaspParser::new().parse_str(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <modeling>
          <generator>
            <i name="program" type="string">vasp </i>
          </generator>
          <results>
            <i name="total">-12.5</i>
          </results>
          <extra>
            <i name="ignored">1.0</i>
          </extra>
        </modeling>"#;

    #[test]
    fn test_parse_str_returns_root_mapping() {
        let doc = parse_str(DOC).unwrap();
        assert_eq!(
            doc.get("generator")
                .and_then(|g| g.get("program"))
                .and_then(Value::as_str),
            Some("vasp")
        );
    }

    #[test]
    fn test_selection_keeps_only_requested_subtrees() {
        let doc = VaspParser::new()
            .with_selection(["results"])
            .parse_str(DOC)
            .unwrap();
        let mapping = doc.as_mapping().unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(
            doc.get("results")
                .and_then(|r| r.get("total"))
                .and_then(Value::as_f64),
            Some(-12.5)
        );
    }

    #[test]
    fn test_default_parser_equals_new() {
        let a = VaspParser::default().parse_str(DOC).unwrap();
        let b = VaspParser::new().parse_str(DOC).unwrap();
        assert_eq!(a, b);
    }
}
