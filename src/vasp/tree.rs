//! In-memory element tree loaded through quick-xml
//!
//! The document-model builder is a recursive descent over an already
//! parsed element tree, so the pull events from quick-xml are first folded
//! into a small owned [`Element`] tree. Text content is kept exactly as
//! written (no trimming): the fixed-width timestamp rule splits raw text
//! at a byte position, and numeric converters trim per token instead.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::ParseError;

/// One XML element: tag, attributes, raw text and child elements.
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Tag name
    pub tag: String,
    /// Attributes in document order
    attributes: Vec<(String, String)>,
    /// Concatenated raw text content
    pub text: String,
    /// Child elements in document order
    pub children: Vec<Element>,
}

impl Element {
    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical name of this element.
    ///
    /// Value-carrying tags (`i`, `v`, `varray`) take their `name` attribute
    /// alone, so an unnamed value element resolves to `None`. Every other
    /// tag resolves to `tag` or `tag:name`.
    pub fn resolved_name(&self) -> Option<String> {
        match self.tag.as_str() {
            "i" | "v" | "varray" => self.attr("name").map(str::to_string),
            _ => match self.attr("name") {
                Some(name) => Some(format!("{}:{}", self.tag, name)),
                None => Some(self.tag.clone()),
            },
        }
    }

    /// Name used in diagnostics: the resolved name, or the bare tag for
    /// anonymous value elements.
    pub fn display_name(&self) -> String {
        self.resolved_name().unwrap_or_else(|| self.tag.clone())
    }

    /// Load the root element of an XML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Element, ParseError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = Reader::from_reader(BufReader::with_capacity(64 * 1024, file));
        read_tree(reader, path)
    }

    /// Load the root element from an XML string.
    pub fn from_xml(xml: &str) -> Result<Element, ParseError> {
        read_tree(Reader::from_reader(xml.as_bytes()), Path::new("<string>"))
    }
}

fn markup(path: &Path, source: quick_xml::Error) -> ParseError {
    ParseError::Markup {
        path: path.to_path_buf(),
        source,
    }
}

fn element_from_start(e: &BytesStart, path: &Path) -> Result<Element, ParseError> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| markup(path, quick_xml::Error::from(err)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| markup(path, err))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        tag,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

/// Fold the pull-event stream into an owned element tree.
fn read_tree<R: BufRead>(mut reader: Reader<R>, path: &Path) -> Result<Element, ParseError> {
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let element = element_from_start(e, path)?;
                stack.push(element);
            }
            Ok(Event::Empty(ref e)) => {
                let element = element_from_start(e, path)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Ok(Event::Text(ref t)) => {
                if let Some(current) = stack.last_mut() {
                    let text = t.unescape().map_err(|err| markup(path, err))?;
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref t)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(t));
                }
            }
            Ok(Event::End(_)) => {
                // check_end_names is on, so the tag matches the open element
                let done = match stack.pop() {
                    Some(element) => element,
                    None => return Err(ParseError::Truncated {
                        path: path.to_path_buf(),
                    }),
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => return Ok(done),
                }
            }
            Ok(Event::Eof) => {
                return Err(ParseError::Truncated {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => return Err(markup(path, err)),
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_small_tree() {
        let root = Element::from_xml(
            r#"<modeling><incar><i type="int" name="IBRION">   2</i></incar></modeling>"#,
        )
        .unwrap();
        assert_eq!(root.tag, "modeling");
        assert_eq!(root.children.len(), 1);
        let i = &root.children[0].children[0];
        assert_eq!(i.tag, "i");
        assert_eq!(i.attr("type"), Some("int"));
        assert_eq!(i.text, "   2");
    }

    #[test]
    fn test_text_is_not_trimmed() {
        let root =
            Element::from_xml("<time name=\"totalsc\">    0.27    0.31</time>").unwrap();
        assert_eq!(root.text, "    0.27    0.31");
    }

    #[test]
    fn test_entities_are_unescaped() {
        let root = Element::from_xml(r#"<i name="a&amp;b">x &lt; y</i>"#).unwrap();
        assert_eq!(root.attr("name"), Some("a&b"));
        assert_eq!(root.text, "x < y");
    }

    #[test]
    fn test_empty_element() {
        let root = Element::from_xml("<v/>").unwrap();
        assert_eq!(root.tag, "v");
        assert!(root.text.is_empty());
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_resolved_name_for_value_tags() {
        let named = Element::from_xml(r#"<i name="volume">1.0</i>"#).unwrap();
        assert_eq!(named.resolved_name(), Some("volume".to_string()));
        let anonymous = Element::from_xml("<v>1 2 3</v>").unwrap();
        assert_eq!(anonymous.resolved_name(), None);
        let varray = Element::from_xml(r#"<varray name="forces"/>"#).unwrap();
        assert_eq!(varray.resolved_name(), Some("forces".to_string()));
    }

    #[test]
    fn test_resolved_name_for_container_tags() {
        let bare = Element::from_xml("<calculation/>").unwrap();
        assert_eq!(bare.resolved_name(), Some("calculation".to_string()));
        let named = Element::from_xml(r#"<structure name="initialpos"/>"#).unwrap();
        assert_eq!(
            named.resolved_name(),
            Some("structure:initialpos".to_string())
        );
        let array = Element::from_xml(r#"<array name="atoms"/>"#).unwrap();
        assert_eq!(array.resolved_name(), Some("array:atoms".to_string()));
    }

    #[test]
    fn test_truncated_document_is_an_error() {
        assert!(Element::from_xml("<modeling><incar>").is_err());
        assert!(Element::from_xml("").is_err());
    }

    #[test]
    fn test_mismatched_tags_are_an_error() {
        assert!(Element::from_xml("<a><b></a></b>").is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Element::from_path("/no/such/file.xml").unwrap_err();
        assert!(err.to_string().contains("/no/such/file.xml"));
    }
}
