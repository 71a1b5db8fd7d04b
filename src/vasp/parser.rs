//! Recursive document-model construction
//!
//! Every element is classified exactly once into a terminal kind or the
//! composite fallback. Terminal kinds are a closed set, so they live in an
//! enum rather than a lookup table; the match below is the whole dispatch.

use std::collections::{BTreeMap, HashSet};

use crate::value::{Mapping, Scalar, Value, ValueType};

use super::error::ParseError;
use super::lexer::convert_token;
use super::table::parse_table;
use super::tree::Element;

/// Node classification by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    /// `i`: scalar with a type attribute
    Scalar,
    /// `v`: whitespace-split vector with a type attribute
    Vector,
    /// `varray`: list of value vectors (row-major matrix)
    VectorList,
    /// `array`: tabular node with dimensions/fields/rows
    Table,
    /// `time`: fixed-width two-float timestamp
    Timestamp,
    /// `atoms`/`types`: bare integer counters
    Counter,
    /// Anything else: generic recursion over attributes and children
    Composite,
}

impl NodeKind {
    fn of(tag: &str) -> NodeKind {
        match tag {
            "i" => NodeKind::Scalar,
            "v" => NodeKind::Vector,
            "varray" => NodeKind::VectorList,
            "array" => NodeKind::Table,
            "time" => NodeKind::Timestamp,
            "atoms" | "types" => NodeKind::Counter,
            _ => NodeKind::Composite,
        }
    }
}

/// Parse one element into its resolved name and value.
///
/// `filter` carries the caller's subtree selection while the traversal is
/// outside any selected subtree; it is dropped once a selected subtree is
/// entered so selected content is kept whole.
pub(crate) fn parse_node(
    element: &Element,
    filter: Option<&HashSet<String>>,
) -> Result<(Option<String>, Value), ParseError> {
    let name = element.resolved_name();
    let value = match NodeKind::of(&element.tag) {
        NodeKind::Scalar => parse_scalar(element)?,
        NodeKind::Vector => parse_vector(element)?,
        NodeKind::VectorList => parse_vector_list(element)?,
        NodeKind::Table => Value::Table(Box::new(parse_table(element)?)),
        NodeKind::Timestamp => parse_timestamp(element)?,
        NodeKind::Counter => parse_counter(element)?,
        NodeKind::Composite => parse_composite(element, filter)?,
    };
    Ok((name, value))
}

/// Declared type of a value element, defaulting to float.
fn element_type(element: &Element) -> Result<ValueType, ParseError> {
    let attr = element.attr("type");
    ValueType::from_attr(attr)
        .ok_or_else(|| ParseError::UnknownType(attr.unwrap_or_default().to_string()))
}

fn parse_scalar(element: &Element) -> Result<Value, ParseError> {
    let typ = element_type(element)?;
    convert_token(typ, &element.text)
        .map(Value::Scalar)
        .map_err(|e| e.in_element(Some(&element.display_name())))
}

fn parse_vector(element: &Element) -> Result<Value, ParseError> {
    let typ = element_type(element)?;
    element
        .text
        .split_whitespace()
        .map(|token| {
            convert_token(typ, token).map_err(|e| e.in_element(Some(&element.display_name())))
        })
        .collect::<Result<Vec<Scalar>, ParseError>>()
        .map(Value::Vector)
}

/// A `varray` is a list of `v` rows, each converted with its own type rule.
fn parse_vector_list(element: &Element) -> Result<Value, ParseError> {
    element
        .children
        .iter()
        .filter(|child| child.tag == "v")
        .map(parse_vector)
        .collect::<Result<Vec<Value>, ParseError>>()
        .map(Value::List)
}

/// A `time` element holds two 8-character float columns with no separator;
/// splitting at byte 8 is the only valid strategy, whatever whitespace
/// each half contains.
fn parse_timestamp(element: &Element) -> Result<Value, ParseError> {
    let text = &element.text;
    let split = text.len().min(8);
    if !text.is_char_boundary(split) {
        return Err(ParseError::bad_token(text).in_element(Some(&element.display_name())));
    }
    let (first, second) = text.split_at(split);
    let pair = [first, second]
        .into_iter()
        .map(|half| {
            convert_token(ValueType::Float, half)
                .map_err(|e| e.in_element(Some(&element.display_name())))
        })
        .collect::<Result<Vec<Scalar>, ParseError>>()?;
    Ok(Value::Vector(pair))
}

/// Counter leaves are integers regardless of any type attribute.
fn parse_counter(element: &Element) -> Result<Value, ParseError> {
    convert_token(ValueType::Int, &element.text)
        .map(Value::Scalar)
        .map_err(|e| e.in_element(Some(&element.display_name())))
}

fn parse_composite(
    element: &Element,
    filter: Option<&HashSet<String>>,
) -> Result<Value, ParseError> {
    let mut entries = Mapping::new();

    // Non-name attributes become string fields of the mapping; a child
    // with the same resolved name overwrites them below.
    for (key, value) in element.attributes() {
        if key != "name" {
            entries.insert(
                Some(key.to_string()),
                Value::Scalar(Scalar::Str(value.to_string())),
            );
        }
    }

    // Resolve names and apply the selection before anything is parsed; the
    // aggregation decision below needs the full retained-sibling multiset.
    let mut retained: Vec<(&Element, Option<String>, Option<&HashSet<String>>)> = Vec::new();
    for child in &element.children {
        let name = child.resolved_name();
        match filter {
            Some(keep) => {
                let selected = name.as_deref().is_some_and(|n| keep.contains(n));
                if selected {
                    retained.push((child, name, None));
                } else if subtree_contains(child, keep) {
                    retained.push((child, name, filter));
                }
            }
            None => retained.push((child, name, None)),
        }
    }

    let mut counts: BTreeMap<Option<String>, usize> = BTreeMap::new();
    for (_, name, _) in &retained {
        *counts.entry(name.clone()).or_insert(0) += 1;
    }
    // Repeated names fold into one list each, in document order.
    for (name, count) in &counts {
        if *count > 1 {
            entries.insert(name.clone(), Value::List(Vec::new()));
        }
    }

    for (child, name, child_filter) in retained {
        let (_, value) = parse_node(child, child_filter)?;
        if counts.get(&name).copied().unwrap_or(0) > 1 {
            if let Some(Value::List(items)) = entries.get_mut(&name) {
                items.push(value);
            }
        } else {
            entries.insert(name, value);
        }
    }

    Ok(Value::Mapping(entries))
}

/// Whether any descendant of `element` has a selected resolved name.
fn subtree_contains(element: &Element, keep: &HashSet<String>) -> bool {
    element.children.iter().any(|child| {
        child
            .resolved_name()
            .as_deref()
            .is_some_and(|n| keep.contains(n))
            || subtree_contains(child, keep)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> (Option<String>, Value) {
        parse_node(&Element::from_xml(xml).unwrap(), None).unwrap()
    }

    #[test]
    fn test_scalar_without_type_is_float() {
        let (name, value) = parse(r#"<i name="EDIFF">      0.00010000</i>"#);
        assert_eq!(name.as_deref(), Some("EDIFF"));
        assert_eq!(value, Value::Scalar(Scalar::Float(0.0001)));
    }

    #[test]
    fn test_scalar_types() {
        let (_, v) = parse(r#"<i type="int" name="IBRION">   2</i>"#);
        assert_eq!(v, Value::Scalar(Scalar::Int(2)));
        let (_, v) = parse(r#"<i type="string" name="program">vasp </i>"#);
        assert_eq!(v, Value::Scalar(Scalar::Str("vasp".into())));
        let (_, v) = parse(r#"<i type="logical" name="LWAVE">T</i>"#);
        assert_eq!(v, Value::Scalar(Scalar::Bool(true)));
        let (_, v) = parse(r#"<i type="logical" name="LCHARG">F</i>"#);
        assert_eq!(v, Value::Scalar(Scalar::Bool(false)));
    }

    #[test]
    fn test_scalar_with_empty_type_is_float() {
        let (_, v) = parse(r#"<i type="" name="x">1.5</i>"#);
        assert_eq!(v, Value::Scalar(Scalar::Float(1.5)));
    }

    #[test]
    fn test_unknown_scalar_type_is_rejected() {
        let err = parse_node(
            &Element::from_xml(r#"<i type="complex">1</i>"#).unwrap(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::UnknownType(t) if t == "complex"));
    }

    #[test]
    fn test_vector_splits_on_whitespace_runs() {
        let (_, v) = parse("<v>  1.0   2.0\n  3.0 </v>");
        assert_eq!(
            v,
            Value::Vector(vec![
                Scalar::Float(1.0),
                Scalar::Float(2.0),
                Scalar::Float(3.0)
            ])
        );
    }

    #[test]
    fn test_empty_vector_is_empty_not_an_error() {
        let (_, v) = parse("<v></v>");
        assert_eq!(v, Value::Vector(Vec::new()));
        let (_, v) = parse(r#"<v type="logical"></v>"#);
        assert_eq!(v, Value::Vector(Vec::new()));
    }

    #[test]
    fn test_logical_vector() {
        let (_, v) = parse(r#"<v type="logical">T F X</v>"#);
        assert_eq!(
            v,
            Value::Vector(vec![
                Scalar::Bool(true),
                Scalar::Bool(false),
                Scalar::Bool(false)
            ])
        );
    }

    #[test]
    fn test_varray_is_a_list_of_rows() {
        let (name, v) = parse(
            r#"<varray name="basis">
                 <v>  1.0  0.0 </v>
                 <v>  0.0  1.0 </v>
               </varray>"#,
        );
        assert_eq!(name.as_deref(), Some("basis"));
        let rows = v.as_list().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            Value::Vector(vec![Scalar::Float(0.0), Scalar::Float(1.0)])
        );
    }

    #[test]
    fn test_timestamp_splits_at_byte_eight() {
        let (name, v) = parse(r#"<time name="dav">    0.27    0.31</time>"#);
        assert_eq!(name.as_deref(), Some("time:dav"));
        assert_eq!(
            v,
            Value::Vector(vec![Scalar::Float(0.27), Scalar::Float(0.31)])
        );
    }

    #[test]
    fn test_timestamp_halves_keep_embedded_whitespace() {
        // 8.05 padded to eight columns either side
        let (_, v) = parse("<time name=\"total\">    8.05   16.23</time>");
        assert_eq!(
            v,
            Value::Vector(vec![Scalar::Float(8.05), Scalar::Float(16.23)])
        );
    }

    #[test]
    fn test_short_timestamp_is_an_error() {
        let err =
            parse_node(&Element::from_xml("<time>1.0</time>").unwrap(), None).unwrap_err();
        assert!(matches!(err, ParseError::NumericFormat { .. }));
    }

    #[test]
    fn test_counters_are_integers_whatever_the_type_says() {
        let (name, v) = parse("<atoms>       2 </atoms>");
        assert_eq!(name.as_deref(), Some("atoms"));
        assert_eq!(v, Value::Scalar(Scalar::Int(2)));
        let (_, v) = parse(r#"<types type="string">       1 </types>"#);
        assert_eq!(v, Value::Scalar(Scalar::Int(1)));
    }

    #[test]
    fn test_composite_collects_attributes_except_name() {
        let (name, v) = parse(r#"<structure name="primitive" comment="x"><i name="a">1.0</i></structure>"#);
        assert_eq!(name.as_deref(), Some("structure:primitive"));
        let mapping = v.as_mapping().unwrap();
        assert_eq!(
            mapping.get(&Some("comment".to_string())),
            Some(&Value::Scalar(Scalar::Str("x".into())))
        );
        assert!(!mapping.contains_key(&Some("name".to_string())));
        assert_eq!(v.get("a").and_then(Value::as_f64), Some(1.0));
    }

    #[test]
    fn test_repeated_siblings_fold_into_one_list() {
        let (_, v) = parse(
            r#"<calculation>
                 <scstep><i name="e">1.0</i></scstep>
                 <scstep><i name="e">2.0</i></scstep>
                 <scstep><i name="e">3.0</i></scstep>
                 <energy><i name="e">3.0</i></energy>
               </calculation>"#,
        );
        let steps = v.get("scstep").and_then(Value::as_list).unwrap();
        assert_eq!(steps.len(), 3);
        // list order equals document order
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.get("e").and_then(Value::as_f64), Some(1.0 + i as f64));
        }
        // single occurrence stays a nested mapping
        assert!(v.get("energy").and_then(Value::as_mapping).is_some());
    }

    #[test]
    fn test_anonymous_child_keys_under_none() {
        let (_, v) = parse("<wrapper><v>1.0 2.0</v></wrapper>");
        let mapping = v.as_mapping().unwrap();
        assert!(mapping.contains_key(&None));
    }

    #[test]
    fn test_two_anonymous_children_fold_into_a_list() {
        let (_, v) = parse("<wrapper><v>1.0</v><v>2.0</v></wrapper>");
        let mapping = v.as_mapping().unwrap();
        let items = match mapping.get(&None) {
            Some(Value::List(items)) => items,
            other => panic!("expected list, got {other:?}"),
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_selection_prunes_unrelated_subtrees() {
        let keep: HashSet<String> = ["results".to_string()].into();
        let (_, v) = parse_node(
            &Element::from_xml(
                r#"<modeling>
                     <generator><i name="program" type="string">vasp</i></generator>
                     <results><i name="total">-12.5</i></results>
                     <wrapper><results><i name="total">-13.0</i></results></wrapper>
                   </modeling>"#,
            )
            .unwrap(),
            Some(&keep),
        )
        .unwrap();
        let mapping = v.as_mapping().unwrap();
        assert!(!mapping.contains_key(&Some("generator".to_string())));
        // directly selected subtree kept whole
        assert_eq!(
            v.get("results")
                .and_then(|r| r.get("total"))
                .and_then(Value::as_f64),
            Some(-12.5)
        );
        // ancestor of a selected subtree is descended, not skipped
        assert_eq!(
            v.get("wrapper")
                .and_then(|w| w.get("results"))
                .and_then(|r| r.get("total"))
                .and_then(Value::as_f64),
            Some(-13.0)
        );
    }
}
