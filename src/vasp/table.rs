//! Tabular node assembly, including the dense numeric fast path
//!
//! An `array` node declares dimension labels and field names, then nests
//! its rows inside repetition markers (`set` elements). The shape of a
//! dense numeric table is nowhere declared; it is discovered by measuring
//! nesting cardinalities, after which every row is written straight into
//! its final position of one pre-sized flat buffer. Discovering the shape
//! first costs a second walk but removes per-row reallocation, so filling
//! is O(total element count) with exactly one allocation.

use crate::value::{Field, RowSet, Scalar, Table, TableData, Tensor, ValueType};

use super::error::ParseError;
use super::lexer::{convert_token, parse_float};
use super::tree::Element;

/// Parse an `array` element into a [`Table`].
///
/// Children are, in order: zero or more `dimension` labels, zero or more
/// `field` declarations, and at most one `set` of rows. Tables whose
/// fields are all untyped take the dense numeric path; any explicitly
/// typed field switches to the heterogeneous row representation.
pub(crate) fn parse_table(array: &Element) -> Result<Table, ParseError> {
    let ctx = array.display_name();
    let mut dimensions = Vec::new();
    let mut fields: Vec<Field> = Vec::new();
    let mut row_set: Option<&Element> = None;

    for child in &array.children {
        match child.tag.as_str() {
            "dimension" => dimensions.push(child.text.trim().to_string()),
            "field" => fields.push(Field {
                name: child.text.trim().to_string(),
                typ: field_type(child)?,
            }),
            "set" => row_set = Some(child),
            _ => {}
        }
    }

    let numeric = fields.iter().all(|f| f.typ.is_none());
    let values = match (row_set, numeric) {
        (Some(set), true) => TableData::Tensor(parse_dense(set, fields.len(), &ctx)?),
        (Some(set), false) => TableData::Rows(parse_rows(set, &fields, &ctx)?),
        (None, true) => TableData::Tensor(Tensor::new(vec![0, fields.len()], Vec::new())),
        (None, false) => TableData::Rows(Vec::new()),
    };

    Ok(Table {
        dimensions,
        fields,
        values,
    })
}

/// Explicit field type, `None` when the attribute is absent or empty.
fn field_type(field: &Element) -> Result<Option<ValueType>, ParseError> {
    match field.attr("type") {
        None | Some("") => Ok(None),
        Some(token) => ValueType::from_attr(Some(token))
            .map(Some)
            .ok_or_else(|| ParseError::UnknownType(token.to_string())),
    }
}

/// Row-bearing children of a repetition marker.
///
/// Anything other than `set`/`rc`/`r` (comments and the like) does not
/// carry rows and is skipped by both table paths.
fn row_children(set: &Element) -> Vec<&Element> {
    set.children
        .iter()
        .filter(|c| matches!(c.tag.as_str(), "set" | "rc" | "r"))
        .collect()
}

/// Dense path: discover the shape, then fill one flat buffer by offset.
fn parse_dense(set: &Element, field_count: usize, ctx: &str) -> Result<Tensor, ParseError> {
    // Pass 1: record each nesting level's child count by always descending
    // into the first child. Rectangularity makes the first chain
    // representative; pass 2 enforces it for every sibling.
    let mut cardinalities = Vec::new();
    let mut cursor = set;
    loop {
        let kids = row_children(cursor);
        cardinalities.push(kids.len());
        match kids.first() {
            Some(first) if first.tag == "set" => cursor = first,
            _ => break,
        }
    }

    let total = cardinalities
        .iter()
        .try_fold(1usize, |acc, &c| acc.checked_mul(c))
        .and_then(|r| r.checked_mul(field_count))
        .ok_or_else(|| ParseError::ShapeMismatch(format!("table \"{ctx}\" is too large")))?;

    let mut data = vec![0.0f64; total];
    fill_set(set, &cardinalities, field_count, &mut data, 0, ctx)?;

    let mut shape = cardinalities;
    shape.push(field_count);
    Ok(Tensor::new(shape, data))
}

fn fill_set(
    set: &Element,
    cardinalities: &[usize],
    field_count: usize,
    data: &mut [f64],
    offset: usize,
    ctx: &str,
) -> Result<(), ParseError> {
    let kids = row_children(set);
    let expected = cardinalities.first().copied().unwrap_or(0);
    if kids.len() != expected {
        return Err(ParseError::ShapeMismatch(format!(
            "\"{ctx}\" has a set with {} entries where its first sibling has {expected}",
            kids.len()
        )));
    }

    let inner = &cardinalities[1..];
    let stride = inner.iter().product::<usize>() * field_count;
    for (i, kid) in kids.iter().enumerate() {
        let base = offset + i * stride;
        match kid.tag.as_str() {
            "set" if !inner.is_empty() => {
                fill_set(kid, inner, field_count, data, base, ctx)?;
            }
            "r" if inner.is_empty() => {
                fill_row(kid, field_count, &mut data[base..base + field_count], ctx)?;
            }
            // set deeper than the first chain, or a row above it
            _ => {
                return Err(ParseError::ShapeMismatch(format!(
                    "\"{ctx}\" mixes nesting depths ({} at depth {})",
                    kid.tag,
                    cardinalities.len()
                )))
            }
        }
    }
    Ok(())
}

/// Convert one whitespace-split numeric row into its buffer slots.
fn fill_row(
    row: &Element,
    field_count: usize,
    out: &mut [f64],
    ctx: &str,
) -> Result<(), ParseError> {
    let mut filled = 0usize;
    for token in row.text.split_whitespace() {
        if filled == field_count {
            return Err(ParseError::ShapeMismatch(format!(
                "row in \"{ctx}\" has more than {field_count} columns"
            )));
        }
        out[filled] = parse_float(token).map_err(|e| e.in_element(Some(ctx)))?;
        filled += 1;
    }
    if filled != field_count {
        return Err(ParseError::ShapeMismatch(format!(
            "row in \"{ctx}\" has {filled} columns, expected {field_count}"
        )));
    }
    Ok(())
}

/// Heterogeneous path: nesting depth and child counts directly become the
/// row-set structure; no shape pre-computation.
fn parse_rows(set: &Element, fields: &[Field], ctx: &str) -> Result<Vec<RowSet>, ParseError> {
    let mut out = Vec::new();
    for kid in &set.children {
        match kid.tag.as_str() {
            "set" => out.push(RowSet::Set(parse_rows(kid, fields, ctx)?)),
            "rc" => out.push(RowSet::Row(typed_columns(kid, fields, ctx)?)),
            "r" => out.push(RowSet::Row(split_columns(kid, fields, ctx)?)),
            _ => {}
        }
    }
    Ok(out)
}

/// A row whose columns are separate `c` children, one per field.
fn typed_columns(
    rc: &Element,
    fields: &[Field],
    ctx: &str,
) -> Result<Vec<Scalar>, ParseError> {
    let columns: Vec<&Element> = rc.children.iter().filter(|c| c.tag == "c").collect();
    if columns.len() != fields.len() {
        return Err(ParseError::ShapeMismatch(format!(
            "row in \"{ctx}\" has {} columns, expected {}",
            columns.len(),
            fields.len()
        )));
    }
    fields
        .iter()
        .zip(columns)
        .map(|(field, column)| {
            convert_token(field.typ.unwrap_or_default(), &column.text)
                .map_err(|e| e.in_element(Some(ctx)))
        })
        .collect()
}

/// A row holding all columns in one whitespace-split text body.
fn split_columns(
    row: &Element,
    fields: &[Field],
    ctx: &str,
) -> Result<Vec<Scalar>, ParseError> {
    let tokens: Vec<&str> = row.text.split_whitespace().collect();
    if tokens.len() != fields.len() {
        return Err(ParseError::ShapeMismatch(format!(
            "row in \"{ctx}\" has {} columns, expected {}",
            tokens.len(),
            fields.len()
        )));
    }
    fields
        .iter()
        .zip(tokens)
        .map(|(field, token)| {
            convert_token(field.typ.unwrap_or_default(), token)
                .map_err(|e| e.in_element(Some(ctx)))
        })
        .collect()
}
