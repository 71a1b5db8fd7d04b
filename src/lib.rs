//! # dftxml - A Fast VASP XML Output Parser
//!
//! `dftxml` converts the large, semi-structured `vasprun.xml` documents
//! written by the VASP DFT code into a fully typed, nested in-memory
//! document model, much faster than a generic XML-to-object mapper.
//!
//! ## Key Features
//!
//! - **Typed document model**: five value kinds (scalar, vector, table,
//!   mapping, list) cover the whole schema family; numeric tables keep
//!   their data as one flat buffer plus a shape, so consumers can reshape
//!   or serialize without depending on the parser internals.
//!
//! - **Fast numeric lexing**: the same numeric text repeats millions of
//!   times per file, so token conversion is a single linear pass with no
//!   intermediate allocation.
//!
//! - **Shape inference**: multi-dimensional table extents are discovered
//!   from nesting depth before allocation, then every row is written
//!   straight into its final position of a pre-sized buffer.
//!
//! - **Subtree selection**: callers that only need a few named subtrees
//!   can skip the rest of the document entirely.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dftxml::vasp;
//!
//! let doc = vasp::parse_file("vasprun.xml")?;
//! for (name, value) in doc.as_mapping().into_iter().flatten() {
//!     println!("{}: {}", name.as_deref().unwrap_or(""), value.kind());
//! }
//! # Ok::<(), dftxml::vasp::ParseError>(())
//! ```
//!
//! Parsing is synchronous and owns no shared state: independent files may
//! be parsed concurrently by running `parse_file` calls in parallel.
//!
//! ## Architecture
//!
//! - [`value`]: the document model returned to callers
//! - [`vasp`]: the vasprun.xml parser (element tree, tag dispatch, table
//!   assembly, numeric lexer)

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod value;
pub mod vasp;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::value::{
        Field, Mapping, RowSet, Scalar, Table, TableData, Tensor, Value, ValueType,
    };
    pub use crate::vasp::{parse_file, parse_str, Element, ParseError, VaspParser};
}
