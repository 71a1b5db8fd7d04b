//! # vasprun.xml document parser
//!
//! VASP writes one large XML file per run. The schema is irregular: some
//! elements carry typed scalar or vector payloads, some are pure
//! structural containers, and some encode large homogeneous numeric
//! tables whose shape is only discoverable by walking nested repetition
//! markers. This module turns one such file into a fully typed
//! [`Value`](crate::value::Value) tree in a single recursive pass.
//!
//! ## Document structure
//!
//! ```text
//! modeling
//! ├── generator            <i type="string" name="program">…
//! ├── incar                <i type="int" name="IBRION">…
//! ├── kpoints              <varray name="kpointlist"> <v>…
//! ├── parameters
//! ├── atominfo             <atoms>, <types>, <array name="atoms">
//! ├── structure*           <crystal><varray name="basis">…
//! └── calculation*
//!     ├── scstep*          <time name="dav">, <energy>
//!     ├── varray name="forces" / "stress"
//!     ├── energy
//!     ├── eigenvalues      <array> with nested <set> levels
//!     └── dos
//! ```
//!
//! Terminal tags (`i`, `v`, `varray`, `array`, `time`, `atoms`, `types`)
//! are parsed by dedicated base cases; everything else is a composite
//! container whose repeated same-named children fold into lists.
//!
//! ## Example
//!
//! ```no_run
//! let doc = dftxml::vasp::parse_file("vasprun.xml")?;
//! if let Some(volume) = doc
//!     .get("structure:initialpos")
//!     .and_then(|s| s.get("crystal"))
//!     .and_then(|c| c.get("volume"))
//! {
//!     println!("cell volume: {:?}", volume.as_f64());
//! }
//! # Ok::<(), dftxml::vasp::ParseError>(())
//! ```

pub mod error;
pub mod lexer;

mod document;
mod parser;
mod table;
mod tree;

pub use document::{parse_file, parse_str, VaspParser};
pub use error::ParseError;
pub use tree::Element;
