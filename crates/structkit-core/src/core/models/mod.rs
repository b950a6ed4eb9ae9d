//! # Core Models Module
//!
//! Data structures describing an atomic structure: a [`structure::Structure`] holds
//! numbered [`model::Model`]s (ensemble members), each holding named
//! [`molecule::Molecule`]s made of [`atom::Atom`]s and their bonds.
//!
//! ## Key Components
//!
//! - [`atom`] - A single atom with its PDB descriptors and position
//! - [`molecule`] - Atoms plus the bond adjacency list and file provenance
//! - [`model`] - One conformer of an ensemble
//! - [`structure`] - The multi-model container and its editing operations
//! - [`secondary`] - `HELIX` and `SHEET` annotations and their trimming rules
//! - [`topology`] - Bond guessing from backbone templates and distances
//!
//! ## Usage
//!
//! ```ignore
//! use structkit::core::models::{atom::Atom, structure::{AtomPositions, Structure}};
//!
//! let mut structure = Structure::new();
//! structure.add_atom(Some("pivot"), Atom::new(origin), AtomPositions::Single(origin))?;
//! let selection = structure.select(Some("#prot:1-10@CA"))?;
//! structure.delete_atoms(&selection, None)?;
//! ```

pub mod atom;
pub mod model;
pub mod molecule;
pub mod secondary;
pub mod structure;
pub mod topology;
