//! # Core Module
//!
//! The data layer of structkit: structural containers, the atom selection language,
//! file formats and geometric helpers. Nothing here keeps state beyond the data it owns.
//!
//! - **Structural Data** ([`models`]) - Structures, models, molecules, atoms and bonds
//! - **Atom Selection** ([`selection`]) - Parsing `#mol:res@atom` expressions and index sets
//! - **File I/O** ([`io`]) - PDB, XYZ and Gaussian readers, the PDB writer and reports
//! - **Utilities** ([`utils`]) - Vector geometry and chemical identifier tables

pub mod io;
pub mod models;
pub mod selection;
pub mod utils;
