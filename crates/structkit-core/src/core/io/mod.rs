//! Reading and writing of structural data.
//!
//! Each format implements [`traits::StructureReader`] and, where output is supported,
//! [`traits::StructureWriter`]. Readers return a [`containers::ParsedFile`] which the
//! [`loader`] places into a [`Structure`](crate::core::models::structure::Structure).

pub mod containers;
pub mod gaussian;
pub mod loader;
pub mod pdb;
pub mod report;
pub mod traits;
pub mod xyz;
