//! # structkit Core Library
//!
//! A library for reading, editing, comparing and writing multi-model molecular
//! structures such as NMR ensembles and simulation snapshots.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Structural data models (`Structure`, `Model`,
//!   `Molecule`, `Atom`), the atom selection language, and file I/O for PDB, XYZ and
//!   Gaussian formats.
//!
//! - **[`engine`]: The Numerical Core.** Coordinate extraction, least-squares
//!   superposition, displacement and RMSD statistics, principal component analysis and
//!   pivot-point optimization, together with their configuration and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures that tie `core` and `engine`
//!   together, such as superimposing an ensemble onto a reference model or analysing the
//!   motion of a domain. This is the entry point for most users of the library.

pub mod core;
pub mod engine;
pub mod workflows;
