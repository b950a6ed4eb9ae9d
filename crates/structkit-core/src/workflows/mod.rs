//! # Workflows Module
//!
//! High-level procedures that tie the structural containers of [`crate::core`] to the
//! numerical routines of [`crate::engine`].
//!
//! Each workflow assembles the matched coordinates of an ensemble, runs one analysis and
//! returns a result that can be logged, reported as CSV or, for superposition, written
//! back to the structure.
//!
//! - **Superposition** ([`superimpose`]) - Fit an ensemble to its first member or to its
//!   mean and move the atoms accordingly
//! - **Analysis** ([`analysis`]) - RMSD, pairwise displacements, principal components and
//!   pivot finding

pub mod analysis;
pub mod superimpose;
