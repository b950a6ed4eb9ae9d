//! # Engine Module
//!
//! The numerical core of structkit: everything that turns matched atomic coordinates into
//! fits, statistics and motional descriptions.
//!
//! ## Overview
//!
//! Analyses start from a [`coordinates::CoordinateSet`], the coordinates of the atoms
//! shared by every member of an ensemble. The remaining modules work on plain
//! `[member][atom]` coordinate arrays and know nothing about files or molecules:
//!
//! - **Superposition** ([`superimpose`]) - Kabsch fitting onto the first member or onto
//!   the iteratively refined ensemble mean
//! - **Displacements** ([`displacement`]) - Rigid-body motion between every pair of members
//! - **Statistics** ([`statistics`]) - Mean structure and RMSD measures
//! - **PCA** ([`pca`]) - Principal modes of motion, with observer structures
//! - **Pivot finding** ([`pivot`]) - The point about which a domain rotates, located with
//!   a box-constrained [`simplex`] search
//!
//! Settings live in [`config`], failures in [`error`], and long-running steps report
//! through [`progress`]. Independent fits are run in parallel with rayon.

pub mod config;
pub mod coordinates;
pub mod displacement;
pub mod error;
pub mod pca;
pub mod pivot;
pub mod progress;
pub mod simplex;
pub mod statistics;
pub mod superimpose;
