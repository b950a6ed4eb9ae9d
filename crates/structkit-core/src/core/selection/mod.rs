//! # Atom Selection
//!
//! Selection strings identify subsets of atoms using the `#mol:res@atom` syntax:
//!
//! - `#` takes molecule names, `:` residue numbers or names, `@` atom numbers or names.
//! - Each part is a comma separated list of numbers, ranges (`3-10`, `-5--2`) or name
//!   patterns in which `*` matches any run of characters.
//! - `&` intersects and `|` unites two selections.
//!
//! [`AtomSelection`] is the parsed form. Resolving it against a structure yields an
//! [`IndexSelection`], the concrete `(molecule, atom)` indices the structure operations
//! work on.

mod atom_id;
mod indices;

pub use atom_id::{AtomSelection, SelectionError};
pub(crate) use atom_id::wildcard_regex;
pub use indices::IndexSelection;
