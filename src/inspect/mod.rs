//! Inspection: walk a reflected object graph and turn what it finds into
//! records.
//!
//! - [`walker`] drives the traversal.
//! - [`classify`] decides what each member is and builds its record.
//! - [`path`] finds the shortest public import path of a class.
//! - [`values`] normalizes docstrings, source text and attribute values.

pub mod classify;
pub mod path;
pub mod values;
pub mod walker;

pub use path::best_import_path;
pub use values::LazyFunctions;
pub use walker::Walker;
