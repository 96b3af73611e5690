//! Inheritance & attribute resolution.
//!
//! Pure batch transformations over the fully buffered classes and attribute
//! candidates of one run.

pub mod attributes;
pub mod lattice;

pub use attributes::resolve_attributes;
pub use lattice::{inheritance_edges, InheritanceGraph};

use tracing::debug;

use crate::snapshot::{AttributeCandidate, Inheritance, KlassAttribute, KlassRecord};

/// Output of the resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub inheritance: Vec<Inheritance>,
    pub attributes: Vec<KlassAttribute>,
}

/// Compute inheritance edges, then collapse attribute candidates onto the
/// classes that introduce them.
pub fn resolve(klasses: &[KlassRecord], candidates: &[AttributeCandidate]) -> Resolution {
    let inheritance = inheritance_edges(klasses);
    let mut graph = InheritanceGraph::from_klasses(klasses, &inheritance);
    let attributes = resolve_attributes(candidates, &mut graph);

    debug!(
        nodes = graph.len(),
        edges = inheritance.len(),
        candidates = candidates.len(),
        attributes = attributes.len(),
        "resolved lattice"
    );

    Resolution {
        inheritance,
        attributes,
    }
}
