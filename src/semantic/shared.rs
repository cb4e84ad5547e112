//! Dimensions shared by several metrics.

use std::collections::{BTreeMap, HashSet};

use petgraph::graph::NodeIndex;

use crate::graph::NodeGraph;

use super::dimensions::{DimensionAttributeOutput, DimensionResolver};
use super::error::SemanticResult;

/// Dimension attributes every one of `nodes` can be sliced by, sorted by name.
///
/// Only names have to match. When two nodes resolve a name through different
/// link labels, the unprefixed (empty link) attribute is kept, otherwise the
/// one with the smallest link, so the result doesn't depend on input order.
/// Duplicate nodes are ignored and an empty input gives an empty result.
pub fn get_shared_dimensions(
    graph: &NodeGraph,
    nodes: &[NodeIndex],
) -> SemanticResult<Vec<DimensionAttributeOutput>> {
    SharedDimensions::new(DimensionResolver::new(graph)).resolve(nodes)
}

/// Intersects resolved dimensions across nodes with a configured resolver.
#[derive(Debug, Clone, Copy)]
pub struct SharedDimensions<'g> {
    resolver: DimensionResolver<'g>,
}

impl<'g> SharedDimensions<'g> {
    pub fn new(resolver: DimensionResolver<'g>) -> Self {
        Self { resolver }
    }

    pub fn resolve(&self, nodes: &[NodeIndex]) -> SemanticResult<Vec<DimensionAttributeOutput>> {
        let mut seen = HashSet::new();
        let mut distinct = nodes.iter().copied().filter(|idx| seen.insert(*idx));

        let Some(first) = distinct.next() else {
            return Ok(vec![]);
        };

        let mut common: BTreeMap<String, DimensionAttributeOutput> = self
            .resolver
            .resolve(first)?
            .into_iter()
            .map(|dim| (dim.name.clone(), dim))
            .collect();

        for idx in distinct {
            if common.is_empty() {
                break;
            }
            let mut other: BTreeMap<String, DimensionAttributeOutput> = self
                .resolver
                .resolve(idx)?
                .into_iter()
                .map(|dim| (dim.name.clone(), dim))
                .collect();

            common = std::mem::take(&mut common)
                .into_iter()
                .filter_map(|(name, kept)| {
                    let candidate = other.remove(&name)?;
                    Some((name, preferred(kept, candidate)))
                })
                .collect();
        }

        Ok(common.into_values().collect())
    }
}

/// Pick between two attributes sharing a name: empty link first, then the
/// smallest link, then the smallest type.
fn preferred(a: DimensionAttributeOutput, b: DimensionAttributeOutput) -> DimensionAttributeOutput {
    let key = |d: &DimensionAttributeOutput| {
        (!d.link.is_empty(), d.link.clone(), d.attribute_type.clone())
    };
    if key(&b) < key(&a) {
        b
    } else {
        a
    }
}
