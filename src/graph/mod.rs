//! The compiled layer graph and the machinery that builds it.

pub mod builder;
pub mod oracle;
pub mod registry;

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::layers::LayerDescriptor;
use crate::params::ParamBuffer;

pub use builder::{build_layer_graph, CompileOptions, GraphBuilder};
pub use oracle::{FnOracle, ShapeOracle};
pub use registry::LayerKindRegistry;

/// Layers in declaration order, which is also a valid evaluation order:
/// every input index is smaller than the index of the layer reading it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayerGraph {
    layers: Vec<LayerDescriptor>,
}

impl LayerGraph {
    pub fn from_layers(layers: Vec<LayerDescriptor>) -> Self {
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayerDescriptor> {
        self.layers.iter()
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&LayerDescriptor> {
        self.index_of(name).map(|i| &self.layers[i])
    }

    /// Mutable parameter buffers of the named layer, for the execution
    /// engine. Empty if the layer does not exist or holds no parameters.
    pub fn buffers_mut(&mut self, name: &str) -> Vec<&mut ParamBuffer> {
        match self.layers.iter_mut().find(|l| l.name == name) {
            Some(layer) => layer.kind.buffers_mut(),
            None => Vec::new(),
        }
    }

    /// Total scalar parameters across all layers.
    pub fn param_count(&self) -> usize {
        self.layers.iter().map(LayerDescriptor::param_count).sum()
    }

    pub fn into_layers(self) -> Vec<LayerDescriptor> {
        self.layers
    }
}

impl Index<usize> for LayerGraph {
    type Output = LayerDescriptor;

    fn index(&self, idx: usize) -> &LayerDescriptor {
        &self.layers[idx]
    }
}

impl Index<&str> for LayerGraph {
    type Output = LayerDescriptor;

    /// Panics if no layer has this name.
    fn index(&self, name: &str) -> &LayerDescriptor {
        match self.get(name) {
            Some(layer) => layer,
            None => panic!("no layer named '{}'", name),
        }
    }
}

impl<'a> IntoIterator for &'a LayerGraph {
    type Item = &'a LayerDescriptor;
    type IntoIter = std::slice::Iter<'a, LayerDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{DataLayer, LayerKind};

    fn data(name: &str) -> LayerDescriptor {
        LayerDescriptor {
            name: name.to_string(),
            layer_type: "data".to_string(),
            inputs: Vec::new(),
            num_inputs: Vec::new(),
            num_outputs: 4,
            kind: LayerKind::Data(DataLayer { data_idx: 0 }),
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let mut graph = LayerGraph::from_layers(vec![data("a"), data("b")]);
        assert_eq!(graph.index_of("b"), Some(1));
        assert!(graph.get("c").is_none());
        assert_eq!(graph["a"].name, graph[0].name);
        assert_eq!(graph.param_count(), 0);
        assert!(graph.buffers_mut("a").is_empty());
        assert_eq!((&graph).into_iter().count(), 2);
    }
}
