//! # convgraph
//!
//! Compiles a convolutional-network description into a validated,
//! shape-annotated layer graph with initialized parameter buffers.
//!
//! A network is described by two INI-style files:
//!
//! - a **definition file** with one section per layer, in evaluation order,
//!   naming its `type`, its `inputs` and its geometry
//! - a **parameter file** with learning hyperparameters for the layers whose
//!   kind needs them
//!
//! ```text
//! [images]            [conv1]
//! type = data         epsW = 0.001
//! dataIdx = 0         epsB = 0.002
//!                     momW = 0.9
//! [conv1]             momB = 0.9
//! type = conv         wc = 0
//! inputs = images
//! ...
//! ```
//!
//! The widths of raw data channels come from a [`ShapeOracle`]. The result
//! is a [`LayerGraph`] ready for an execution engine; nothing here computes
//! activations or updates weights.

pub mod config;
pub mod error;
pub mod graph;
pub mod layers;
pub mod params;

/// Registry tags of the built-in layer kinds.
pub mod layer_types {
    pub const DATA: &str = "data";
    pub const FC: &str = "fc";
    pub const CONV: &str = "conv";
    pub const SOFTMAX: &str = "softmax";
    pub const POOL: &str = "pool";
    pub const LOGREG_COST: &str = "cost.logreg";

    /// Tags with this prefix name terminal cost layers, which produce no
    /// output and need no consumer.
    pub const COST_PREFIX: &str = "cost.";

    pub fn is_cost(tag: &str) -> bool {
        tag.starts_with(COST_PREFIX)
    }
}

pub use config::{ConfigFile, ConfigSection};
pub use error::{CompileError, Result, ValueType};
pub use graph::{
    build_layer_graph, CompileOptions, FnOracle, GraphBuilder, LayerGraph, LayerKindRegistry,
    ShapeOracle,
};
pub use layers::{LayerDescriptor, LayerKind, LayerParser};

#[cfg(test)]
mod tests {
    use super::layer_types;

    #[test]
    fn test_cost_tags() {
        assert!(layer_types::is_cost(layer_types::LOGREG_COST));
        assert!(layer_types::is_cost("cost.sqerr"));
        assert!(!layer_types::is_cost("softmax"));
        assert!(!layer_types::is_cost("cost"));
    }
}
