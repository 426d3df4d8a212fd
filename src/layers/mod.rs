//! Layer kinds and the descriptors they build.
//!
//! Each kind is handled by a [`LayerParser`], the capability the registry
//! dispatches on:
//! - `parse` validates a definition section against the layers built so far
//!   and returns a shape-annotated [`LayerDescriptor`]
//! - `requires_params` says whether the parameter file must carry a section
//!   for the layer
//! - `add_params` reads learning hyperparameters from that section
//!
//! Geometry and parameter state live in the closed [`LayerKind`] enum.

pub mod base;
pub mod conv;
pub mod cost;
pub mod data;
pub mod fc;
pub mod pool;
pub mod softmax;

use serde::{Deserialize, Serialize};

use crate::config::ConfigSection;
use crate::error::{CompileError, Result};
use crate::graph::ShapeOracle;
use crate::layer_types;
use crate::params::{BufferStats, ParamBuffer, WeightInitializer};

pub use conv::{ConvLayer, ConvParser};
pub use cost::{CostLayer, LogregCostParser};
pub use data::{DataLayer, DataParser};
pub use fc::{FcLayer, FcParser};
pub use pool::{PoolLayer, PoolMode, PoolParser};
pub use softmax::SoftmaxParser;

/// Collaborators available to a parser while it builds a descriptor.
pub struct BuildContext<'a> {
    /// Reports the width of each raw data channel.
    pub oracle: &'a dyn ShapeOracle,
    /// Random stream for weight initialization.
    pub init: &'a mut WeightInitializer,
}

/// The capability set every layer kind provides.
pub trait LayerParser: Send + Sync {
    /// Whether the parameter file must contain a section for this layer.
    fn requires_params(&self) -> bool {
        false
    }

    /// Build a descriptor from the layer's definition section. `prev` holds
    /// every layer declared before this one.
    fn parse(
        &self,
        section: &ConfigSection,
        prev: &[LayerDescriptor],
        ctx: &mut BuildContext<'_>,
    ) -> Result<LayerDescriptor>;

    /// Attach hyperparameters from the layer's parameter section.
    fn add_params(&self, _section: &ConfigSection, _layer: &mut LayerDescriptor) -> Result<()> {
        Ok(())
    }
}

/// Kind-specific geometry and parameter state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum LayerKind {
    Data(DataLayer),
    FullyConnected(FcLayer),
    Conv(ConvLayer),
    Softmax,
    Pool(PoolLayer),
    Cost(CostLayer),
}

impl LayerKind {
    /// Weight buffers in input order.
    pub fn weights(&self) -> Vec<&ParamBuffer> {
        match self {
            LayerKind::FullyConnected(fc) => fc.weights.iter().collect(),
            LayerKind::Conv(conv) => vec![&conv.weights],
            _ => Vec::new(),
        }
    }

    pub fn biases(&self) -> Option<&ParamBuffer> {
        match self {
            LayerKind::FullyConnected(fc) => Some(&fc.biases),
            LayerKind::Conv(conv) => Some(&conv.biases),
            _ => None,
        }
    }

    /// Every buffer the execution engine updates, weights first.
    pub fn buffers_mut(&mut self) -> Vec<&mut ParamBuffer> {
        match self {
            LayerKind::FullyConnected(fc) => {
                let mut bufs: Vec<&mut ParamBuffer> = fc.weights.iter_mut().collect();
                bufs.push(&mut fc.biases);
                bufs
            }
            LayerKind::Conv(conv) => vec![&mut conv.weights, &mut conv.biases],
            _ => Vec::new(),
        }
    }
}

/// One node of the layer graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub name: String,
    /// Registry tag the layer was built with, e.g. `conv` or `cost.logreg`.
    pub layer_type: String,
    /// Indices of input layers; each is smaller than this layer's own index.
    pub inputs: Vec<usize>,
    /// Output width of each input layer.
    pub num_inputs: Vec<usize>,
    /// Flattened output width. Zero for cost layers.
    pub num_outputs: usize,
    pub kind: LayerKind,
}

impl LayerDescriptor {
    pub fn is_cost(&self) -> bool {
        layer_types::is_cost(&self.layer_type)
    }

    pub fn is_learnable(&self) -> bool {
        self.kind.biases().is_some()
    }

    /// Number of scalar parameters held by the layer.
    pub fn param_count(&self) -> usize {
        self.kind.weights().iter().map(|w| w.len()).sum::<usize>()
            + self.kind.biases().map_or(0, ParamBuffer::len)
    }

    /// Mean absolute value of each weight buffer and its increment buffer.
    pub fn weight_stats(&self) -> Vec<BufferStats> {
        self.kind.weights().iter().map(|w| w.stats()).collect()
    }

    /// Error for a descriptor handed to a parser of a different kind, which
    /// only happens with a rehydrated graph whose tags were edited.
    pub(crate) fn kind_mismatch(&self) -> CompileError {
        CompileError::constraint(
            &self.name,
            "type",
            format!(
                "'{}' does not match the layer's stored geometry",
                self.layer_type
            ),
        )
    }
}
