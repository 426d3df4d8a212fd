//! Fully-connected layers: one weight matrix per input, summed into
//! `numOutputs` units.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConfigSection;
use crate::error::Result;
use crate::layers::base::{check_list_len, checked_product, positive, InputLayer};
use crate::layers::{BuildContext, LayerDescriptor, LayerKind, LayerParser};
use crate::params::{Hyperparams, MemoryOrder, ParamBuffer};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FcLayer {
    /// Activation applied by the engine after the affine map.
    pub neuron: String,
    /// Initialization scale, one per input.
    pub init_w: Vec<f64>,
    /// `numInputs[i] x numOutputs`, column-major.
    pub weights: Vec<ParamBuffer>,
    /// `1 x numOutputs`, column-major.
    pub biases: ParamBuffer,
    /// Per-input learning hyperparameters; `None` until the parameter file
    /// has been applied.
    pub hyper: Option<Hyperparams<Vec<f64>>>,
}

/// Parser for `type = fc`.
pub struct FcParser;

impl LayerParser for FcParser {
    fn requires_params(&self) -> bool {
        true
    }

    fn parse(
        &self,
        section: &ConfigSection,
        prev: &[LayerDescriptor],
        ctx: &mut BuildContext<'_>,
    ) -> Result<LayerDescriptor> {
        let base = InputLayer::parse(section, prev)?;
        let num_outputs = positive(section, "numOutputs")?;
        let neuron = section.get_str("neuron")?.to_string();
        let init_w = section.get_float_list("initW")?;
        check_list_len(&base.name, "initW", &init_w, base.inputs.len())?;
        for &rows in &base.num_inputs {
            checked_product(&base.name, "numOutputs", &[rows, num_outputs])?;
        }

        let weights = base
            .num_inputs
            .iter()
            .zip(&init_w)
            .map(|(&rows, &init)| {
                ctx.init
                    .make_weights(rows, num_outputs, init as f32, MemoryOrder::ColumnMajor)
            })
            .collect();
        let biases = ctx
            .init
            .make_weights(1, num_outputs, 0.0, MemoryOrder::ColumnMajor);

        info!(
            "Initialized fully-connected layer '{}', producing {} outputs",
            base.name, num_outputs
        );
        Ok(base.finish(
            num_outputs,
            LayerKind::FullyConnected(FcLayer {
                neuron,
                init_w,
                weights,
                biases,
                hyper: None,
            }),
        ))
    }

    fn add_params(&self, section: &ConfigSection, layer: &mut LayerDescriptor) -> Result<()> {
        let num_inputs = layer.inputs.len();
        let hyper = Hyperparams {
            eps_w: section.get_float_list("epsW")?,
            eps_b: section.get_float("epsB")?,
            mom_w: section.get_float_list("momW")?,
            mom_b: section.get_float("momB")?,
            wc: section.get_float_list("wc")?,
        };
        check_list_len(&layer.name, "epsW", &hyper.eps_w, num_inputs)?;
        check_list_len(&layer.name, "momW", &hyper.mom_w, num_inputs)?;
        check_list_len(&layer.name, "wc", &hyper.wc, num_inputs)?;

        match &mut layer.kind {
            LayerKind::FullyConnected(fc) => {
                fc.hyper = Some(hyper);
                Ok(())
            }
            _ => Err(layer.kind_mismatch()),
        }
    }
}
