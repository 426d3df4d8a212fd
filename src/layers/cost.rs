//! Terminal cost layers.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConfigSection;
use crate::error::{CompileError, Result};
use crate::layers::base::InputLayer;
use crate::layers::{BuildContext, LayerDescriptor, LayerKind, LayerParser};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostLayer {
    /// Weight of this cost in the objective; set from the parameter file.
    pub coeff: Option<f64>,
}

/// Parser for `type = cost.logreg`. Inputs are `labels,probs`.
pub struct LogregCostParser;

impl LayerParser for LogregCostParser {
    fn requires_params(&self) -> bool {
        true
    }

    fn parse(
        &self,
        section: &ConfigSection,
        prev: &[LayerDescriptor],
        _ctx: &mut BuildContext<'_>,
    ) -> Result<LayerDescriptor> {
        let base = InputLayer::parse(section, prev)?;
        base.expect_inputs(2)?;
        if base.num_inputs[0] != 1 {
            return Err(CompileError::InvalidLabelShape {
                layer: base.name,
                got: base.num_inputs[0],
            });
        }
        info!("Initialized logistic regression cost '{}'", base.name);
        Ok(base.finish(0, LayerKind::Cost(CostLayer { coeff: None })))
    }

    fn add_params(&self, section: &ConfigSection, layer: &mut LayerDescriptor) -> Result<()> {
        let coeff = section.get_float("coeff")?;
        match &mut layer.kind {
            LayerKind::Cost(cost) => {
                cost.coeff = Some(coeff);
                Ok(())
            }
            _ => Err(layer.kind_mismatch()),
        }
    }
}
