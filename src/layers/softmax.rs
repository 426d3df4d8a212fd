//! Softmax layers: normalize one input into a distribution of the same width.

use tracing::info;

use crate::config::ConfigSection;
use crate::error::Result;
use crate::layers::base::InputLayer;
use crate::layers::{BuildContext, LayerDescriptor, LayerKind, LayerParser};

/// Parser for `type = softmax`: one input, same width out.
pub struct SoftmaxParser;

impl LayerParser for SoftmaxParser {
    fn parse(
        &self,
        section: &ConfigSection,
        prev: &[LayerDescriptor],
        _ctx: &mut BuildContext<'_>,
    ) -> Result<LayerDescriptor> {
        let base = InputLayer::parse(section, prev)?;
        base.expect_inputs(1)?;
        let num_outputs = base.num_inputs[0];
        info!(
            "Initialized softmax layer '{}', producing {} outputs",
            base.name, num_outputs
        );
        Ok(base.finish(num_outputs, LayerKind::Softmax))
    }
}
