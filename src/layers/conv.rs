//! Convolutional layers over square multi-channel images.
//!
//! Output geometry:
//!
//! ```text
//! modulesX   = 1 + ceil((2 * padding + imgSize - filterSize) / stride)
//! modules    = modulesX^2
//! numOutputs = modules * numFilters
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConfigSection;
use crate::error::{CompileError, Result};
use crate::layers::base::{
    ceil_div, checked_product, non_negative, positive, square_images, InputLayer,
};
use crate::layers::{BuildContext, LayerDescriptor, LayerKind, LayerParser};
use crate::params::{Hyperparams, MemoryOrder, ParamBuffer};

/// Inputs with more channels than this must come in multiples of
/// [`CHANNEL_MULTIPLE`].
pub const MAX_UNGROUPED_CHANNELS: usize = 3;

pub const CHANNEL_MULTIPLE: usize = 4;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvLayer {
    /// Channels of the input images.
    pub channels: usize,
    /// Pixels per input channel.
    pub img_pixels: usize,
    /// Edge of the square input image.
    pub img_size: usize,
    /// Zero padding, stored as `-padding`: the engine reads it as the offset
    /// of the first filter application relative to the image origin.
    pub padding: i64,
    /// Distance between filter applications.
    pub stride: usize,
    /// Edge of the square filter.
    pub filter_size: usize,
    /// `filterSize^2`.
    pub filter_pixels: usize,
    /// Filter applications along each image axis.
    pub modules_x: usize,
    /// `modulesX^2`.
    pub modules: usize,
    /// Output channels.
    pub num_filters: usize,
    /// Gradient partial-sum granularity; zero means a single sum.
    pub partial_sum: usize,
    /// Activation applied by the engine after the convolution.
    pub neuron: String,
    /// Initialization scale of the filters.
    pub init_w: f64,
    /// `filterPixels * channels x numFilters`, row-major.
    pub weights: ParamBuffer,
    /// `modules * numFilters x 1`, row-major.
    pub biases: ParamBuffer,
    /// Learning hyperparameters; `None` until the parameter file has been
    /// applied.
    pub hyper: Option<Hyperparams<f64>>,
}

/// Parser for `type = conv`.
pub struct ConvParser;

impl LayerParser for ConvParser {
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
        base.expect_inputs(1)?;
        let name = base.name.as_str();

        let channels = positive(section, "channels")?;
        let (img_pixels, img_size) = square_images(name, base.num_inputs[0], channels)?;
        if channels > MAX_UNGROUPED_CHANNELS && channels % CHANNEL_MULTIPLE != 0 {
            return Err(CompileError::constraint(
                name,
                "channels",
                format!(
                    "must be at most {MAX_UNGROUPED_CHANNELS} or divisible by {CHANNEL_MULTIPLE}, got {channels}"
                ),
            ));
        }

        let padding = non_negative(section, "padding")?;
        let stride = positive(section, "stride")?;
        let filter_size = positive(section, "filterSize")?;
        let filter_pixels = checked_product(name, "filterSize", &[filter_size, filter_size])?;
        let span = (padding as i64)
            .checked_mul(2)
            .and_then(|p| p.checked_add(img_size as i64))
            .map(|p| p - filter_size as i64)
            .ok_or_else(|| {
                CompileError::constraint(name, "padding", format!("({padding}) overflows"))
            })?;
        let modules_x = ceil_div(span, stride as i64).saturating_add(1);
        if modules_x <= 0 {
            return Err(CompileError::constraint(
                name,
                "filterSize",
                format!(
                    "{filter_size} with padding {padding} does not fit a {img_size}x{img_size} image"
                ),
            ));
        }
        let modules_x = modules_x as usize;
        let modules = checked_product(name, "filterSize", &[modules_x, modules_x])?;
        let num_filters = positive(section, "numFilters")?;
        let num_outputs = checked_product(name, "numFilters", &[modules, num_filters])?;
        let filter_rows = checked_product(name, "channels", &[filter_pixels, channels])?;
        checked_product(name, "numFilters", &[filter_rows, num_filters])?;

        let partial_sum = non_negative(section, "partialSum")?;
        if partial_sum != 0 && modules % partial_sum != 0 {
            return Err(CompileError::constraint(
                name,
                "partialSum",
                format!(
                    "({partial_sum}) does not divide the {modules} outputs per filter this layer produces"
                ),
            ));
        }

        let neuron = section.get_str("neuron")?.to_string();
        let init_w = section.get_float("initW")?;

        let weights = ctx.init.make_weights(
            filter_rows,
            num_filters,
            init_w as f32,
            MemoryOrder::RowMajor,
        );
        let biases = ctx
            .init
            .make_weights(num_outputs, 1, 0.0, MemoryOrder::RowMajor);

        info!(
            "Initialized convolutional layer '{}', producing {}x{} {}-channel output",
            name, modules_x, modules_x, num_filters
        );
        Ok(base.finish(
            num_outputs,
            LayerKind::Conv(ConvLayer {
                channels,
                img_pixels,
                img_size,
                padding: -(padding as i64),
                stride,
                filter_size,
                filter_pixels,
                modules_x,
                modules,
                num_filters,
                partial_sum,
                neuron,
                init_w,
                weights,
                biases,
                hyper: None,
            }),
        ))
    }

    fn add_params(&self, section: &ConfigSection, layer: &mut LayerDescriptor) -> Result<()> {
        let hyper = Hyperparams {
            eps_w: section.get_float("epsW")?,
            eps_b: section.get_float("epsB")?,
            mom_w: section.get_float("momW")?,
            mom_b: section.get_float("momB")?,
            wc: section.get_float("wc")?,
        };
        match &mut layer.kind {
            LayerKind::Conv(conv) => {
                conv.hyper = Some(hyper);
                Ok(())
            }
            _ => Err(layer.kind_mismatch()),
        }
    }
}
