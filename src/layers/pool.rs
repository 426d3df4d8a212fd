//! Max and average pooling over square multi-channel images.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConfigSection;
use crate::error::{CompileError, Result};
use crate::layers::base::{ceil_div, checked_product, positive, square_images, InputLayer};
use crate::layers::{BuildContext, LayerDescriptor, LayerKind, LayerParser};

/// Pooled inputs must have a multiple of this many channels.
pub const CHANNEL_MULTIPLE: usize = 16;

/// How a pooling window is reduced to one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolMode {
    Max,
    Avg,
}

impl PoolMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "max" => Some(PoolMode::Max),
            "avg" => Some(PoolMode::Avg),
            _ => None,
        }
    }
}

impl fmt::Display for PoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolMode::Max => f.write_str("max"),
            PoolMode::Avg => f.write_str("avg"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolLayer {
    /// Channels of the input images; a multiple of [`CHANNEL_MULTIPLE`].
    pub channels: usize,
    /// Pooling window edge.
    pub subs_x: usize,
    /// Offset of the first window.
    pub start: i64,
    /// Distance between window origins.
    pub stride: usize,
    /// Output edge; computed when declared as zero or negative.
    pub outputs_x: usize,
    /// Reduction applied over each window.
    pub pool: PoolMode,
    /// Pixels per input channel.
    pub img_pixels: usize,
    /// Edge of the square input image.
    pub img_size: usize,
}

/// Parser for `type = pool`.
pub struct PoolParser;

impl LayerParser for PoolParser {
    fn parse(
        &self,
        section: &ConfigSection,
        prev: &[LayerDescriptor],
        _ctx: &mut BuildContext<'_>,
    ) -> Result<LayerDescriptor> {
        let base = InputLayer::parse(section, prev)?;
        base.expect_inputs(1)?;
        let name = base.name.as_str();

        let channels = positive(section, "channels")?;
        let subs_x = positive(section, "subsX")?;
        let start = section.get_int("start")?;
        let stride = positive(section, "stride")?;
        let declared_outputs_x = section.get_int("outputsX")?;
        let pool_name = section.get_str("pool")?;

        if channels % CHANNEL_MULTIPLE != 0 {
            return Err(CompileError::constraint(
                name,
                "channels",
                format!("must be a multiple of {CHANNEL_MULTIPLE}, got {channels}"),
            ));
        }
        let Some(pool) = PoolMode::from_name(pool_name) else {
            return Err(CompileError::constraint(
                name,
                "pool",
                format!("must be one of 'max', 'avg', got '{pool_name}'"),
            ));
        };

        let (img_pixels, img_size) = square_images(name, base.num_inputs[0], channels)?;
        let outputs_x = if declared_outputs_x <= 0 {
            (img_size as i64)
                .checked_sub(start)
                .and_then(|span| span.checked_sub(subs_x as i64))
                .map(|span| ceil_div(span, stride as i64).saturating_add(1))
                .ok_or_else(|| {
                    CompileError::constraint(name, "start", format!("({start}) overflows"))
                })?
        } else {
            declared_outputs_x
        };
        if outputs_x <= 0 {
            return Err(CompileError::constraint(
                name,
                "subsX",
                format!(
                    "window {subs_x} starting at {start} does not fit a {img_size}x{img_size} image"
                ),
            ));
        }
        let outputs_x = outputs_x as usize;
        let num_outputs = checked_product(name, "outputsX", &[outputs_x, outputs_x, channels])?;

        info!(
            "Initialized {}-pooling layer '{}', producing {}x{} {}-channel output",
            pool, name, outputs_x, outputs_x, channels
        );
        Ok(base.finish(
            num_outputs,
            LayerKind::Pool(PoolLayer {
                channels,
                subs_x,
                start,
                stride,
                outputs_x,
                pool,
                img_pixels,
                img_size,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::DataLayer;
    use crate::params::WeightInitializer;

    fn conv_out(width: usize) -> Vec<LayerDescriptor> {
        vec![LayerDescriptor {
            name: "conv1".to_string(),
            layer_type: "data".to_string(),
            inputs: Vec::new(),
            num_inputs: Vec::new(),
            num_outputs: width,
            kind: LayerKind::Data(DataLayer { data_idx: 0 }),
        }]
    }

    fn pool1() -> ConfigSection {
        ConfigSection::new("pool1")
            .with("type", "pool")
            .with("inputs", "conv1")
            .with("pool", "max")
            .with("start", "0")
            .with("subsX", "2")
            .with("stride", "2")
            .with("outputsX", "0")
            .with("channels", "32")
    }

    fn parse(section: &ConfigSection, width: usize) -> Result<LayerDescriptor> {
        let mut init = WeightInitializer::seeded(0);
        let mut ctx = BuildContext {
            oracle: &[0usize; 0],
            init: &mut init,
        };
        PoolParser.parse(section, &conv_out(width), &mut ctx)
    }

    fn geometry(layer: &LayerDescriptor) -> &PoolLayer {
        match &layer.kind {
            LayerKind::Pool(pool) => pool,
            other => panic!("expected a pool layer, got {:?}", other),
        }
    }

    #[test]
    fn test_computed_outputs_x() {
        let layer = parse(&pool1(), 32 * 32 * 32).unwrap();
        let pool = geometry(&layer);
        assert_eq!(pool.img_size, 32);
        assert_eq!(pool.outputs_x, 16);
        assert_eq!(pool.pool, PoolMode::Max);
        assert_eq!(layer.num_outputs, 16 * 16 * 32);
        assert_eq!(layer.num_outputs, 8192);
    }

    #[test]
    fn test_overlapping_windows_round_up() {
        // ceil((32 - 0 - 3) / 2) + 1 = 16
        let section = pool1().with("subsX", "3").with("pool", "avg");
        let layer = parse(&section, 32 * 32 * 32).unwrap();
        assert_eq!(geometry(&layer).outputs_x, 16);
        assert_eq!(geometry(&layer).pool, PoolMode::Avg);
    }

    #[test]
    fn test_declared_outputs_x_is_kept() {
        let layer = parse(&pool1().with("outputsX", "10"), 32 * 32 * 32).unwrap();
        assert_eq!(geometry(&layer).outputs_x, 10);
        assert_eq!(layer.num_outputs, 10 * 10 * 32);
    }

    #[test]
    fn test_channels_must_be_multiple_of_16() {
        let err = parse(&pool1().with("channels", "20"), 20 * 32 * 32).unwrap_err();
        assert!(matches!(
            err,
            CompileError::ConstraintViolation { ref key, .. } if key == "channels"
        ));
    }

    #[test]
    fn test_unknown_pool_mode() {
        let err = parse(&pool1().with("pool", "median"), 32 * 32 * 32).unwrap_err();
        assert!(matches!(
            err,
            CompileError::ConstraintViolation { ref key, .. } if key == "pool"
        ));
    }

    #[test]
    fn test_non_square_input() {
        let err = parse(&pool1(), 32 * 30 * 32).unwrap_err();
        assert!(matches!(err, CompileError::ShapeMismatch { channels: 32, .. }));
    }

    #[test]
    fn test_window_past_image_edge() {
        // 2x2 image, window 2 starting at 3: ceil(-3 / 1) + 1 = -2.
        let section = pool1().with("start", "3").with("stride", "1");
        let err = parse(&section, 2 * 2 * 32).unwrap_err();
        assert!(matches!(
            err,
            CompileError::ConstraintViolation { ref key, .. } if key == "subsX"
        ));
    }

    #[test]
    fn test_oversized_output_is_rejected() {
        // (2^32)^2 * 32 does not fit in a usize.
        let err = parse(&pool1().with("outputsX", "4294967296"), 32 * 32 * 32).unwrap_err();
        assert!(matches!(
            err,
            CompileError::ConstraintViolation { ref key, .. } if key == "outputsX"
        ));
        let err = parse(&pool1().with("start", "-9223372036854775807"), 32 * 32 * 32).unwrap_err();
        assert!(matches!(
            err,
            CompileError::ConstraintViolation { ref key, .. } if key == "start"
        ));
    }
}
