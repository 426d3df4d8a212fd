//! Behavior shared by the layer kinds: input resolution and the integer
//! geometry checks used by convolution and pooling.

use tracing::debug;

use crate::config::ConfigSection;
use crate::error::{CompileError, Result};
use crate::layers::{LayerDescriptor, LayerKind};

/// Name and type of the layer a section declares.
pub(crate) fn header(section: &ConfigSection) -> Result<(String, String)> {
    let layer_type = section.get_str("type")?;
    Ok((section.name().to_string(), layer_type.to_string()))
}

/// A layer whose `inputs` have been resolved against the layers before it.
pub(crate) struct InputLayer {
    pub name: String,
    pub layer_type: String,
    pub inputs: Vec<usize>,
    pub num_inputs: Vec<usize>,
}

impl InputLayer {
    /// Resolve the comma-separated `inputs` key. Every name must belong to a
    /// layer in `prev`.
    pub fn parse(section: &ConfigSection, prev: &[LayerDescriptor]) -> Result<Self> {
        let (name, layer_type) = header(section)?;
        let mut inputs = Vec::new();
        let mut num_inputs = Vec::new();
        for input in section.get_name_list("inputs")? {
            let Some(idx) = prev.iter().position(|l| l.name == input) else {
                return Err(CompileError::UndefinedInput { layer: name, input });
            };
            inputs.push(idx);
            num_inputs.push(prev[idx].num_outputs);
        }
        debug!("Layer '{}' reads from {:?}", name, inputs);
        Ok(Self {
            name,
            layer_type,
            inputs,
            num_inputs,
        })
    }

    pub fn expect_inputs(&self, expected: usize) -> Result<()> {
        if self.inputs.len() != expected {
            return Err(CompileError::WrongInputCount {
                layer: self.name.clone(),
                expected,
                got: self.inputs.len(),
            });
        }
        Ok(())
    }

    pub fn finish(self, num_outputs: usize, kind: LayerKind) -> LayerDescriptor {
        LayerDescriptor {
            name: self.name,
            layer_type: self.layer_type,
            inputs: self.inputs,
            num_inputs: self.num_inputs,
            num_outputs,
            kind,
        }
    }
}

/// Read a strictly positive integer.
pub(crate) fn positive(section: &ConfigSection, key: &str) -> Result<usize> {
    let v = section.get_int(key)?;
    if v <= 0 {
        return Err(CompileError::constraint(
            section.name(),
            key,
            format!("must be positive, got {v}"),
        ));
    }
    Ok(v as usize)
}

/// Read an integer that may be zero but not negative.
pub(crate) fn non_negative(section: &ConfigSection, key: &str) -> Result<usize> {
    let v = section.get_int(key)?;
    if v < 0 {
        return Err(CompileError::constraint(
            section.name(),
            key,
            format!("must not be negative, got {v}"),
        ));
    }
    Ok(v as usize)
}

/// Interpret a flat input of width `num_inputs` as square `channels`-channel
/// images. Returns `(imgPixels, imgSize)`.
pub(crate) fn square_images(
    layer: &str,
    num_inputs: usize,
    channels: usize,
) -> Result<(usize, usize)> {
    let img_pixels = num_inputs / channels;
    let img_size = isqrt(img_pixels);
    if img_pixels == 0 || num_inputs % channels != 0 || img_size * img_size != img_pixels {
        return Err(CompileError::ShapeMismatch {
            layer: layer.to_string(),
            num_inputs,
            channels,
        });
    }
    Ok((img_pixels, img_size))
}

/// `floor(sqrt(n))`, exact for every `usize`.
pub(crate) fn isqrt(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    while r.checked_mul(r).map_or(true, |sq| sq > n) {
        r -= 1;
    }
    while (r + 1).checked_mul(r + 1).map_or(false, |sq| sq <= n) {
        r += 1;
    }
    r
}

/// `ceil(a / b)` for a positive divisor. Does not overflow.
pub(crate) fn ceil_div(a: i64, b: i64) -> i64 {
    debug_assert!(b > 0);
    let q = a.div_euclid(b);
    if a.rem_euclid(b) != 0 {
        q + 1
    } else {
        q
    }
}

/// Product of `factors`, failing with a `ConstraintViolation` on `key` if it
/// overflows or is too large to allocate as a buffer of `f32`.
pub(crate) fn checked_product(layer: &str, key: &str, factors: &[usize]) -> Result<usize> {
    let max = isize::MAX as usize / std::mem::size_of::<f32>();
    factors
        .iter()
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .filter(|&n| n <= max)
        .ok_or_else(|| {
            CompileError::constraint(
                layer,
                key,
                format!("gives a size that overflows ({factors:?})"),
            )
        })
}

/// Fail unless a per-input list has one entry per input.
pub(crate) fn check_list_len<T>(
    layer: &str,
    key: &str,
    list: &[T],
    num_inputs: usize,
) -> Result<()> {
    if list.len() != num_inputs {
        return Err(CompileError::ParamListLengthMismatch {
            layer: layer.to_string(),
            key: key.to_string(),
            expected: num_inputs,
            got: list.len(),
        });
    }
    Ok(())
}
