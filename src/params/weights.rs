//! Parameter buffers and their random initialization.
//!
//! Every learnable tensor is paired with an increment (momentum) buffer of the
//! same shape. Weights are drawn from `init * N(0, 1)`; increments start at
//! zero.

use ndarray::{Array2, ShapeBuilder};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Memory order of a parameter buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryOrder {
    /// C order.
    #[default]
    RowMajor,
    /// Fortran order.
    ColumnMajor,
}

impl MemoryOrder {
    /// Whether `a` is laid out contiguously in this order.
    pub fn holds(self, a: &Array2<f32>) -> bool {
        match self {
            MemoryOrder::RowMajor => a.is_standard_layout(),
            MemoryOrder::ColumnMajor => a.t().is_standard_layout(),
        }
    }

    /// `a` with the same logical contents, laid out in this order.
    pub fn relayout(self, a: Array2<f32>) -> Array2<f32> {
        if self.holds(&a) {
            return a;
        }
        let mut out = Array2::zeros(a.raw_dim().set_f(self == MemoryOrder::ColumnMajor));
        out.assign(&a);
        out
    }
}

/// A parameter tensor and its increment tensor.
///
/// Serialized arrays are read back in C order, so the layout is recorded
/// alongside them and restored on deserialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredBuffer")]
pub struct ParamBuffer {
    pub values: Array2<f32>,
    pub increments: Array2<f32>,
    /// Layout of both arrays in memory.
    pub order: MemoryOrder,
}

#[derive(Deserialize)]
struct StoredBuffer {
    values: Array2<f32>,
    increments: Array2<f32>,
    #[serde(default)]
    order: MemoryOrder,
}

impl From<StoredBuffer> for ParamBuffer {
    fn from(stored: StoredBuffer) -> Self {
        ParamBuffer {
            values: stored.order.relayout(stored.values),
            increments: stored.order.relayout(stored.increments),
            order: stored.order,
        }
    }
}

/// Mean absolute value of a buffer pair, as printed after a test pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferStats {
    pub mean_abs: f32,
    pub inc_mean_abs: f32,
}

impl ParamBuffer {
    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Number of scalar parameters (increments not counted).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            mean_abs: mean_abs(&self.values),
            inc_mean_abs: mean_abs(&self.increments),
        }
    }
}

fn mean_abs(a: &Array2<f32>) -> f32 {
    if a.is_empty() {
        return 0.0;
    }
    a.iter().map(|v| v.abs()).sum::<f32>() / a.len() as f32
}

/// Allocates parameter buffers from a single random stream.
pub struct WeightInitializer {
    rng: StdRng,
}

impl WeightInitializer {
    /// Deterministic stream: the same seed yields the same weights.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// A `rows x cols` buffer scaled by `init`, with a zeroed increment buffer.
    /// An `init` of zero gives all-zero values without drawing from the stream.
    pub fn make_weights(
        &mut self,
        rows: usize,
        cols: usize,
        init: f32,
        order: MemoryOrder,
    ) -> ParamBuffer {
        let shape = (rows, cols).set_f(order == MemoryOrder::ColumnMajor);
        let values = if init == 0.0 {
            Array2::zeros(shape.clone())
        } else {
            Array2::from_shape_simple_fn(shape.clone(), || {
                let z: f32 = StandardNormal.sample(&mut self.rng);
                init * z
            })
        };
        ParamBuffer {
            values,
            increments: Array2::zeros(shape),
            order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_and_zero_increments() {
        let mut init = WeightInitializer::seeded(7);
        let buf = init.make_weights(75, 64, 0.01, MemoryOrder::RowMajor);
        assert_eq!(buf.shape(), (75, 64));
        assert_eq!(buf.increments.dim(), (75, 64));
        assert!(buf.increments.iter().all(|&v| v == 0.0));
        assert!(buf.values.iter().any(|&v| v != 0.0));
        assert_eq!(buf.len(), 75 * 64);
    }

    #[test]
    fn test_memory_order() {
        let mut init = WeightInitializer::seeded(7);
        let c = init.make_weights(4, 3, 1.0, MemoryOrder::RowMajor);
        assert!(c.values.is_standard_layout());

        let f = init.make_weights(4, 3, 1.0, MemoryOrder::ColumnMajor);
        assert!(!f.values.is_standard_layout());
        assert!(f.values.t().is_standard_layout());
        assert!(f.increments.t().is_standard_layout());
    }

    #[test]
    fn test_zero_init_gives_zero_values() {
        let mut init = WeightInitializer::seeded(1);
        let bias = init.make_weights(1, 10, 0.0, MemoryOrder::ColumnMajor);
        assert!(bias.values.iter().all(|&v| v == 0.0));
        assert_eq!(bias.stats().mean_abs, 0.0);
    }

    #[test]
    fn test_seeded_streams_are_reproducible() {
        let a = WeightInitializer::seeded(42).make_weights(8, 8, 0.1, MemoryOrder::RowMajor);
        let b = WeightInitializer::seeded(42).make_weights(8, 8, 0.1, MemoryOrder::RowMajor);
        let c = WeightInitializer::seeded(43).make_weights(8, 8, 0.1, MemoryOrder::RowMajor);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_scale_controls_magnitude() {
        let mut init = WeightInitializer::seeded(3);
        let small = init.make_weights(100, 100, 0.001, MemoryOrder::RowMajor);
        let large = init.make_weights(100, 100, 1.0, MemoryOrder::RowMajor);
        let s = small.stats().mean_abs;
        let l = large.stats().mean_abs;
        // E|z| = sqrt(2/pi) ~ 0.8 for a standard normal.
        assert!(l > 0.7 && l < 0.9, "mean abs = {}", l);
        assert!(s < 0.001, "mean abs = {}", s);
    }

    #[test]
    fn test_serde_keeps_column_major_layout() {
        let mut init = WeightInitializer::seeded(9);
        let mut fc = init.make_weights(20, 10, 0.1, MemoryOrder::ColumnMajor);
        // Small integers survive JSON exactly.
        for (i, v) in fc.values.iter_mut().enumerate() {
            *v = i as f32;
        }
        let json = serde_json::to_string(&fc).unwrap();
        let back: ParamBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(back.order, MemoryOrder::ColumnMajor);
        assert!(back.values.t().is_standard_layout());
        assert!(back.increments.t().is_standard_layout());
        assert_eq!(back, fc);

        let mut conv = init.make_weights(75, 64, 0.1, MemoryOrder::RowMajor);
        conv.values.fill(0.5);
        let back: ParamBuffer = serde_json::from_str(&serde_json::to_string(&conv).unwrap()).unwrap();
        assert!(back.values.is_standard_layout());
        assert_eq!(back, conv);
    }

    #[test]
    fn test_relayout() {
        let c = ndarray::arr2(&[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let f = MemoryOrder::ColumnMajor.relayout(c.clone());
        assert!(MemoryOrder::ColumnMajor.holds(&f));
        assert!(!MemoryOrder::RowMajor.holds(&f));
        assert_eq!(f, c);
        assert_eq!(f.as_slice_memory_order().unwrap(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }
}
