//! Learnable parameter state: weight buffers and learning hyperparameters.

pub mod hyper;
pub mod weights;

pub use hyper::Hyperparams;
pub use weights::{BufferStats, MemoryOrder, ParamBuffer, WeightInitializer};
