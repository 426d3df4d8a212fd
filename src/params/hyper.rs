//! Learning hyperparameters attached from the parameter file.

use serde::{Deserialize, Serialize};

/// Learning rate, momentum and weight decay for a layer's weights and bias.
///
/// `W` is `Vec<f64>` for layers with one weight tensor per input and `f64`
/// for layers with a single weight tensor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams<W> {
    /// Weight learning rate.
    pub eps_w: W,
    /// Bias learning rate.
    pub eps_b: f64,
    /// Weight momentum.
    pub mom_w: W,
    /// Bias momentum.
    pub mom_b: f64,
    /// Weight decay.
    pub wc: W,
}
