//! The data-provider capability consumed by data layers.

/// Reports the flattened width of each raw data channel.
pub trait ShapeOracle {
    /// Width of data channel `idx`, or `None` if the provider has no such
    /// channel.
    fn data_dims(&self, idx: usize) -> Option<usize>;
}

impl ShapeOracle for [usize] {
    fn data_dims(&self, idx: usize) -> Option<usize> {
        self.get(idx).copied()
    }
}

impl<const N: usize> ShapeOracle for [usize; N] {
    fn data_dims(&self, idx: usize) -> Option<usize> {
        self.get(idx).copied()
    }
}

impl ShapeOracle for Vec<usize> {
    fn data_dims(&self, idx: usize) -> Option<usize> {
        self.get(idx).copied()
    }
}

impl<T: ShapeOracle + ?Sized> ShapeOracle for &T {
    fn data_dims(&self, idx: usize) -> Option<usize> {
        (**self).data_dims(idx)
    }
}

/// Adapts a closure into a [`ShapeOracle`].
pub struct FnOracle<F>(pub F);

impl<F> ShapeOracle for FnOracle<F>
where
    F: Fn(usize) -> Option<usize>,
{
    fn data_dims(&self, idx: usize) -> Option<usize> {
        (self.0)(idx)
    }
}
