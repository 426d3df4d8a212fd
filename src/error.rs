//! Compilation errors.
//!
//! Every failure the compiler can report is a variant of [`CompileError`].
//! Variants carry the offending layer name and, where one applies, the
//! offending key, so a driver can print the message and exit without adding
//! context of its own.

use std::fmt;
use std::path::PathBuf;

/// The value type an accessor expected when a raw config value failed to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    Bool,
    IntList,
    FloatList,
    BoolList,
}

impl ValueType {
    /// The list form of a scalar type. List types map to themselves.
    pub fn list(self) -> Self {
        match self {
            ValueType::Int | ValueType::IntList => ValueType::IntList,
            ValueType::Float | ValueType::FloatList => ValueType::FloatList,
            ValueType::Bool | ValueType::BoolList => ValueType::BoolList,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => f.write_str("int"),
            ValueType::Float => f.write_str("float"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::IntList => f.write_str("delimited list of ints"),
            ValueType::FloatList => f.write_str("delimited list of floats"),
            ValueType::BoolList => f.write_str("delimited list of bools"),
        }
    }
}

/// All errors produced while reading config files or building a layer graph.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A definition or parameter file does not exist.
    #[error("file '{}' does not exist", path.display())]
    MissingFile { path: PathBuf },

    /// The file exists but could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line the config reader cannot interpret.
    #[error("{}:{line}: {message}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("layer '{layer}': required parameter '{key}' missing")]
    MissingKey { layer: String, key: String },

    #[error("layer '{layer}': parameter '{key}' must be {expected}")]
    TypeMismatch {
        layer: String,
        key: String,
        expected: ValueType,
    },

    #[error("layer '{layer}': {key} list length {got} does not match number of inputs ({expected})")]
    ParamListLengthMismatch {
        layer: String,
        key: String,
        expected: usize,
        got: usize,
    },

    #[error("layer '{layer}': unknown layer type '{kind}'")]
    UnknownKind { layer: String, kind: String },

    #[error("layer type '{tag}' already registered")]
    DuplicateTag { tag: String },

    #[error("layer '{layer}': input '{input}' not defined")]
    UndefinedInput { layer: String, input: String },

    #[error("layer '{layer}': number of inputs must be {expected}, got {got}")]
    WrongInputCount {
        layer: String,
        expected: usize,
        got: usize,
    },

    #[error("layer '{layer}': has {num_inputs}-dimensional input, not interpretable as {channels}-channel images")]
    ShapeMismatch {
        layer: String,
        num_inputs: usize,
        channels: usize,
    },

    /// A kind-specific rule on a geometry parameter was broken.
    #[error("layer '{layer}': parameter '{key}' {rule}")]
    ConstraintViolation {
        layer: String,
        key: String,
        rule: String,
    },

    #[error("layer '{layer}' of type '{kind}' is unused")]
    UnusedLayer { layer: String, kind: String },

    #[error("layer '{layer}': dimensionality of first input must be 1, got {got}")]
    InvalidLabelShape { layer: String, got: usize },

    #[error("layer '{layer}' of type '{kind}' requires extra parameters, but none given in file '{}'", path.display())]
    MissingParameterSection {
        layer: String,
        kind: String,
        path: PathBuf,
    },
}

impl CompileError {
    pub(crate) fn constraint(
        layer: impl Into<String>,
        key: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        CompileError::ConstraintViolation {
            layer: layer.into(),
            key: key.into(),
            rule: rule.into(),
        }
    }

    /// The layer the error refers to, if it refers to one.
    pub fn layer(&self) -> Option<&str> {
        match self {
            CompileError::MissingFile { .. }
            | CompileError::Io { .. }
            | CompileError::Syntax { .. }
            | CompileError::DuplicateTag { .. } => None,
            CompileError::MissingKey { layer, .. }
            | CompileError::TypeMismatch { layer, .. }
            | CompileError::ParamListLengthMismatch { layer, .. }
            | CompileError::UnknownKind { layer, .. }
            | CompileError::UndefinedInput { layer, .. }
            | CompileError::WrongInputCount { layer, .. }
            | CompileError::ShapeMismatch { layer, .. }
            | CompileError::ConstraintViolation { layer, .. }
            | CompileError::UnusedLayer { layer, .. }
            | CompileError::InvalidLabelShape { layer, .. }
            | CompileError::MissingParameterSection { layer, .. } => Some(layer),
        }
    }
}

/// Result alias used throughout the compiler.
pub type Result<T> = std::result::Result<T, CompileError>;
