//! Two-pass graph compilation.
//!
//! Pass 1 walks the definition file in declaration order and asks each
//! layer's parser for a descriptor, so every `inputs` reference can only
//! point backwards. Every non-cost layer must then feed some other layer.
//! Pass 2 walks the descriptors and attaches hyperparameters from the
//! parameter file.
//!
//! A non-empty prior graph replaces pass 1; its buffers are kept as they are.

use std::path::Path;

use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::error::{CompileError, Result};
use crate::graph::registry::{self, LayerKindRegistry};
use crate::graph::{LayerGraph, ShapeOracle};
use crate::layers::base::header;
use crate::layers::{BuildContext, LayerDescriptor};
use crate::params::WeightInitializer;

/// Build-time settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Seed for weight initialization. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl CompileOptions {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

/// Compiles definition and parameter files into a [`LayerGraph`].
pub struct GraphBuilder<'r> {
    registry: &'r LayerKindRegistry,
    options: CompileOptions,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(registry: &'r LayerKindRegistry) -> Self {
        Self {
            registry,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Check both paths exist, read them, and build.
    pub fn build_files(
        &self,
        definition_path: impl AsRef<Path>,
        parameter_path: impl AsRef<Path>,
        oracle: &dyn ShapeOracle,
        prior: Option<LayerGraph>,
    ) -> Result<LayerGraph> {
        let definition_path = definition_path.as_ref();
        let parameter_path = parameter_path.as_ref();
        for path in [definition_path, parameter_path] {
            if !path.exists() {
                return Err(CompileError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
        }
        let definitions = ConfigFile::read(definition_path)?;
        let parameters = ConfigFile::read(parameter_path)?;
        self.build(&definitions, &parameters, oracle, prior)
    }

    /// Build from already-parsed files.
    pub fn build(
        &self,
        definitions: &ConfigFile,
        parameters: &ConfigFile,
        oracle: &dyn ShapeOracle,
        prior: Option<LayerGraph>,
    ) -> Result<LayerGraph> {
        let mut layers = match prior {
            Some(graph) if !graph.is_empty() => {
                info!(
                    "Resuming with {} layers from a prior graph, skipping '{}'",
                    graph.len(),
                    definitions.path().display()
                );
                graph.into_layers()
            }
            _ => self.define(definitions, oracle)?,
        };
        check_usage(&layers)?;
        self.attach_params(&mut layers, parameters)?;

        let graph = LayerGraph::from_layers(layers);
        info!(
            "Built layer graph with {} layers and {} parameters",
            graph.len(),
            graph.param_count()
        );
        Ok(graph)
    }

    /// Pass 1.
    fn define(
        &self,
        definitions: &ConfigFile,
        oracle: &dyn ShapeOracle,
    ) -> Result<Vec<LayerDescriptor>> {
        let mut init = WeightInitializer::new(self.options.seed);
        let mut layers: Vec<LayerDescriptor> = Vec::with_capacity(definitions.len());
        for section in definitions.sections() {
            let (name, tag) = header(section)?;
            let parser = self.registry.resolve(&name, &tag)?;
            let mut ctx = BuildContext {
                oracle,
                init: &mut init,
            };
            let layer = parser.parse(section, &layers, &mut ctx)?;
            layers.push(layer);
        }
        Ok(layers)
    }

    /// Pass 2.
    fn attach_params(&self, layers: &mut [LayerDescriptor], parameters: &ConfigFile) -> Result<()> {
        for layer in layers.iter_mut() {
            let parser = self.registry.resolve(&layer.name, &layer.layer_type)?;
            match parameters.section(&layer.name) {
                Some(section) => {
                    parser.add_params(section, layer)?;
                    debug!("Attached parameters to layer '{}'", layer.name);
                }
                None if parser.requires_params() => {
                    return Err(CompileError::MissingParameterSection {
                        layer: layer.name.clone(),
                        kind: layer.layer_type.clone(),
                        path: parameters.path().to_path_buf(),
                    });
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Every non-cost layer, data layers included, must be an input of some
/// other layer.
fn check_usage(layers: &[LayerDescriptor]) -> Result<()> {
    for (idx, layer) in layers.iter().enumerate() {
        if layer.is_cost() {
            continue;
        }
        let consumed = layers
            .iter()
            .enumerate()
            .any(|(other, l)| other != idx && l.inputs.contains(&idx));
        if !consumed {
            return Err(CompileError::UnusedLayer {
                layer: layer.name.clone(),
                kind: layer.layer_type.clone(),
            });
        }
    }
    Ok(())
}

/// Compile a definition file and a parameter file with the process-wide
/// registry.
pub fn build_layer_graph(
    definition_path: impl AsRef<Path>,
    parameter_path: impl AsRef<Path>,
    oracle: &dyn ShapeOracle,
    prior: Option<LayerGraph>,
) -> Result<LayerGraph> {
    GraphBuilder::new(registry::global()).build_files(definition_path, parameter_path, oracle, prior)
}
