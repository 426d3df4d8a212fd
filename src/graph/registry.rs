//! Layer-kind registry: maps a `type` tag to the parser that handles it.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::error::{CompileError, Result};
use crate::layer_types;
use crate::layers::{
    ConvParser, DataParser, FcParser, LayerParser, LogregCostParser, PoolParser, SoftmaxParser,
};

/// Tag-to-parser table. Each tag binds at most once.
#[derive(Default)]
pub struct LayerKindRegistry {
    parsers: HashMap<String, Box<dyn LayerParser>>,
}

impl LayerKindRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in kind.
    pub fn with_builtin_kinds() -> Self {
        let mut parsers: HashMap<String, Box<dyn LayerParser>> = HashMap::new();
        parsers.insert(layer_types::DATA.to_string(), Box::new(DataParser));
        parsers.insert(layer_types::FC.to_string(), Box::new(FcParser));
        parsers.insert(layer_types::CONV.to_string(), Box::new(ConvParser));
        parsers.insert(layer_types::SOFTMAX.to_string(), Box::new(SoftmaxParser));
        parsers.insert(layer_types::POOL.to_string(), Box::new(PoolParser));
        parsers.insert(layer_types::LOGREG_COST.to_string(), Box::new(LogregCostParser));
        Self { parsers }
    }

    /// Bind `tag` to `parser`. Fails without touching the registry if the
    /// tag is already bound.
    pub fn register(&mut self, tag: &str, parser: impl LayerParser + 'static) -> Result<()> {
        if self.parsers.contains_key(tag) {
            return Err(CompileError::DuplicateTag {
                tag: tag.to_string(),
            });
        }
        debug!("Registered layer type '{}'", tag);
        self.parsers.insert(tag.to_string(), Box::new(parser));
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<&dyn LayerParser> {
        self.parsers.get(tag).map(|p| p.as_ref())
    }

    /// Look up the parser for `layer`'s `tag`.
    pub fn resolve(&self, layer: &str, tag: &str) -> Result<&dyn LayerParser> {
        self.get(tag).ok_or_else(|| CompileError::UnknownKind {
            layer: layer.to_string(),
            kind: tag.to_string(),
        })
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.parsers.contains_key(tag)
    }

    /// Bound tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

static GLOBAL: OnceLock<LayerKindRegistry> = OnceLock::new();

/// Install the process-wide registry. Only the first call takes effect; a
/// later call, or a call after [`global`] has been read, hands the registry
/// back.
pub fn install(registry: LayerKindRegistry) -> std::result::Result<(), LayerKindRegistry> {
    GLOBAL.set(registry)
}

/// The process-wide registry: the installed one, or the built-in kinds.
pub fn global() -> &'static LayerKindRegistry {
    GLOBAL.get_or_init(LayerKindRegistry::with_builtin_kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSection;
    use crate::layers::{BuildContext, LayerDescriptor};

    struct Dummy;

    impl LayerParser for Dummy {
        fn parse(
            &self,
            section: &ConfigSection,
            _prev: &[LayerDescriptor],
            _ctx: &mut BuildContext<'_>,
        ) -> Result<LayerDescriptor> {
            Err(CompileError::constraint(section.name(), "type", "is a dummy"))
        }
    }

    #[test]
    fn test_builtin_kinds() {
        let registry = LayerKindRegistry::with_builtin_kinds();
        assert_eq!(
            registry.tags(),
            vec!["conv", "cost.logreg", "data", "fc", "pool", "softmax"]
        );
        assert!(registry.resolve("conv1", "conv").unwrap().requires_params());
        assert!(!registry.resolve("probs", "softmax").unwrap().requires_params());
    }

    #[test]
    fn test_duplicate_tag_leaves_registry_unchanged() {
        let mut registry = LayerKindRegistry::with_builtin_kinds();
        let err = registry.register("fc", Dummy).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateTag { ref tag } if tag == "fc"));
        // Still the fully-connected parser.
        assert!(registry.get("fc").unwrap().requires_params());
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_register_then_resolve() {
        let mut registry = LayerKindRegistry::new();
        assert!(registry.is_empty());
        registry.register("dummy", Dummy).unwrap();
        assert!(registry.contains("dummy"));
        assert!(registry.resolve("d", "dummy").is_ok());
        let err = registry.resolve("d", "conv").err().unwrap();
        assert!(matches!(
            err,
            CompileError::UnknownKind { ref layer, ref kind } if layer == "d" && kind == "conv"
        ));
    }

    #[test]
    fn test_global_falls_back_to_builtins() {
        assert!(global().contains(layer_types::LOGREG_COST));
        // The global is already initialized, so a late install is refused.
        assert!(install(LayerKindRegistry::new()).is_err());
    }
}
