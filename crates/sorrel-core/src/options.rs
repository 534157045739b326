use std::collections::HashMap;
use std::sync::Arc;

use crate::analyzer::Analyzer;
use crate::ast::Value;
use crate::concurrency::MapFactory;
use crate::env::Expander;

pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Configuration for `Env::new`. `None` fields fall back to the
/// builtin analyzer, the no-op expander and the locked-map factory.
#[derive(Clone)]
pub struct EnvOptions {
    pub globals: HashMap<String, Value>,
    pub max_depth: usize,
    pub analyzer: Option<Arc<dyn Analyzer>>,
    pub expander: Option<Arc<dyn Expander>>,
    pub map_factory: Option<MapFactory>,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            globals: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            analyzer: None,
            expander: None,
            map_factory: None,
        }
    }
}

impl EnvOptions {
    pub fn with_globals(mut self, globals: HashMap<String, Value>) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    /// Panics if `depth` is zero; a zero bound would reject every
    /// invocation.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        assert!(depth != 0, "max stack depth must be nonzero");
        self.max_depth = depth;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_expander(mut self, expander: Arc<dyn Expander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_map_factory(mut self, factory: MapFactory) -> Self {
        self.map_factory = Some(factory);
        self
    }
}
