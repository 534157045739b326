use std::sync::Arc;

use crate::analyzer::Analyzer;
use crate::ast::Value;
use crate::concurrency::{ConcurrentMap, MapFactory};
use crate::error::SorrelError;
use crate::options::EnvOptions;

/// Consulted with each form before analysis. Returning `Ok(None)`
/// means "no expansion"; the pipeline keeps the original form.
pub trait Expander: Send + Sync {
    fn expand(&self, env: &mut Env, form: &Value) -> Result<Option<Value>, SorrelError>;
}

/// Default expander: expands nothing. Macro rewriting policy belongs
/// to the embedding application.
pub struct NoopExpander;

impl Expander for NoopExpander {
    fn expand(&self, _env: &mut Env, _form: &Value) -> Result<Option<Value>, SorrelError> {
        Ok(None)
    }
}

/// One invocation's bookkeeping: a diagnostic name, the evaluated
/// arguments, and a private local scope. Frames are LIFO and never
/// outlive the invocation that pushed them.
pub struct StackFrame {
    pub name: String,
    pub args: Vec<Value>,
    pub locals: Arc<dyn ConcurrentMap>,
}

/// Evaluation context. The global store is shared by reference across
/// forks; the frame stack is private to each environment.
pub struct Env {
    globals: Arc<dyn ConcurrentMap>,
    stack: Vec<StackFrame>,
    max_depth: usize,
    analyzer: Arc<dyn Analyzer>,
    expander: Arc<dyn Expander>,
    map_factory: MapFactory,
}

impl Default for Env {
    fn default() -> Self {
        Self::new(EnvOptions::default())
    }
}

impl Env {
    pub fn new(opts: EnvOptions) -> Self {
        let map_factory = opts
            .map_factory
            .unwrap_or_else(crate::concurrency::default_map_factory);
        let globals = (map_factory)();
        for (name, value) in opts.globals {
            globals.store(&name, value);
        }
        Self {
            globals,
            stack: Vec::new(),
            max_depth: opts.max_depth,
            analyzer: opts
                .analyzer
                .unwrap_or_else(|| Arc::new(crate::analyzer::BasicAnalyzer::default())),
            expander: opts.expander.unwrap_or_else(|| Arc::new(NoopExpander)),
            map_factory,
        }
    }

    /// Expand, analyze, then evaluate one form.
    pub fn eval(&mut self, form: &Value) -> Result<Value, SorrelError> {
        let expander = Arc::clone(&self.expander);
        let form = match expander.expand(self, form)? {
            Some(expanded) => expanded,
            None => form.clone(),
        };
        let analyzer = Arc::clone(&self.analyzer);
        let expr = analyzer.analyze(self, &form)?;
        expr.eval(self)
    }

    /// Look `name` up in the current frame's locals, then the globals.
    /// Absence is a signal to the caller, not an error.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.stack.last() {
            if let Some(value) = frame.locals.load(name) {
                return Some(value);
            }
        }
        self.globals.load(name)
    }

    pub fn set_global(&self, name: &str, value: Value) {
        self.globals.store(name, value);
    }

    /// Bind into the current frame's locals, or the globals when no
    /// frame is active.
    pub fn set_local(&mut self, name: &str, value: Value) {
        match self.stack.last() {
            Some(frame) => frame.locals.store(name, value),
            None => self.globals.store(name, value),
        }
    }

    pub fn push_frame(&mut self, name: String, args: Vec<Value>) -> Result<(), SorrelError> {
        if self.stack.len() >= self.max_depth {
            return Err(SorrelError::stack_overflow(self.max_depth));
        }
        let locals = (self.map_factory)();
        self.stack.push(StackFrame { name, args, locals });
        Ok(())
    }

    pub fn pop_frame(&mut self) {
        self.stack.pop();
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.stack.last()
    }

    /// Derive an environment that shares this one's global store and
    /// configuration but starts with an empty call stack. Used for
    /// each `go` evaluation.
    pub fn fork(&self) -> Env {
        Env {
            globals: Arc::clone(&self.globals),
            stack: Vec::new(),
            max_depth: self.max_depth,
            analyzer: Arc::clone(&self.analyzer),
            expander: Arc::clone(&self.expander),
            map_factory: Arc::clone(&self.map_factory),
        }
    }
}
