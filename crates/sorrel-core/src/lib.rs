//! Embeddable core of the sorrel language: a reader that turns rune
//! streams into data forms, an analyzer that turns forms into
//! executable expression trees, and a tree-walking evaluator running
//! against a mutable, fork-aware environment.

pub mod analyzer;
pub mod ast;
pub mod concurrency;
pub mod env;
pub mod error;
pub mod eval;
pub mod options;
pub mod reader;
pub mod seq;

use std::path::Path;

pub use analyzer::{Analyzer, BasicAnalyzer, SpecialParser};
pub use ast::{NativeFn, Value};
pub use concurrency::{ConcurrentMap, LockedMap, MapFactory};
pub use env::{Env, Expander, NoopExpander, StackFrame};
pub use error::{format_error, Position, SorrelError};
pub use eval::Expr;
pub use options::EnvOptions;
pub use reader::{Reader, ReaderMacro, ReaderOptions};
pub use seq::{List, Seq};

/// Read every form in `src`.
pub fn read_source(src: &str) -> Result<Vec<Value>, SorrelError> {
    Reader::new(src).all()
}

/// Evaluate every form in `src` against a fresh environment, returning
/// the last result (`nil` for empty input).
pub fn eval_source(src: &str, options: Option<EnvOptions>) -> Result<Value, SorrelError> {
    let mut env = Env::new(options.unwrap_or_default());
    eval_source_in(&mut env, src)
}

/// Evaluate every form in `src` against an existing environment.
pub fn eval_source_in(env: &mut Env, src: &str) -> Result<Value, SorrelError> {
    let mut result = Value::Nil;
    for form in Reader::new(src).all()? {
        result = env.eval(&form)?;
    }
    Ok(result)
}

/// Evaluate a file, labeling reader errors with its path.
pub fn eval_file(path: impl AsRef<Path>, options: Option<EnvOptions>) -> Result<Value, SorrelError> {
    let path = path.as_ref();
    let mut reader = Reader::from_file(path)
        .map_err(|err| SorrelError::message(format!("unable to read {}: {}", path.display(), err)))?;
    let mut env = Env::new(options.unwrap_or_default());
    let mut result = Value::Nil;
    for form in reader.all()? {
        result = env.eval(&form)?;
    }
    Ok(result)
}
