use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::thread;

use crate::ast::Value;
use crate::env::Env;

/// Binding storage shared across forked environments. `store`/`load`
/// must tolerate concurrent callers; forks hold the same instance by
/// reference, so a write in one fork is visible in every other.
pub trait ConcurrentMap: Send + Sync {
    fn store(&self, key: &str, value: Value);
    fn load(&self, key: &str) -> Option<Value>;
}

/// Default `ConcurrentMap`: a hash map behind a reader/writer lock.
#[derive(Default)]
pub struct LockedMap {
    data: RwLock<HashMap<String, Value>>,
}

impl LockedMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConcurrentMap for LockedMap {
    fn store(&self, key: &str, value: Value) {
        self.data
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
    }

    fn load(&self, key: &str) -> Option<Value> {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

pub type MapFactory = Arc<dyn Fn() -> Arc<dyn ConcurrentMap> + Send + Sync>;

pub fn default_map_factory() -> MapFactory {
    Arc::new(|| Arc::new(LockedMap::new()))
}

/// Fire-and-forget evaluation of `form` against `env` on a detached
/// thread. There is no join handle and no result channel; errors and
/// panics from the spawned evaluation are discarded.
pub fn spawn_eval(mut env: Env, form: Value) {
    thread::spawn(move || {
        let _ = panic::catch_unwind(AssertUnwindSafe(move || {
            let _ = env.eval(&form);
        }));
    });
}
