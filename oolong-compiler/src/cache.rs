//! Process-local cache of compiled expressions keyed by source text and
//! signature. Compilation for an uncached key runs while the lock is held,
//! so concurrent callers for the same key block on the first compile and
//! reuse its result; a published entry is never replaced.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::compiler::{CompileError, Signature};
use crate::eval::CompiledExpression;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub signature: Signature,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, Arc<CompiledExpression>>,
    order: VecDeque<CacheKey>,
}

/// Bounded FIFO cache; never silently unbounded. A capacity of zero
/// disables storage entirely.
pub struct ExpressionCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl ExpressionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Return the cached expression for `key`, or run `compile` and publish
    /// its result. The compile function runs at most once per cached key;
    /// errors are returned to the caller and never cached.
    pub fn get_or_compile(
        &self,
        key: CacheKey,
        compile: impl FnOnce() -> Result<CompiledExpression, CompileError>,
    ) -> Result<Arc<CompiledExpression>, CompileError> {
        let mut state = self.lock();
        if let Some(hit) = state.entries.get(&key) {
            return Ok(hit.clone());
        }

        let compiled = Arc::new(compile()?);
        if self.capacity > 0 {
            if state.entries.len() >= self.capacity {
                if let Some(oldest) = state.order.pop_front() {
                    state.entries.remove(&oldest);
                }
            }
            state.entries.insert(key.clone(), compiled.clone());
            state.order.push_back(key);
        }
        Ok(compiled)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{TypedExpression, TypedExpressionKind};
    use crate::types::Type;
    use crate::value::Value;

    fn literal_expression(value: i32) -> CompiledExpression {
        CompiledExpression::new(
            Vec::new(),
            TypedExpression {
                offset: 0,
                ty: Type::Int,
                nullable: false,
                kind: TypedExpressionKind::Literal(Value::Int(value)),
            },
        )
    }

    fn key(source: &str) -> CacheKey {
        CacheKey {
            source: source.to_string(),
            signature: Signature::default(),
        }
    }

    #[test]
    fn compiles_each_key_once() {
        let cache = ExpressionCache::new(8);
        let mut calls = 0;
        for _ in 0..3 {
            let compiled = cache
                .get_or_compile(key("1"), || {
                    calls += 1;
                    Ok(literal_expression(1))
                })
                .expect("compile should succeed");
            assert_eq!(compiled.invoke(&[]).expect("invoke"), Value::Int(1));
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_oldest_entry_at_capacity() {
        let cache = ExpressionCache::new(2);
        for value in 0..3 {
            cache
                .get_or_compile(key(&value.to_string()), || Ok(literal_expression(value)))
                .expect("compile should succeed");
        }
        assert_eq!(cache.len(), 2);

        // "0" was evicted, so compiling it again runs the closure.
        let mut recompiled = false;
        cache
            .get_or_compile(key("0"), || {
                recompiled = true;
                Ok(literal_expression(0))
            })
            .expect("compile should succeed");
        assert!(recompiled);
    }

    #[test]
    fn zero_capacity_disables_storage() {
        let cache = ExpressionCache::new(0);
        let mut calls = 0;
        for _ in 0..2 {
            cache
                .get_or_compile(key("1"), || {
                    calls += 1;
                    Ok(literal_expression(1))
                })
                .expect("compile should succeed");
        }
        assert_eq!(calls, 2);
        assert!(cache.is_empty());
    }
}
