use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use oolong_compiler::{
    CacheKey, CompileOptions, Compiler, Engine, ExpressionCache, Registry, Signature, Type,
    TypeResolver, Value,
};

#[test]
fn identical_compiles_share_a_cache_entry() {
    let engine = Engine::default();
    let signature = Signature::with_params([Type::Int, Type::Int]);

    let first = engine
        .compile_with("$0 + $1", signature.clone())
        .expect("compile should succeed");
    let second = engine
        .compile_with("$0 + $1", signature)
        .expect("compile should succeed");

    assert_eq!(engine.cache().len(), 1);
    let arguments = [Value::Int(3), Value::Int(4)];
    assert_eq!(
        first.invoke(&arguments).expect("invoke"),
        second.invoke(&arguments).expect("invoke")
    );
}

#[test]
fn different_signatures_compile_separately() {
    let engine = Engine::default();
    engine
        .compile_with("$0 + $0", Signature::with_params([Type::Int]))
        .expect("compile should succeed");
    engine
        .compile_with("$0 + $0", Signature::with_params([Type::Double]))
        .expect("compile should succeed");
    assert_eq!(engine.cache().len(), 2);
}

#[test]
fn failed_compiles_are_not_cached() {
    let engine = Engine::default();
    assert!(engine.compile("unknown_var").is_err());
    assert!(engine.cache().is_empty());
}

#[test]
fn clear_empties_the_cache() {
    let engine = Engine::default();
    engine.compile("1 + 1").expect("compile should succeed");
    assert_eq!(engine.cache().len(), 1);
    engine.cache().clear();
    assert!(engine.cache().is_empty());
}

#[test]
fn compile_runs_at_most_once_per_key() {
    let cache = ExpressionCache::new(16);
    let resolver: Arc<dyn TypeResolver> = Arc::new(Registry::with_builtins());
    let compiles = AtomicUsize::new(0);

    let key = CacheKey {
        source: "$0 * 2".to_string(),
        signature: Signature::with_params([Type::Int]),
    };
    for _ in 0..5 {
        let compiled = cache
            .get_or_compile(key.clone(), || {
                compiles.fetch_add(1, Ordering::SeqCst);
                let options = CompileOptions {
                    param_types: vec![Type::Int],
                    ..CompileOptions::default()
                };
                Compiler::new(resolver.clone(), options).compile("$0 * 2")
            })
            .expect("compile should succeed");
        assert_eq!(
            compiled.invoke(&[Value::Int(21)]).expect("invoke"),
            Value::Int(42)
        );
    }
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_callers_converge_on_one_entry() {
    let engine = Arc::new(Engine::default());
    let mut handles = Vec::new();

    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            let compiled = engine
                .compile_with("$0 + 1", Signature::with_params([Type::Int]))
                .expect("compile should succeed");
            compiled.invoke(&[Value::Int(1)]).expect("invoke")
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().expect("thread"), Value::Int(2));
    }
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn compiled_expressions_are_shared_across_threads() {
    let engine = Engine::default();
    let compiled = engine
        .compile_with("$0 * $0", Signature::with_params([Type::Int]))
        .expect("compile should succeed");

    let mut handles = Vec::new();
    for value in 0..4 {
        let compiled = compiled.clone();
        handles.push(thread::spawn(move || {
            compiled.invoke(&[Value::Int(value)]).expect("invoke")
        }));
    }
    for (value, handle) in (0..4).zip(handles) {
        assert_eq!(handle.join().expect("thread"), Value::Int(value * value));
    }
}
