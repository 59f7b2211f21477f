use oolong_compiler::{Engine, InvokeError, Signature, Type, Value};

fn eval(source: &str, arguments: &[Value]) -> Value {
    Engine::default()
        .eval(source, arguments)
        .unwrap_or_else(|error| panic!("failed to evaluate '{source}': {error}"))
}

fn eval_typed(source: &str, param_types: Vec<Type>, arguments: &[Value]) -> Value {
    let engine = Engine::default();
    let compiled = engine
        .compile_with(source, Signature::with_params(param_types))
        .unwrap_or_else(|error| panic!("failed to compile '{source}': {error}"));
    compiled
        .invoke(arguments)
        .unwrap_or_else(|error| panic!("failed to invoke '{source}': {error}"))
}

#[test]
fn adds_two_slots() {
    assert_eq!(eval("$0 + $1", &[Value::Int(3), Value::Int(4)]), Value::Int(7));
}

#[test]
fn literal_arithmetic_follows_precedence() {
    assert_eq!(eval("1 + 2 * 3", &[]), Value::Int(7));
    assert_eq!(eval("(1 + 2) * 3", &[]), Value::Int(9));
    assert_eq!(eval("10 % 4", &[]), Value::Int(2));
    assert_eq!(eval("7 / 2", &[]), Value::Int(3));
}

#[test]
fn mixed_operands_promote_to_the_wider_type() {
    assert_eq!(eval("1 + 2L", &[]), Value::Long(3));
    assert_eq!(eval("1 / 4.0", &[]), Value::Double(0.25));
    assert_eq!(eval("1L + 0.5", &[]), Value::Double(1.5));
}

#[test]
fn unary_operators() {
    assert_eq!(eval("-3 + 1", &[]), Value::Int(-2));
    assert_eq!(eval("!false", &[]), Value::Bool(true));
    assert_eq!(eval("-(1 + 2)", &[]), Value::Int(-3));
}

#[test]
fn comparisons_and_equality() {
    assert_eq!(eval("1 < 2", &[]), Value::Bool(true));
    assert_eq!(eval("2 <= 1", &[]), Value::Bool(false));
    assert_eq!(eval("1 == 1.0", &[]), Value::Bool(true));
    assert_eq!(eval("\"a\" == \"a\"", &[]), Value::Bool(true));
    assert_eq!(eval("'a' < 'b'", &[]), Value::Bool(true));
    assert_eq!(eval("1 != 2", &[]), Value::Bool(true));
}

#[test]
fn conditional_selects_a_branch() {
    assert_eq!(eval("true ? 1 : 2", &[]), Value::Int(1));
    assert_eq!(eval("1 > 2 ? \"yes\" : \"no\"", &[]), Value::from("no"));
    // Branches promote to a common numeric type.
    assert_eq!(eval("false ? 1 : 2.5", &[]), Value::Double(2.5));
    assert_eq!(eval("true ? 1 : 2.5", &[]), Value::Double(1.0));
}

#[test]
fn string_concatenation() {
    assert_eq!(eval("\"a\" + \"b\"", &[]), Value::from("ab"));
    assert_eq!(eval("\"n = \" + 42", &[]), Value::from("n = 42"));
    assert_eq!(eval("1 + \"!\"", &[]), Value::from("1!"));
}

#[test]
fn short_circuit_and_skips_the_right_operand() {
    // The right operand would null-dereference if evaluated.
    assert_eq!(
        eval_typed(
            "$0 != null && $0.length > 0",
            vec![Type::Str],
            &[Value::Null]
        ),
        Value::Bool(false)
    );
    assert_eq!(
        eval_typed(
            "$0 != null && $0.length > 0",
            vec![Type::Str],
            &[Value::from("hi")]
        ),
        Value::Bool(true)
    );
}

#[test]
fn short_circuit_or_skips_the_right_operand() {
    assert_eq!(
        eval_typed(
            "$0 == null || $0.length == 0",
            vec![Type::Str],
            &[Value::Null]
        ),
        Value::Bool(true)
    );
}

#[test]
fn coalesce_falls_through_on_null() {
    assert_eq!(
        eval_typed("$0 ?? \"fallback\"", vec![Type::Str], &[Value::Null]),
        Value::from("fallback")
    );
    assert_eq!(
        eval_typed("$0 ?? \"fallback\"", vec![Type::Str], &[Value::from("x")]),
        Value::from("x")
    );
}

#[test]
fn null_propagation_chains_with_coalesce() {
    assert_eq!(
        eval_typed("$0?.length ?? -1", vec![Type::Str], &[Value::Null]),
        Value::Int(-1)
    );
    assert_eq!(
        eval_typed("$0?.length ?? -1", vec![Type::Str], &[Value::from("abc")]),
        Value::Int(3)
    );
}

#[test]
fn casts_convert_numerics() {
    assert_eq!(eval("(long)1", &[]), Value::Long(1));
    assert_eq!(eval("(int)2.9", &[]), Value::Int(2));
    assert_eq!(eval("(double)1 / 4", &[]), Value::Double(0.25));
    assert_eq!(eval("(char)65", &[]), Value::Char('A'));
    assert_eq!(eval("(int)'A'", &[]), Value::Int(65));
}

#[test]
fn member_access_on_plain_null_receiver_faults() {
    let engine = Engine::default();
    let compiled = engine
        .compile_with("$0.length", Signature::with_params([Type::Str]))
        .expect("compile should succeed");
    let error = compiled.invoke(&[Value::Null]).expect_err("invoke should fail");
    assert!(matches!(error, InvokeError::NullReceiver { .. }));
}

#[test]
fn integer_division_by_zero_faults() {
    let engine = Engine::default();
    let error = engine.eval("1 / 0", &[]).expect_err("evaluation should fail");
    assert!(error.to_string().contains("division by zero"));
}

#[test]
fn integer_overflow_faults_instead_of_wrapping() {
    let engine = Engine::default();
    let error = engine
        .eval("2147483647 + 1", &[])
        .expect_err("evaluation should fail");
    assert!(error.to_string().contains("integer overflow"));
}

#[test]
fn float_division_by_zero_is_infinite() {
    assert_eq!(eval("1.0 / 0.0", &[]), Value::Double(f64::INFINITY));
}

#[test]
fn arity_is_validated_before_evaluation() {
    let engine = Engine::default();
    let compiled = engine
        .compile_with("$0 + $1", Signature::with_params([Type::Int, Type::Int]))
        .expect("compile should succeed");
    let error = compiled.invoke(&[Value::Int(1)]).expect_err("invoke should fail");
    assert_eq!(
        error,
        InvokeError::ArityMismatch {
            expected: 2,
            received: 1
        }
    );
}

#[test]
fn argument_types_are_validated_before_evaluation() {
    let engine = Engine::default();
    let compiled = engine
        .compile_with("$0 + $1", Signature::with_params([Type::Int, Type::Int]))
        .expect("compile should succeed");
    let error = compiled
        .invoke(&[Value::Int(1), Value::from("two")])
        .expect_err("invoke should fail");
    assert!(matches!(
        error,
        InvokeError::ArgumentType { index: 1, .. }
    ));
}

#[test]
fn arguments_widen_to_the_declared_signature() {
    assert_eq!(
        eval_typed("$0 / 2.0", vec![Type::Double], &[Value::Int(1)]),
        Value::Double(0.5)
    );
}

#[test]
fn declared_result_type_widens_the_body() {
    let engine = Engine::default();
    let signature = Signature {
        param_types: vec![Type::Int],
        result_type: Some(Type::Long),
        ..Signature::default()
    };
    let compiled = engine
        .compile_with("$0 + 1", signature)
        .expect("compile should succeed");
    assert_eq!(compiled.return_type(), &Type::Long);
    assert_eq!(
        compiled.invoke(&[Value::Int(3)]).expect("invoke"),
        Value::Long(4)
    );
}

#[test]
fn named_lambda_parameters_bind_by_name() {
    assert_eq!(
        eval_typed("(a, b) => a * 10 + b", vec![Type::Int, Type::Int], &[
            Value::Int(4),
            Value::Int(2)
        ]),
        Value::Int(42)
    );
}

#[test]
fn default_instance_binds_the_lambda_parameter() {
    let engine = Engine::default();
    let signature = Signature {
        default_instance: Some(Type::Int),
        ..Signature::default()
    };
    let compiled = engine
        .compile_with("m => m.to_string()", signature)
        .expect("compile should succeed");
    assert_eq!(
        compiled.invoke(&[Value::Int(42)]).expect("invoke"),
        Value::from("42")
    );
}

#[test]
fn repeated_invocation_is_idempotent() {
    let engine = Engine::default();
    let compiled = engine
        .compile_with("$0 * $0", Signature::with_params([Type::Int]))
        .expect("compile should succeed");
    for _ in 0..3 {
        assert_eq!(
            compiled.invoke(&[Value::Int(9)]).expect("invoke"),
            Value::Int(81)
        );
    }
}
