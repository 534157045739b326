use std::sync::Arc;
use std::time::{Duration, Instant};

use sorrel_core::{
    eval_source, eval_source_in, Analyzer, BasicAnalyzer, Env, EnvOptions, SorrelError, Value,
};

fn add(_env: &mut Env, args: &[Value]) -> Result<Value, SorrelError> {
    let mut sum = 0i64;
    for arg in args {
        match arg {
            Value::Int(n) => sum += n,
            other => {
                return Err(SorrelError::invalid_form(format!(
                    "+ expects ints, got '{}'",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::Int(sum))
}

fn base_options() -> EnvOptions {
    EnvOptions::default().with_global("+", Value::native_fn_with_name("+", add))
}

fn eval(src: &str) -> Result<Value, SorrelError> {
    eval_source(src, Some(base_options()))
}

#[test]
fn self_evaluating_forms() {
    assert_eq!(eval("42").unwrap(), Value::Int(42));
    assert_eq!(eval(":k").unwrap(), Value::keyword("k"));
    assert_eq!(eval("\"s\"").unwrap(), Value::string("s"));
    assert_eq!(eval("()").unwrap(), Value::list(vec![]));
    assert_eq!(eval("").unwrap(), Value::Nil);
}

#[test]
fn if_truthiness() {
    // Only nil and false are falsy; numeric zero is truthy.
    assert_eq!(eval("(if nil 1 2)").unwrap(), Value::Int(2));
    assert_eq!(eval("(if false 1 2)").unwrap(), Value::Int(2));
    assert_eq!(eval("(if 0 1 2)").unwrap(), Value::Int(1));
    assert_eq!(eval("(if true 1 2)").unwrap(), Value::Int(1));
    assert_eq!(eval("(if nil 1)").unwrap(), Value::Nil);
}

#[test]
fn if_wrong_arity() {
    assert!(matches!(
        eval("(if 1)"),
        Err(SorrelError::InvalidForm { .. })
    ));
    assert!(matches!(
        eval("(if 1 2 3 4)"),
        Err(SorrelError::InvalidForm { .. })
    ));
}

#[test]
fn def_binds_globally() {
    assert_eq!(eval("(def x 5)").unwrap(), Value::symbol("x"));
    assert_eq!(eval("(def x 5) x").unwrap(), Value::Int(5));
    assert_eq!(eval("(def x 5) (def y x) y").unwrap(), Value::Int(5));
}

#[test]
fn def_rejects_bad_forms() {
    assert!(matches!(
        eval("(def 1 5)"),
        Err(SorrelError::InvalidForm { .. })
    ));
    assert!(matches!(
        eval("(def x)"),
        Err(SorrelError::InvalidForm { .. })
    ));
    assert!(matches!(
        eval("(def x 1 2)"),
        Err(SorrelError::InvalidForm { .. })
    ));
}

#[test]
fn def_rejects_blank_name() {
    use sorrel_core::Expr;

    let mut env = Env::default();
    let expr = Expr::Def {
        name: "   ".to_string(),
        value: Value::Int(1),
    };
    assert!(matches!(
        expr.eval(&mut env),
        Err(SorrelError::InvalidBindName { .. })
    ));
}

#[test]
fn quote_returns_form_unevaluated() {
    assert_eq!(eval("'x").unwrap(), Value::symbol("x"));
    assert_eq!(
        eval("(quote (a b))").unwrap(),
        Value::list(vec![Value::symbol("a"), Value::symbol("b")])
    );
    assert!(matches!(
        eval("(quote)"),
        Err(SorrelError::InvalidForm { .. })
    ));
    assert!(matches!(
        eval("(quote a b)"),
        Err(SorrelError::InvalidForm { .. })
    ));
}

#[test]
fn do_evaluates_in_order() {
    assert_eq!(eval("(do)").unwrap(), Value::Nil);
    assert_eq!(eval("(do 1 2 3)").unwrap(), Value::Int(3));
    assert_eq!(eval("(do (def a 1) (def b 2) (+ a b))").unwrap(), Value::Int(3));
}

#[test]
fn do_aborts_on_first_failure() {
    let mut env = Env::new(base_options());
    assert!(eval_source_in(&mut env, "(do (def c 1) missing (def d 2))").is_err());
    assert_eq!(env.resolve("c"), Some(Value::Int(1)));
    assert_eq!(env.resolve("d"), None);
}

#[test]
fn invocation() {
    assert_eq!(eval("(+ 1 2 3)").unwrap(), Value::Int(6));
    assert_eq!(eval("(+ (+ 1 2) (+ 3 4))").unwrap(), Value::Int(10));
}

#[test]
fn invocation_argument_order() {
    let order = Value::native_fn_with_name("order", |_env: &mut Env, args: &[Value]| {
        Ok(Value::list(args.to_vec()))
    });
    let opts = base_options().with_global("order", order);
    assert_eq!(
        eval_source("(order 1 (+ 1 1) 3)", Some(opts)).unwrap(),
        Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn invocation_of_non_function_fails() {
    let err = eval("(1 2)").unwrap_err();
    assert!(matches!(
        err,
        SorrelError::NotInvokable { ref kind } if kind == "int"
    ));
    assert!(matches!(
        eval("(def k :kw) (k 1)"),
        Err(SorrelError::NotInvokable { .. })
    ));
}

#[test]
fn unresolved_symbol() {
    assert!(matches!(eval("missing"), Err(SorrelError::NotFound(_))));
}

#[test]
fn analysis_bakes_resolved_values() {
    let mut env = Env::new(EnvOptions::default().with_global("x", Value::Int(1)));
    let analyzer = BasicAnalyzer::default();
    let expr = analyzer.analyze(&mut env, &Value::symbol("x")).unwrap();

    env.set_global("x", Value::Int(2));

    // The node holds the value resolved at analysis time.
    assert_eq!(expr.eval(&mut env).unwrap(), Value::Int(1));
    // A fresh analysis sees the rebinding.
    let expr = analyzer.analyze(&mut env, &Value::symbol("x")).unwrap();
    assert_eq!(expr.eval(&mut env).unwrap(), Value::Int(2));
}

#[test]
fn def_value_is_computed_during_analysis() {
    let mut env = Env::new(base_options());
    let analyzer = BasicAnalyzer::default();
    let form = sorrel_core::read_source("(def x (+ 1 2))").unwrap().remove(0);

    // Analysis computes the bound value but does not store it.
    let expr = analyzer.analyze(&mut env, &form).unwrap();
    assert_eq!(env.resolve("x"), None);

    // Evaluation stores the pre-computed value.
    expr.eval(&mut env).unwrap();
    assert_eq!(env.resolve("x"), Some(Value::Int(3)));
}

#[test]
fn deep_recursion_reports_stack_overflow() {
    let boom = Value::native_fn_with_name("boom", |env: &mut Env, _args: &[Value]| {
        env.eval(&Value::list(vec![Value::symbol("boom")]))
    });
    let opts = EnvOptions::default()
        .with_global("boom", boom)
        .with_max_depth(16);
    let err = eval_source("(boom)", Some(opts)).unwrap_err();
    assert_eq!(err, SorrelError::stack_overflow(16));
}

#[test]
fn frames_pop_after_failed_invocations() {
    let fail = Value::native_fn_with_name("fail", |_env: &mut Env, _args: &[Value]| {
        Err(SorrelError::message("boom"))
    });
    let mut env = Env::new(EnvOptions::default().with_global("fail", fail));
    for _ in 0..3 {
        assert!(eval_source_in(&mut env, "(fail)").is_err());
    }
    assert_eq!(env.depth(), 0);
}

#[test]
fn locals_shadow_globals_within_a_frame() {
    let mut env = Env::new(EnvOptions::default().with_global("x", Value::Int(1)));
    env.push_frame("test".to_string(), vec![]).unwrap();
    env.set_local("x", Value::Int(2));
    assert_eq!(env.resolve("x"), Some(Value::Int(2)));
    env.pop_frame();
    assert_eq!(env.resolve("x"), Some(Value::Int(1)));
}

#[test]
fn forks_share_the_global_store() {
    let env = Env::default();
    let fork = env.fork();
    fork.set_global("shared", Value::Int(42));
    assert_eq!(env.resolve("shared"), Some(Value::Int(42)));
}

#[test]
fn go_returns_nil_and_defines_through_the_fork() {
    let mut env = Env::default();
    assert_eq!(
        eval_source_in(&mut env, "(go (def y 1))").unwrap(),
        Value::Nil
    );

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if env.resolve("y") == Some(Value::Int(1)) {
            break;
        }
        assert!(Instant::now() < deadline, "spawned def never became visible");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn go_runs_off_the_calling_thread() {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let notify = Value::native_fn_with_name("notify", move |_env: &mut Env, _args: &[Value]| {
        let _ = tx.send(std::thread::current().id());
        Ok(Value::Nil)
    });
    let opts = EnvOptions::default().with_global("notify", notify);
    assert_eq!(
        eval_source("(go (notify))", Some(opts)).unwrap(),
        Value::Nil
    );
    let spawned = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(spawned, std::thread::current().id());
}

#[test]
fn go_swallows_errors() {
    let mut env = Env::default();
    // The spawned form fails to resolve; the caller still gets nil and
    // a usable environment.
    assert_eq!(
        eval_source_in(&mut env, "(go (missing 1 2))").unwrap(),
        Value::Nil
    );
    assert_eq!(
        eval_source_in(&mut env, "(def ok 1) ok").unwrap(),
        Value::Int(1)
    );
}

#[test]
fn go_wrong_arity() {
    assert!(matches!(eval("(go)"), Err(SorrelError::InvalidForm { .. })));
    assert!(matches!(
        eval("(go 1 2)"),
        Err(SorrelError::InvalidForm { .. })
    ));
}

#[test]
fn custom_special_form() {
    let analyzer = BasicAnalyzer::default().with_special(
        "always-seven",
        Arc::new(|_env, _args| {
            Ok(sorrel_core::Expr::Const {
                value: Value::Int(7),
            })
        }),
    );
    let opts = EnvOptions::default().with_analyzer(Arc::new(analyzer));
    assert_eq!(
        eval_source("(always-seven 1 2 3)", Some(opts)).unwrap(),
        Value::Int(7)
    );
}

#[test]
fn removed_special_form_becomes_invocation() {
    let analyzer = BasicAnalyzer::default().without_special("do");
    let opts = EnvOptions::default().with_analyzer(Arc::new(analyzer));
    // With `do` gone the head is resolved like any symbol.
    assert!(matches!(
        eval_source("(do 1)", Some(opts)),
        Err(SorrelError::NotFound(_))
    ));
}
