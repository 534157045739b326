use crate::ast::Value;
use crate::concurrency;
use crate::env::Env;
use crate::error::SorrelError;

/// Executable expression node. Built once by the analyzer, read-only
/// afterwards; evaluation never revisits a node.
#[derive(Clone)]
pub enum Expr {
    /// Yields the held value unchanged.
    Const { value: Value },

    /// Yields the held form without evaluating it.
    Quote { form: Value },

    /// Binds a pre-computed value into the global store and yields the
    /// bound name as a symbol.
    Def { name: String, value: Value },

    /// Evaluates `test`, then exactly one of the two branch forms.
    /// Branches run through the full pipeline, not as baked nodes.
    If { test: Value, then: Value, els: Value },

    /// Evaluates each form in order, yielding the last result (`nil`
    /// when empty). The first failure aborts the rest.
    Do { forms: Vec<Value> },

    /// Evaluates the target, then each argument left to right, and
    /// applies the target inside a fresh stack frame.
    Invoke {
        name: String,
        target: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Forks the environment and evaluates the held form on a detached
    /// thread. Yields `nil` immediately; the spawned result is
    /// discarded.
    Go { form: Value },
}

impl Expr {
    pub fn eval(&self, env: &mut Env) -> Result<Value, SorrelError> {
        match self {
            Expr::Const { value } => Ok(value.clone()),

            Expr::Quote { form } => Ok(form.clone()),

            Expr::Def { name, value } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(SorrelError::invalid_bind_name(name));
                }
                env.set_global(name, value.clone());
                Ok(Value::Symbol(name.to_string()))
            }

            Expr::If { test, then, els } => {
                let test = env.eval(test)?;
                if test.is_truthy() {
                    env.eval(then)
                } else {
                    env.eval(els)
                }
            }

            Expr::Do { forms } => {
                let mut result = Value::Nil;
                for form in forms {
                    result = env.eval(form)?;
                }
                Ok(result)
            }

            Expr::Invoke { name, target, args } => {
                let callee = target.eval(env)?;
                let func = match callee {
                    Value::Func(func) => func,
                    other => return Err(SorrelError::not_invokable(other.type_name())),
                };

                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.eval(env)?);
                }

                env.push_frame(name.clone(), values.clone())?;
                let result = func.call(env, &values);
                env.pop_frame();
                result
            }

            Expr::Go { form } => {
                let child = env.fork();
                concurrency::spawn_eval(child, form.clone());
                Ok(Value::Nil)
            }
        }
    }
}
