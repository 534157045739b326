use std::fmt;
use std::sync::Arc;

use crate::env::Env;
use crate::error::SorrelError;
use crate::seq::List;

/// Runtime value. A closed sum so analysis and evaluation sites are
/// checked for exhaustiveness.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Keyword(String),
    Symbol(String),
    List(List),
    Func(Arc<NativeFn>),
}

impl Value {
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Value::Keyword(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Value::Str(text.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(List::from_vec(items))
    }

    pub fn native_fn(
        func: impl Fn(&mut Env, &[Value]) -> Result<Value, SorrelError> + Send + Sync + 'static,
    ) -> Self {
        Value::Func(Arc::new(NativeFn::new(func)))
    }

    pub fn native_fn_with_name(
        name: impl Into<String>,
        func: impl Fn(&mut Env, &[Value]) -> Result<Value, SorrelError> + Send + Sync + 'static,
    ) -> Self {
        Value::Func(Arc::new(NativeFn::with_name(name, func)))
    }

    /// Only `nil` and `false` are falsy. Numeric zero is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Func(_) => "function",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Char(c) => write!(f, "{}", char_literal(*c)),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Keyword(name) => write!(f, ":{}", name),
            Value::Symbol(name) => write!(f, "{}", name),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Func(func) => match func.debug_name() {
                Some(name) => write!(f, "#<fn {}>", name),
                None => write!(f, "#<fn>"),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn char_literal(c: char) -> String {
    match c {
        '\n' => "\\newline".to_string(),
        '\t' => "\\tab".to_string(),
        '\r' => "\\return".to_string(),
        ' ' => "\\space".to_string(),
        '\u{0008}' => "\\backspace".to_string(),
        '\u{000C}' => "\\formfeed".to_string(),
        '\0' => "\\null".to_string(),
        other => format!("\\{}", other),
    }
}

/// Host function callable from sorrel code. The boxed closure receives
/// the environment whose frame stack the invocation runs on.
pub struct NativeFn {
    func: Box<dyn Fn(&mut Env, &[Value]) -> Result<Value, SorrelError> + Send + Sync>,
    debug_name: Option<Arc<str>>,
}

impl NativeFn {
    pub fn new(
        func: impl Fn(&mut Env, &[Value]) -> Result<Value, SorrelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Box::new(func),
            debug_name: None,
        }
    }

    pub fn with_name(
        name: impl Into<String>,
        func: impl Fn(&mut Env, &[Value]) -> Result<Value, SorrelError> + Send + Sync + 'static,
    ) -> Self {
        let mut nf = Self::new(func);
        nf.debug_name = Some(name.into().into());
        nf
    }

    pub fn call(&self, env: &mut Env, args: &[Value]) -> Result<Value, SorrelError> {
        (self.func)(env, args)
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }
}
