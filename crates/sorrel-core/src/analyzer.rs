use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::Value;
use crate::env::Env;
use crate::error::SorrelError;
use crate::eval::Expr;
use crate::seq::{List, Seq};

/// Turns one form into one executable expression node.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, env: &mut Env, form: &Value) -> Result<Expr, SorrelError>;
}

/// Parses one special-form invocation. Receives the tail of the list
/// raw; each parser controls when (or whether) its operands are
/// analyzed and evaluated.
pub type SpecialParser = Arc<dyn Fn(&mut Env, &List) -> Result<Expr, SorrelError> + Send + Sync>;

/// Analyzer with a replaceable table of named special forms.
pub struct BasicAnalyzer {
    special_forms: HashMap<String, SpecialParser>,
}

impl Default for BasicAnalyzer {
    fn default() -> Self {
        let mut special_forms: HashMap<String, SpecialParser> = HashMap::new();
        special_forms.insert("quote".to_string(), Arc::new(parse_quote));
        special_forms.insert("def".to_string(), Arc::new(parse_def));
        special_forms.insert("if".to_string(), Arc::new(parse_if));
        special_forms.insert("do".to_string(), Arc::new(parse_do));
        special_forms.insert("go".to_string(), Arc::new(parse_go));
        Self { special_forms }
    }
}

impl BasicAnalyzer {
    /// Analyzer with no special forms at all; every list is a plain
    /// invocation.
    pub fn empty() -> Self {
        Self {
            special_forms: HashMap::new(),
        }
    }

    pub fn with_special(mut self, name: impl Into<String>, parser: SpecialParser) -> Self {
        self.special_forms.insert(name.into(), parser);
        self
    }

    pub fn without_special(mut self, name: &str) -> Self {
        self.special_forms.remove(name);
        self
    }

    fn analyze_seq(&self, env: &mut Env, list: &List) -> Result<Expr, SorrelError> {
        let first = list.first()?;

        // A symbol in call position may name a special form, whose
        // parser owns the raw tail.
        if let Value::Symbol(name) = &first {
            if let Some(parse) = self.special_forms.get(name.as_str()) {
                let tail = list.next()?;
                return parse(env, &tail);
            }
        }

        let target = self.analyze(env, &first)?;
        let mut args = Vec::with_capacity(list.len().saturating_sub(1));
        for item in list.iter().skip(1) {
            args.push(self.analyze(env, item)?);
        }
        Ok(Expr::Invoke {
            name: invocation_name(&first),
            target: Box::new(target),
            args,
        })
    }
}

impl Analyzer for BasicAnalyzer {
    fn analyze(&self, env: &mut Env, form: &Value) -> Result<Expr, SorrelError> {
        match form {
            // Resolution bakes the symbol's current value into the
            // node; later rebinding does not affect this expression.
            Value::Symbol(name) => match env.resolve(name) {
                Some(value) => Ok(Expr::Const { value }),
                None => Err(SorrelError::not_found(name.clone())),
            },
            Value::List(list) => {
                if list.count()? == 0 {
                    return Ok(Expr::Const {
                        value: form.clone(),
                    });
                }
                self.analyze_seq(env, list)
            }
            other => Ok(Expr::Const {
                value: other.clone(),
            }),
        }
    }
}

fn invocation_name(form: &Value) -> String {
    match form {
        Value::Symbol(name) => name.clone(),
        other => other.to_string(),
    }
}

pub fn parse_quote(_env: &mut Env, args: &List) -> Result<Expr, SorrelError> {
    let count = args.count()?;
    if count != 1 {
        return Err(SorrelError::invalid_form(format!(
            "quote requires exactly 1 argument, got {}",
            count
        )));
    }
    Ok(Expr::Quote {
        form: args.first()?,
    })
}

pub fn parse_def(env: &mut Env, args: &List) -> Result<Expr, SorrelError> {
    let count = args.count()?;
    if count != 2 {
        return Err(SorrelError::invalid_form(format!(
            "def requires exactly 2 arguments, got {}",
            count
        )));
    }

    let first = args.first()?;
    let name = match &first {
        Value::Symbol(name) => name.clone(),
        other => {
            return Err(SorrelError::invalid_form(format!(
                "first argument to def must be a symbol, not '{}'",
                other.type_name()
            )))
        }
    };

    // The bound value is computed now, at analysis time, through the
    // full pipeline.
    let second = args.next()?.first()?;
    let value = env.eval(&second)?;

    Ok(Expr::Def { name, value })
}

pub fn parse_if(_env: &mut Env, args: &List) -> Result<Expr, SorrelError> {
    let count = args.count()?;
    if count != 2 && count != 3 {
        return Err(SorrelError::invalid_form(format!(
            "if requires 2 or 3 arguments, got {}",
            count
        )));
    }

    let test = args.first()?;
    let rest = args.next()?;
    let then = rest.first()?;
    let els = if count == 3 {
        rest.next()?.first()?
    } else {
        Value::Nil
    };

    Ok(Expr::If { test, then, els })
}

pub fn parse_do(_env: &mut Env, args: &List) -> Result<Expr, SorrelError> {
    Ok(Expr::Do {
        forms: args.iter().cloned().collect(),
    })
}

pub fn parse_go(_env: &mut Env, args: &List) -> Result<Expr, SorrelError> {
    let count = args.count()?;
    if count != 1 {
        return Err(SorrelError::invalid_form(format!(
            "go requires exactly 1 argument, got {}",
            count
        )));
    }
    Ok(Expr::Go {
        form: args.first()?,
    })
}
