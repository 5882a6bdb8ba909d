//! Global objects and native methods available to style code

use crate::error::{EvalError, Result};
use crate::interp::Interpreter;
use crate::value::{set_property, Value};
use indexmap::IndexMap;
use stylebake_core::{Literal, ThemeExpr, UnaryOp};
use stylebake_theme::Target;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    MathMax,
    MathMin,
    MathRound,
    MathFloor,
    MathCeil,
    MathAbs,
    MathPow,
    String,
    Number,
    Boolean,
    ObjectAssign,
    ObjectKeys,
    PlatformSelect,
    ArrayMap,
    ArrayFilter,
    ArrayJoin,
    ArrayIncludes,
    StringToUpperCase,
    StringToLowerCase,
    StringTrim,
    StringIncludes,
    StringStartsWith,
    StringEndsWith,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::MathMax => "Math.max",
            Builtin::MathMin => "Math.min",
            Builtin::MathRound => "Math.round",
            Builtin::MathFloor => "Math.floor",
            Builtin::MathCeil => "Math.ceil",
            Builtin::MathAbs => "Math.abs",
            Builtin::MathPow => "Math.pow",
            Builtin::String => "String",
            Builtin::Number => "Number",
            Builtin::Boolean => "Boolean",
            Builtin::ObjectAssign => "Object.assign",
            Builtin::ObjectKeys => "Object.keys",
            Builtin::PlatformSelect => "Platform.select",
            Builtin::ArrayMap => "Array.prototype.map",
            Builtin::ArrayFilter => "Array.prototype.filter",
            Builtin::ArrayJoin => "Array.prototype.join",
            Builtin::ArrayIncludes => "Array.prototype.includes",
            Builtin::StringToUpperCase => "String.prototype.toUpperCase",
            Builtin::StringToLowerCase => "String.prototype.toLowerCase",
            Builtin::StringTrim => "String.prototype.trim",
            Builtin::StringIncludes => "String.prototype.includes",
            Builtin::StringStartsWith => "String.prototype.startsWith",
            Builtin::StringEndsWith => "String.prototype.endsWith",
        }
    }
}

fn namespace(entries: &[(&str, Builtin)]) -> Value {
    Value::object(
        entries
            .iter()
            .map(|(name, builtin)| (name.to_string(), Value::native(*builtin, Value::Undefined)))
            .collect(),
    )
}

/// Global bindings for a build target
pub fn globals(target: Target) -> Vec<(&'static str, Value)> {
    let math = namespace(&[
        ("max", Builtin::MathMax),
        ("min", Builtin::MathMin),
        ("round", Builtin::MathRound),
        ("floor", Builtin::MathFloor),
        ("ceil", Builtin::MathCeil),
        ("abs", Builtin::MathAbs),
        ("pow", Builtin::MathPow),
    ]);
    let object = namespace(&[("assign", Builtin::ObjectAssign), ("keys", Builtin::ObjectKeys)]);

    let mut platform = IndexMap::new();
    platform.insert("OS".to_string(), Value::string(target.capabilities().os));
    platform.insert(
        "select".to_string(),
        Value::native(Builtin::PlatformSelect, Value::Undefined),
    );

    vec![
        ("Math", math),
        ("Object", object),
        ("Platform", Value::object(platform)),
        ("String", Value::native(Builtin::String, Value::Undefined)),
        ("Number", Value::native(Builtin::Number, Value::Undefined)),
        ("Boolean", Value::native(Builtin::Boolean, Value::Undefined)),
    ]
}

pub(crate) fn array_method(name: &str) -> Option<Builtin> {
    match name {
        "map" => Some(Builtin::ArrayMap),
        "filter" => Some(Builtin::ArrayFilter),
        "join" => Some(Builtin::ArrayJoin),
        "includes" => Some(Builtin::ArrayIncludes),
        _ => None,
    }
}

pub(crate) fn string_method(name: &str) -> Option<Builtin> {
    match name {
        "toUpperCase" => Some(Builtin::StringToUpperCase),
        "toLowerCase" => Some(Builtin::StringToLowerCase),
        "trim" => Some(Builtin::StringTrim),
        "includes" => Some(Builtin::StringIncludes),
        "startsWith" => Some(Builtin::StringStartsWith),
        "endsWith" => Some(Builtin::StringEndsWith),
        _ => None,
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Numeric argument; theme values cannot pass through numeric builtins
fn numeric(builtin: Builtin, value: &Value) -> Result<f64> {
    match value {
        Value::Tracked(expr) => Err(EvalError::on_expr(
            format!("theme value passed to {}", builtin.name()),
            expr,
        )),
        other => other.to_number(),
    }
}

fn numbers(builtin: Builtin, args: &[Value]) -> Result<Vec<f64>> {
    args.iter().map(|v| numeric(builtin, v)).collect()
}

/// JavaScript `Math.round`: halves round towards +Infinity
fn js_round(n: f64) -> f64 {
    (n + 0.5).floor()
}

pub(crate) fn call(interp: &Interpreter, builtin: Builtin, receiver: &Value, args: Vec<Value>) -> Result<Value> {
    match builtin {
        Builtin::MathMax => Ok(Value::Number(
            numbers(builtin, &args)?
                .into_iter()
                .fold(f64::NEG_INFINITY, |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) }),
        )),
        Builtin::MathMin => Ok(Value::Number(
            numbers(builtin, &args)?
                .into_iter()
                .fold(f64::INFINITY, |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) }),
        )),
        Builtin::MathRound => numeric(builtin, &arg(&args, 0)).map(|n| Value::Number(js_round(n))),
        Builtin::MathFloor => numeric(builtin, &arg(&args, 0)).map(|n| Value::Number(n.floor())),
        Builtin::MathCeil => numeric(builtin, &arg(&args, 0)).map(|n| Value::Number(n.ceil())),
        Builtin::MathAbs => numeric(builtin, &arg(&args, 0)).map(|n| Value::Number(n.abs())),
        Builtin::MathPow => {
            let base = numeric(builtin, &arg(&args, 0))?;
            let exp = numeric(builtin, &arg(&args, 1))?;
            Ok(Value::Number(base.powf(exp)))
        }

        Builtin::String => match arg(&args, 0) {
            Value::Tracked(expr) => Ok(Value::Tracked(ThemeExpr::Concat(vec![expr]))),
            _ if args.is_empty() => Ok(Value::string("")),
            other => other.to_js_string().map(Value::string),
        },
        Builtin::Number => match arg(&args, 0) {
            Value::Tracked(expr) => Ok(Value::Tracked(ThemeExpr::unary(UnaryOp::Plus, expr))),
            _ if args.is_empty() => Ok(Value::Number(0.0)),
            other => other.to_number().map(Value::Number),
        },
        Builtin::Boolean => match arg(&args, 0) {
            Value::Tracked(expr) => Ok(Value::Tracked(ThemeExpr::unary(
                UnaryOp::Not,
                ThemeExpr::unary(UnaryOp::Not, expr),
            ))),
            other => other.truthy().map(Value::Bool),
        },

        Builtin::ObjectAssign => {
            let target = arg(&args, 0);
            let Value::Object(map) = &target else {
                return Err(EvalError::Type(format!(
                    "Object.assign target must be an object, got {}",
                    target.type_name()
                )));
            };
            for source in args.iter().skip(1) {
                let mut entries = IndexMap::new();
                interp.spread_into(&mut entries, source)?;
                let mut map = map.borrow_mut();
                for (key, value) in entries {
                    set_property(&mut map, key, value);
                }
            }
            Ok(target)
        }
        Builtin::ObjectKeys => {
            let keys: Vec<String> = match arg(&args, 0) {
                Value::Object(map) => map.borrow().keys().cloned().collect(),
                Value::Array(items) => (0..items.borrow().len()).map(|i| i.to_string()).collect(),
                Value::Theme(node) => node.keys(),
                Value::Tracked(expr) => {
                    return Err(EvalError::on_expr("Object.keys applied to a theme leaf", &expr))
                }
                Value::Props => return Err(EvalError::PropsDependency),
                _ => Vec::new(),
            };
            Ok(Value::array(keys.into_iter().map(Value::string).collect()))
        }

        Builtin::PlatformSelect => {
            let specifics = arg(&args, 0);
            let Value::Object(map) = &specifics else {
                return Err(EvalError::Type("Platform.select expects an object".into()));
            };
            let map = map.borrow();
            let chosen = interp
                .capabilities()
                .select_keys
                .iter()
                .find_map(|key| map.get(*key).cloned());
            Ok(chosen.unwrap_or(Value::Undefined))
        }

        Builtin::ArrayMap | Builtin::ArrayFilter => {
            let Value::Array(items) = receiver else {
                return Err(EvalError::Type(format!("{} called on a non-array", builtin.name())));
            };
            let callback = arg(&args, 0);
            let items = items.borrow().clone();
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let result = interp.call(&callback, vec![item.clone(), Value::Number(index as f64)])?;
                if builtin == Builtin::ArrayMap {
                    out.push(result);
                } else if result.truthy()? {
                    out.push(item);
                }
            }
            Ok(Value::array(out))
        }
        Builtin::ArrayJoin => {
            let Value::Array(items) = receiver else {
                return Err(EvalError::Type("join called on a non-array".into()));
            };
            let separator = match arg(&args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_js_string()?,
            };
            join(&items.borrow(), &separator)
        }
        Builtin::ArrayIncludes => {
            let Value::Array(items) = receiver else {
                return Err(EvalError::Type("includes called on a non-array".into()));
            };
            let needle = arg(&args, 0);
            if let Value::Tracked(expr) = &needle {
                return Err(EvalError::on_expr("theme value used as a lookup key", expr));
            }
            let found = items.borrow().iter().any(|item| {
                item.strict_eq(&needle)
                    || matches!((item, &needle), (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan())
            });
            Ok(Value::Bool(found))
        }

        Builtin::StringToUpperCase
        | Builtin::StringToLowerCase
        | Builtin::StringTrim
        | Builtin::StringIncludes
        | Builtin::StringStartsWith
        | Builtin::StringEndsWith => {
            let Value::String(text) = receiver else {
                return Err(EvalError::Type(format!("{} called on a non-string", builtin.name())));
            };
            let needle = || -> Result<String> {
                match arg(&args, 0) {
                    Value::Tracked(expr) => Err(EvalError::on_expr(
                        format!("theme value passed to {}", builtin.name()),
                        &expr,
                    )),
                    other => other.to_js_string(),
                }
            };
            Ok(match builtin {
                Builtin::StringToUpperCase => Value::string(text.to_uppercase()),
                Builtin::StringToLowerCase => Value::string(text.to_lowercase()),
                Builtin::StringTrim => Value::string(text.trim()),
                Builtin::StringIncludes => Value::Bool(text.contains(needle()?.as_str())),
                Builtin::StringStartsWith => Value::Bool(text.starts_with(needle()?.as_str())),
                _ => Value::Bool(text.ends_with(needle()?.as_str())),
            })
        }
    }
}

/// `join` keeps theme values alive as a concatenation
fn join(items: &[Value], separator: &str) -> Result<Value> {
    if !items.iter().any(|v| matches!(v, Value::Tracked(_))) {
        let parts = items
            .iter()
            .map(|v| if v.is_nullish() { Ok(String::new()) } else { v.to_js_string() })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Value::string(parts.join(separator)));
    }

    let mut parts = Vec::with_capacity(items.len() * 2);
    for (index, item) in items.iter().enumerate() {
        if index > 0 && !separator.is_empty() {
            parts.push(ThemeExpr::Lit(Literal::String(separator.to_string())));
        }
        match item {
            Value::Tracked(expr) => parts.push(expr.clone()),
            v if v.is_nullish() => {}
            v => parts.push(ThemeExpr::Lit(Literal::String(v.to_js_string()?))),
        }
    }
    Ok(Value::Tracked(ThemeExpr::Concat(parts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::EvalOptions;
    use crate::ast::Module;
    use stylebake_core::ThemePath;

    fn interp(target: Target) -> Interpreter {
        Interpreter::new(
            &Module::default(),
            EvalOptions {
                target,
                ..EvalOptions::default()
            },
        )
    }

    fn tracked(segments: &[&str]) -> Value {
        Value::Tracked(ThemeExpr::Ref(ThemePath::from(segments)))
    }

    #[test]
    fn test_math_rounding_matches_javascript() {
        let i = interp(Target::Web);
        let round = |n: f64| call(&i, Builtin::MathRound, &Value::Undefined, vec![Value::Number(n)]).unwrap();
        assert!(matches!(round(2.5), Value::Number(n) if n == 3.0));
        assert!(matches!(round(-2.5), Value::Number(n) if n == -2.0));
    }

    #[test]
    fn test_numeric_builtins_reject_theme_values() {
        let i = interp(Target::Web);
        let err = call(&i, Builtin::MathMax, &Value::Undefined, vec![tracked(&["spacing", "md"]), Value::Number(4.0)])
            .unwrap_err();
        assert_eq!(err.theme_path().unwrap().to_string(), "spacing.md");
    }

    #[test]
    fn test_string_of_theme_value_is_concat() {
        let i = interp(Target::Web);
        let value = call(&i, Builtin::String, &Value::Undefined, vec![tracked(&["radii", "md"])]).unwrap();
        assert!(matches!(value, Value::Tracked(ThemeExpr::Concat(parts)) if parts.len() == 1));
    }

    #[test]
    fn test_platform_select_uses_target_priority() {
        let mut specifics = IndexMap::new();
        specifics.insert("default".to_string(), Value::Number(1.0));
        specifics.insert("native".to_string(), Value::Number(2.0));
        specifics.insert("web".to_string(), Value::Number(3.0));
        let specifics = Value::object(specifics);

        let web = call(&interp(Target::Web), Builtin::PlatformSelect, &Value::Undefined, vec![specifics.clone()]).unwrap();
        let ios = call(&interp(Target::Ios), Builtin::PlatformSelect, &Value::Undefined, vec![specifics]).unwrap();
        assert!(matches!(web, Value::Number(n) if n == 3.0));
        assert!(matches!(ios, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn test_join_with_theme_values() {
        let items = vec![tracked(&["spacing", "sm"]), Value::string("solid"), tracked(&["colors", "border"])];
        let value = join(&items, " ").unwrap();
        let Value::Tracked(ThemeExpr::Concat(parts)) = value else {
            panic!("expected concat");
        };
        assert_eq!(parts.len(), 5);
    }
}
