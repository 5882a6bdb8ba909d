//! Runtime values of the shadow interpreter

use crate::ast::Function;
use crate::builtins::Builtin;
use crate::error::{EvalError, Result};
use crate::proxy::ThemeNode;
use crate::scope::Env;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use stylebake_core::{insertion_point, Literal, ThemeExpr, ThemePath};

pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Set an object property. New array-index keys are placed in ascending order
/// ahead of all other keys; existing keys keep their position.
pub fn set_property(map: &mut IndexMap<String, Value>, key: String, value: Value) {
    if let Some(slot) = map.get_mut(&key) {
        *slot = value;
        return;
    }
    match insertion_point(map.keys(), &key) {
        Some(at) => {
            map.shift_insert(at, key, value);
        }
        None => {
            map.insert(key, value);
        }
    }
}

/// A value produced while shadow-executing a style module.
///
/// Besides the usual JavaScript values there are three extraction-specific kinds:
/// [`Value::Theme`] (an object node of the instrumented theme), [`Value::Tracked`]
/// (a primitive derived from theme reads) and [`Value::Props`] (the opaque
/// component props handed to props functions).
#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<Callable>),
    Theme(ThemeNode),
    Tracked(ThemeExpr),
    Props,
    /// Module binding that could not be evaluated statically
    Opaque(Rc<str>),
}

/// Something that can be called
pub enum Callable {
    Closure { func: Rc<Function>, env: Env },
    Native { builtin: Builtin, receiver: Value },
    /// Calls both and deep-merges the second result over the first
    Merged(Value, Value),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Closure { func, .. } => {
                write!(f, "[Function {}]", func.name.as_deref().unwrap_or("(anonymous)"))
            }
            Callable::Native { builtin, .. } => write!(f, "[Native {builtin:?}]"),
            Callable::Merged(..) => f.write_str("[Function merged]"),
        }
    }
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn object(map: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(map)))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn closure(func: Rc<Function>, env: Env) -> Self {
        Value::Function(Rc::new(Callable::Closure { func, env }))
    }

    pub fn native(builtin: Builtin, receiver: Value) -> Self {
        Value::Function(Rc::new(Callable::Native { builtin, receiver }))
    }

    pub fn merged(base: Value, extension: Value) -> Self {
        Value::Function(Rc::new(Callable::Merged(base, extension)))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Short name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Theme(_) => "theme object",
            Value::Tracked(_) => "theme value",
            Value::Props => "props",
            Value::Opaque(_) => "opaque binding",
        }
    }

    /// The concrete primitive, if this is one
    pub fn as_literal(&self) -> Option<Literal> {
        match self {
            Value::Undefined => Some(Literal::Undefined),
            Value::Null => Some(Literal::Null),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => Some(Literal::Number(*n)),
            Value::String(s) => Some(Literal::String(s.to_string())),
            _ => None,
        }
    }

    pub fn from_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::string(s),
        }
    }

    /// First theme path behind a tracked value or theme node
    pub fn theme_path(&self) -> Option<ThemePath> {
        match self {
            Value::Tracked(expr) => expr.paths().into_iter().next(),
            Value::Theme(node) => Some(node.path().clone()),
            _ => None,
        }
    }

    /// Operand form for building a theme expression
    pub fn theme_operand(&self) -> Result<ThemeExpr> {
        if let Some(lit) = self.as_literal() {
            return Ok(ThemeExpr::Lit(lit));
        }
        match self {
            Value::Tracked(expr) => Ok(expr.clone()),
            Value::Theme(node) => Err(EvalError::unresolvable(
                "theme object combined with another value",
                Some(node.path().clone()),
            )),
            Value::Props => Err(EvalError::PropsDependency),
            Value::Opaque(name) => Err(EvalError::OpaqueBinding(name.to_string())),
            other => Err(EvalError::unresolvable(
                format!("theme value combined with a non-primitive {}", other.type_name()),
                None,
            )),
        }
    }

    /// JavaScript truthiness
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Value::Undefined | Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0 && !n.is_nan()),
            Value::String(s) => Ok(!s.is_empty()),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Theme(_) => Ok(true),
            Value::Tracked(expr) => Err(EvalError::on_expr(
                "theme value used as a branch condition",
                expr,
            )),
            Value::Props => Err(EvalError::PropsDependency),
            Value::Opaque(name) => Err(EvalError::OpaqueBinding(name.to_string())),
        }
    }

    /// JavaScript `ToNumber` for concrete values
    pub fn to_number(&self) -> Result<f64> {
        match self {
            Value::Undefined => Ok(f64::NAN),
            Value::Null => Ok(0.0),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Ok(*n),
            Value::String(s) => Ok(string_to_number(s)),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => Ok(f64::NAN),
            Value::Theme(node) => Err(EvalError::unresolvable(
                "theme object used as a number",
                Some(node.path().clone()),
            )),
            Value::Tracked(expr) => Err(EvalError::on_expr("theme value used as a number", expr)),
            Value::Props => Err(EvalError::PropsDependency),
            Value::Opaque(name) => Err(EvalError::OpaqueBinding(name.to_string())),
        }
    }

    /// JavaScript `ToString` for concrete values
    pub fn to_js_string(&self) -> Result<String> {
        match self {
            Value::Undefined => Ok("undefined".to_string()),
            Value::Null => Ok("null".to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(number_to_string(*n)),
            Value::String(s) => Ok(s.to_string()),
            Value::Array(items) => {
                let parts = items
                    .borrow()
                    .iter()
                    .map(|v| if v.is_nullish() { Ok(String::new()) } else { v.to_js_string() })
                    .collect::<Result<Vec<_>>>()?;
                Ok(parts.join(","))
            }
            Value::Object(_) => Ok("[object Object]".to_string()),
            Value::Function(_) => Ok("function".to_string()),
            Value::Theme(node) => Err(EvalError::unresolvable(
                "theme object used as a string",
                Some(node.path().clone()),
            )),
            Value::Tracked(expr) => Err(EvalError::on_expr("theme value used as a string", expr)),
            Value::Props => Err(EvalError::PropsDependency),
            Value::Opaque(name) => Err(EvalError::OpaqueBinding(name.to_string())),
        }
    }

    /// `typeof`
    pub fn type_of(&self) -> Result<&'static str> {
        match self {
            Value::Undefined => Ok("undefined"),
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Theme(_) => Ok("object"),
            Value::Bool(_) => Ok("boolean"),
            Value::Number(_) => Ok("number"),
            Value::String(_) => Ok("string"),
            Value::Function(_) => Ok("function"),
            Value::Tracked(expr) => Err(EvalError::on_expr("typeof applied to a theme value", expr)),
            Value::Props => Err(EvalError::PropsDependency),
            Value::Opaque(name) => Err(EvalError::OpaqueBinding(name.to_string())),
        }
    }

    /// `===` on concrete values (objects compare by identity)
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==` on concrete values
    pub fn loose_eq(&self, other: &Value) -> Result<bool> {
        if self.is_nullish() || other.is_nullish() {
            return Ok(self.is_nullish() && other.is_nullish());
        }
        match (self, other) {
            (Value::Number(_) | Value::Bool(_) | Value::String(_), Value::Number(_) | Value::Bool(_))
            | (Value::Number(_) | Value::Bool(_), Value::String(_)) => {
                Ok(self.to_number()? == other.to_number()?)
            }
            _ => Ok(self.strict_eq(other)),
        }
    }

    /// Build a value from a concrete JSON document (used for concrete themes)
    pub fn from_json(json: &serde_json::Value) -> Self {
        if let Some(lit) = Literal::from_json(json) {
            return Value::from_literal(&lit);
        }
        match json {
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    set_property(&mut out, k.clone(), Value::from_json(v));
                }
                Value::object(out)
            }
            _ => Value::Undefined,
        }
    }

    /// Concrete JSON form; `None` when the value holds functions or theme values
    pub fn to_json(&self) -> Option<serde_json::Value> {
        if let Some(lit) = self.as_literal() {
            return Some(lit.to_json());
        }
        match self {
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(Value::to_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Value::Object(map) => map
                .borrow()
                .iter()
                .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object),
            _ => None,
        }
    }
}

/// JavaScript number-to-string conversion for the values style code produces
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_formatting() {
        assert_eq!(number_to_string(16.0), "16");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(Value::string(" 12 ").to_number().unwrap(), 12.0);
        assert!(Value::string("12px").to_number().unwrap().is_nan());
        assert_eq!(Value::Bool(true).to_js_string().unwrap(), "true");
        let arr = Value::array(vec![Value::Number(1.0), Value::Null, Value::string("a")]);
        assert_eq!(arr.to_js_string().unwrap(), "1,,a");
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Null.loose_eq(&Value::Undefined).unwrap());
        assert!(Value::string("1").loose_eq(&Value::Number(1.0)).unwrap());
        assert!(!Value::Null.loose_eq(&Value::Number(0.0)).unwrap());
    }

    #[test]
    fn test_json_conversion_keeps_order() {
        let doc = json!({ "b": 1, "a": [true, null], "c": { "__undefined": true } });
        let value = Value::from_json(&doc);
        assert!(matches!(value.clone(), Value::Object(map) if matches!(map.borrow()["c"], Value::Undefined)));
        assert_eq!(value.to_json().unwrap(), doc);
    }

    #[test]
    fn test_tracked_values_refuse_coercion() {
        let tracked = Value::Tracked(ThemeExpr::Ref(ThemePath::from(&["spacing", "md"][..])));
        let err = tracked.to_number().unwrap_err();
        assert_eq!(err.theme_path().map(ToString::to_string).as_deref(), Some("spacing.md"));
        assert!(tracked.truthy().is_err());
        assert!(tracked.type_of().is_err());
    }

    #[test]
    fn test_index_keys_are_ordered_first() {
        let mut map = IndexMap::new();
        for (key, value) in [("b", 1.0), ("2", 2.0), ("1", 3.0), ("a", 4.0), ("01", 5.0)] {
            set_property(&mut map, key.to_string(), Value::Number(value));
        }
        set_property(&mut map, "b".to_string(), Value::Number(6.0));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["1", "2", "b", "a", "01"]);
        assert!(matches!(map["b"], Value::Number(n) if n == 6.0));
    }
}
