//! Literal values and theme-derived expressions

use crate::node::DecodeError;
use crate::path::ThemePath;
use serde_json::{json, Map, Number, Value};

/// A concrete, theme-independent primitive value.
///
/// `Undefined` is kept distinct from `Null`: an absent value stays absent.
#[derive(Clone, Debug)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Undefined, Literal::Undefined) | (Literal::Null, Literal::Null) => true,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Number(a), Literal::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Literal::String(a), Literal::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Literal {
    /// Encode as JSON. `undefined` and non-finite numbers use marker objects.
    pub fn to_json(&self) -> Value {
        match self {
            Literal::Undefined => json!({ "__undefined": true }),
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => number_to_json(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    /// Decode a JSON primitive (or a literal marker object)
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Literal::Null),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Literal::Number),
            Value::String(s) => Some(Literal::String(s.clone())),
            Value::Object(map) if map.len() == 1 => {
                if map.get("__undefined") == Some(&Value::Bool(true)) {
                    return Some(Literal::Undefined);
                }
                match map.get("__number").and_then(Value::as_str) {
                    Some("NaN") => Some(Literal::Number(f64::NAN)),
                    Some("Infinity") => Some(Literal::Number(f64::INFINITY)),
                    Some("-Infinity") => Some(Literal::Number(f64::NEG_INFINITY)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_nan() {
        return json!({ "__number": "NaN" });
    }
    if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return json!({ "__number": text });
    }
    // Integral values print without a fraction so `0` stays `0`, not `0.0`
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// Unary operators that preserve a theme tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "!" => Some(UnaryOp::Not),
            "-" => Some(UnaryOp::Neg),
            "+" => Some(UnaryOp::Plus),
            _ => None,
        }
    }
}

/// Binary, comparison and logical operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    And,
    Or,
    Nullish,
}

impl BinaryOp {
    const ALL: [BinaryOp; 16] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::LtEq,
        BinaryOp::GtEq,
        BinaryOp::Eq,
        BinaryOp::NotEq,
        BinaryOp::StrictEq,
        BinaryOp::StrictNotEq,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Nullish,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Nullish => "??",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Short-circuiting operators (`&&`, `||`, `??`)
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish)
    }
}

/// An expression over theme reads, recorded when a theme value is combined with
/// other values inside a style function (`` `${theme.spacing.md}px` ``,
/// `theme.spacing.md * 2`, `dark ? theme.a : theme.b`).
///
/// The rewrite pass emits it as-is against the live theme.
#[derive(Clone, Debug, PartialEq)]
pub enum ThemeExpr {
    Ref(ThemePath),
    Lit(Literal),
    Unary(UnaryOp, Box<ThemeExpr>),
    Binary(BinaryOp, Box<ThemeExpr>, Box<ThemeExpr>),
    Cond(Box<ThemeExpr>, Box<ThemeExpr>, Box<ThemeExpr>),
    /// String concatenation of all parts (template literals, `String(x)`)
    Concat(Vec<ThemeExpr>),
}

impl ThemeExpr {
    pub fn unary(op: UnaryOp, arg: ThemeExpr) -> Self {
        ThemeExpr::Unary(op, Box::new(arg))
    }

    pub fn binary(op: BinaryOp, left: ThemeExpr, right: ThemeExpr) -> Self {
        ThemeExpr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn cond(test: ThemeExpr, then: ThemeExpr, otherwise: ThemeExpr) -> Self {
        ThemeExpr::Cond(Box::new(test), Box::new(then), Box::new(otherwise))
    }

    /// Distinct theme paths read by this expression, in first-read order
    pub fn paths(&self) -> Vec<ThemePath> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths(&self, out: &mut Vec<ThemePath>) {
        match self {
            ThemeExpr::Ref(path) => {
                if !out.contains(path) {
                    out.push(path.clone());
                }
            }
            ThemeExpr::Lit(_) => {}
            ThemeExpr::Unary(_, arg) => arg.collect_paths(out),
            ThemeExpr::Binary(_, left, right) => {
                left.collect_paths(out);
                right.collect_paths(out);
            }
            ThemeExpr::Cond(test, then, otherwise) => {
                test.collect_paths(out);
                then.collect_paths(out);
                otherwise.collect_paths(out);
            }
            ThemeExpr::Concat(parts) => parts.iter().for_each(|p| p.collect_paths(out)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ThemeExpr::Ref(path) => json!({ "ref": path.segments() }),
            ThemeExpr::Lit(lit) => json!({ "lit": lit.to_json() }),
            ThemeExpr::Unary(op, arg) => json!({ "op": op.symbol(), "arg": arg.to_json() }),
            ThemeExpr::Binary(op, left, right) => json!({
                "op": op.symbol(),
                "left": left.to_json(),
                "right": right.to_json(),
            }),
            ThemeExpr::Cond(test, then, otherwise) => json!({
                "if": test.to_json(),
                "then": then.to_json(),
                "else": otherwise.to_json(),
            }),
            ThemeExpr::Concat(parts) => {
                json!({ "concat": parts.iter().map(ThemeExpr::to_json).collect::<Vec<_>>() })
            }
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let map = value
            .as_object()
            .ok_or_else(|| DecodeError::new("theme expression must be an object"))?;

        if let Some(path) = map.get("ref") {
            return Ok(ThemeExpr::Ref(decode_path(path)?));
        }
        if let Some(lit) = map.get("lit") {
            return Literal::from_json(lit)
                .map(ThemeExpr::Lit)
                .ok_or_else(|| DecodeError::new("invalid literal in theme expression"));
        }
        if let Some(parts) = map.get("concat") {
            let parts = parts
                .as_array()
                .ok_or_else(|| DecodeError::new("concat must be an array"))?;
            return parts
                .iter()
                .map(ThemeExpr::from_json)
                .collect::<Result<_, _>>()
                .map(ThemeExpr::Concat);
        }
        if let Some(test) = map.get("if") {
            let then = field(map, "then")?;
            let otherwise = field(map, "else")?;
            return Ok(ThemeExpr::cond(
                ThemeExpr::from_json(test)?,
                ThemeExpr::from_json(then)?,
                ThemeExpr::from_json(otherwise)?,
            ));
        }

        let symbol = field(map, "op")?
            .as_str()
            .ok_or_else(|| DecodeError::new("operator must be a string"))?;
        if let Some(arg) = map.get("arg") {
            let op = UnaryOp::from_symbol(symbol)
                .ok_or_else(|| DecodeError::new(format!("unknown unary operator '{symbol}'")))?;
            return Ok(ThemeExpr::unary(op, ThemeExpr::from_json(arg)?));
        }
        let op = BinaryOp::from_symbol(symbol)
            .ok_or_else(|| DecodeError::new(format!("unknown binary operator '{symbol}'")))?;
        Ok(ThemeExpr::binary(
            op,
            ThemeExpr::from_json(field(map, "left")?)?,
            ThemeExpr::from_json(field(map, "right")?)?,
        ))
    }
}

fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Result<&'a Value, DecodeError> {
    map.get(name)
        .ok_or_else(|| DecodeError::new(format!("missing field '{name}'")))
}

pub(crate) fn decode_path(value: &Value) -> Result<ThemePath, DecodeError> {
    let segments = value
        .as_array()
        .ok_or_else(|| DecodeError::new("theme path must be an array"))?;
    segments
        .iter()
        .map(|s| {
            s.as_str()
                .map(str::to_string)
                .ok_or_else(|| DecodeError::new("theme path segments must be strings"))
        })
        .collect()
}
