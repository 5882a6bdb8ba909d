//! Canonical extracted style trees

use crate::expr::{decode_path, Literal, ThemeExpr};
use crate::path::ThemePath;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Keys that mark a JSON object as an encoded node rather than an author object
const MARKER_KEYS: [&str; 7] = [
    "themeRef",
    "themeRefs",
    "expr",
    "variantTable",
    "deferred",
    "__undefined",
    "__number",
];

const OBJECT_ESCAPE: &str = "__object";

/// Error decoding a tree from its JSON wire form
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid extracted tree: {message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A leaf whose value is read from the live theme.
///
/// A plain reference has one path and no expression. A derived reference (one path
/// combined with literals) or a multi-path reference carries the expression that
/// reproduces the value from the theme.
#[derive(Clone, Debug, PartialEq)]
pub struct ThemeRef {
    pub paths: Vec<ThemePath>,
    pub expr: Option<ThemeExpr>,
}

impl ThemeRef {
    /// A direct read of `path`
    pub fn path(path: ThemePath) -> Self {
        Self {
            paths: vec![path],
            expr: None,
        }
    }

    /// A value computed from theme reads. A bare read collapses to [`ThemeRef::path`].
    pub fn derived(expr: ThemeExpr) -> Self {
        match expr {
            ThemeExpr::Ref(path) => Self::path(path),
            expr => Self {
                paths: expr.paths(),
                expr: Some(expr),
            },
        }
    }

    /// True when more than one distinct theme path contributes to the value
    pub fn is_multi_path(&self) -> bool {
        self.paths.len() > 1
    }

    /// The expression reproducing this value
    pub fn to_expr(&self) -> ThemeExpr {
        match (&self.expr, self.paths.first()) {
            (Some(expr), _) => expr.clone(),
            (None, Some(path)) => ThemeExpr::Ref(path.clone()),
            (None, None) => ThemeExpr::Lit(Literal::Undefined),
        }
    }
}

/// Per-key expansion of an iteration marker
#[derive(Clone, Debug, PartialEq)]
pub struct VariantTable {
    /// Enumeration id, e.g. `intents` or `sizes.alert`
    pub enumeration: String,
    /// One case per enumeration key, in enumeration order
    pub cases: IndexMap<String, ExtractedNode>,
}

/// Canonical, theme-independent description of the value a style function produces.
///
/// Every leaf is a [`Literal`] or a [`ThemeRef`]; nothing executable survives.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractedNode {
    Literal(Literal),
    ThemeRef(ThemeRef),
    Object(IndexMap<String, ExtractedNode>),
    List(Vec<ExtractedNode>),
    VariantTable(VariantTable),
    /// A props function that never reads its props; the body is its result
    Deferred(Box<ExtractedNode>),
}

impl ExtractedNode {
    pub fn literal(lit: Literal) -> Self {
        ExtractedNode::Literal(lit)
    }

    pub fn theme_ref(path: ThemePath) -> Self {
        ExtractedNode::ThemeRef(ThemeRef::path(path))
    }

    /// True when the subtree contains no theme reads and no deferred functions
    pub fn is_static(&self) -> bool {
        match self {
            ExtractedNode::Literal(_) => true,
            ExtractedNode::ThemeRef(_) | ExtractedNode::Deferred(_) => false,
            ExtractedNode::Object(map) => map.values().all(ExtractedNode::is_static),
            ExtractedNode::List(items) => items.iter().all(ExtractedNode::is_static),
            ExtractedNode::VariantTable(table) => table.cases.values().all(ExtractedNode::is_static),
        }
    }

    /// Follow object keys, list indices, table cases and deferred bodies
    pub fn get(&self, keys: &[&str]) -> Option<&ExtractedNode> {
        let Some((first, rest)) = keys.split_first() else {
            return Some(self);
        };
        let next = match self {
            ExtractedNode::Object(map) => map.get(*first),
            ExtractedNode::List(items) => first.parse::<usize>().ok().and_then(|i| items.get(i)),
            ExtractedNode::VariantTable(table) => table.cases.get(*first),
            ExtractedNode::Deferred(body) => return body.get(keys),
            ExtractedNode::Literal(_) | ExtractedNode::ThemeRef(_) => None,
        }?;
        next.get(rest)
    }

    /// All theme references in depth-first order
    pub fn theme_refs(&self) -> Vec<&ThemeRef> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a ThemeRef>) {
        match self {
            ExtractedNode::Literal(_) => {}
            ExtractedNode::ThemeRef(r) => out.push(r),
            ExtractedNode::Object(map) => map.values().for_each(|n| n.collect_refs(out)),
            ExtractedNode::List(items) => items.iter().for_each(|n| n.collect_refs(out)),
            ExtractedNode::VariantTable(table) => {
                table.cases.values().for_each(|n| n.collect_refs(out))
            }
            ExtractedNode::Deferred(body) => body.collect_refs(out),
        }
    }

    /// Encode to the JSON wire form used by the cache document
    pub fn to_json(&self) -> Value {
        match self {
            ExtractedNode::Literal(lit) => lit.to_json(),
            ExtractedNode::ThemeRef(r) => theme_ref_to_json(r),
            ExtractedNode::Object(map) => {
                let encoded: Map<String, Value> =
                    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                let collides = map
                    .keys()
                    .any(|k| k == OBJECT_ESCAPE || MARKER_KEYS.contains(&k.as_str()));
                if collides {
                    json!({ OBJECT_ESCAPE: encoded })
                } else {
                    Value::Object(encoded)
                }
            }
            ExtractedNode::List(items) => {
                Value::Array(items.iter().map(ExtractedNode::to_json).collect())
            }
            ExtractedNode::VariantTable(table) => {
                let cases: Map<String, Value> = table
                    .cases
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                json!({ "variantTable": { "enumeration": table.enumeration, "cases": cases } })
            }
            ExtractedNode::Deferred(body) => json!({ "deferred": body.to_json() }),
        }
    }

    /// Decode from the JSON wire form
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(ExtractedNode::from_json)
                .collect::<Result<_, _>>()
                .map(ExtractedNode::List),
            Value::Object(map) => decode_object(map),
            primitive => Literal::from_json(primitive)
                .map(ExtractedNode::Literal)
                .ok_or_else(|| DecodeError::new("unsupported primitive")),
        }
    }
}

fn theme_ref_to_json(r: &ThemeRef) -> Value {
    let mut out = Map::new();
    match r.paths.as_slice() {
        [single] => {
            out.insert("themeRef".into(), json!(single.segments()));
        }
        many => {
            let paths: Vec<Value> = many.iter().map(|p| json!(p.segments())).collect();
            out.insert("themeRefs".into(), Value::Array(paths));
        }
    }
    if let Some(expr) = &r.expr {
        out.insert("expr".into(), expr.to_json());
    }
    Value::Object(out)
}

fn decode_object(map: &Map<String, Value>) -> Result<ExtractedNode, DecodeError> {
    if map.len() == 1 {
        if let Some(inner) = map.get(OBJECT_ESCAPE) {
            let inner = inner
                .as_object()
                .ok_or_else(|| DecodeError::new("escaped object must be an object"))?;
            return decode_fields(inner);
        }
        if let Some(body) = map.get("deferred") {
            return Ok(ExtractedNode::Deferred(Box::new(ExtractedNode::from_json(body)?)));
        }
        if let Some(table) = map.get("variantTable") {
            return decode_table(table);
        }
        if let Some(lit) = Literal::from_json(&Value::Object(map.clone())) {
            return Ok(ExtractedNode::Literal(lit));
        }
    }

    let expr = map.get("expr").map(ThemeExpr::from_json).transpose()?;
    if let Some(path) = map.get("themeRef") {
        return Ok(ExtractedNode::ThemeRef(ThemeRef {
            paths: vec![decode_path(path)?],
            expr,
        }));
    }
    if let Some(paths) = map.get("themeRefs") {
        let paths = paths
            .as_array()
            .ok_or_else(|| DecodeError::new("themeRefs must be an array"))?
            .iter()
            .map(decode_path)
            .collect::<Result<Vec<_>, _>>()?;
        if expr.is_none() {
            return Err(DecodeError::new("multi-path reference without expression"));
        }
        return Ok(ExtractedNode::ThemeRef(ThemeRef { paths, expr }));
    }

    decode_fields(map)
}

fn decode_fields(map: &Map<String, Value>) -> Result<ExtractedNode, DecodeError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), ExtractedNode::from_json(v)?)))
        .collect::<Result<IndexMap<_, _>, _>>()
        .map(ExtractedNode::Object)
}

fn decode_table(value: &Value) -> Result<ExtractedNode, DecodeError> {
    let enumeration = value
        .get("enumeration")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::new("variant table without enumeration"))?;
    let cases = value
        .get("cases")
        .and_then(Value::as_object)
        .ok_or_else(|| DecodeError::new("variant table without cases"))?;
    let cases = cases
        .iter()
        .map(|(k, v)| Ok((k.clone(), ExtractedNode::from_json(v)?)))
        .collect::<Result<IndexMap<_, _>, DecodeError>>()?;
    Ok(ExtractedNode::VariantTable(VariantTable {
        enumeration: enumeration.to_string(),
        cases,
    }))
}

impl Serialize for ExtractedNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExtractedNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ExtractedNode::from_json(&value).map_err(serde::de::Error::custom)
    }
}
