//! JavaScript emission for extracted trees
//!
//! Literal content is emitted as plain JavaScript values. Theme references become
//! property reads on the live theme parameter, derived references the expression
//! they were recorded as. All-literal objects and arrays are hoisted out into
//! module constants by [`Codegen`]. Constant names are claimed from a per-file
//! [`HoistNames`] so two sites whose names sanitize alike never share one.

use rustc_hash::FxHashSet;
use stylebake_core::{ExtractedNode, Literal, ThemeExpr, ThemePath};
use stylebake_script::number_to_string;

const INDENT: &str = "  ";

/// Prefix of hoisted module constants
pub const HOIST_PREFIX: &str = "__sb_";

/// Emitter for one site
pub struct Codegen<'a> {
    theme: &'a str,
    prefix: String,
    names: &'a mut HoistNames,
    next: usize,
    hoisted: Vec<Hoisted>,
}

/// Constant names already taken in one output file
#[derive(Debug, Default)]
pub struct HoistNames {
    taken: FxHashSet<String>,
}

impl HoistNames {
    /// Reserve every hoist-prefixed identifier already present in `source`
    pub fn from_source(source: &str) -> Self {
        let mut names = Self::default();
        let mut rest = source;
        while let Some(at) = rest.find(HOIST_PREFIX) {
            let preceded_by_ident = rest[..at].chars().next_back().is_some_and(is_ident_char);
            let tail = &rest[at..];
            let len = tail.find(|c: char| !is_ident_char(c)).unwrap_or(tail.len());
            if !preceded_by_ident {
                names.taken.insert(tail[..len].to_string());
            }
            rest = &tail[len..];
        }
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// First `{prefix}_{n}` not taken yet, from `*next` upward
    fn claim(&mut self, prefix: &str, next: &mut usize) -> String {
        loop {
            let name = format!("{prefix}_{next}");
            *next += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// A module constant holding an all-literal subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hoisted {
    pub name: String,
    pub code: String,
}

impl Hoisted {
    pub fn declaration(&self) -> String {
        format!("const {} = {};\n", self.name, self.code)
    }
}

impl<'a> Codegen<'a> {
    /// `site_name` is the site's export name; it is sanitized into the constant prefix
    pub fn new(theme: &'a str, site_name: &str, names: &'a mut HoistNames) -> Self {
        Self {
            theme,
            prefix: format!("{HOIST_PREFIX}{}", sanitize(site_name)),
            names,
            next: 0,
            hoisted: Vec::new(),
        }
    }

    /// Emit a tree, hoisting maximal all-literal containers
    pub fn emit(&mut self, node: &ExtractedNode) -> String {
        self.emit_at(node, 0)
    }

    pub fn hoisted(&self) -> &[Hoisted] {
        &self.hoisted
    }

    pub fn into_hoisted(self) -> Vec<Hoisted> {
        self.hoisted
    }

    fn emit_at(&mut self, node: &ExtractedNode, depth: usize) -> String {
        if is_hoistable(node) {
            let name = self.names.claim(&self.prefix, &mut self.next);
            self.hoisted.push(Hoisted {
                name: name.clone(),
                code: static_js(node, 0),
            });
            return name;
        }
        match node {
            ExtractedNode::Literal(lit) => literal_js(lit),
            ExtractedNode::ThemeRef(r) => expr_js(self.theme, &r.to_expr()),
            ExtractedNode::Object(fields) => {
                let entries: Vec<(String, String)> = fields
                    .iter()
                    .map(|(k, v)| (property_key(k), self.emit_at(v, depth + 1)))
                    .collect();
                object_js(&entries, depth)
            }
            ExtractedNode::VariantTable(table) => {
                let entries: Vec<(String, String)> = table
                    .cases
                    .iter()
                    .map(|(k, v)| (property_key(k), self.emit_at(v, depth + 1)))
                    .collect();
                object_js(&entries, depth)
            }
            ExtractedNode::List(items) => {
                let items: Vec<String> = items.iter().map(|v| self.emit_at(v, depth + 1)).collect();
                array_js(&items, depth)
            }
            ExtractedNode::Deferred(body) => format!("(_props) => ({})", self.emit_at(body, depth)),
        }
    }
}

fn is_hoistable(node: &ExtractedNode) -> bool {
    let non_empty = match node {
        ExtractedNode::Object(fields) => !fields.is_empty(),
        ExtractedNode::List(items) => !items.is_empty(),
        ExtractedNode::VariantTable(table) => !table.cases.is_empty(),
        ExtractedNode::Literal(_) | ExtractedNode::ThemeRef(_) | ExtractedNode::Deferred(_) => false,
    };
    non_empty && node.is_static()
}

/// Emit an all-literal tree without hoisting
pub fn static_js(node: &ExtractedNode, depth: usize) -> String {
    match node {
        ExtractedNode::Literal(lit) => literal_js(lit),
        ExtractedNode::Object(fields) => {
            let entries: Vec<(String, String)> = fields
                .iter()
                .map(|(k, v)| (property_key(k), static_js(v, depth + 1)))
                .collect();
            object_js(&entries, depth)
        }
        ExtractedNode::VariantTable(table) => {
            let entries: Vec<(String, String)> = table
                .cases
                .iter()
                .map(|(k, v)| (property_key(k), static_js(v, depth + 1)))
                .collect();
            object_js(&entries, depth)
        }
        ExtractedNode::List(items) => {
            let items: Vec<String> = items.iter().map(|v| static_js(v, depth + 1)).collect();
            array_js(&items, depth)
        }
        ExtractedNode::ThemeRef(r) => expr_js("theme", &r.to_expr()),
        ExtractedNode::Deferred(body) => format!("(_props) => ({})", static_js(body, depth)),
    }
}

fn object_js(entries: &[(String, String)], depth: usize) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let inner = INDENT.repeat(depth + 1);
    let mut out = String::from("{\n");
    for (key, value) in entries {
        out.push_str(&format!("{inner}{key}: {value},\n"));
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
    out
}

fn array_js(items: &[String], depth: usize) -> String {
    let single_line = items.iter().all(|i| !i.contains('\n')) && items.iter().map(String::len).sum::<usize>() < 60;
    if single_line {
        return format!("[{}]", items.join(", "));
    }
    let inner = INDENT.repeat(depth + 1);
    let mut out = String::from("[\n");
    for item in items {
        out.push_str(&format!("{inner}{item},\n"));
    }
    out.push_str(&INDENT.repeat(depth));
    out.push(']');
    out
}

pub fn literal_js(lit: &Literal) -> String {
    match lit {
        Literal::Undefined => "undefined".to_string(),
        Literal::Null => "null".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Number(n) => number_to_string(*n),
        Literal::String(s) => string_js(s),
    }
}

fn string_js(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.escape_default()))
}

/// `theme.colors.text.primary`, with bracket access for non-identifier keys
pub fn theme_path_js(theme: &str, path: &ThemePath) -> String {
    let mut out = theme.to_string();
    for segment in path.segments() {
        if is_identifier(segment) {
            out.push('.');
            out.push_str(segment);
        } else {
            out.push('[');
            out.push_str(&string_js(segment));
            out.push(']');
        }
    }
    out
}

/// Emit a theme expression against the live theme parameter
pub fn expr_js(theme: &str, expr: &ThemeExpr) -> String {
    match expr {
        ThemeExpr::Ref(path) => theme_path_js(theme, path),
        ThemeExpr::Lit(lit) => literal_js(lit),
        ThemeExpr::Unary(op, arg) => format!("{}{}", op.symbol(), operand(theme, arg, true)),
        ThemeExpr::Binary(op, left, right) => format!(
            "{} {} {}",
            operand(theme, left, false),
            op.symbol(),
            operand(theme, right, false)
        ),
        ThemeExpr::Cond(test, then, otherwise) => format!(
            "{} ? {} : {}",
            operand(theme, test, false),
            operand(theme, then, false),
            operand(theme, otherwise, false)
        ),
        ThemeExpr::Concat(parts) => {
            let mut out = String::from("`");
            for part in parts {
                match part {
                    ThemeExpr::Lit(Literal::String(text)) => out.push_str(&escape_template(text)),
                    other => {
                        out.push_str("${");
                        out.push_str(&expr_js(theme, other));
                        out.push('}');
                    }
                }
            }
            out.push('`');
            out
        }
    }
}

/// Subexpression, parenthesized unless atomic
fn operand(theme: &str, expr: &ThemeExpr, under_unary: bool) -> String {
    let text = expr_js(theme, expr);
    let needs_parens = match expr {
        ThemeExpr::Binary(..) | ThemeExpr::Cond(..) => true,
        ThemeExpr::Unary(..) => under_unary,
        ThemeExpr::Lit(Literal::Number(n)) => *n < 0.0 || (*n == 0.0 && n.is_sign_negative()),
        _ => false,
    };
    if needs_parens {
        format!("({text})")
    } else {
        text
    }
}

fn escape_template(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

pub fn property_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        string_js(key)
    }
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn sanitize(name: &str) -> String {
    name.chars().map(|c| if is_ident_char(c) { c } else { '_' }).collect()
}
