//! Rewritten sources must produce the same styles as the originals for every
//! concrete theme of the extraction shape.

use serde_json::json;
use stylebake_compiler::{discover, rewrite_source, ApiNames, Extractor, RewriteOptions, SiteStatus};
use stylebake_core::{content_hash, CacheEntry};
use stylebake_script::{deep_merge, parse_module, EvalOptions, Interpreter, Value};
use stylebake_theme::{Enumerations, ThemeShape};

const FILE: &str = "src/Card.styles.tsx";
const ENV: &str = "round-trip";

const SOURCE: &str = r#"
const radius = 6;

export const cardStyles = defineStyle('Card', (theme) => ({
  root: {
    backgroundColor: theme.colors.surface,
    borderRadius: radius,
    padding: theme.spacing.md * 2,
    border: `1px solid ${theme.colors.border}`,
    shadowColor: theme.mode === 'dark' ? '#000' : '#ccc',
    elevation: Platform.select({ web: 0, default: 2 }),
  },
  title: { fontSize: 16, fontWeight: '600', letterSpacing: -0.5 },
  body: (_props) => ({ color: theme.colors.text, gap: theme.spacing.sm }),
}));

const base = (theme) => ({ root: { color: theme.colors.text, margin: [0, 4] } });
export const badgeStyles = defineStyle('Badge', base).extend((theme) => ({
  root: { margin: [theme.spacing.sm, 0] },
}));
"#;

fn themes() -> Vec<serde_json::Value> {
    vec![
        json!({
            "mode": "light",
            "colors": { "surface": "#ffffff", "border": "#e5e7eb", "text": "#111827" },
            "spacing": { "sm": 4, "md": 8 }
        }),
        json!({
            "mode": "dark",
            "colors": { "surface": "#111827", "border": "#374151", "text": "#f9fafb" },
            "spacing": { "sm": 6, "md": 12 }
        }),
    ]
}

/// Concrete style trees of every site, with style functions applied to empty props
fn evaluate(source: &str, theme: &serde_json::Value) -> Vec<serde_json::Value> {
    let module = parse_module(source).unwrap();
    let sites = discover(&module, FILE, &ApiNames::default()).sites;
    let interp = Interpreter::new(&module, EvalOptions::default());
    let theme = Value::from_json(theme);

    sites
        .iter()
        .map(|site| {
            let mut merged: Option<Value> = None;
            for part in std::iter::once(&site.base).chain(&site.extensions) {
                let callable = interp.eval_expr(part, interp.module_env()).unwrap();
                let styles = interp.call(&callable, vec![theme.clone()]).unwrap();
                merged = Some(match merged {
                    Some(prev) => deep_merge(prev, styles),
                    None => styles,
                });
            }
            resolve(&interp, &merged.unwrap())
        })
        .collect()
}

fn resolve(interp: &Interpreter, value: &Value) -> serde_json::Value {
    match value {
        Value::Function(_) => {
            let result = interp.call(value, vec![Value::from_json(&json!({}))]).unwrap();
            resolve(interp, &result)
        }
        Value::Object(map) => serde_json::Value::Object(
            map.borrow()
                .iter()
                .map(|(k, v)| (k.clone(), resolve(interp, v)))
                .collect(),
        ),
        Value::Array(items) => serde_json::Value::Array(items.borrow().iter().map(|v| resolve(interp, v)).collect()),
        other => other.to_json().unwrap(),
    }
}

fn compile(source: &str) -> String {
    let module = parse_module(source).unwrap();
    let sites = discover(&module, FILE, &ApiNames::default()).sites;
    let shape = ThemeShape::from_json(&themes()[0]).unwrap();
    let enumerations = Enumerations::default();
    let extractor = Extractor::new(&module, &shape, &enumerations, EvalOptions::default());
    let hash = content_hash(ENV, source.as_bytes());
    let entries: Vec<CacheEntry> = sites
        .iter()
        .map(|site| CacheEntry::new(site.site.clone(), hash.clone(), extractor.extract(site).unwrap()))
        .collect();

    let apis = ApiNames::default();
    let options = RewriteOptions {
        environment: ENV,
        apis: &apis,
    };
    let output = rewrite_source(FILE, source, &entries, &options).unwrap();
    assert!(output.sites.iter().all(|s| s.status == SiteStatus::Rewritten));
    output.source
}

#[test]
fn rewritten_source_matches_original_for_each_theme() {
    let rewritten = compile(SOURCE);
    assert_ne!(rewritten, SOURCE);
    assert!(!rewritten.contains(".extend("));

    for theme in themes() {
        assert_eq!(evaluate(&rewritten, &theme), evaluate(SOURCE, &theme), "theme {theme}");
    }
}

#[test]
fn literal_subtrees_do_not_read_the_theme() {
    let rewritten = compile(SOURCE);
    let title = rewritten
        .lines()
        .skip_while(|line| !line.starts_with("const __sb_cardStyles_"))
        .take_while(|line| !line.starts_with("};"))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(title.contains("fontWeight: \"600\""));
    assert!(!title.contains("theme."));
}

#[test]
fn rewriting_is_stable() {
    assert_eq!(compile(SOURCE), compile(SOURCE));
}
