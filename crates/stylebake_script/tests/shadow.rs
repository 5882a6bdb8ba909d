//! Shadow execution of style modules against the instrumented theme

use serde_json::json;
use stylebake_core::{BinaryOp, ThemeExpr, ThemePath};
use stylebake_script::{parse_module, EvalError, EvalOptions, Interpreter, Limits, ProxyTheme, Value};
use stylebake_theme::ThemeShape;

fn theme_json() -> serde_json::Value {
    json!({
        "mode": "light",
        "colors": {
            "text": { "primary": "#111827", "secondary": "#4b5563" },
            "surface": { "primary": "#ffffff", "secondary": "#f3f4f6" }
        },
        "spacing": { "sm": 4, "md": 8 },
        "intents": {
            "primary": { "primary": "#3b82f6", "contrast": "#ffffff" },
            "danger": { "primary": "#ef4444", "contrast": "#ffffff" }
        }
    })
}

fn proxy() -> ProxyTheme {
    ProxyTheme::wrap(&ThemeShape::from_json(&theme_json()).unwrap())
}

/// Evaluate the style function bound to `name` with the given theme argument
fn run(source: &str, name: &str, theme: Value) -> Result<serde_json::Value, EvalError> {
    let module = parse_module(source).expect("module parses");
    let interp = Interpreter::new(&module, EvalOptions::default());
    let style = interp.lookup(name)?;
    let result = interp.call(&style, vec![theme])?;
    Ok(describe(&result))
}

/// JSON rendering that shows tracked values as their expression
fn describe(value: &Value) -> serde_json::Value {
    match value {
        Value::Tracked(expr) => json!({ "tracked": expr.to_json() }),
        Value::Object(map) => serde_json::Value::Object(
            map.borrow().iter().map(|(k, v)| (k.clone(), describe(v))).collect(),
        ),
        Value::Array(items) => serde_json::Value::Array(items.borrow().iter().map(describe).collect()),
        other => other.to_json().unwrap_or_else(|| json!(other.type_name())),
    }
}

fn path(segments: &[&str]) -> ThemePath {
    ThemePath::from(segments)
}

#[test]
fn leaf_reads_and_literals_are_separated() {
    let src = "export const textStyles = (theme) => ({ text: { color: theme.colors.text.primary, margin: 0 } });";
    let result = run(src, "textStyles", proxy().value()).unwrap();
    assert_eq!(
        result,
        json!({ "text": { "color": { "tracked": { "ref": ["colors", "text", "primary"] } }, "margin": 0 } })
    );
}

#[test]
fn template_literals_become_concatenations() {
    let src = "const s = (theme: Theme) => ({ box: { padding: `${theme.spacing.md}px ${theme.spacing.sm}px` } });";
    let result = run(src, "s", proxy().value()).unwrap();
    let concat = &result["box"]["padding"]["tracked"]["concat"];
    assert_eq!(concat.as_array().map(Vec::len), Some(4), "parts: {concat}");
}

#[test]
fn arithmetic_on_theme_values_is_tracked() {
    let src = "const s = (theme) => ({ box: { gap: theme.spacing.md * 2 } });";
    let module = parse_module(src).unwrap();
    let interp = Interpreter::new(&module, EvalOptions::default());
    let result = interp.call(&interp.lookup("s").unwrap(), vec![proxy().value()]).unwrap();
    let gap = interp.get_member(&interp.get_member(&result, "box").unwrap(), "gap").unwrap();
    match gap {
        Value::Tracked(ThemeExpr::Binary(BinaryOp::Mul, left, _)) => {
            assert_eq!(*left, ThemeExpr::Ref(path(&["spacing", "md"])))
        }
        other => panic!("expected tracked product, got {other:?}"),
    }
}

#[test]
fn same_shape_ternary_is_pushed_into_leaves() {
    let src = r#"
        const s = (theme) => ({
            box: theme.mode === 'dark'
                ? { color: theme.colors.text.primary, borderWidth: 1 }
                : { color: theme.colors.text.secondary, borderWidth: 1 },
        });
    "#;
    let result = run(src, "s", proxy().value()).unwrap();
    assert_eq!(result["box"]["borderWidth"], 1, "identical literals collapse");
    assert!(result["box"]["color"]["tracked"].get("if").is_some());
}

#[test]
fn shape_changing_ternary_fails() {
    let src = r#"
        const s = (theme) => ({
            box: theme.mode === 'dark' ? { color: 'white' } : { backgroundColor: 'black' },
        });
    "#;
    let err = run(src, "s", proxy().value()).unwrap_err();
    assert!(matches!(err, EvalError::Unresolvable { .. }), "got {err:?}");
    assert_eq!(err.theme_path(), Some(&path(&["mode"])));
}

#[test]
fn theme_value_as_if_condition_fails() {
    let src = r#"
        function s(theme) {
            if (theme.mode === 'dark') { return { a: 1 }; }
            return { a: 2 };
        }
    "#;
    assert!(matches!(
        run(src, "s", proxy().value()),
        Err(EvalError::Unresolvable { .. })
    ));
}

#[test]
fn property_read_on_leaf_fails_with_path() {
    let src = "const s = (theme) => ({ a: theme.colors.text.primary.length });";
    let err = run(src, "s", proxy().value()).unwrap_err();
    assert_eq!(err.theme_path(), Some(&path(&["colors", "text", "primary"])));
}

#[test]
fn spreading_theme_objects_copies_tracked_children() {
    let src = "const s = (theme) => ({ box: { ...theme.colors.surface, opacity: 1 } });";
    let result = run(src, "s", proxy().value()).unwrap();
    assert_eq!(
        result["box"]["secondary"],
        json!({ "tracked": { "ref": ["colors", "surface", "secondary"] } })
    );
    assert_eq!(result["box"]["opacity"], 1);
}

#[test]
fn markers_resolve_per_run() {
    let src = "const s = (theme) => ({ variants: { type: { color: theme.$intents.primary } } });";
    for key in ["primary", "danger"] {
        let theme = proxy().with_markers([("intents", key)]).value();
        let result = run(src, "s", theme).unwrap();
        assert_eq!(
            result["variants"]["type"]["color"]["tracked"]["ref"],
            json!(["intents", key, "primary"])
        );
    }
}

#[test]
fn module_constants_are_visible_and_calls_are_opaque() {
    let src = r#"
        import { tokens } from './tokens';
        const base = { flex: 1, direction: 'row' };
        const computed = makeTokens();
        const ok = (theme) => ({ box: { ...base, gap: theme.spacing.sm } });
        const bad = (theme) => ({ box: computed });
    "#;
    let result = run(src, "ok", proxy().value()).unwrap();
    assert_eq!(result["box"]["flex"], 1);
    assert_eq!(
        run(src, "bad", proxy().value()).unwrap_err(),
        EvalError::OpaqueBinding("computed".into())
    );
}

#[test]
fn props_reads_are_reported() {
    let src = "const s = (theme) => ({ box: (props) => ({ color: props.color }) });";
    let module = parse_module(src).unwrap();
    let interp = Interpreter::new(&module, EvalOptions::default());
    let result = interp.call(&interp.lookup("s").unwrap(), vec![proxy().value()]).unwrap();
    let entry = interp.get_member(&result, "box").unwrap();
    assert_eq!(interp.call(&entry, vec![Value::Props]).unwrap_err(), EvalError::PropsDependency);
}

#[test]
fn concrete_theme_produces_concrete_values() {
    let src = r#"
        const s = (theme) => {
            const { sm, md } = theme.spacing;
            let pad = sm;
            pad += md;
            return {
                box: {
                    padding: pad,
                    border: `${Math.max(sm, 1)}px solid ${theme.colors.text.secondary}`,
                    web: Platform.select({ web: 'yes', default: 'no' }),
                },
            };
        };
    "#;
    let result = run(src, "s", Value::from_json(&theme_json())).unwrap();
    assert_eq!(
        result,
        json!({ "box": { "padding": 12, "border": "4px solid #4b5563", "web": "yes" } })
    );
}

#[test]
fn new_expressions_are_rejected() {
    let src = "const s = (theme) => ({ when: new Date() });";
    assert!(matches!(
        run(src, "s", proxy().value()),
        Err(EvalError::Unsupported(_))
    ));
}

#[test]
fn runaway_recursion_is_bounded() {
    let src = "function loop(n) { return loop(n + 1); }\nconst s = (theme) => ({ a: loop(0) });";
    let module = parse_module(src).unwrap();
    let options = EvalOptions {
        limits: Limits {
            max_depth: 32,
            ..Limits::default()
        },
        ..EvalOptions::default()
    };
    let interp = Interpreter::new(&module, options);
    let err = interp
        .call(&interp.lookup("s").unwrap(), vec![proxy().value()])
        .unwrap_err();
    assert_eq!(err, EvalError::RecursionLimit);
}

#[test]
fn integer_like_keys_enumerate_first() {
    let src = "export const gridStyles = (theme) => {\n  const cols = { b: 1, 2: 'x', 1: 'y' };\n  return { cols, order: Object.keys(cols).join(','), spread: { z: 0, ...cols } };\n};";
    let result = run(src, "gridStyles", proxy().value()).unwrap();
    let keys: Vec<&String> = result["cols"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["1", "2", "b"]);
    assert_eq!(result["order"], json!("1,2,b"));
    let spread: Vec<&String> = result["spread"].as_object().unwrap().keys().collect();
    assert_eq!(spread, vec!["1", "2", "z", "b"]);
}
