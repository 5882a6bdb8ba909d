//! Style site discovery
//!
//! Finds style-definition calls among a module's top-level statements:
//!
//! ```text
//! export const cardStyles = defineStyle('Card', (theme) => ({ ... }));
//! export const alertStyles = defineStyle('Alert', base).extend(ext);
//! const styles = StyleSheet.create({ ... });
//! extendStyle('Button', (theme) => ({ ... }));
//! ```
//!
//! Calls whose callable cannot be resolved statically are skipped with a
//! [`DiagnosticKind::DiscoveryWarning`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use stylebake_core::{Diagnostic, DiagnosticKind, SiteKind, StyleSite};
use stylebake_script::ast::{
    ArrayElem, Declarator, ExprKind, FunctionBody, MemberProp, ObjectProp, Pattern, PropKey, Stmt,
};
use stylebake_script::{Expr, Function, ItemKind, Module, Span};
use stylebake_theme::find_marker;

/// Names of the style APIs recognized in source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiNames {
    /// `defineStyle('Name', fn)`, `StyleSheet.create(fn)`
    pub factories: Vec<String>,
    /// `extendStyle('Name', fn)`
    pub extensions: Vec<String>,
    /// `overrideStyle('Name', fn)`
    pub overrides: Vec<String>,
    /// `.extend(fn)` on a factory result
    pub builder_method: String,
}

impl Default for ApiNames {
    fn default() -> Self {
        Self {
            factories: vec!["defineStyle".to_string(), "StyleSheet.create".to_string()],
            extensions: vec!["extendStyle".to_string()],
            overrides: vec!["overrideStyle".to_string()],
            builder_method: "extend".to_string(),
        }
    }
}

impl ApiNames {
    fn kind_of(&self, callee: &str) -> Option<SiteKind> {
        let listed = |names: &[String]| names.iter().any(|n| n == callee);
        if listed(&self.factories) {
            Some(SiteKind::Factory)
        } else if listed(&self.extensions) {
            Some(SiteKind::Extension)
        } else if listed(&self.overrides) {
            Some(SiteKind::Override)
        } else {
            None
        }
    }
}

/// A discovered site together with the syntax needed to extract and rewrite it
#[derive(Debug, Clone)]
pub struct DiscoveredSite {
    pub site: StyleSite,
    /// Callee as written (`defineStyle`, `StyleSheet.create`)
    pub api: String,
    /// The callable argument of the factory call
    pub base: Expr,
    /// Builder extension arguments in chain order
    pub extensions: Vec<Expr>,
    /// Expression replaced on rewrite: the call, or the whole builder chain
    pub target: Span,
    pub callee: Span,
    /// Arguments before the callable (the component name)
    pub leading_args: Vec<Span>,
    /// Top-level statement holding the call
    pub statement: Span,
}

impl DiscoveredSite {
    /// Whether the callable is a plain object (`StyleSheet.create({ ... })`)
    pub fn is_object_literal(&self) -> bool {
        matches!(self.base.unparen().kind, ExprKind::Object(_))
    }
}

/// Everything found in one module
#[derive(Debug, Default)]
pub struct Discovery {
    pub sites: Vec<DiscoveredSite>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Locate style sites in a parsed module
pub fn discover(module: &Module, file: &str, apis: &ApiNames) -> Discovery {
    let mut finder = Finder {
        module,
        file,
        apis,
        out: Discovery::default(),
        seen: FxHashMap::default(),
    };

    for item in &module.items {
        match &item.kind {
            ItemKind::Binding { declarators, .. } => {
                for Declarator { pattern, init, .. } in declarators {
                    if let (Pattern::Ident(name), Some(init)) = (pattern, init) {
                        finder.visit(init, Naming::Bound(name), item.span);
                    }
                }
            }
            ItemKind::ExportDefault(expr) => finder.visit(expr, Naming::Default, item.span),
            ItemKind::Expr(expr) => finder.visit(expr, Naming::Statement, item.span),
            ItemKind::Import | ItemKind::Ignored | ItemKind::Function(_) => {}
        }
    }

    tracing::debug!(file, sites = finder.out.sites.len(), "Discovered style sites");
    finder.out
}

/// Bound-name indirections followed when resolving a callable
const MAX_ALIAS_HOPS: usize = 8;

enum Naming<'a> {
    Bound(&'a str),
    Default,
    Statement,
}

struct Finder<'m> {
    module: &'m Module,
    file: &'m str,
    apis: &'m ApiNames,
    out: Discovery,
    seen: FxHashMap<String, usize>,
}

/// A factory call with the builder extensions applied to it
struct Chain<'e> {
    callee: &'e Expr,
    args: &'e [ArrayElem],
    extensions: Vec<&'e Expr>,
}

impl<'m> Finder<'m> {
    fn visit(&mut self, expr: &Expr, naming: Naming<'_>, statement: Span) {
        let expr = expr.unparen();
        let Some(chain) = self.chain(expr) else {
            return;
        };
        let Some(api) = chain
            .callee
            .member_chain()
            .map(|(root, rest)| std::iter::once(root).chain(rest).collect::<Vec<_>>().join("."))
        else {
            return;
        };
        let Some(mut kind) = self.apis.kind_of(&api) else {
            return;
        };
        if !chain.extensions.is_empty() {
            kind = SiteKind::Builder;
        }

        let args: Vec<&Expr> = chain
            .args
            .iter()
            .filter_map(|arg| match arg {
                ArrayElem::Expr(e) => Some(e),
                _ => None,
            })
            .collect();
        if args.len() != chain.args.len() {
            self.warn(format!("{api} call with spread arguments skipped"));
            return;
        }

        let (component, callable, leading) = match args.as_slice() {
            [callable] if kind == SiteKind::Factory || kind == SiteKind::Builder => (None, *callable, vec![]),
            [name, callable] => match &name.unparen().kind {
                ExprKind::String(component) => (Some(component.clone()), *callable, vec![name.span]),
                _ => {
                    self.warn(format!("{api} call with a non-literal component name skipped"));
                    return;
                }
            },
            _ => {
                self.warn(format!("{api} call with {} arguments skipped", args.len()));
                return;
            }
        };

        let mut parts = Vec::with_capacity(1 + chain.extensions.len());
        for part in std::iter::once(callable).chain(chain.extensions.iter().copied()) {
            match self.resolve(part, 0) {
                Ok(resolved) => parts.push(resolved),
                Err(reason) => {
                    self.warn(format!("{api} call skipped: {reason}"));
                    return;
                }
            }
        }

        let theme_param = parts
            .first()
            .and_then(|r| r.param.clone())
            .unwrap_or_else(|| "theme".to_string());
        let mut markers = Vec::new();
        for part in &parts {
            if let (Some(func), Some(param)) = (&part.func, &part.param) {
                collect_markers(func, param, &mut markers);
            }
        }

        let base_name = match naming {
            Naming::Bound(name) => name.to_string(),
            Naming::Default => "default".to_string(),
            Naming::Statement => match &component {
                Some(component) => format!("{api}:{component}"),
                None => api.clone(),
            },
        };
        let export_name = self.unique(base_name);

        let site = StyleSite::new(self.file, export_name, markers)
            .with_kind(kind)
            .with_component(component)
            .with_theme_param(theme_param);
        tracing::debug!(site = %site, ?kind, "Found style site");

        self.out.sites.push(DiscoveredSite {
            site,
            api,
            base: callable.clone(),
            extensions: chain.extensions.iter().map(|e| (*e).clone()).collect(),
            target: expr.span,
            callee: chain.callee.span,
            leading_args: leading,
            statement,
        });
    }

    /// Unwind `factory(...).extend(a).extend(b)` into the factory call and `[a, b]`
    fn chain<'e>(&self, expr: &'e Expr) -> Option<Chain<'e>> {
        let ExprKind::Call { callee, args, .. } = &expr.unparen().kind else {
            return None;
        };
        if let ExprKind::Member {
            object,
            property: MemberProp::Name(method),
            ..
        } = &callee.unparen().kind
        {
            if *method == self.apis.builder_method {
                if let [ArrayElem::Expr(extension)] = args.as_slice() {
                    if let Some(mut inner) = self.chain(object) {
                        inner.extensions.push(extension);
                        return Some(inner);
                    }
                }
            }
        }
        Some(Chain {
            callee,
            args,
            extensions: Vec::new(),
        })
    }

    /// Resolve a callable argument to the function (or object) it denotes
    fn resolve(&self, expr: &Expr, hops: usize) -> Result<Resolved, String> {
        match &expr.unparen().kind {
            ExprKind::Function(func) => Ok(Resolved::function(func)),
            ExprKind::Object(_) => Ok(Resolved::object()),
            ExprKind::Ident(name) if hops < MAX_ALIAS_HOPS => self.resolve_binding(name, hops + 1),
            ExprKind::Ident(name) => Err(format!("'{name}' aliases too deeply")),
            ExprKind::Call { .. } => Err("callable is a call result".to_string()),
            other => Err(format!("unsupported callable {}", describe(other))),
        }
    }

    fn resolve_binding(&self, name: &str, hops: usize) -> Result<Resolved, String> {
        for item in &self.module.items {
            match &item.kind {
                ItemKind::Function(func) if func.name.as_deref() == Some(name) => {
                    return Ok(Resolved::function(func));
                }
                ItemKind::Binding { declarators, .. } => {
                    for decl in declarators {
                        if !matches!(&decl.pattern, Pattern::Ident(n) if n == name) {
                            continue;
                        }
                        return match &decl.init {
                            Some(init) => self.resolve(init, hops),
                            None => Err(format!("'{name}' has no initializer")),
                        };
                    }
                }
                _ => {}
            }
        }
        Err(format!("'{name}' is imported or not defined in this module"))
    }

    fn unique(&mut self, name: String) -> String {
        let count = self.seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            name
        } else {
            format!("{name}#{count}")
        }
    }

    fn warn(&mut self, detail: String) {
        tracing::warn!(file = self.file, "{detail}");
        self.out
            .diagnostics
            .push(Diagnostic::warning(DiagnosticKind::DiscoveryWarning, self.file, detail));
    }
}

struct Resolved {
    func: Option<Rc<Function>>,
    param: Option<String>,
}

impl Resolved {
    fn function(func: &Rc<Function>) -> Self {
        Self {
            param: func
                .params
                .first()
                .and_then(|p| p.ident())
                .map(str::to_string),
            func: Some(func.clone()),
        }
    }

    fn object() -> Self {
        Self {
            func: None,
            param: None,
        }
    }
}

fn describe(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Member { .. } => "member expression",
        ExprKind::Cond { .. } => "conditional",
        ExprKind::Array(_) => "array",
        _ => "expression",
    }
}

/// Enumeration ids of every `$name` marker read through `param` in `func`
fn collect_markers(func: &Function, param: &str, out: &mut Vec<String>) {
    let mut visit = |expr: &Expr| {
        if let Some((root, chain)) = expr.member_chain() {
            if root == param {
                if let Some(marker) = find_marker(&chain) {
                    if !out.contains(&marker.enumeration) {
                        out.push(marker.enumeration);
                    }
                }
            }
        }
    };
    walk_function(func, &mut visit);
}

// ----------------------------------------------------------------------------
// Syntax walk
// ----------------------------------------------------------------------------

fn walk_function(func: &Function, visit: &mut impl FnMut(&Expr)) {
    for param in &func.params {
        walk_pattern(&param.pattern, visit);
        if let Some(default) = &param.default {
            walk_expr(default, visit);
        }
    }
    match &func.body {
        FunctionBody::Expr(body) => walk_expr(body, visit),
        FunctionBody::Block(stmts) => stmts.iter().for_each(|s| walk_stmt(s, visit)),
    }
}

fn walk_stmt(stmt: &Stmt, visit: &mut impl FnMut(&Expr)) {
    match stmt {
        Stmt::Decl { declarators, .. } => {
            for decl in declarators {
                walk_pattern(&decl.pattern, visit);
                if let Some(init) = &decl.init {
                    walk_expr(init, visit);
                }
            }
        }
        Stmt::Function(func) => walk_function(func, visit),
        Stmt::If {
            test,
            then,
            otherwise,
        } => {
            walk_expr(test, visit);
            walk_stmt(then, visit);
            if let Some(otherwise) = otherwise {
                walk_stmt(otherwise, visit);
            }
        }
        Stmt::Block(stmts) => stmts.iter().for_each(|s| walk_stmt(s, visit)),
        Stmt::Return(Some(expr)) | Stmt::Expr(expr) => walk_expr(expr, visit),
        Stmt::Return(None) | Stmt::Empty => {}
    }
}

fn walk_pattern(pattern: &Pattern, visit: &mut impl FnMut(&Expr)) {
    match pattern {
        Pattern::Ident(_) => {}
        Pattern::Object { props, .. } => {
            for prop in props {
                walk_pattern(&prop.value, visit);
                if let Some(default) = &prop.default {
                    walk_expr(default, visit);
                }
            }
        }
        Pattern::Array { elems, .. } => {
            for elem in elems.iter().flatten() {
                walk_pattern(&elem.pattern, visit);
                if let Some(default) = &elem.default {
                    walk_expr(default, visit);
                }
            }
        }
    }
}

fn walk_expr(expr: &Expr, visit: &mut impl FnMut(&Expr)) {
    visit(expr);
    match &expr.kind {
        ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Undefined
        | ExprKind::Ident(_) => {}
        ExprKind::Template { exprs, .. } => exprs.iter().for_each(|e| walk_expr(e, visit)),
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    ObjectProp::KeyValue { key, value } => {
                        if let PropKey::Computed(key) = key {
                            walk_expr(key, visit);
                        }
                        walk_expr(value, visit);
                    }
                    ObjectProp::Shorthand(_) => {}
                    ObjectProp::Spread(e) => walk_expr(e, visit),
                }
            }
        }
        ExprKind::Array(elems) => walk_elems(elems, visit),
        ExprKind::Function(func) => walk_function(func, visit),
        ExprKind::Member {
            object, property, ..
        } => {
            walk_expr(object, visit);
            if let MemberProp::Computed(key) = property {
                walk_expr(key, visit);
            }
        }
        ExprKind::Call { callee, args, .. } => {
            walk_expr(callee, visit);
            walk_elems(args, visit);
        }
        ExprKind::New(inner) | ExprKind::Paren(inner) | ExprKind::Unary { arg: inner, .. } => {
            walk_expr(inner, visit)
        }
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, visit);
            walk_expr(right, visit);
        }
        ExprKind::Cond {
            test,
            then,
            otherwise,
        } => {
            walk_expr(test, visit);
            walk_expr(then, visit);
            walk_expr(otherwise, visit);
        }
        ExprKind::Assign { target, value, .. } => {
            walk_expr(target, visit);
            walk_expr(value, visit);
        }
    }
}

fn walk_elems(elems: &[ArrayElem], visit: &mut impl FnMut(&Expr)) {
    for elem in elems {
        match elem {
            ArrayElem::Expr(e) | ArrayElem::Spread(e) => walk_expr(e, visit),
            ArrayElem::Hole => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylebake_script::parse_module;

    fn sites(source: &str) -> Discovery {
        let module = parse_module(source).expect("module parses");
        discover(&module, "src/Alert.styles.tsx", &ApiNames::default())
    }

    fn names(found: &Discovery) -> Vec<&str> {
        found.sites.iter().map(|s| s.site.export_name.as_str()).collect()
    }

    #[test]
    fn test_bound_and_default_sites() {
        let src = r#"
            import { defineStyle } from '@acme/theme';
            void StyleSheet;
            export const alertStyles = defineStyle('Alert', (theme: Theme) => ({ box: { color: theme.colors.text.primary } }));
            export default defineStyle('Badge', (t) => ({ dot: { size: 4 } }));
        "#;
        let found = sites(src);
        assert_eq!(names(&found), vec!["alertStyles", "default"]);
        let alert = &found.sites[0].site;
        assert_eq!(alert.component.as_deref(), Some("Alert"));
        assert_eq!(alert.kind, SiteKind::Factory);
        assert_eq!(found.sites[1].site.theme_param, "t");
        assert!(found.diagnostics.is_empty());
    }

    #[test]
    fn test_markers_are_collected_from_the_theme_param() {
        let src = r#"
            export const alertStyles = defineStyle('Alert', (theme) => ({
                box: (_props) => ({
                    variants: {
                        type: { filled: { backgroundColor: theme.$intents.primary } },
                        size: { gap: theme.sizes.$alert.gap },
                    },
                }),
            }));
        "#;
        let found = sites(src);
        assert_eq!(found.sites[0].site.variant_keys, vec!["intents", "sizes.alert"]);
    }

    #[test]
    fn test_statement_sites_are_named_by_api_and_deduplicated() {
        let src = r#"
            extendStyle('Button', (theme) => ({ root: { margin: 0 } }));
            extendStyle('Button', (theme) => ({ root: { padding: 0 } }));
            overrideStyle('Text', (theme) => ({ body: { color: 'red' } }));
        "#;
        let found = sites(src);
        assert_eq!(
            names(&found),
            vec!["extendStyle:Button", "extendStyle:Button#2", "overrideStyle:Text"]
        );
        assert_eq!(found.sites[2].site.kind, SiteKind::Override);
    }

    #[test]
    fn test_builder_chain_and_named_callables() {
        let src = r#"
            function base(theme) { return { root: { color: theme.colors.text.primary } }; }
            const ext = (theme) => ({ root: { gap: theme.sizes.$alert.gap } });
            export const cardStyles = defineStyle('Card', base).extend(ext);
            const sheet = StyleSheet.create({ root: { flex: 1 } });
        "#;
        let found = sites(src);
        assert_eq!(names(&found), vec!["cardStyles", "sheet"]);
        let card = &found.sites[0];
        assert_eq!(card.site.kind, SiteKind::Builder);
        assert_eq!(card.extensions.len(), 1);
        assert_eq!(card.site.variant_keys, vec!["sizes.alert"]);
        assert_eq!(card.target.text(src), "defineStyle('Card', base).extend(ext)");
        assert!(found.sites[1].is_object_literal());
        assert_eq!(found.sites[1].site.component, None);
    }

    #[test]
    fn test_unresolvable_callables_are_skipped_with_warnings() {
        let src = r#"
            import { shared } from './shared';
            export const a = defineStyle('A', makeStyles());
            export const b = defineStyle('B', shared);
            export const c = defineStyle(name, (theme) => ({}));
        "#;
        let found = sites(src);
        assert!(found.sites.is_empty());
        assert_eq!(found.diagnostics.len(), 3);
        assert!(found
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::DiscoveryWarning && !d.is_fatal()));
    }
}
