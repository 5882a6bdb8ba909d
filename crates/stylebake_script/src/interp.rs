//! Tree-walking shadow interpreter
//!
//! Executes style modules with the instrumented theme in place of a real one.
//! Ordinary values follow JavaScript semantics; theme-derived values either stay
//! tracked as a [`ThemeExpr`] or fail with [`EvalError::Unresolvable`].

use crate::ast::*;
use crate::builtins;
use crate::error::{EvalError, Result};
use crate::merge::deep_merge;
use crate::scope::{Env, Scope};
use crate::value::{number_to_string, set_property, Callable, Value};
use indexmap::IndexMap;
use std::cell::Cell;
use std::rc::Rc;
use stylebake_core::{BinaryOp, ThemeExpr};
use stylebake_theme::{Capabilities, Target};

/// Resource limits for one interpreter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting of function calls
    pub max_depth: usize,
    /// Maximum number of evaluated expressions
    pub max_steps: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_steps: 1_000_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalOptions {
    pub target: Target,
    pub limits: Limits,
}

enum Flow {
    Normal,
    Return(Value),
}

/// Interpreter bound to one module.
///
/// Module-level bindings are evaluated when the interpreter is created, so each
/// shadow run that builds its own interpreter also gets a fresh module scope.
pub struct Interpreter {
    module_env: Env,
    options: EvalOptions,
    steps: Cell<u64>,
    depth: Cell<usize>,
}

impl Interpreter {
    pub fn new(module: &Module, options: EvalOptions) -> Self {
        let globals = Scope::root();
        for (name, value) in builtins::globals(options.target) {
            Scope::declare(&globals, name, value, false);
        }
        let interp = Self {
            module_env: Scope::child(&globals),
            options,
            steps: Cell::new(0),
            depth: Cell::new(0),
        };
        interp.load_module(module);
        interp
    }

    pub fn module_env(&self) -> &Env {
        &self.module_env
    }

    pub fn capabilities(&self) -> &'static Capabilities {
        self.options.target.capabilities()
    }

    /// Value of a module-level binding
    pub fn lookup(&self, name: &str) -> Result<Value> {
        self.resolve(name, &self.module_env)
    }

    fn load_module(&self, module: &Module) {
        for item in &module.items {
            if let ItemKind::Function(func) = &item.kind {
                if let Some(name) = &func.name {
                    let value = Value::closure(func.clone(), self.module_env.clone());
                    Scope::declare(&self.module_env, name, value, true);
                }
            }
        }

        for item in &module.items {
            let ItemKind::Binding { kind, declarators } = &item.kind else {
                continue;
            };
            let mutable = *kind != DeclKind::Const;
            for decl in declarators {
                let value = match &decl.init {
                    None => Ok(Value::Undefined),
                    Some(init) if is_static_init(init) => self.eval_expr(init, &self.module_env),
                    Some(_) => Err(EvalError::Unsupported("initializer needs execution".into())),
                };
                let bound =
                    value.and_then(|v| self.bind_pattern(&decl.pattern, v, &self.module_env, mutable));
                if let Err(err) = bound {
                    for name in pattern_names(&decl.pattern) {
                        tracing::trace!(binding = %name, error = %err, "Module binding is opaque");
                        Scope::declare(&self.module_env, &name, Value::Opaque(name.as_str().into()), mutable);
                    }
                }
            }
        }
        self.steps.set(0);
    }

    fn tick(&self) -> Result<()> {
        let steps = self.steps.get() + 1;
        if steps > self.options.limits.max_steps {
            return Err(EvalError::StepLimit);
        }
        self.steps.set(steps);
        Ok(())
    }

    fn resolve(&self, name: &str, env: &Env) -> Result<Value> {
        match Scope::lookup(env, name) {
            Some(Value::Opaque(binding)) => Err(EvalError::OpaqueBinding(binding.to_string())),
            Some(value) => Ok(value),
            None => Err(EvalError::Undefined(name.to_string())),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn eval_expr(&self, expr: &Expr, env: &Env) -> Result<Value> {
        self.tick()?;
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::String(s) => Ok(Value::string(s)),
            ExprKind::Template { quasis, exprs } => self.eval_template(quasis, exprs, env),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Ident(name) => self.resolve(name, env),
            ExprKind::Object(props) => self.eval_object(props, env),
            ExprKind::Array(elems) => self.eval_elems(elems, env).map(Value::array),
            ExprKind::Function(func) => Ok(Value::closure(func.clone(), env.clone())),
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval_expr(object, env)?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = self.property_key(property, &object, env)?;
                self.get_member(&object, &key)
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                let callee = self.eval_expr(callee, env)?;
                if *optional && callee.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let args = self.eval_elems(args, env)?;
                self.call(&callee, args)
            }
            ExprKind::New(_) => Err(EvalError::Unsupported("`new` expressions".into())),
            ExprKind::Unary { op, arg } => self.eval_unary(*op, arg, env),
            ExprKind::Binary { op, left, right } => {
                let left = self.eval_expr(left, env)?;
                if op.is_logical() {
                    return self.eval_logical(*op, left, right, env);
                }
                let right = self.eval_expr(right, env)?;
                binary(*op, &left, &right)
            }
            ExprKind::Cond {
                test,
                then,
                otherwise,
            } => {
                let test = self.eval_expr(test, env)?;
                match &test {
                    Value::Tracked(cond) => {
                        let a = self.eval_expr(then, env)?;
                        let b = self.eval_expr(otherwise, env)?;
                        merge_branches(cond, a, b)
                    }
                    _ if test.truthy()? => self.eval_expr(then, env),
                    _ => self.eval_expr(otherwise, env),
                }
            }
            ExprKind::Assign { op, target, value } => self.eval_assign(*op, target, value, env),
            ExprKind::Paren(inner) => self.eval_expr(inner, env),
        }
    }

    fn eval_template(&self, quasis: &[String], exprs: &[Expr], env: &Env) -> Result<Value> {
        let values = exprs
            .iter()
            .map(|e| self.eval_expr(e, env))
            .collect::<Result<Vec<_>>>()?;

        if values.iter().any(|v| matches!(v, Value::Tracked(_))) {
            let mut parts = Vec::new();
            for (index, quasi) in quasis.iter().enumerate() {
                if !quasi.is_empty() {
                    parts.push(ThemeExpr::Lit(stylebake_core::Literal::String(quasi.clone())));
                }
                if let Some(value) = values.get(index) {
                    parts.push(value.theme_operand()?);
                }
            }
            return Ok(Value::Tracked(ThemeExpr::Concat(parts)));
        }

        let mut out = String::new();
        for (index, quasi) in quasis.iter().enumerate() {
            out.push_str(quasi);
            if let Some(value) = values.get(index) {
                out.push_str(&value.to_js_string()?);
            }
        }
        Ok(Value::string(out))
    }

    fn eval_object(&self, props: &[ObjectProp], env: &Env) -> Result<Value> {
        let mut map = IndexMap::new();
        for prop in props {
            match prop {
                ObjectProp::KeyValue { key, value } => {
                    let key = match key {
                        PropKey::Name(name) => name.clone(),
                        PropKey::Computed(expr) => {
                            let key = self.eval_expr(expr, env)?;
                            key_string(&key, false)?
                        }
                    };
                    let value = self.eval_expr(value, env)?;
                    set_property(&mut map, key, value);
                }
                ObjectProp::Shorthand(name) => {
                    set_property(&mut map, name.clone(), self.resolve(name, env)?);
                }
                ObjectProp::Spread(expr) => {
                    let value = self.eval_expr(expr, env)?;
                    self.spread_into(&mut map, &value)?;
                }
            }
        }
        Ok(Value::object(map))
    }

    /// Copy the enumerable entries of `value` into `map` (object spread)
    pub(crate) fn spread_into(&self, map: &mut IndexMap<String, Value>, value: &Value) -> Result<()> {
        match value {
            Value::Object(source) => {
                for (k, v) in source.borrow().iter() {
                    set_property(map, k.clone(), v.clone());
                }
            }
            Value::Theme(node) => {
                for key in node.keys() {
                    let child = node.read(&key)?;
                    set_property(map, key, child);
                }
            }
            Value::Array(items) => {
                for (i, v) in items.borrow().iter().enumerate() {
                    set_property(map, i.to_string(), v.clone());
                }
            }
            Value::String(s) => {
                for (i, c) in s.chars().enumerate() {
                    set_property(map, i.to_string(), Value::string(c.to_string()));
                }
            }
            Value::Tracked(expr) => {
                return Err(EvalError::on_expr("theme leaf spread into an object", expr))
            }
            Value::Props => return Err(EvalError::PropsDependency),
            Value::Opaque(name) => return Err(EvalError::OpaqueBinding(name.to_string())),
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::Function(_) => {}
        }
        Ok(())
    }

    fn eval_elems(&self, elems: &[ArrayElem], env: &Env) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(elems.len());
        for elem in elems {
            match elem {
                ArrayElem::Expr(expr) => out.push(self.eval_expr(expr, env)?),
                ArrayElem::Spread(expr) => {
                    let value = self.eval_expr(expr, env)?;
                    out.extend(iterate(&value)?);
                }
                ArrayElem::Hole => out.push(Value::Undefined),
            }
        }
        Ok(out)
    }

    fn property_key(&self, property: &MemberProp, object: &Value, env: &Env) -> Result<String> {
        match property {
            MemberProp::Name(name) => Ok(name.clone()),
            MemberProp::Computed(expr) => {
                let key = self.eval_expr(expr, env)?;
                key_string(&key, matches!(object, Value::Theme(_)))
            }
        }
    }

    /// Property read with JavaScript semantics plus the theme proxy rules
    pub fn get_member(&self, object: &Value, key: &str) -> Result<Value> {
        match object {
            Value::Undefined | Value::Null => Err(EvalError::Type(format!(
                "cannot read property '{key}' of {}",
                object.type_name()
            ))),
            Value::Object(map) => Ok(map.borrow().get(key).cloned().unwrap_or(Value::Undefined)),
            Value::Array(items) => {
                if key == "length" {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(items.borrow().get(index).cloned().unwrap_or(Value::Undefined));
                }
                Ok(builtins::array_method(key)
                    .map(|b| Value::native(b, object.clone()))
                    .unwrap_or(Value::Undefined))
            }
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.encode_utf16().count() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map(|c| Value::string(c.to_string()))
                        .unwrap_or(Value::Undefined));
                }
                Ok(builtins::string_method(key)
                    .map(|b| Value::native(b, object.clone()))
                    .unwrap_or(Value::Undefined))
            }
            Value::Theme(node) => node.read(key),
            Value::Tracked(expr) => Err(EvalError::on_expr(
                format!("property '{key}' read on a theme leaf"),
                expr,
            )),
            Value::Props => Err(EvalError::PropsDependency),
            Value::Opaque(name) => Err(EvalError::OpaqueBinding(name.to_string())),
            Value::Bool(_) | Value::Number(_) | Value::Function(_) => Ok(Value::Undefined),
        }
    }

    fn set_member(&self, object: &Value, key: String, value: Value) -> Result<()> {
        match object {
            Value::Object(map) => {
                set_property(&mut map.borrow_mut(), key, value);
                Ok(())
            }
            Value::Array(items) => {
                let index = key
                    .parse::<usize>()
                    .map_err(|_| EvalError::Unsupported(format!("array property '{key}' assignment")))?;
                let mut items = items.borrow_mut();
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
                Ok(())
            }
            Value::Theme(node) => Err(EvalError::unresolvable(
                "assignment into the theme",
                Some(node.path().clone()),
            )),
            Value::Tracked(expr) => Err(EvalError::on_expr("assignment into a theme leaf", expr)),
            Value::Props => Err(EvalError::PropsDependency),
            other => Err(EvalError::Type(format!(
                "cannot set property '{key}' on {}",
                other.type_name()
            ))),
        }
    }

    fn eval_unary(&self, op: UnaryOperator, arg: &Expr, env: &Env) -> Result<Value> {
        let value = self.eval_expr(arg, env)?;
        match op {
            UnaryOperator::Void => return Ok(Value::Undefined),
            UnaryOperator::TypeOf => return value.type_of().map(Value::string),
            _ => {}
        }
        if let (Value::Tracked(expr), Some(theme_op)) = (&value, op.theme_op()) {
            return Ok(Value::Tracked(ThemeExpr::unary(theme_op, expr.clone())));
        }
        match op {
            UnaryOperator::Not => Ok(Value::Bool(!value.truthy()?)),
            UnaryOperator::Neg => Ok(Value::Number(-value.to_number()?)),
            _ => Ok(Value::Number(value.to_number()?)),
        }
    }

    fn eval_logical(&self, op: BinaryOp, left: Value, right: &Expr, env: &Env) -> Result<Value> {
        if let Value::Tracked(expr) = &left {
            let right = self.eval_expr(right, env)?;
            let right = right
                .theme_operand()
                .map_err(|err| with_path(err, &left))?;
            return Ok(Value::Tracked(ThemeExpr::binary(op, expr.clone(), right)));
        }
        match op {
            BinaryOp::And if left.truthy()? => self.eval_expr(right, env),
            BinaryOp::Or if !left.truthy()? => self.eval_expr(right, env),
            BinaryOp::Nullish if left.is_nullish() => self.eval_expr(right, env),
            _ => Ok(left),
        }
    }

    fn eval_assign(&self, op: AssignOp, target: &Expr, value: &Expr, env: &Env) -> Result<Value> {
        let new_value = match op.binary() {
            None => self.eval_expr(value, env)?,
            Some(bop) => {
                let current = self.eval_expr(target, env)?;
                if bop.is_logical() {
                    self.eval_logical(bop, current, value, env)?
                } else {
                    let right = self.eval_expr(value, env)?;
                    binary(bop, &current, &right)?
                }
            }
        };

        match &target.unparen().kind {
            ExprKind::Ident(name) => Scope::assign(env, name, new_value.clone())?,
            ExprKind::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(object, env)?;
                let key = self.property_key(property, &object, env)?;
                self.set_member(&object, key, new_value.clone())?;
            }
            _ => return Err(EvalError::Unsupported("assignment target".into())),
        }
        Ok(new_value)
    }

    // ------------------------------------------------------------------
    // Calls and statements
    // ------------------------------------------------------------------

    /// Call a function value
    pub fn call(&self, callee: &Value, args: Vec<Value>) -> Result<Value> {
        match callee {
            Value::Function(callable) => match callable.as_ref() {
                Callable::Closure { func, env } => self.call_closure(func, env, args),
                Callable::Native { builtin, receiver } => builtins::call(self, *builtin, receiver, args),
                Callable::Merged(base, extension) => {
                    let base = self.call(base, args.clone())?;
                    let extension = self.call(extension, args)?;
                    Ok(deep_merge(base, extension))
                }
            },
            Value::Tracked(expr) => Err(EvalError::on_expr("theme value called as a function", expr)),
            Value::Theme(node) => Err(EvalError::unresolvable(
                "theme object called as a function",
                Some(node.path().clone()),
            )),
            Value::Props => Err(EvalError::PropsDependency),
            Value::Opaque(name) => Err(EvalError::OpaqueBinding(name.to_string())),
            other => Err(EvalError::Type(format!("{} is not a function", other.type_name()))),
        }
    }

    fn call_closure(&self, func: &Rc<Function>, env: &Env, args: Vec<Value>) -> Result<Value> {
        let depth = self.depth.get();
        if depth >= self.options.limits.max_depth {
            return Err(EvalError::RecursionLimit);
        }
        self.depth.set(depth + 1);
        let result = self.invoke(func, env, args);
        self.depth.set(depth);
        result
    }

    fn invoke(&self, func: &Function, env: &Env, args: Vec<Value>) -> Result<Value> {
        let scope = Scope::child(env);
        let mut args = args.into_iter();
        for param in &func.params {
            let mut value = args.next().unwrap_or(Value::Undefined);
            if matches!(value, Value::Undefined) {
                if let Some(default) = &param.default {
                    value = self.eval_expr(default, &scope)?;
                }
            }
            self.bind_pattern(&param.pattern, value, &scope, true)?;
        }
        match &func.body {
            FunctionBody::Expr(body) => self.eval_expr(body, &scope),
            FunctionBody::Block(stmts) => match self.exec_block(stmts, &scope)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            },
        }
    }

    fn exec_block(&self, stmts: &[Stmt], env: &Env) -> Result<Flow> {
        for stmt in stmts {
            if let Stmt::Function(func) = stmt {
                if let Some(name) = &func.name {
                    Scope::declare(env, name, Value::closure(func.clone(), env.clone()), true);
                }
            }
        }
        for stmt in stmts {
            if let Flow::Return(value) = self.exec_stmt(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&self, stmt: &Stmt, env: &Env) -> Result<Flow> {
        match stmt {
            Stmt::Decl { kind, declarators } => {
                for decl in declarators {
                    let value = match &decl.init {
                        Some(init) => self.eval_expr(init, env)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(&decl.pattern, value, env, *kind != DeclKind::Const)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                let test = self.eval_expr(test, env)?;
                if let Value::Tracked(expr) = &test {
                    return Err(EvalError::on_expr("theme value used as an if condition", expr));
                }
                if test.truthy()? {
                    self.exec_stmt(then, env)
                } else if let Some(otherwise) = otherwise {
                    self.exec_stmt(otherwise, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(body) => self.exec_block(body, &Scope::child(env)),
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Expr(expr) => {
                self.eval_expr(expr, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn bind_pattern(&self, pattern: &Pattern, value: Value, env: &Env, mutable: bool) -> Result<()> {
        match pattern {
            Pattern::Ident(name) => {
                Scope::declare(env, name, value, mutable);
                Ok(())
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(EvalError::Type(format!("cannot destructure {}", value.type_name())));
                }
                for prop in props {
                    let mut field = self.get_member(&value, &prop.key)?;
                    if matches!(field, Value::Undefined) {
                        if let Some(default) = &prop.default {
                            field = self.eval_expr(default, env)?;
                        }
                    }
                    self.bind_pattern(&prop.value, field, env, mutable)?;
                }
                if let Some(rest) = rest {
                    let used: Vec<&str> = props.iter().map(|p| p.key.as_str()).collect();
                    let mut all = IndexMap::new();
                    self.spread_into(&mut all, &value)?;
                    all.retain(|k, _| !used.contains(&k.as_str()));
                    Scope::declare(env, rest, Value::object(all), mutable);
                }
                Ok(())
            }
            Pattern::Array { elems, rest } => {
                let items = iterate(&value)?;
                for (index, elem) in elems.iter().enumerate() {
                    let Some(elem) = elem else { continue };
                    let mut item = items.get(index).cloned().unwrap_or(Value::Undefined);
                    if matches!(item, Value::Undefined) {
                        if let Some(default) = &elem.default {
                            item = self.eval_expr(default, env)?;
                        }
                    }
                    self.bind_pattern(&elem.pattern, item, env, mutable)?;
                }
                if let Some(rest) = rest {
                    let remaining = items.into_iter().skip(elems.len()).collect();
                    Scope::declare(env, rest, Value::array(remaining), mutable);
                }
                Ok(())
            }
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        Scope::clear(&self.module_env);
    }
}

/// Property key from a computed member or object key
fn key_string(key: &Value, on_theme: bool) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.to_string()),
        Value::Number(n) => Ok(number_to_string(*n)),
        Value::Tracked(expr) if on_theme => Err(EvalError::on_expr(
            "theme indexed with a theme-derived key",
            expr,
        )),
        Value::Tracked(expr) => Err(EvalError::on_expr("theme value used as a property key", expr)),
        Value::Undefined | Value::Null | Value::Bool(_) => key.to_js_string(),
        Value::Props => Err(EvalError::PropsDependency),
        other => Err(EvalError::Type(format!(
            "{} cannot be used as a property key",
            other.type_name()
        ))),
    }
}

/// Elements of an iterable (array spread, array destructuring)
fn iterate(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
        Value::Tracked(expr) => Err(EvalError::on_expr("theme leaf spread into a list", expr)),
        Value::Theme(node) => Err(EvalError::unresolvable(
            "theme object is not iterable",
            Some(node.path().clone()),
        )),
        Value::Props => Err(EvalError::PropsDependency),
        other => Err(EvalError::Type(format!("{} is not iterable", other.type_name()))),
    }
}

/// Attach the path of a tracked operand to an unresolvable error lacking one
fn with_path(err: EvalError, operand: &Value) -> EvalError {
    match err {
        EvalError::Unresolvable { reason, path: None } => EvalError::Unresolvable {
            reason,
            path: operand.theme_path(),
        },
        other => other,
    }
}

/// Non-logical binary operators
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    for side in [left, right] {
        if let Value::Theme(node) = side {
            let reason = match op {
                BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => {
                    "comparison of theme objects"
                }
                _ => "theme object used as an operand",
            };
            return Err(EvalError::unresolvable(reason, Some(node.path().clone())));
        }
    }

    if matches!(left, Value::Tracked(_)) || matches!(right, Value::Tracked(_)) {
        let tracked = if matches!(left, Value::Tracked(_)) { left } else { right };
        let l = left.theme_operand().map_err(|e| with_path(e, tracked))?;
        let r = right.theme_operand().map_err(|e| with_path(e, tracked))?;
        return Ok(Value::Tracked(ThemeExpr::binary(op, l, r)));
    }

    match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| {
                matches!(v, Value::String(_) | Value::Object(_) | Value::Array(_) | Value::Function(_))
            };
            if stringy(left) || stringy(right) {
                let mut out = left.to_js_string()?;
                out.push_str(&right.to_js_string()?);
                Ok(Value::string(out))
            } else {
                Ok(Value::Number(left.to_number()? + right.to_number()?))
            }
        }
        BinaryOp::Sub => Ok(Value::Number(left.to_number()? - right.to_number()?)),
        BinaryOp::Mul => Ok(Value::Number(left.to_number()? * right.to_number()?)),
        BinaryOp::Div => Ok(Value::Number(left.to_number()? / right.to_number()?)),
        BinaryOp::Rem => Ok(Value::Number(left.to_number()? % right.to_number()?)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number()?.partial_cmp(&right.to_number()?),
            };
            let result = match ordering {
                None => false,
                Some(ord) => match op {
                    BinaryOp::Lt => ord.is_lt(),
                    BinaryOp::Gt => ord.is_gt(),
                    BinaryOp::LtEq => ord.is_le(),
                    _ => ord.is_ge(),
                },
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Eq => left.loose_eq(right).map(Value::Bool),
        BinaryOp::NotEq => left.loose_eq(right).map(|eq| Value::Bool(!eq)),
        BinaryOp::StrictEq => Ok(Value::Bool(left.strict_eq(right))),
        BinaryOp::StrictNotEq => Ok(Value::Bool(!left.strict_eq(right))),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => Err(EvalError::Unsupported(
            "logical operator outside short-circuit evaluation".into(),
        )),
    }
}

/// Combine both branches of a ternary whose condition is a theme value.
///
/// Structurally identical branches are merged position by position so each leaf
/// carries its own conditional; anything else cannot be expressed statically.
fn merge_branches(test: &ThemeExpr, a: Value, b: Value) -> Result<Value> {
    let mismatch = || {
        EvalError::on_expr(
            "theme-dependent ternary chooses between structurally different branches",
            test,
        )
    };

    match (&a, &b) {
        (Value::Object(x), Value::Object(y)) => {
            if Rc::ptr_eq(x, y) {
                return Ok(a.clone());
            }
            let (x, y) = (x.borrow(), y.borrow());
            if !x.keys().eq(y.keys()) {
                return Err(mismatch());
            }
            let mut out = IndexMap::with_capacity(x.len());
            for ((key, va), vb) in x.iter().zip(y.values()) {
                out.insert(key.clone(), merge_branches(test, va.clone(), vb.clone())?);
            }
            Ok(Value::object(out))
        }
        (Value::Array(x), Value::Array(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            if x.len() != y.len() {
                return Err(mismatch());
            }
            let merged = x
                .iter()
                .zip(y.iter())
                .map(|(va, vb)| merge_branches(test, va.clone(), vb.clone()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::array(merged))
        }
        (Value::Theme(x), Value::Theme(y)) => {
            if x.path() == y.path() {
                return Ok(a.clone());
            }
            if !x.same_shape(y) {
                return Err(mismatch());
            }
            let mut out = IndexMap::new();
            for key in x.keys() {
                let merged = merge_branches(test, x.read(&key)?, y.read(&key)?)?;
                out.insert(key, merged);
            }
            Ok(Value::object(out))
        }
        (Value::Function(f), Value::Function(g)) if Rc::ptr_eq(f, g) => Ok(a.clone()),
        (Value::Props, _) | (_, Value::Props) => Err(EvalError::PropsDependency),
        _ => match (a.theme_operand(), b.theme_operand()) {
            (Ok(l), Ok(r)) if l == r => Ok(a.clone()),
            (Ok(l), Ok(r)) => Ok(Value::Tracked(ThemeExpr::cond(test.clone(), l, r))),
            _ => Err(mismatch()),
        },
    }
}

/// Whether a module-level initializer can be evaluated without running calls
fn is_static_init(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Undefined
        | ExprKind::Ident(_)
        | ExprKind::Function(_) => true,
        ExprKind::Template { exprs, .. } => exprs.iter().all(is_static_init),
        ExprKind::Object(props) => props.iter().all(|prop| match prop {
            ObjectProp::KeyValue { key, value } => {
                matches!(key, PropKey::Name(_)) && is_static_init(value)
            }
            ObjectProp::Shorthand(_) => true,
            ObjectProp::Spread(expr) => is_static_init(expr),
        }),
        ExprKind::Array(elems) => elems.iter().all(|elem| match elem {
            ArrayElem::Expr(e) | ArrayElem::Spread(e) => is_static_init(e),
            ArrayElem::Hole => true,
        }),
        ExprKind::Member {
            object, property, ..
        } => {
            is_static_init(object)
                && match property {
                    MemberProp::Name(_) => true,
                    MemberProp::Computed(key) => is_static_init(key),
                }
        }
        ExprKind::Unary { arg, .. } => is_static_init(arg),
        ExprKind::Binary { left, right, .. } => is_static_init(left) && is_static_init(right),
        ExprKind::Cond {
            test,
            then,
            otherwise,
        } => is_static_init(test) && is_static_init(then) && is_static_init(otherwise),
        ExprKind::Paren(inner) => is_static_init(inner),
        ExprKind::Call { .. } | ExprKind::New(_) | ExprKind::Assign { .. } => false,
    }
}

/// Names bound by a pattern
pub fn pattern_names(pattern: &Pattern) -> Vec<String> {
    fn collect(pattern: &Pattern, out: &mut Vec<String>) {
        match pattern {
            Pattern::Ident(name) => out.push(name.clone()),
            Pattern::Object { props, rest } => {
                props.iter().for_each(|p| collect(&p.value, out));
                out.extend(rest.iter().cloned());
            }
            Pattern::Array { elems, rest } => {
                elems.iter().flatten().for_each(|e| collect(&e.pattern, out));
                out.extend(rest.iter().cloned());
            }
        }
    }
    let mut out = Vec::new();
    collect(pattern, &mut out);
    out
}
