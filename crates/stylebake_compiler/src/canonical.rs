//! Canonical style trees
//!
//! [`to_node`] turns the value one shadow run produced into an [`ExtractedNode`].
//! [`fold`] merges the trees of all runs of a site (one per combination of
//! iteration-marker keys) into a single tree with [`VariantTable`]s where the
//! runs differ.
//!
//! Folding works purely by comparing runs. A subtree that is identical in every
//! run does not depend on any marker and is kept as-is. Where runs differ, a
//! table is built at the *marked position*: each direct child of a `variants`
//! object, and otherwise the leaf itself. Everything above a marked position must
//! agree structurally across runs.
//!
//! Entries of a `compoundVariants` array whose `styles` use a marker are
//! expanded instead: one entry per key, each with the key recorded under the
//! enumeration's singular name (`intent: 'primary'`).

use indexmap::IndexMap;
use stylebake_core::{ExtractedNode, Literal, ThemeRef, VariantTable};
use stylebake_script::{EvalError, Interpreter, Value};
use thiserror::Error;

/// Key under which authors group variant styles
pub const VARIANTS_KEY: &str = "variants";

/// Array of conditional style entries
pub const COMPOUND_VARIANTS_KEY: &str = "compoundVariants";

/// Field holding the styles of a compound variant entry
pub const COMPOUND_STYLES_KEY: &str = "styles";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Root,
    Entry,
    Nested,
}

/// Convert the result of a style function.
///
/// Top-level entries that are functions are props-dependent styles: they are
/// called once with opaque props and kept as [`ExtractedNode::Deferred`].
pub fn to_node(interp: &Interpreter, value: &Value) -> Result<ExtractedNode, EvalError> {
    match value {
        Value::Object(_) => convert(interp, value, Position::Root, &mut Vec::new()),
        other => Err(EvalError::Type(format!(
            "style function returned {}, expected an object",
            other.type_name()
        ))),
    }
}

fn convert(
    interp: &Interpreter,
    value: &Value,
    position: Position,
    at: &mut Vec<String>,
) -> Result<ExtractedNode, EvalError> {
    if let Some(lit) = value.as_literal() {
        return Ok(ExtractedNode::Literal(lit));
    }
    match value {
        Value::Tracked(expr) => Ok(ExtractedNode::ThemeRef(ThemeRef::derived(expr.clone()))),
        Value::Theme(node) => Ok(ExtractedNode::theme_ref(node.path().clone())),
        Value::Object(map) => {
            let fields = map.borrow().clone();
            let child = if position == Position::Root {
                Position::Entry
            } else {
                Position::Nested
            };
            let mut out = IndexMap::with_capacity(fields.len());
            for (key, field) in &fields {
                at.push(key.clone());
                let node = convert(interp, field, child, at)?;
                at.pop();
                out.insert(key.clone(), node);
            }
            Ok(ExtractedNode::Object(out))
        }
        Value::Array(items) => {
            let items = items.borrow().clone();
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                at.push(index.to_string());
                out.push(convert(interp, item, Position::Nested, at)?);
                at.pop();
            }
            Ok(ExtractedNode::List(out))
        }
        Value::Function(_) if position == Position::Entry => {
            let body = interp.call(value, vec![Value::Props])?;
            let body = convert(interp, &body, Position::Nested, at)?;
            Ok(ExtractedNode::Deferred(Box::new(body)))
        }
        Value::Function(_) => Err(EvalError::Type(format!(
            "function value at '{}' cannot be compiled",
            at.join(".")
        ))),
        Value::Props => Err(EvalError::PropsDependency),
        Value::Opaque(name) => Err(EvalError::OpaqueBinding(name.to_string())),
        other => Err(EvalError::Type(format!(
            "{} at '{}' cannot be compiled",
            other.type_name(),
            at.join(".")
        ))),
    }
}

/// Variant runs disagree outside a marked position
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("variant runs disagree at '{location}': {reason}")]
pub struct FoldError {
    pub location: String,
    pub reason: String,
}

/// The tree produced by one shadow run
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Bound key per marker, in marker order
    pub keys: Vec<String>,
    pub tree: ExtractedNode,
}

type RunRef<'a> = (&'a [String], &'a ExtractedNode);

/// Fold the runs of one site. `markers` are the site's enumeration ids in the
/// order the runs' keys are recorded.
pub fn fold(markers: &[String], runs: &[Run]) -> Result<ExtractedNode, FoldError> {
    let refs: Vec<RunRef<'_>> = runs.iter().map(|r| (r.keys.as_slice(), &r.tree)).collect();
    if refs.is_empty() {
        return Err(FoldError {
            location: String::new(),
            reason: "no runs".to_string(),
        });
    }
    fold_at(markers, &refs, false, &mut Vec::new())
}

fn fold_at(
    markers: &[String],
    runs: &[RunRef<'_>],
    marked: bool,
    at: &mut Vec<String>,
) -> Result<ExtractedNode, FoldError> {
    let first = runs[0].1;
    if runs.iter().all(|(_, tree)| *tree == first) {
        return Ok(first.clone());
    }

    let container = |node: &ExtractedNode| {
        matches!(
            node,
            ExtractedNode::Object(_) | ExtractedNode::List(_) | ExtractedNode::Deferred(_)
        )
    };
    if marked || !runs.iter().any(|(_, tree)| container(*tree)) {
        return match used_marker(runs, markers.len()) {
            Some(index) => table(markers, runs, index, at),
            None => Err(mismatch(at, "values differ without a marker")),
        };
    }

    let child_marked = at.last().is_some_and(|k| k == VARIANTS_KEY);
    match first {
        ExtractedNode::Object(fields) => {
            let mut children: Vec<Vec<RunRef<'_>>> = vec![Vec::with_capacity(runs.len()); fields.len()];
            for &(keys, tree) in runs {
                let ExtractedNode::Object(other) = tree else {
                    return Err(mismatch(at, "object in some runs only"));
                };
                if !other.keys().eq(fields.keys()) {
                    return Err(mismatch(at, "object keys differ"));
                }
                for (slot, value) in children.iter_mut().zip(other.values()) {
                    slot.push((keys, value));
                }
            }
            let mut out = IndexMap::with_capacity(fields.len());
            for (key, child_runs) in fields.keys().zip(&children) {
                at.push(key.clone());
                let node = fold_at(markers, child_runs, child_marked, at)?;
                at.pop();
                out.insert(key.clone(), node);
            }
            Ok(ExtractedNode::Object(out))
        }
        ExtractedNode::List(items) => {
            let mut children: Vec<Vec<RunRef<'_>>> = vec![Vec::with_capacity(runs.len()); items.len()];
            for &(keys, tree) in runs {
                let ExtractedNode::List(other) = tree else {
                    return Err(mismatch(at, "array in some runs only"));
                };
                if other.len() != items.len() {
                    return Err(mismatch(at, "array lengths differ"));
                }
                for (slot, value) in children.iter_mut().zip(other) {
                    slot.push((keys, value));
                }
            }
            let compound = at.last().is_some_and(|k| k == COMPOUND_VARIANTS_KEY);
            let mut out = Vec::with_capacity(items.len());
            for (index, child_runs) in children.iter().enumerate() {
                at.push(index.to_string());
                match compound.then(|| compound_marker(child_runs, markers.len())).flatten() {
                    Some(marker) => expand_compound(markers, child_runs, marker, at, &mut out)?,
                    None => out.push(fold_at(markers, child_runs, false, at)?),
                }
                at.pop();
            }
            Ok(ExtractedNode::List(out))
        }
        ExtractedNode::Deferred(_) => {
            let mut bodies = Vec::with_capacity(runs.len());
            for &(keys, tree) in runs {
                let ExtractedNode::Deferred(body) = tree else {
                    return Err(mismatch(at, "props function in some runs only"));
                };
                bodies.push((keys, body.as_ref()));
            }
            let body = fold_at(markers, &bodies, false, at)?;
            Ok(ExtractedNode::Deferred(Box::new(body)))
        }
        _ => Err(mismatch(at, "value kinds differ")),
    }
}

/// First marker whose key changes the subtree while all other keys stay fixed
fn used_marker(runs: &[RunRef<'_>], markers: usize) -> Option<usize> {
    (0..markers).find(|&m| {
        runs.iter().enumerate().any(|(i, (keys, tree))| {
            runs[i + 1..].iter().any(|(other_keys, other_tree)| {
                let same_elsewhere = keys
                    .iter()
                    .zip(other_keys.iter())
                    .enumerate()
                    .all(|(j, (a, b))| j == m || a == b);
                same_elsewhere && keys[m] != other_keys[m] && tree != other_tree
            })
        })
    })
}

/// Marker that varies a compound variant entry's `styles`, if the entry is one
fn compound_marker(runs: &[RunRef<'_>], markers: usize) -> Option<usize> {
    let styles: Vec<RunRef<'_>> = runs
        .iter()
        .map(|&(keys, tree)| match tree {
            ExtractedNode::Object(fields) => fields.get(COMPOUND_STYLES_KEY).map(|styles| (keys, styles)),
            _ => None,
        })
        .collect::<Option<_>>()?;
    used_marker(&styles, markers)
}

/// One entry per key of `markers[index]`, the key recorded beside `styles`
fn expand_compound(
    markers: &[String],
    runs: &[RunRef<'_>],
    index: usize,
    at: &mut Vec<String>,
    out: &mut Vec<ExtractedNode>,
) -> Result<(), FoldError> {
    let field = compound_field(&markers[index]);
    let mut groups: IndexMap<&str, Vec<RunRef<'_>>> = IndexMap::new();
    for run in runs {
        groups.entry(run.0[index].as_str()).or_default().push(*run);
    }
    for (key, group) in &groups {
        let ExtractedNode::Object(fields) = fold_at(markers, group, false, at)? else {
            return Err(mismatch(at, "compound variant is not an object"));
        };
        let mut entry = IndexMap::with_capacity(fields.len() + 1);
        for (name, value) in fields {
            if name == COMPOUND_STYLES_KEY {
                entry.insert(field.clone(), ExtractedNode::Literal(Literal::String(key.to_string())));
            }
            entry.insert(name, value);
        }
        out.push(ExtractedNode::Object(entry));
    }
    Ok(())
}

/// Singular of the enumeration's first segment: `intents` -> `intent`,
/// `sizes.alert` -> `size`
pub fn compound_field(enumeration: &str) -> String {
    let head = enumeration.split('.').next().unwrap_or(enumeration);
    match head.strip_suffix('s') {
        Some(singular) if !singular.is_empty() && !singular.ends_with('s') => singular.to_string(),
        _ => head.to_string(),
    }
}

fn table(
    markers: &[String],
    runs: &[RunRef<'_>],
    index: usize,
    at: &mut Vec<String>,
) -> Result<ExtractedNode, FoldError> {
    let mut groups: IndexMap<&str, Vec<RunRef<'_>>> = IndexMap::new();
    for run in runs {
        groups.entry(run.0[index].as_str()).or_default().push(*run);
    }
    let mut cases = IndexMap::with_capacity(groups.len());
    for (key, group) in &groups {
        cases.insert(key.to_string(), fold_at(markers, group, true, at)?);
    }
    Ok(ExtractedNode::VariantTable(VariantTable {
        enumeration: markers[index].clone(),
        cases,
    }))
}

fn mismatch(at: &[String], reason: &str) -> FoldError {
    FoldError {
        location: if at.is_empty() {
            "<root>".to_string()
        } else {
            at.join(".")
        },
        reason: reason.to_string(),
    }
}
