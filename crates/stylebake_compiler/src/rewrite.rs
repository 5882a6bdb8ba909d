//! Source rewriting
//!
//! Replaces each style site's callable with the compiled tree from its cache
//! entry. A file is rewritten only when every site in it has a fresh entry;
//! otherwise it is returned unchanged with the offending sites marked.

use crate::codegen::{Codegen, HoistNames, Hoisted};
use crate::discovery::{discover, ApiNames, DiscoveredSite};
use serde::Serialize;
use std::collections::BTreeMap;
use stylebake_core::{content_hash, CacheEntry, StyleSite};
use stylebake_script::{parse_module, ParseError};

/// Per-site outcome of a rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SiteStatus {
    /// Replaced by its compiled form
    Rewritten,
    /// The cache entry was extracted from different file contents
    Stale,
    /// No cache entry for the site
    Missing,
    /// Fresh, but left alone because another site in the file is not
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRewrite {
    pub site: StyleSite,
    pub status: SiteStatus,
}

/// Inputs that must match the ones used for extraction
#[derive(Debug, Clone, Copy)]
pub struct RewriteOptions<'a> {
    /// Extraction environment the cache hashes were computed under
    pub environment: &'a str,
    pub apis: &'a ApiNames,
}

#[derive(Debug, Clone)]
pub struct RewriteOutput {
    pub source: String,
    pub sites: Vec<SiteRewrite>,
}

impl RewriteOutput {
    /// True when every site was rewritten
    pub fn is_complete(&self) -> bool {
        self.sites.iter().all(|s| s.status == SiteStatus::Rewritten)
    }

    pub fn is_modified(&self) -> bool {
        self.sites.iter().any(|s| s.status == SiteStatus::Rewritten)
    }
}

/// Rewrite the style sites of one file from its cache entries.
///
/// `path` is the project-relative file path the entries were recorded under.
pub fn rewrite_source(
    path: &str,
    source: &str,
    entries: &[CacheEntry],
    options: &RewriteOptions<'_>,
) -> Result<RewriteOutput, ParseError> {
    let module = parse_module(source)?;
    let discovered = discover(&module, path, options.apis).sites;
    let hash = content_hash(options.environment, source.as_bytes());

    let mut statuses = Vec::with_capacity(discovered.len());
    let mut ready = Vec::new();
    for site in &discovered {
        let status = match entries.iter().find(|e| e.site == site.site) {
            None => SiteStatus::Missing,
            Some(entry) if !entry.is_fresh(&hash) => SiteStatus::Stale,
            Some(entry) => {
                ready.push((site, entry));
                SiteStatus::Rewritten
            }
        };
        statuses.push(SiteRewrite {
            site: site.site.clone(),
            status,
        });
    }

    if statuses.iter().any(|s| s.status != SiteStatus::Rewritten) {
        for status in &mut statuses {
            if status.status == SiteStatus::Rewritten {
                status.status = SiteStatus::Skipped;
            }
        }
        tracing::debug!(file = path, "File left unmodified: not every site is fresh");
        return Ok(RewriteOutput {
            source: source.to_string(),
            sites: statuses,
        });
    }

    let mut names = HoistNames::from_source(source);
    let mut hoists: BTreeMap<usize, String> = BTreeMap::new();
    let mut replacements: Vec<(usize, usize, String)> = Vec::with_capacity(ready.len());
    for (site, entry) in ready {
        let (code, hoisted) = compile_site(source, site, entry, &mut names);
        let block = hoists.entry(site.statement.start).or_default();
        for h in &hoisted {
            block.push_str(&h.declaration());
        }
        replacements.push((site.target.start, site.target.end, code));
    }

    let mut output = source.to_string();
    let mut edits: Vec<(usize, usize, String, bool)> = replacements
        .into_iter()
        .map(|(start, end, text)| (start, end, text, false))
        .chain(hoists.into_iter().filter(|(_, text)| !text.is_empty()).map(|(at, text)| (at, at, text, true)))
        .collect();
    // Back to front; at equal offsets the replacement goes first so the
    // insertion lands before it.
    edits.sort_by(|a, b| b.0.cmp(&a.0).then(a.3.cmp(&b.3)));
    for (start, end, text, _) in edits {
        output.replace_range(start..end, &text);
    }

    tracing::debug!(file = path, sites = statuses.len(), "Rewrote style sites");
    Ok(RewriteOutput {
        source: output,
        sites: statuses,
    })
}

/// Replacement for the site's call expression plus the constants it needs
fn compile_site(
    source: &str,
    site: &DiscoveredSite,
    entry: &CacheEntry,
    names: &mut HoistNames,
) -> (String, Vec<Hoisted>) {
    let param = site.site.theme_param.as_str();
    let mut codegen = Codegen::new(param, &site.site.export_name, names);
    let tree = codegen.emit(&entry.tree);

    let callable = if site.is_object_literal() && site.extensions.is_empty() {
        tree
    } else {
        format!("({param}) => ({tree})")
    };
    let mut args: Vec<&str> = site.leading_args.iter().map(|s| s.text(source)).collect();
    args.push(&callable);
    let call = format!("{}({})", site.callee.text(source), args.join(", "));
    (call, codegen.into_hoisted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stylebake_core::ExtractedNode;

    const ENV: &str = "test-env";

    fn entry(source: &str, name: &str, tree: serde_json::Value) -> CacheEntry {
        CacheEntry::new(
            StyleSite::new("src/Text.styles.tsx", name, vec![]),
            content_hash(ENV, source.as_bytes()),
            ExtractedNode::from_json(&tree).unwrap(),
        )
    }

    fn rewrite(source: &str, entries: &[CacheEntry]) -> RewriteOutput {
        let apis = ApiNames::default();
        let options = RewriteOptions {
            environment: ENV,
            apis: &apis,
        };
        rewrite_source("src/Text.styles.tsx", source, entries, &options).unwrap()
    }

    #[test]
    fn test_site_is_replaced_and_literals_hoisted() {
        let source = "import { defineStyle } from '@acme/theme';\n\nexport const textStyles = defineStyle('Text', (theme) => ({ text: { color: theme.colors.text.primary, margin: 0 }, box: { flex: 1 } }));\n";
        let entries = vec![entry(
            source,
            "textStyles",
            json!({ "text": { "color": { "themeRef": ["colors", "text", "primary"] }, "margin": 0 }, "box": { "flex": 1 } }),
        )];
        let out = rewrite(source, &entries);

        assert!(out.is_complete());
        let hoist = out.source.find("const __sb_textStyles_0 = {").unwrap();
        let site = out.source.find("export const textStyles = defineStyle('Text', (theme) => ({").unwrap();
        assert!(hoist < site);
        assert!(out.source.starts_with("import { defineStyle } from '@acme/theme';"));
        assert!(out.source.contains("color: theme.colors.text.primary,"));
        assert!(out.source.contains("box: __sb_textStyles_0,"));
        assert!(parse_module(&out.source).is_ok());
    }

    #[test]
    fn test_stale_entry_leaves_file_unmodified() {
        let source = "export const a = defineStyle('A', (theme) => ({ x: { y: 1 } }));\nexport const b = defineStyle('B', (theme) => ({ x: { y: 2 } }));\n";
        let mut stale = entry(source, "b", json!({ "x": { "y": 2 } }));
        stale.source_hash = "old".into();
        let entries = vec![entry(source, "a", json!({ "x": { "y": 1 } })), stale];

        let out = rewrite(source, &entries);
        assert_eq!(out.source, source);
        let statuses: Vec<SiteStatus> = out.sites.iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![SiteStatus::Skipped, SiteStatus::Stale]);
        assert!(!out.is_modified());
    }

    #[test]
    fn test_missing_entry() {
        let source = "extendStyle('Button', (theme) => ({ root: { margin: 0 } }));";
        let out = rewrite(source, &[]);
        assert_eq!(out.sites[0].status, SiteStatus::Missing);
        assert_eq!(out.source, source);
    }

    #[test]
    fn test_builder_chain_collapses_and_statement_hoists() {
        let source = "extendStyle('Button', (t) => ({ root: { margin: 0 } }));\nexport const card = defineStyle('Card', base).extend(ext);\nconst base = (theme) => ({ a: { b: 1 } });\nconst ext = (theme) => ({ a: { c: theme.x } });\n";
        let entries = vec![
            CacheEntry::new(
                StyleSite::new("src/Text.styles.tsx", "extendStyle:Button", vec![]),
                content_hash(ENV, source.as_bytes()),
                ExtractedNode::from_json(&json!({ "root": { "margin": 0 } })).unwrap(),
            ),
            entry(source, "card", json!({ "a": { "b": 1, "c": { "themeRef": ["x"] } } })),
        ];
        let out = rewrite(source, &entries);
        assert!(out.is_complete(), "{:?}", out.sites);
        assert!(out
            .source
            .starts_with("const __sb_extendStyle_Button_0 = {"));
        assert!(out.source.contains("extendStyle('Button', (t) => (__sb_extendStyle_Button_0));"));
        assert!(out.source.contains("defineStyle('Card', (theme) => ({"));
        assert!(out.source.contains("c: theme.x,"));
        assert!(!out.source.contains(".extend(ext)"));
    }

    #[test]
    fn test_object_literal_argument_becomes_constant() {
        let source = "const styles = StyleSheet.create({ root: { flex: 1 } });";
        let entries = vec![entry(source, "styles", json!({ "root": { "flex": 1 } }))];
        let out = rewrite(source, &entries);
        assert!(out.source.contains("const styles = StyleSheet.create(__sb_styles_0);"));
    }

    #[test]
    fn test_sites_with_alike_names_get_distinct_constants() {
        let source = "extendStyle('Button', (t) => ({ root: { margin: 0 } }));\nextendStyle('Button', (t) => ({ root: { margin: 1 } }));\nextendStyle('Button_2', (t) => ({ root: { margin: 2 } }));\n";
        let entries: Vec<CacheEntry> = ["extendStyle:Button", "extendStyle:Button#2", "extendStyle:Button_2"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                CacheEntry::new(
                    StyleSite::new("src/Text.styles.tsx", *name, vec![]),
                    content_hash(ENV, source.as_bytes()),
                    ExtractedNode::from_json(&json!({ "root": { "margin": i } })).unwrap(),
                )
            })
            .collect();
        let out = rewrite(source, &entries);
        assert!(out.is_complete(), "{:?}", out.sites);

        let declared: Vec<&str> = out
            .source
            .lines()
            .filter_map(|line| line.strip_prefix("const "))
            .filter_map(|rest| rest.split(' ').next())
            .collect();
        assert_eq!(declared.len(), 3);
        let unique: std::collections::BTreeSet<&str> = declared.iter().copied().collect();
        assert_eq!(unique.len(), 3, "{declared:?}");
        assert!(out.source.contains("extendStyle('Button_2', (t) => (__sb_extendStyle_Button_2_1));"));
        assert!(parse_module(&out.source).is_ok());
    }
}
