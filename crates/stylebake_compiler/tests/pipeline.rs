use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use stylebake_compiler::{run, BuildSettings, CacheStore, FileStatus, RunMode};
use stylebake_core::{DiagnosticKind, ExtractedNode, Severity, ThemePath};
use stylebake_theme::{Target, ThemeShape};

const TEXT_STYLES: &str = "import { defineStyle } from '@acme/theme';\n\nexport const textStyles = defineStyle('Text', (theme) => ({\n  text: { color: theme.colors.text.primary, margin: 0 },\n}));\n";

fn shape() -> ThemeShape {
    ThemeShape::from_json(&json!({
        "mode": "light",
        "colors": { "text": { "primary": "#111827", "muted": "#6b7280" } },
        "spacing": { "sm": 4, "md": 8 }
    }))
    .unwrap()
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn settings(root: &Path) -> BuildSettings {
    let mut settings = BuildSettings::new(root, shape());
    settings.jobs = 2;
    settings
}

fn cached_tree(root: &Path, settings: &BuildSettings, name: &str) -> ExtractedNode {
    let (store, _) = CacheStore::open(root.join(&settings.cache_path)).unwrap();
    store
        .entries()
        .iter()
        .find(|e| e.site.export_name == name)
        .map(|e| e.tree.clone())
        .expect("site is cached")
}

#[tokio::test]
async fn text_scenario_records_theme_ref_and_literal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Text.styles.tsx", TEXT_STYLES);
    let settings = settings(dir.path());

    let report = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    assert!(!report.has_fatal(), "{:?}", report.diagnostics);
    assert_eq!(report.files_with(FileStatus::Extracted), 1);

    let tree = cached_tree(dir.path(), &settings, "textStyles");
    assert_eq!(
        tree.get(&["text", "color"]),
        Some(&ExtractedNode::theme_ref(ThemePath::from(&["colors", "text", "primary"][..])))
    );
    assert_eq!(
        tree.to_json(),
        json!({ "text": { "color": { "themeRef": ["colors", "text", "primary"] }, "margin": 0 } })
    );
}

#[tokio::test]
async fn shape_changing_ternary_fails_only_its_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Text.styles.tsx", TEXT_STYLES);
    write(
        dir.path(),
        "src/Box.styles.ts",
        "export const boxStyles = defineStyle('Box', (theme) => ({\n  box: theme.mode === 'dark' ? { a: 1 } : { b: 2 },\n}));\n",
    );
    let settings = settings(dir.path());

    let report = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    assert!(report.has_fatal());
    let errors: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::UnresolvableThemeUsage);
    assert_eq!(errors[0].file, "src/Box.styles.ts");
    assert_eq!(errors[0].path.as_ref().map(|p| p.to_string()), Some("mode".to_string()));

    let statuses: Vec<(String, FileStatus)> = report.files.iter().map(|f| (f.file.clone(), f.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("src/Box.styles.ts".to_string(), FileStatus::Failed),
            ("src/Text.styles.tsx".to_string(), FileStatus::Extracted),
        ]
    );
    let (store, _) = CacheStore::open(dir.path().join(&settings.cache_path)).unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn soft_fail_downgrades_site_failures() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/Box.styles.ts",
        "export const boxStyles = defineStyle('Box', (theme) => ({ box: { color: theme.palette.main } }));\n",
    );
    let mut settings = settings(dir.path());
    settings.soft_fail = true;

    let report = run(Arc::new(settings), RunMode::Build).await.unwrap();
    assert!(!report.has_fatal());
    assert_eq!(report.count(Severity::Warning), 1);
    assert!(!report.files[0].rewritten);

    let copied = fs::read_to_string(dir.path().join(".stylebake/out/src/Box.styles.ts")).unwrap();
    assert_eq!(copied, fs::read_to_string(dir.path().join("src/Box.styles.ts")).unwrap());
}

#[tokio::test]
async fn cache_is_reused_then_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Text.styles.tsx", TEXT_STYLES);
    let settings = settings(dir.path());

    let first = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    assert_eq!(first.files[0].status, FileStatus::Extracted);

    let second = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    assert_eq!(second.files[0].status, FileStatus::Fresh);

    write(
        dir.path(),
        "src/Text.styles.tsx",
        &TEXT_STYLES.replace("margin: 0", "margin: theme.spacing.sm"),
    );
    let edited = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    assert_eq!(edited.files[0].status, FileStatus::Extracted);
    let tree = cached_tree(dir.path(), &settings, "textStyles");
    assert_eq!(
        tree.get(&["text", "margin"]),
        Some(&ExtractedNode::theme_ref(ThemePath::from(&["spacing", "sm"][..])))
    );

    let mut retargeted = settings.clone();
    retargeted.target = Target::Ios;
    let report = run(Arc::new(retargeted), RunMode::Extract).await.unwrap();
    assert_eq!(report.files[0].status, FileStatus::Extracted);
}

#[tokio::test]
async fn check_mode_does_not_write_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Text.styles.tsx", TEXT_STYLES);
    let settings = settings(dir.path());

    let report = run(Arc::new(settings.clone()), RunMode::Check).await.unwrap();
    assert_eq!(report.files.len(), 1);
    assert!(!dir.path().join(&settings.cache_path).exists());
}

#[tokio::test]
async fn removed_sites_are_pruned() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Text.styles.tsx", TEXT_STYLES);
    let settings = settings(dir.path());
    run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();

    fs::remove_file(dir.path().join("src/Text.styles.tsx")).unwrap();
    let report = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    assert_eq!(report.pruned.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::MissingStyleSite);
    assert_eq!(report.diagnostics[0].severity, Severity::Info);
    assert!(!report.has_fatal());
}

#[tokio::test]
async fn extraction_is_deterministic() {
    let source = r#"
        export const alertStyles = defineStyle('Alert', (theme) => ({
          root: {
            padding: theme.spacing.md,
            border: `1px solid ${theme.colors.text.muted}`,
            variants: { tone: { color: theme.$intents.primary } },
          },
          title: { fontSize: 14, lineHeight: 1.4 },
        }));
    "#;
    let shape = ThemeShape::from_json(&json!({
        "colors": { "text": { "muted": "#6b7280" } },
        "spacing": { "md": 8 },
        "intents": { "info": { "primary": "#3b82f6" }, "danger": { "primary": "#ef4444" } }
    }))
    .unwrap();

    let mut bytes = Vec::new();
    for _ in 0..2 {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/Alert.styles.ts", source);
        let mut settings = BuildSettings::new(dir.path(), shape.clone());
        settings.jobs = 1;
        let report = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
        assert!(!report.has_fatal(), "{:?}", report.diagnostics);
        let tree = cached_tree(dir.path(), &settings, "alertStyles");
        bytes.push(serde_json::to_vec(&tree.to_json()).unwrap());
    }
    assert_eq!(bytes[0], bytes[1]);

    let tree: serde_json::Value = serde_json::from_slice(&bytes[0]).unwrap();
    let cases: Vec<&String> = tree["root"]["variants"]["tone"]["variantTable"]["cases"]
        .as_object()
        .map(|m| m.keys().collect())
        .unwrap_or_default();
    assert_eq!(cases, vec!["info", "danger"]);
}

#[tokio::test]
async fn editing_a_literal_changes_only_that_leaf() {
    let dir = tempfile::tempdir().unwrap();
    let source = "export const cardStyles = defineStyle('Card', (theme) => ({\n  card: { color: theme.colors.text.primary, margin: 0, padding: theme.spacing.md },\n  title: { fontWeight: 'bold' },\n}));\n";
    write(dir.path(), "src/Card.styles.ts", source);
    let settings = settings(dir.path());

    run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    let before = cached_tree(dir.path(), &settings, "cardStyles").to_json();

    write(dir.path(), "src/Card.styles.ts", &source.replace("margin: 0", "margin: 4"));
    let report = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    assert_eq!(report.files[0].status, FileStatus::Extracted);
    let after = cached_tree(dir.path(), &settings, "cardStyles").to_json();

    let mut expected = before.clone();
    expected["card"]["margin"] = json!(4);
    assert_eq!(after, expected);
    assert_ne!(after, before);
}

#[tokio::test]
async fn formatting_and_unrelated_edits_keep_the_tree() {
    let dir = tempfile::tempdir().unwrap();
    let source = "const label = (n) => `#${n}`;\n\nexport const textStyles = defineStyle('Text', (theme) => ({\n  text: { color: theme.colors.text.primary, margin: 0 },\n}));\n";
    write(dir.path(), "src/Text.styles.ts", source);
    let settings = settings(dir.path());

    run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    let before = serde_json::to_vec(&cached_tree(dir.path(), &settings, "textStyles").to_json()).unwrap();

    let edited = source
        .replace("const label = (n) => `#${n}`;", "// numbering\nconst label = (n) => `No. ${n + 1}`;")
        .replace("margin: 0 }", "  margin: 0, /* reset */\n  }");
    write(dir.path(), "src/Text.styles.ts", &edited);
    let report = run(Arc::new(settings.clone()), RunMode::Extract).await.unwrap();
    assert_eq!(report.files[0].status, FileStatus::Extracted);
    let after = serde_json::to_vec(&cached_tree(dir.path(), &settings, "textStyles").to_json()).unwrap();

    assert_eq!(before, after);
}
