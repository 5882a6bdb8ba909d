use stylebake_theme::{Enumerations, ShapePreset, ThemeShape};

#[test]
fn preset_catalog_contains_expected_presets() {
    let mut ids: Vec<&str> = ShapePreset::all().iter().map(|p| p.id()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["minimal", "standard"]);
}

#[test]
fn standard_preset_binds_common_enumerations() {
    let shape = ShapePreset::Standard.shape().unwrap();
    let enums = Enumerations::default();

    for id in ["intents", "sizes.alert", "sizes.button", "typography", "colors.surface"] {
        let keys = enums
            .keys(id, &shape)
            .unwrap_or_else(|e| panic!("enumeration {id} should resolve: {e}"));
        assert!(!keys.is_empty(), "enumeration {id} should have keys");
    }
    assert_eq!(
        enums.keys("sizes.alert", &shape).unwrap(),
        vec!["xs", "sm", "md", "lg", "xl"]
    );
}

#[test]
fn every_intent_has_the_same_fields() {
    let instance = ShapePreset::Standard.instance();
    let intents = instance["intents"].as_object().unwrap();
    for (name, intent) in intents {
        let mut fields: Vec<&String> = intent.as_object().unwrap().keys().collect();
        fields.sort();
        assert_eq!(
            fields,
            vec!["contrast", "dark", "light", "primary"],
            "intent {name} should have the standard fields"
        );
    }
}

#[test]
fn preset_written_to_disk_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("theme.json");
    let text = serde_json::to_string_pretty(&ShapePreset::Minimal.instance()).unwrap();
    std::fs::write(&path, text).unwrap();

    let loaded = ThemeShape::load(&path).unwrap();
    assert_eq!(loaded.fingerprint(), ShapePreset::Minimal.shape().unwrap().fingerprint());
}
