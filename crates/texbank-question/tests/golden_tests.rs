use std::fs;
use std::path::Path;
use texbank_question::parse_questions;

#[test]
fn run_golden_tests() {
    let fixtures_dir = Path::new("tests/fixtures");
    if !fixtures_dir.exists() {
        // Skip if no fixtures
        return;
    }

    let mut checked = 0;
    for entry in fs::read_dir(fixtures_dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_none_or(|ext| ext != "tex") {
            continue;
        }

        let source = fs::read_to_string(&path).expect("Failed to read fixture");
        let actual = serde_json::to_value(parse_questions(&source)).expect("Failed to serialize output");
        let golden_path = path.with_extension("golden.json");

        if std::env::var("UPDATE_GOLDEN").is_ok() {
            let pretty = serde_json::to_string_pretty(&actual).unwrap();
            fs::write(&golden_path, pretty + "\n").expect("Failed to update golden file");
        } else {
            let expected = fs::read_to_string(&golden_path)
                .expect("Failed to read golden file (run with UPDATE_GOLDEN=1 to create)");
            let expected: serde_json::Value =
                serde_json::from_str(&expected).expect("Golden file is not valid JSON");
            assert_eq!(actual, expected, "Golden test failed for {:?}", path);
        }
        checked += 1;
    }
    assert!(checked > 0, "no .tex fixtures found");
}
