#![no_main]
use libfuzzer_sys::fuzz_target;
use texbank_question::{ParseStatus, parse_questions};
use texbank_syntax::validate_document;

fuzz_target!(|data: &[u8]| {
    // Malformed markup must come back as diagnostics, never as a panic.
    let s = String::from_utf8_lossy(data);
    let output = parse_questions(&s);

    // A failed parse emits nothing but its one structural diagnostic.
    if output.status == ParseStatus::Failed {
        assert!(output.questions.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
    } else {
        // Structural problems only ever come from the document gate.
        assert!(!output.all_diagnostics().any(|d| d.is_fatal()));
    }
    let _ = validate_document(&s);
});
