use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of the markup conventions the parser looks for.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```
/// use texbank_question::ParseOptions;
///
/// let opts: ParseOptions = serde_json::from_str(r#"{ "environment": "bt" }"#).unwrap();
/// assert_eq!(opts.environment, "bt");
/// assert_eq!(opts.solution_command, r"\loigiai");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Environment holding one question.
    pub environment: String,
    /// Marker placed inside a correct answer entry.
    pub correct_marker: String,
    pub solution_command: String,
    pub choice_command: String,
    pub true_false_command: String,
    pub short_answer_command: String,
    /// Merge answer lines that were broken inside a `\dfrac` numerator.
    pub repair_split_fractions: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            environment: "ex".to_string(),
            correct_marker: "\\True".to_string(),
            solution_command: "\\loigiai".to_string(),
            choice_command: "\\choice".to_string(),
            true_false_command: "\\choiceTF".to_string(),
            short_answer_command: "\\shortans".to_string(),
            repair_split_fractions: true,
        }
    }
}

impl ParseOptions {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let options: ParseOptions = serde_json::from_str(&content)?;
        log::info!("Loaded parse options from {:?}", path);
        Ok(options)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
