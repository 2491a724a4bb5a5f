//! The five coarse request categories that drive planning.

use serde::{Deserialize, Serialize};

/// The category assigned to a user request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// A question answered from the notebook's materials
    Question,
    /// Analysis over tabular or numeric data
    DataAnalysis,
    /// Open-ended research that needs the web
    Research,
    /// Writing and running code
    CodeExecution,
    /// Producing an artifact: quiz, flashcards, slides, notes
    ContentGeneration,
}

impl Intent {
    /// All intents, in the order the escalation parser scans for them.
    ///
    /// `Question` comes last so that a reply mentioning several labels
    /// resolves to the more specific one.
    pub const ESCALATION_ORDER: [Intent; 5] = [
        Intent::DataAnalysis,
        Intent::CodeExecution,
        Intent::Research,
        Intent::ContentGeneration,
        Intent::Question,
    ];

    /// The upper-case label used in prompts and serialized output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Question => "QUESTION",
            Self::DataAnalysis => "DATA_ANALYSIS",
            Self::Research => "RESEARCH",
            Self::CodeExecution => "CODE_EXECUTION",
            Self::ContentGeneration => "CONTENT_GENERATION",
        }
    }

    /// Whether planning for this intent reads the notebook's source materials.
    pub fn reads_materials(&self) -> bool {
        matches!(
            self,
            Self::Question | Self::ContentGeneration | Self::DataAnalysis
        )
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    /// Accepts the label in any case, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Self::ESCALATION_ORDER
            .into_iter()
            .find(|intent| intent.label() == normalized)
            .ok_or_else(|| format!("unknown intent: {s}"))
    }
}
