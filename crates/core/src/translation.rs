//! Translation request/response types

use serde::{Deserialize, Serialize};

/// FLORES-200 tag for English in Latin script
pub const ENGLISH: &str = "eng_Latn";

/// FLORES-200 tag for Nepali in Devanagari script
pub const NEPALI: &str = "npi_Deva";

/// Generation knobs passed on every translate call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateOptions {
    pub max_new_tokens: usize,
    pub num_beams: usize,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            num_beams: 4,
        }
    }
}

/// Output of one translation call. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
    pub model_id: String,
    pub src_lang: String,
    pub tgt_lang: String,
}

impl TranslationResult {
    /// Empty result for blank input; the model is never consulted.
    pub fn empty(model_id: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            model_id: model_id.into(),
            src_lang: ENGLISH.to_string(),
            tgt_lang: NEPALI.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
