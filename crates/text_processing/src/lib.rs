//! Text processing for the Nepali speech service
//!
//! This crate provides:
//! - **Normalization**: the acoustic model's text front-end (NFKC, quote
//!   folding, zero-width stripping, ASCII lowercasing, whitespace collapse,
//!   optional danda insertion)
//! - **Translation**: English → Nepali via a lazily loaded NLLB-200 model
//!
//! # Example
//!
//! ```ignore
//! use nepali_tts_text_processing::{create_translator, HttpTranslatorConfig, TextNormalizer};
//!
//! let normalizer = TextNormalizer::default();
//! assert_eq!(normalizer.normalize("  “Hello”  नमस्ते ", true), "\"hello\" नमस्ते।");
//!
//! let translator = create_translator(HttpTranslatorConfig::default());
//! let result = translator.translate("hello", &Default::default()).await?;
//! ```

pub mod normalize;
pub mod translation;

pub use normalize::{normalize, TextNormalizer, DANDA, DOUBLE_DANDA};
pub use translation::{
    create_translator, Device, HttpTranslationModel, HttpTranslatorConfig, ModelLoader,
    NllbTranslator, TranslationModel,
};
