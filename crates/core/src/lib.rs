//! Core traits and types for the Nepali speech service
//!
//! This crate provides foundational types used across all other crates:
//! - `TextToSpeech` and `Translator` traits for pluggable model backends
//! - The in-memory `Waveform` buffer
//! - Translation request/response types and language tags
//! - Error types

pub mod audio;
pub mod error;
pub mod traits;
pub mod translation;

pub use audio::{Waveform, DEFAULT_HEADROOM};
pub use error::{Error, Result};
pub use traits::{TextToSpeech, Translator};
pub use translation::{TranslateOptions, TranslationResult, ENGLISH, NEPALI};
