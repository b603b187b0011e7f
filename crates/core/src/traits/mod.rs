//! Core traits for the speech service
//!
//! Both traits are object safe so the request pipeline can hold
//! `Arc<dyn TextToSpeech>` / `Arc<dyn Translator>` and tests can swap in mocks.
//!
//! ```text
//!   - TextToSpeech: Nepali text → Waveform
//!   - Translator:   English text → Nepali text
//! ```

mod speech;

pub use speech::{TextToSpeech, Translator};
