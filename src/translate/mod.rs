pub mod interface;
pub mod client;

pub use interface::{TranslationResult, Translator};
pub use client::YandexTranslator;
