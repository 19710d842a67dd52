//! External Collaborators
//!
//! Proof-of-work validation and language classification are consumed as black
//! boxes. Implementations are constructed by the caller and shared by reference.

use std::sync::Arc;

use crate::event::Event;
use crate::prelude::*;

/// Pass/fail proof-of-work check
pub trait PowValidator: Send + Sync {
	/// Whether `event` carries proof-of-work of at least `difficulty`
	fn is_valid(&self, event: &Event, difficulty: u32) -> bool;
}

/// Result of classifying a piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
	/// Canonical language label, as returned by [`LanguageClassifier::resolve`]
	pub language: String,
	/// Confidence in `0.0..=1.0`
	pub confidence: f64,
}

/// Content language classifier
pub trait LanguageClassifier: Send + Sync {
	/// Map a configured name or ISO code to the classifier's canonical label.
	/// Returns `None` for names the classifier does not support.
	fn resolve(&self, name: &str) -> Option<String>;

	/// Most likely language of `text`; `Ok(None)` if it cannot be determined
	fn detect(&self, text: &str) -> RgResult<Option<Detection>>;

	/// Confidence that `text` is written in `language` (a canonical label)
	fn confidence(&self, text: &str, language: &str) -> RgResult<f64>;
}

pub type SharedPowValidator = Arc<dyn PowValidator>;
pub type SharedClassifier = Arc<dyn LanguageClassifier>;

// vim: ts=4
