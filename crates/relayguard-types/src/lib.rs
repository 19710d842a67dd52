//! Shared types for the relayguard policy engine.
//!
//! Evaluators, their collaborators and the facade all speak this vocabulary:
//! events, verdicts, request metadata, the clock port and the error type.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod event;
pub mod external;
pub mod policy;
pub mod prelude;

pub use clock::{Clock, MockClock, SharedClock, SystemClock};
pub use error::{ConfigWarning, Error, RgResult};
pub use event::{kind, Event};
pub use external::{
	Detection, LanguageClassifier, PowValidator, SharedClassifier, SharedPowValidator,
};
pub use policy::{Evaluator, RequestMeta, Verdict, META_LANGUAGE};

// vim: ts=4
