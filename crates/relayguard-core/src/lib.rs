//! Stateful anti-abuse evaluators for relayguard.
//!
//! Everything here keeps bounded, internally synchronized per-identity state:
//!
//! - [`RateLimiterEngine`]: per-kind token buckets keyed by address and/or public key
//! - [`EmergencyGuard`]: throttles how fast never-seen public keys are admitted
//! - [`AbuseRatioTracker`]: rejects identities whose activity is mostly reposts
//! - [`FloodGuard`]: chat spam heuristics with a proof-of-work escape hatch
//! - [`LanguagePolicy`]: allow-listed languages behind an [`ApprovalCache`]
//!
//! The building blocks ([`TimedCache`], [`TokenBucketLimiter`], identity keying)
//! are public as well.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod approval;
pub mod cache;
pub mod config;
pub mod emergency;
pub mod flood;
pub mod keying;
pub mod language;
pub mod limiter;
pub mod pow;
pub mod prelude;
pub mod rate_limiter;
pub mod repost_abuse;

pub use approval::ApprovalCache;
pub use cache::TimedCache;
pub use config::{
	CharRange, EmergencyConfig, FloodConfig, LanguageConfig, PerAddressConfig, RateDimension,
	RateLimitRule, RateLimiterConfig, RepostAbuseConfig, COMBINING_MARK_RANGES,
};
pub use emergency::EmergencyGuard;
pub use flood::FloodGuard;
pub use keying::{normalize_address, normalize_pubkey, AddressPrefixes, IdentityKey};
pub use language::LanguagePolicy;
pub use limiter::TokenBucketLimiter;
pub use pow::Nip13Pow;
pub use rate_limiter::RateLimiterEngine;
pub use repost_abuse::{AbuseRatioTracker, ActivityStats, PostClass};

// vim: ts=4
