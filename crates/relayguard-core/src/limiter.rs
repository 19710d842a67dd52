//! Token Bucket Limiter
//!
//! Thin wrapper over a direct (unkeyed) governor GCRA limiter: up to `burst`
//! calls pass at once, then one more every `1 / rate` seconds. Time is read
//! through the shared [`Clock`], so limiters follow a `MockClock` in tests.
//!
//! Two edge cases are handled before a quota is built:
//! a non-positive rate means "unlimited" and allows every call, and a zero
//! burst with a positive rate denies every call.

use std::fmt;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::prelude::*;

/// Adapts the shared clock to governor's clock trait
#[derive(Debug, Clone)]
struct LimiterClock(SharedClock);

impl governor::clock::Clock for LimiterClock {
	type Instant = Instant;

	fn now(&self) -> Instant {
		self.0.now()
	}
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, LimiterClock, NoOpMiddleware<Instant>>;

enum Bucket {
	Unlimited,
	Closed,
	Limited(DirectLimiter),
}

pub struct TokenBucketLimiter {
	rate: f64,
	burst: u32,
	bucket: Bucket,
}

impl TokenBucketLimiter {
	/// Create a full bucket
	pub fn new(rate: f64, burst: u32, clock: SharedClock) -> Self {
		let bucket = if rate <= 0.0 || rate.is_nan() {
			Bucket::Unlimited
		} else {
			match NonZeroU32::new(burst) {
				None => Bucket::Closed,
				Some(burst) => Bucket::Limited(RateLimiter::direct_with_clock(
					quota(rate, burst),
					LimiterClock(clock),
				)),
			}
		};
		Self { rate, burst, bucket }
	}

	pub fn rate(&self) -> f64 {
		self.rate
	}

	pub fn burst(&self) -> u32 {
		self.burst
	}

	pub fn is_unlimited(&self) -> bool {
		matches!(self.bucket, Bucket::Unlimited)
	}

	/// Try to consume one token
	pub fn allow(&self) -> bool {
		match &self.bucket {
			Bucket::Unlimited => true,
			Bucket::Closed => false,
			Bucket::Limited(limiter) => limiter.check().is_ok(),
		}
	}
}

impl fmt::Debug for TokenBucketLimiter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokenBucketLimiter")
			.field("rate", &self.rate)
			.field("burst", &self.burst)
			.finish_non_exhaustive()
	}
}

/// One cell every `1 / rate` seconds. The period is clamped so the theoretical
/// arrival time, at most `(burst + 1) * period` ahead, fits governor's u64
/// nanosecond arithmetic with room to spare.
fn quota(rate: f64, burst: NonZeroU32) -> Quota {
	let max_nanos = u64::MAX / (2 * (u64::from(burst.get()) + 1));
	let period = Duration::try_from_secs_f64(1.0 / rate).unwrap_or(Duration::MAX);
	let nanos = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX).clamp(1, max_nanos);

	Quota::with_period(Duration::from_nanos(nanos))
		.unwrap_or_else(|| Quota::per_second(burst))
		.allow_burst(burst)
}


// vim: ts=4
