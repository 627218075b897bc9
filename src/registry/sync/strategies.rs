use std::time::Duration;

/// Trait for retry policies applied after a failed sync pass
///
/// Implementations must be deterministic: the same attempt number always yields the same delay.
pub trait ReconnectionStrategy: Send + Sync {
	/// Delay before retrying after failed attempt `attempt` (1-based), or `None` to stop
	/// retrying automatically.
	fn reconnect_after(&self, attempt: u32) -> Option<Duration>;
}

/// Exponential backoff: `multiplier * e^(attempt / exponent)`
#[derive(Debug, Clone)]
pub struct ExponentialReconnection {
	/// Base delay in seconds
	pub multiplier: f64,
	/// Growth divisor applied to the attempt number
	pub exponent: f64,
	/// Upper bound on a single delay
	pub max_delay: Option<Duration>,
	/// Last attempt that is still retried
	pub max_attempts: Option<u32>,
}

impl Default for ExponentialReconnection {
	fn default() -> Self {
		Self {
			multiplier: 0.3,
			exponent: 2.0,
			max_delay: None,
			max_attempts: None,
		}
	}
}

impl ReconnectionStrategy for ExponentialReconnection {
	fn reconnect_after(&self, attempt: u32) -> Option<Duration> {
		if self.max_attempts.is_some_and(|max| attempt > max) {
			return None;
		}

		let seconds = self.multiplier * (f64::from(attempt) / self.exponent).exp();
		let delay = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX);

		Some(match self.max_delay {
			Some(max) => delay.min(max),
			None => delay,
		})
	}
}

/// Same delay after every failure
#[derive(Debug, Clone)]
pub struct ConstantReconnection {
	pub delay: Duration,
	pub max_attempts: Option<u32>,
}

impl ConstantReconnection {
	pub fn new(delay: Duration) -> Self {
		Self {
			delay,
			max_attempts: None,
		}
	}
}

impl ReconnectionStrategy for ConstantReconnection {
	fn reconnect_after(&self, attempt: u32) -> Option<Duration> {
		match self.max_attempts {
			Some(max) if attempt > max => None,
			_ => Some(self.delay),
		}
	}
}

/// Never retry automatically
#[derive(Debug, Clone, Default)]
pub struct NoReconnection;

impl ReconnectionStrategy for NoReconnection {
	fn reconnect_after(&self, _attempt: u32) -> Option<Duration> {
		None
	}
}
