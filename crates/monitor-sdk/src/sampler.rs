// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-type probabilistic sampling.

use std::fmt;

use monitor_core::{Event, EventType};

use crate::error::{Result, SdkError};

/// Keep probabilities in `[0, 1]` per event type.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRates {
	pub error: f64,
	pub performance: f64,
	pub behavior: f64,
	/// Every other event type.
	pub default: f64,
}

impl Default for SampleRates {
	fn default() -> Self {
		Self {
			error: 1.0,
			performance: 0.1,
			behavior: 0.5,
			default: 1.0,
		}
	}
}

impl SampleRates {
	pub fn rate_for(&self, event_type: EventType) -> f64 {
		match event_type {
			EventType::Error => self.error,
			EventType::Performance => self.performance,
			EventType::Behavior => self.behavior,
			_ => self.default,
		}
	}

	pub fn validate(&self) -> Result<()> {
		for (name, rate) in [
			("error", self.error),
			("performance", self.performance),
			("behavior", self.behavior),
			("default", self.default),
		] {
			if !(0.0..=1.0).contains(&rate) {
				return Err(SdkError::InvalidConfig(format!(
					"{name} sample rate must be within [0, 1], got {rate}"
				)));
			}
		}
		Ok(())
	}
}

/// Decides whether an event survives sampling.
pub struct Sampler {
	rates: SampleRates,
	roll: Box<dyn Fn() -> f64 + Send + Sync>,
}

impl Sampler {
	/// Sampler drawing from `fastrand`.
	pub fn new(rates: SampleRates) -> Self {
		Self::with_source(rates, fastrand::f64)
	}

	/// Sampler drawing from `roll`, which must return values in `[0, 1)`.
	pub fn with_source(rates: SampleRates, roll: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
		Self {
			rates,
			roll: Box::new(roll),
		}
	}

	/// Keeps the event iff a uniform draw is below the rate for its type.
	pub fn sample(&self, event: &Event) -> bool {
		(self.roll)() < self.rates.rate_for(event.event_type)
	}

	pub fn rates(&self) -> &SampleRates {
		&self.rates
	}
}

impl fmt::Debug for Sampler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Sampler").field("rates", &self.rates).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn event(event_type: EventType) -> Event {
		Event::new(event_type, serde_json::json!({}))
	}

	#[test]
	fn rate_per_type() {
		let rates = SampleRates::default();
		assert_eq!(rates.rate_for(EventType::Error), 1.0);
		assert_eq!(rates.rate_for(EventType::Performance), 0.1);
		assert_eq!(rates.rate_for(EventType::Behavior), 0.5);
		assert_eq!(rates.rate_for(EventType::Network), 1.0);
	}

	#[test]
	fn draw_below_rate_keeps() {
		let sampler = Sampler::with_source(SampleRates::default(), || 0.3);
		assert!(sampler.sample(&event(EventType::Error)));
		assert!(sampler.sample(&event(EventType::Behavior)));
		assert!(!sampler.sample(&event(EventType::Performance)));
	}

	#[test]
	fn zero_rate_drops_everything() {
		let rates = SampleRates {
			error: 0.0,
			..Default::default()
		};
		let sampler = Sampler::with_source(rates, || 0.0);
		assert!(!sampler.sample(&event(EventType::Error)));
	}

	#[test]
	fn rejects_out_of_range() {
		let rates = SampleRates {
			behavior: 1.5,
			..Default::default()
		};
		assert!(rates.validate().is_err());

		let rates = SampleRates {
			error: f64::NAN,
			..Default::default()
		};
		assert!(rates.validate().is_err());
	}

	proptest! {
		#[test]
		fn full_rate_always_keeps(draw in 0.0f64..1.0) {
			let rates = SampleRates { performance: 1.0, ..Default::default() };
			let sampler = Sampler::with_source(rates, move || draw);
			prop_assert!(sampler.sample(&event(EventType::Performance)));
		}
	}
}
