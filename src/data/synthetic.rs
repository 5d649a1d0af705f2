//! Synthetic reference histograms.
//!
//! Stand-in for detector simulations: for every emitted multiplicity
//! `e = 1..=max_emitted` we draw `events_per_bin` detected multiplicities from
//! a Poisson distribution whose mean is the response model `a·(1 - exp(-e/b))`.
//! The conditional mean of each column therefore follows the model up to
//! counting noise, which is what the reducer and the fitter expect.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;

use crate::domain::{HistogramEntry, ResponseParams};
use crate::error::AppError;
use crate::models::response::forward;

/// Generator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    pub params: ResponseParams,
    pub max_emitted: u32,
    pub events_per_bin: u32,
    pub seed: u64,
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        let p = self.params;
        if !(p.a.is_finite() && p.b.is_finite() && p.a > 0.0 && p.b > 0.0) {
            return Err(AppError::config(format!(
                "Response constants must be finite and > 0 (a={}, b={}).",
                p.a, p.b
            )));
        }
        if self.max_emitted == 0 || self.events_per_bin == 0 {
            return Err(AppError::config("Emitted range and events per bin must be > 0."));
        }
        Ok(())
    }
}

/// Draw a reference histogram as `(emitted, detected, count)` entries.
///
/// The same seed always yields the same histogram.
pub fn generate_reference_histogram(config: &SyntheticConfig) -> Result<Vec<HistogramEntry>, AppError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut entries = Vec::new();
    for emitted in 1..=config.max_emitted {
        let e = f64::from(emitted);
        let mean = forward(e, config.params);
        let poisson = Poisson::new(mean)
            .map_err(|err| AppError::config(format!("Detection noise for e={e} (mean {mean}): {err}")))?;

        let mut counts: BTreeMap<u64, u32> = BTreeMap::new();
        for _ in 0..config.events_per_bin {
            let detected: f64 = poisson.sample(&mut rng);
            *counts.entry(detected as u64).or_insert(0) += 1;
        }

        entries.extend(counts.into_iter().map(|(detected, count)| HistogramEntry {
            x: e,
            y: detected as f64,
            weight: f64::from(count),
        }));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventHistogram2D;
    use crate::fit::{FitOptions, fit_response};
    use crate::reduce::reduce_response;

    fn config(seed: u64) -> SyntheticConfig {
        SyntheticConfig {
            params: ResponseParams { a: 19.0, b: 28.0 },
            max_emitted: 60,
            events_per_bin: 4000,
            seed,
        }
    }

    #[test]
    fn same_seed_same_histogram() {
        let small = SyntheticConfig {
            max_emitted: 5,
            events_per_bin: 50,
            ..config(11)
        };
        assert_eq!(
            generate_reference_histogram(&small).unwrap(),
            generate_reference_histogram(&small).unwrap()
        );
    }

    #[test]
    fn every_column_holds_all_events() {
        let small = SyntheticConfig {
            max_emitted: 8,
            events_per_bin: 200,
            ..config(3)
        };
        let entries = generate_reference_histogram(&small).unwrap();
        let hist = EventHistogram2D::from_entries(&entries).unwrap();
        assert_eq!(hist.n_columns(), 8);
        for col in 0..hist.n_columns() {
            assert_eq!(hist.column_weight(col), 200.0);
        }
    }

    #[test]
    fn fit_recovers_generating_constants() {
        let entries = generate_reference_histogram(&config(2024)).unwrap();
        let hist = EventHistogram2D::from_entries(&entries).unwrap();
        let curve = reduce_response(&hist, "synthetic", None);
        let fitted = fit_response(&curve, &FitOptions::single()).unwrap();

        assert!((fitted.a - 19.0).abs() / 19.0 < 0.1, "a = {}", fitted.a);
        assert!((fitted.b - 28.0).abs() / 28.0 < 0.1, "b = {}", fitted.b);
    }

    #[test]
    fn invalid_constants_are_rejected() {
        let bad = SyntheticConfig {
            params: ResponseParams { a: -1.0, b: 28.0 },
            ..config(1)
        };
        assert!(generate_reference_histogram(&bad).is_err());
    }
}
