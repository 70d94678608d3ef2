//! Summary statistics over independent rate observations.
//!
//! Several observations of the same currency pair (possibly from different
//! sources, possibly quoted in the opposite direction) fold into a single
//! [`Rate`] carrying a [`RateStats`] envelope, ready for historical export.

use chrono::{DateTime, FixedOffset};

use crate::error::CambioError;
use crate::rate::{Rate, RateStats};

/// Source name recorded when collected samples disagree on their origin.
pub const MULTIPLE_SOURCES: &str = "<<multiple-sources>>";

/// Incremental accumulator for rate samples of one currency pair.
///
/// The first sample fixes the pair and direction; later samples quoted the
/// opposite way are normalized via [`Rate::reciprocal`] before folding.
/// Samples are processed in input order.
#[derive(Debug, Default)]
pub struct RateCollector {
    template: Option<Rate>,
    samples: u32,
    sum: f64,
    lo: f64,
    hi: f64,
    date_0: Option<DateTime<FixedOffset>>,
    rate_at_0: f64,
    date_1: Option<DateTime<FixedOffset>>,
    rate_at_1: f64,
    multi_source: bool,
}

impl RateCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample in.
    ///
    /// # Errors
    /// [`CambioError::MismatchedPair`] if the sample, after reciprocal
    /// normalization, still names a different pair than the first sample.
    pub fn push(&mut self, sample: &Rate) -> Result<(), CambioError> {
        let Some(template) = &self.template else {
            self.template = Some(sample.clone());
            self.accumulate(sample);
            return Ok(());
        };

        let (want_base, want_quote) = (template.base().code(), template.quote().code());
        let (got_base, got_quote) = (sample.base().code(), sample.quote().code());

        if got_base == want_quote && got_quote == want_base {
            let flipped = sample.reciprocal();
            self.accumulate(&flipped);
            return Ok(());
        }
        if got_base != want_base || got_quote != want_quote {
            return Err(CambioError::MismatchedPair {
                expected_base: want_base,
                expected_quote: want_quote,
                base: got_base,
                quote: got_quote,
            });
        }
        self.accumulate(sample);
        Ok(())
    }

    fn accumulate(&mut self, sample: &Rate) {
        let stats = sample.stats();

        if sample.source() != self.template.as_ref().map_or("", |t| t.source()) {
            self.multi_source = true;
        }

        self.samples += 1;
        self.sum += sample.rate();

        let lo = stats.and_then(|s| s.lo).unwrap_or_else(|| sample.rate());
        let hi = stats.and_then(|s| s.hi).unwrap_or_else(|| sample.rate());
        if self.samples == 1 || lo < self.lo {
            self.lo = lo;
        }
        if self.samples == 1 || hi > self.hi {
            self.hi = hi;
        }

        let d0 = stats.and_then(|s| s.date_0).unwrap_or_else(|| sample.date());
        let r0 = stats
            .and_then(|s| s.rate_at_date_0)
            .unwrap_or_else(|| sample.rate());
        if self.date_0.is_none_or(|cur| d0 < cur) {
            self.date_0 = Some(d0);
            self.rate_at_0 = r0;
        }

        let d1 = stats.and_then(|s| s.date_1).unwrap_or_else(|| sample.date());
        let r1 = stats
            .and_then(|s| s.rate_at_date_1)
            .unwrap_or_else(|| sample.rate());
        if self.date_1.is_none_or(|cur| d1 > cur) {
            self.date_1 = Some(d1);
            self.rate_at_1 = r1;
        }
    }

    /// Number of samples folded so far.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.samples
    }

    /// Whether no samples have been folded yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Finish and produce the summary rate.
    ///
    /// The representative `rate` is the first sample's; the envelope carries
    /// the mean, extrema, and boundary values.
    ///
    /// # Errors
    /// [`CambioError::NoSamples`] if nothing was folded in.
    pub fn finish(self) -> Result<Rate, CambioError> {
        let template = self.template.ok_or(CambioError::NoSamples)?;
        let source = if self.multi_source {
            MULTIPLE_SOURCES.to_string()
        } else {
            template.source().to_string()
        };
        let stats = RateStats {
            avg: Some(self.sum / f64::from(self.samples)),
            lo: Some(self.lo),
            hi: Some(self.hi),
            samples: self.samples,
            rate_at_date_0: Some(self.rate_at_0),
            rate_at_date_1: Some(self.rate_at_1),
            date_0: self.date_0,
            date_1: self.date_1,
        };
        Rate::with_stats(
            template.base().clone(),
            template.quote().clone(),
            template.rate(),
            source,
            template.date(),
            template.derived().map(str::to_string),
            stats,
        )
    }
}

/// Fold a list of samples for one pair into a summary rate.
///
/// # Errors
/// [`CambioError::NoSamples`] on empty input, or
/// [`CambioError::MismatchedPair`] if a sample names a different pair.
pub fn collect<'a, I>(rates: I) -> Result<Rate, CambioError>
where
    I: IntoIterator<Item = &'a Rate>,
{
    let mut collector = RateCollector::new();
    for rate in rates {
        collector.push(rate)?;
    }
    collector.finish()
}
