//! Timestamp-to-bucket truncation.

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone};

use cambio_types::QuantizerConfig;

const SECONDS_PER_DAY: i64 = 86_400;

/// Normalizes timestamps into canonical rate-validity buckets.
///
/// A bucket is the floor of the timestamp to a `bucket_secs` boundary,
/// computed in civil time: by default each timestamp's own UTC offset is
/// applied before truncation, so a day bucket lands on local midnight. An
/// explicit `offset_secs` pins the boundary instead.
///
/// Quantization is idempotent and earlier-or-equal to its input; `None`
/// (meaning "no specific time") stays `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeQuantizer {
    bucket_secs: i64,
    offset_secs: Option<i32>,
}

impl TimeQuantizer {
    /// Build a quantizer with an explicit bucket width and boundary offset.
    ///
    /// Widths below one second are clamped to one second.
    #[must_use]
    pub fn new(bucket_secs: i64, offset_secs: Option<i32>) -> Self {
        Self {
            bucket_secs: bucket_secs.max(1),
            offset_secs,
        }
    }

    /// Build a quantizer from its serializable configuration.
    #[must_use]
    pub fn from_config(cfg: &QuantizerConfig) -> Self {
        Self::new(cfg.bucket_secs, cfg.offset_secs)
    }

    /// Bucket width in seconds.
    #[must_use]
    pub const fn bucket_secs(&self) -> i64 {
        self.bucket_secs
    }

    /// Truncate `t` to the start of its bucket, preserving `t`'s offset.
    #[must_use]
    pub fn quantize(&self, t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        // Exact calendar-day buckets in the timestamp's own zone re-express
        // as local midnight of the civil date, which keeps the bucket stable
        // across irregular offsets.
        if self.bucket_secs == SECONDS_PER_DAY && self.offset_secs.is_none() {
            let midnight = t
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .expect("midnight is a valid time of day");
            return t
                .offset()
                .from_local_datetime(&midnight)
                .single()
                .expect("fixed offsets map local times uniquely");
        }

        let offset = i64::from(
            self.offset_secs
                .unwrap_or_else(|| t.offset().local_minus_utc()),
        );
        let shifted = t.timestamp() + offset;
        let floored = shifted.div_euclid(self.bucket_secs) * self.bucket_secs;
        let utc = DateTime::from_timestamp(floored - offset, 0)
            .expect("flooring keeps the timestamp representable");
        utc.with_timezone(t.offset())
    }

    /// Quantize an optional timestamp; `None` passes through.
    #[must_use]
    pub fn quantize_opt(
        &self,
        t: Option<DateTime<FixedOffset>>,
    ) -> Option<DateTime<FixedOffset>> {
        t.map(|t| self.quantize(t))
    }

    /// The bucket containing `t`, as a half-open `[start, end)` window.
    ///
    /// Used by the historical writer to fill a rate's validity dates.
    #[must_use]
    pub fn quantize_range(
        &self,
        t: DateTime<FixedOffset>,
    ) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        let start = self.quantize(t);
        (start, start + TimeDelta::seconds(self.bucket_secs))
    }
}

impl Default for TimeQuantizer {
    fn default() -> Self {
        Self::from_config(&QuantizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(offset_hours: i32, y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(offset_hours * 3_600).unwrap();
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
            .and_local_timezone(tz)
            .unwrap()
    }

    #[test]
    fn day_bucket_lands_on_local_midnight() {
        let q = TimeQuantizer::default();
        let t = at(-5, 2024, 3, 9, 17, 45, 12);
        let b = q.quantize(t);
        assert_eq!(b, at(-5, 2024, 3, 9, 0, 0, 0));
        assert_eq!(b.offset(), t.offset());
    }

    #[test]
    fn utc_in_utc_out() {
        let q = TimeQuantizer::default();
        let t = at(0, 2024, 3, 9, 23, 59, 59);
        assert_eq!(q.quantize(t), at(0, 2024, 3, 9, 0, 0, 0));
    }

    #[test]
    fn hour_bucket_floors_within_the_hour() {
        let q = TimeQuantizer::new(3_600, None);
        let t = at(2, 2024, 7, 1, 10, 59, 59);
        assert_eq!(q.quantize(t), at(2, 2024, 7, 1, 10, 0, 0));
    }

    #[test]
    fn explicit_offset_pins_the_boundary() {
        // Day buckets anchored to UTC midnight regardless of the input zone.
        let q = TimeQuantizer::new(86_400, Some(0));
        let t = at(-5, 2024, 3, 9, 22, 0, 0); // 03:00 UTC next day
        let b = q.quantize(t);
        assert_eq!(b.timestamp() % 86_400, 0);
        assert_eq!(b.offset(), t.offset());
    }

    #[test]
    fn quantize_none_is_none() {
        let q = TimeQuantizer::default();
        assert_eq!(q.quantize_opt(None), None);
    }

    #[test]
    fn range_is_one_bucket_wide() {
        let q = TimeQuantizer::default();
        let (d0, d1) = q.quantize_range(at(-5, 2024, 3, 9, 17, 45, 12));
        assert_eq!(d0, at(-5, 2024, 3, 9, 0, 0, 0));
        assert_eq!(d1, at(-5, 2024, 3, 10, 0, 0, 0));
    }
}
