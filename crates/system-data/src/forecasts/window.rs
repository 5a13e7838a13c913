//! Window arithmetic over stored forecast records.
//!
//! All functions take the records of a single label sorted by initial time.

use chrono::{DateTime, Duration, Utc};

use super::metadata::ForecastMetadata;
use crate::error::{Result, SystemDataError};
use crate::time::{advance, is_multiple_of, is_whole_millis, span, steps_between};

/// Find the first record covering `[initial_time, initial_time + R * horizon)`.
///
/// A record covers the request when it starts at or before `initial_time`,
/// ends at or after the requested end, and `initial_time` falls on one of
/// its rows. Returns the record and the row offset of `initial_time` in it.
/// A request whose end falls outside the date range is never covered.
pub fn locate<'a, I>(
    records: I,
    initial_time: DateTime<Utc>,
    horizon: usize,
) -> Option<(&'a ForecastMetadata, usize)>
where
    I: IntoIterator<Item = &'a ForecastMetadata>,
{
    records.into_iter().find_map(|record| {
        let resolution = record.resolution();
        let start = record.initial_time();
        let end_time = advance(initial_time, resolution, horizon)?;

        if start > initial_time || end_time > record.end_time()? {
            return None;
        }
        steps_between(start, initial_time, resolution).map(|offset| (record, offset))
    })
}

/// The span covered by a run of contiguous records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContiguousSpan {
    pub first_initial_time: DateTime<Utc>,
    pub resolution: Duration,
    /// Sum of the horizons of every record.
    pub total_horizon: usize,
}

impl ContiguousSpan {
    /// Last initial time at which a window of `horizon` rows still fits.
    ///
    /// Returns `None` if no such time is representable.
    pub fn last_initial_time(&self, horizon: usize) -> Option<DateTime<Utc>> {
        advance(self.first_initial_time, self.resolution, self.total_horizon)?
            .checked_sub_signed(span(self.resolution, horizon)?)
    }
}

/// Check that each record starts exactly where the previous one ends.
///
/// Fails with a validation error on a gap, an overlap or a change of
/// resolution, and with NotFound if `records` is empty.
pub fn check_contiguous<'a, I>(records: I) -> Result<ContiguousSpan>
where
    I: IntoIterator<Item = &'a ForecastMetadata>,
{
    let mut records = records.into_iter();
    let first = records
        .next()
        .ok_or_else(|| SystemDataError::not_found("no forecasts stored"))?;

    let mut span_so_far = ContiguousSpan {
        first_initial_time: first.initial_time(),
        resolution: first.resolution(),
        total_horizon: first.horizon(),
    };
    let mut expected_next = end_of(first)?;

    for record in records {
        if record.resolution() != span_so_far.resolution {
            return Err(SystemDataError::validation(format!(
                "forecast '{}' at {} changes resolution",
                record.label(),
                record.initial_time()
            )));
        }
        if record.initial_time() != expected_next {
            return Err(SystemDataError::validation(format!(
                "forecasts for '{}' are not contiguous: expected {} but found {}",
                record.label(),
                expected_next,
                record.initial_time()
            )));
        }
        span_so_far.total_horizon += record.horizon();
        expected_next = end_of(record)?;
    }

    Ok(span_so_far)
}

fn end_of(record: &ForecastMetadata) -> Result<DateTime<Utc>> {
    record.end_time().ok_or_else(|| {
        SystemDataError::validation(format!(
            "forecast '{}' at {} ends past the supported date range",
            record.label(),
            record.initial_time()
        ))
    })
}

/// Every initial time at which a `horizon`-row window fits in `span`,
/// stepping by `interval` from `start` (default: the first stored time).
pub fn initial_times(
    contiguous: &ContiguousSpan,
    interval: Duration,
    horizon: usize,
    start: Option<DateTime<Utc>>,
) -> Result<Vec<DateTime<Utc>>> {
    if horizon == 0 {
        return Err(SystemDataError::validation("horizon must be greater than 0"));
    }
    if interval <= Duration::zero()
        || !is_whole_millis(interval)
        || !is_multiple_of(interval, contiguous.resolution)
    {
        return Err(SystemDataError::validation(format!(
            "interval of {} is not a positive multiple of the resolution ({})",
            interval, contiguous.resolution
        )));
    }

    let Some(last) = contiguous.last_initial_time(horizon) else {
        return Ok(Vec::new());
    };
    let mut current = start.unwrap_or(contiguous.first_initial_time);
    let mut times = Vec::new();
    while current <= last {
        times.push(current);
        current = match current.checked_add_signed(interval) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecasts::metadata::ForecastWindow;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn record(initial_time: DateTime<Utc>, horizon: usize) -> ForecastMetadata {
        let window =
            ForecastWindow::new("load", Duration::hours(1), initial_time, horizon, Uuid::new_v4())
                .unwrap();
        ForecastMetadata::deterministic(window)
    }

    #[test]
    fn test_locate_inside_record() {
        let records = vec![record(t0(), 10)];
        let (found, offset) = locate(&records, t0() + Duration::hours(3), 4).unwrap();
        assert_eq!(found.initial_time(), t0());
        assert_eq!(offset, 3);
    }

    #[test]
    fn test_locate_up_to_record_end() {
        let records = vec![record(t0(), 10)];
        assert!(locate(&records, t0() + Duration::hours(3), 7).is_some());
        assert!(locate(&records, t0() + Duration::hours(3), 8).is_none());
    }

    #[test]
    fn test_locate_misaligned_time() {
        let records = vec![record(t0(), 10)];
        assert!(locate(&records, t0() + Duration::minutes(90), 2).is_none());
    }

    #[test]
    fn test_locate_before_first_record() {
        let records = vec![record(t0(), 10)];
        assert!(locate(&records, t0() - Duration::hours(1), 2).is_none());
    }

    #[test]
    fn test_locate_first_match_wins() {
        let records = vec![record(t0(), 24), record(t0() + Duration::hours(12), 24)];
        let (found, offset) = locate(&records, t0() + Duration::hours(13), 4).unwrap();
        assert_eq!(found.initial_time(), t0());
        assert_eq!(offset, 13);

        let (found, offset) = locate(&records, t0() + Duration::hours(20), 10).unwrap();
        assert_eq!(found.initial_time(), t0() + Duration::hours(12));
        assert_eq!(offset, 8);
    }

    #[test]
    fn test_check_contiguous() {
        let records = vec![record(t0(), 24), record(t0() + Duration::hours(24), 24)];
        let contiguous = check_contiguous(&records).unwrap();
        assert_eq!(contiguous.total_horizon, 48);
        assert_eq!(contiguous.first_initial_time, t0());
    }

    #[test]
    fn test_check_contiguous_gap_and_overlap() {
        let gap = vec![record(t0(), 24), record(t0() + Duration::hours(25), 24)];
        assert!(matches!(check_contiguous(&gap), Err(SystemDataError::Validation(_))));

        let overlap = vec![record(t0(), 24), record(t0() + Duration::hours(12), 24)];
        assert!(matches!(check_contiguous(&overlap), Err(SystemDataError::Validation(_))));
    }

    #[test]
    fn test_check_contiguous_empty() {
        let records: Vec<ForecastMetadata> = Vec::new();
        assert!(matches!(check_contiguous(&records), Err(SystemDataError::NotFound(_))));
    }

    #[test]
    fn test_initial_times_range() {
        let contiguous = ContiguousSpan {
            first_initial_time: t0(),
            resolution: Duration::hours(1),
            total_horizon: 48,
        };
        let times = initial_times(&contiguous, Duration::hours(2), 5, None).unwrap();
        // Last start must be <= t0 + 43h; stepping 2h gives t0 + 42h.
        assert_eq!(times.first(), Some(&t0()));
        assert_eq!(times.last(), Some(&(t0() + Duration::hours(42))));
        assert_eq!(times.len(), 22);
    }

    #[test]
    fn test_initial_times_custom_start() {
        let contiguous = ContiguousSpan {
            first_initial_time: t0(),
            resolution: Duration::hours(1),
            total_horizon: 24,
        };
        let start = t0() + Duration::hours(20);
        let times = initial_times(&contiguous, Duration::hours(1), 4, Some(start)).unwrap();
        assert_eq!(times, vec![start]);
    }

    #[test]
    fn test_initial_times_horizon_longer_than_span() {
        let contiguous = ContiguousSpan {
            first_initial_time: t0(),
            resolution: Duration::hours(1),
            total_horizon: 4,
        };
        assert!(initial_times(&contiguous, Duration::hours(1), 5, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_initial_times_bad_interval() {
        let contiguous = ContiguousSpan {
            first_initial_time: t0(),
            resolution: Duration::hours(1),
            total_horizon: 24,
        };
        assert!(initial_times(&contiguous, Duration::minutes(90), 4, None).is_err());
        assert!(
            initial_times(&contiguous, Duration::hours(1) + Duration::microseconds(500), 4, None)
                .is_err()
        );
        assert!(initial_times(&contiguous, Duration::zero(), 4, None).is_err());
        assert!(initial_times(&contiguous, Duration::hours(1), 0, None).is_err());
    }

    #[test]
    fn test_locate_horizon_past_date_range() {
        let records = vec![record(t0(), 10)];
        assert!(locate(&records, t0(), 10_000_000_000).is_none());
        assert!(locate(&records, t0(), usize::MAX).is_none());
    }

    #[test]
    fn test_initial_times_huge_horizon() {
        let contiguous = ContiguousSpan {
            first_initial_time: t0(),
            resolution: Duration::hours(1),
            total_horizon: 24,
        };
        assert_eq!(contiguous.last_initial_time(10_000_000_000), None);
        assert!(initial_times(&contiguous, Duration::hours(1), 10_000_000_000, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_initial_times_stop_at_date_range_end() {
        let first = DateTime::<Utc>::MAX_UTC - Duration::hours(10);
        let contiguous = ContiguousSpan {
            first_initial_time: first,
            resolution: Duration::hours(1),
            total_horizon: 10,
        };
        // The step after the last fitting start overflows the date range.
        let times = initial_times(&contiguous, Duration::hours(3), 1, None).unwrap();
        assert_eq!(times.len(), 4);
        assert_eq!(times.last(), Some(&(first + Duration::hours(9))));
    }
}
