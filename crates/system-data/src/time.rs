//! Time arithmetic for forecast windows.

use chrono::{DateTime, Duration, Utc};

/// `resolution * steps` without the `i32` limit of `Duration`'s `Mul`.
///
/// Returns `None` if the product does not fit in a `Duration`.
pub fn span(resolution: Duration, steps: usize) -> Option<Duration> {
    let steps = i64::try_from(steps).ok()?;
    resolution
        .num_milliseconds()
        .checked_mul(steps)
        .filter(|ms| *ms != i64::MIN)
        .map(Duration::milliseconds)
}

/// `start + resolution * steps`, or `None` outside the representable range.
pub fn advance(start: DateTime<Utc>, resolution: Duration, steps: usize) -> Option<DateTime<Utc>> {
    start.checked_add_signed(span(resolution, steps)?)
}

/// Check that `value` has no sub-millisecond part.
pub fn is_whole_millis(value: Duration) -> bool {
    value == Duration::milliseconds(value.num_milliseconds())
}

/// Check if `value` is a whole multiple of a positive `step`.
pub fn is_multiple_of(value: Duration, step: Duration) -> bool {
    let step_ms = step.num_milliseconds();
    step_ms > 0 && value.num_milliseconds() % step_ms == 0
}

/// Number of whole `step`s from `from` to `to`.
///
/// Returns `None` if `to` is before `from` or the gap is not an exact
/// multiple of `step`.
pub fn steps_between(from: DateTime<Utc>, to: DateTime<Utc>, step: Duration) -> Option<usize> {
    let gap = to.signed_duration_since(from);
    if gap < Duration::zero() || !is_multiple_of(gap, step) {
        return None;
    }
    Some((gap.num_milliseconds() / step.num_milliseconds()) as usize)
}

/// Serde adapter storing a `Duration` as integer milliseconds.
pub mod duration_ms {
    use chrono::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = i64::deserialize(deserializer)?;
        if ms == i64::MIN {
            return Err(D::Error::custom("duration out of range"));
        }
        Ok(Duration::milliseconds(ms))
    }
}
