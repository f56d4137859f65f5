//! Unit conversion, unpacking and time reconstruction shared by decoders.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Metres per second in one knot, as used by the wind products.
pub const MS_PER_KNOT: f64 = 0.514;

/// 1990-01-01T00:00:00Z as Unix seconds.
pub const EPOCH_1990_UNIX: i64 = 631_152_000;

/// 2000-01-01T12:00:00Z as Unix seconds.
pub const J2000_NOON_UNIX: i64 = 946_728_000;

/// Convert m/s to knots.
pub fn to_knots(ms: f64) -> f64 {
    ms / MS_PER_KNOT
}

/// Split a speed and a direction in degrees into `(v, h)`.
pub fn wind_components(speed: f64, dir_deg: f64) -> (f64, f64) {
    let rad = dir_deg.to_radians();
    (speed * rad.sin(), speed * rad.cos())
}

/// Linear unpacking `physical = raw * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOffset {
    pub scale: f64,
    pub offset: f64,
}

impl ScaleOffset {
    /// A zero scale is treated as 1.
    pub fn new(scale: f64, offset: f64) -> Self {
        Self {
            scale: if scale == 0.0 { 1.0 } else { scale },
            offset,
        }
    }

    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }
}

impl Default for ScaleOffset {
    fn default() -> Self {
        Self::identity()
    }
}

/// Offset fractional seconds from a Unix epoch, rounded to microseconds.
pub fn from_epoch_seconds(epoch_unix: i64, seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1e6).round();
    if micros.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    let total = epoch_unix.checked_mul(1_000_000)?.checked_add(micros as i64)?;
    DateTime::from_timestamp_micros(total)
}

/// Seconds since 1990-01-01T00:00:00Z.
pub fn from_1990_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    from_epoch_seconds(EPOCH_1990_UNIX, seconds)
}

/// Days plus seconds since 2000-01-01T12:00:00Z.
pub fn from_j2000_noon(days: f64, seconds: f64) -> Option<DateTime<Utc>> {
    from_epoch_seconds(J2000_NOON_UNIX, days * 86_400.0 + seconds)
}

/// Parse a UTC timestamp, ignoring surrounding whitespace.
pub fn parse_utc(text: &str, format: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), format)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Mask with the low `bits` bits of a QC flag.
pub fn low_bits(flag: f64, bits: u32) -> u64 {
    let mask = (1u64 << bits) - 1;
    (flag as i64 as u64) & mask
}

/// Deny-list QC: any set bit among the low `bits` rejects the cell.
pub fn deny_any(flag: f64, bits: u32) -> bool {
    low_bits(flag, bits) == 0
}

/// Allow-list QC: the cell is kept when every set bit among the low `bits`
/// is in `allowed`.
pub fn allow_only(flag: f64, bits: u32, allowed: u64) -> bool {
    let truncated = low_bits(flag, bits);
    truncated & allowed == truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_knots() {
        assert!((to_knots(10.28) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_wind_components() {
        let (v, h) = wind_components(20.0, 90.0);
        assert!((v - 20.0).abs() < 1e-9);
        assert!(h.abs() < 1e-9);

        let (v, h) = wind_components(10.0, 180.0);
        assert!(v.abs() < 1e-9);
        assert!((h + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_scale_is_one() {
        let so = ScaleOffset::new(0.0, 2.0);
        assert_eq!(so.apply(5.0), 7.0);
        assert!((ScaleOffset::new(0.01, 0.0).apply(1028.0) - 10.28).abs() < 1e-9);
    }

    #[test]
    fn test_epochs() {
        let t = from_1990_seconds(0.0).unwrap();
        assert_eq!((t.year(), t.month(), t.day(), t.hour()), (1990, 1, 1, 0));

        let t = from_j2000_noon(0.0, 0.0).unwrap();
        assert_eq!((t.year(), t.month(), t.day(), t.hour()), (2000, 1, 1, 12));

        let t = from_j2000_noon(1.0, 1.5).unwrap();
        assert_eq!((t.day(), t.hour(), t.second()), (2, 12, 1));
        assert_eq!(t.nanosecond(), 500_000_000);

        assert!(from_1990_seconds(f64::NAN).is_none());
        assert!(from_1990_seconds(1e300).is_none());
    }

    #[test]
    fn test_parse_utc() {
        let t = parse_utc(" 20240101T06:30:00 ", "%Y%m%dT%H:%M:%S").unwrap();
        assert_eq!((t.hour(), t.minute()), (6, 30));
        assert!(parse_utc("2024-01-01T06:30:00Z", "%Y-%m-%dT%H:%M:%SZ").is_some());
        assert!(parse_utc("garbage", "%Y%m%dT%H:%M:%S").is_none());

        let t = parse_utc("2024-01-01 06:30:00.250", "%Y-%m-%d %H:%M:%S%.f").unwrap();
        assert_eq!(t.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_qc_helpers() {
        assert!(deny_any(0.0, 17));
        assert!(!deny_any(1.0, 17));
        // Bit 17 is outside the checked range
        assert!(deny_any((1u64 << 17) as f64, 17));

        let allowed = (1 << 14) | (1 << 15);
        assert!(allow_only(0.0, 31, allowed));
        assert!(allow_only((1 << 14) as f64, 31, allowed));
        assert!(!allow_only(((1 << 14) | 1) as f64, 31, allowed));
        assert!(allow_only((1u64 << 31) as f64, 31, allowed));
    }
}
