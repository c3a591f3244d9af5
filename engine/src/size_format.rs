//! Human-readable byte counts.
//!
//! Pure functions over a fixed suffix table per [`SuffixStyle`]. The
//! magnitude is chosen so the rounded display value never reaches 1000 in the
//! selected unit (`1023.96 KB` at one decimal place renders as `1.0 MB`).

use crate::error::EngineError;
use crate::model::SuffixStyle;

const WINDOWS_SUFFIXES: [&str; 9] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const BINARY_SUFFIXES: [&str; 9] =
    ["bytes", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];
const METRIC_SUFFIXES: [&str; 9] = ["bytes", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

// Beyond this many places the rollover check is skipped; 10^places would
// overflow the f64 mantissa anyway.
const MAX_ROUNDING_PLACES: usize = 15;

impl SuffixStyle {
    fn base(self) -> u64 {
        match self {
            SuffixStyle::Metric => 1000,
            SuffixStyle::Binary | SuffixStyle::Windows => 1024,
        }
    }

    fn suffixes(self) -> &'static [&'static str; 9] {
        match self {
            SuffixStyle::Windows => &WINDOWS_SUFFIXES,
            SuffixStyle::Binary => &BINARY_SUFFIXES,
            SuffixStyle::Metric => &METRIC_SUFFIXES,
        }
    }
}

/// Convert a byte count to a string such as `"976.6 KiB"`.
///
/// # Errors
/// Returns [`EngineError::InvalidDecimalPlaces`] if `decimal_places` is negative.
pub fn format_size(
    value: u64,
    style: SuffixStyle,
    decimal_places: i32,
) -> Result<String, EngineError> {
    if decimal_places < 0 {
        return Err(EngineError::InvalidDecimalPlaces(decimal_places));
    }
    let places = decimal_places as usize;

    if value == 0 {
        return Ok(format!("{:.*} bytes", places, 0.0));
    }

    let base = style.base();
    let suffixes = style.suffixes();

    // magnitude = floor(log_base(value)), without going through floating point
    let mut magnitude = 0;
    let mut unit: u64 = 1;
    while magnitude + 1 < suffixes.len() {
        match unit.checked_mul(base) {
            Some(next) if next <= value => {
                unit = next;
                magnitude += 1;
            }
            _ => break,
        }
    }

    let mut adjusted = value as f64 / unit as f64;
    if round_to(adjusted, places) >= 1000.0 && magnitude + 1 < suffixes.len() {
        magnitude += 1;
        adjusted /= base as f64;
    }

    // Ties round away from zero; `{:.*}` alone would round them to even
    let shown = round_to(adjusted, places);
    Ok(format!("{:.*} {}", places, shown, suffixes[magnitude]))
}

/// Format a transfer rate, e.g. `"1.5 MB/sec"`.
///
/// The rate is truncated to whole bytes before formatting.
pub fn format_rate(
    bytes_per_second: f64,
    style: SuffixStyle,
    decimal_places: i32,
) -> Result<String, EngineError> {
    // `as` saturates and maps NaN to 0
    let whole = bytes_per_second.max(0.0) as u64;
    Ok(format!("{}/sec", format_size(whole, style, decimal_places)?))
}

fn round_to(value: f64, places: usize) -> f64 {
    if places > MAX_ROUNDING_PLACES {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(format_size(999_999, SuffixStyle::Binary, 1).unwrap(), "976.6 KiB");
        assert_eq!(format_size(1_000_000_000, SuffixStyle::Metric, 2).unwrap(), "1.00 GB");
        assert_eq!(format_size(1536, SuffixStyle::Windows, 1).unwrap(), "1.5 KB");
        assert_eq!(format_size(1500, SuffixStyle::Metric, 1).unwrap(), "1.5 kB");
        assert_eq!(format_size(512, SuffixStyle::Windows, 0).unwrap(), "512 bytes");
    }

    #[test]
    fn test_zero_for_every_style() {
        for style in [SuffixStyle::Windows, SuffixStyle::Binary, SuffixStyle::Metric] {
            assert_eq!(format_size(0, style, 0).unwrap(), "0 bytes");
            assert_eq!(format_size(0, style, 1).unwrap(), "0.0 bytes");
            assert_eq!(format_size(0, style, 3).unwrap(), "0.000 bytes");
        }
    }

    #[test]
    fn test_negative_places_rejected_for_every_style() {
        for style in [SuffixStyle::Windows, SuffixStyle::Binary, SuffixStyle::Metric] {
            let result = format_size(1024, style, -1);
            assert!(matches!(result, Err(EngineError::InvalidDecimalPlaces(-1))));
            assert!(format_rate(10.0, style, -1).is_err());
        }
    }

    #[test]
    fn test_exact_halves_round_up() {
        assert_eq!(format_size(1280, SuffixStyle::Windows, 1).unwrap(), "1.3 KB");
        assert_eq!(format_size(2560, SuffixStyle::Windows, 0).unwrap(), "3 KB");
        assert_eq!(format_size(2500, SuffixStyle::Metric, 0).unwrap(), "3 kB");
        assert_eq!(format_size(1_179_648, SuffixStyle::Binary, 2).unwrap(), "1.13 MiB");
        assert_eq!(format_rate(3584.0, SuffixStyle::Binary, 0).unwrap(), "4 KiB/sec");
    }

    #[test]
    fn test_rollover_to_next_unit() {
        // 1023 bytes would round to "1023.0 bytes"
        assert_eq!(format_size(1023, SuffixStyle::Windows, 1).unwrap(), "1.0 KB");
        // 1023.999 KiB rounds to 1024.0
        assert_eq!(format_size(1_048_575, SuffixStyle::Binary, 1).unwrap(), "1.0 MiB");
        // 999.9996 kB rounds to 1000.0
        assert_eq!(format_size(999_999_600, SuffixStyle::Metric, 1).unwrap(), "1.0 GB");
        // 999.4 kB stays put
        assert_eq!(format_size(999_400, SuffixStyle::Metric, 1).unwrap(), "999.4 kB");
    }

    #[test]
    fn test_rollover_never_displays_four_digits() {
        let samples = [
            1u64,
            999,
            1000,
            1023,
            1024,
            999_499,
            999_999,
            1_048_575,
            1_073_741_823,
            u64::MAX,
        ];
        for style in [SuffixStyle::Windows, SuffixStyle::Binary, SuffixStyle::Metric] {
            for places in 0..4 {
                for &value in &samples {
                    let text = format_size(value, style, places).unwrap();
                    let numeral: f64 = text.split(' ').next().unwrap().parse().unwrap();
                    assert!(numeral < 1000.0 || value < 1000, "{value} {style} {places} -> {text}");
                }
            }
        }
    }

    #[test]
    fn test_largest_value() {
        assert_eq!(format_size(u64::MAX, SuffixStyle::Binary, 1).unwrap(), "16.0 EiB");
        assert_eq!(format_size(u64::MAX, SuffixStyle::Metric, 1).unwrap(), "18.4 EB");
    }

    #[test]
    fn test_rate_is_truncated() {
        assert_eq!(format_rate(1536.9, SuffixStyle::Windows, 1).unwrap(), "1.5 KB/sec");
        assert_eq!(format_rate(999.99, SuffixStyle::Metric, 0).unwrap(), "999 bytes/sec");
        assert_eq!(format_rate(0.0, SuffixStyle::Binary, 1).unwrap(), "0.0 bytes/sec");
        assert_eq!(format_rate(f64::NAN, SuffixStyle::Binary, 0).unwrap(), "0 bytes/sec");
    }
}
