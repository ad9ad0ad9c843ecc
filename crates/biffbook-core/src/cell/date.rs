//! Date serials
//!
//! Dates are stored as plain numbers: whole days since the epoch of the
//! workbook's date system plus a fraction of a day. The 1900 system keeps the
//! fictional 1900-02-29 (serial 60), so serials from 61 on are one day ahead of
//! a pure Gregorian count.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// First serial past 9999-12-31 in the 1900 system
const MAX_SERIAL_1900: f64 = 2_958_466.0;
/// First serial past 9999-12-31 in the 1904 system
const MAX_SERIAL_1904: f64 = 2_957_004.0;

fn epoch(date_1904: bool) -> Option<NaiveDate> {
    if date_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 31)
    }
}

fn time_fraction(time: NaiveTime) -> f64 {
    let secs = time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9;
    secs / SECONDS_PER_DAY
}

/// Serial number for a date and time; `None` before the epoch
pub fn date_to_serial(value: NaiveDateTime, date_1904: bool) -> Option<f64> {
    let base = epoch(date_1904)?;
    let mut days = (value.date() - base).num_days();
    if days < 0 {
        return None;
    }
    if !date_1904 && days >= 60 {
        days += 1;
    }
    Some(days as f64 + time_fraction(value.time()))
}

/// Date and time for a serial; `None` for negative or out-of-range serials
///
/// Serial 60 of the 1900 system has no real date and maps to 1900-02-28.
pub fn serial_to_date(serial: f64, date_1904: bool) -> Option<NaiveDateTime> {
    let max = if date_1904 { MAX_SERIAL_1904 } else { MAX_SERIAL_1900 };
    if !serial.is_finite() || serial < 0.0 || serial >= max {
        return None;
    }
    let mut days = serial.floor() as i64;
    // Round to the nearest millisecond to absorb float noise in the fraction
    let mut millis = ((serial - serial.floor()) * SECONDS_PER_DAY * 1000.0).round() as i64;
    if millis >= 86_400_000 {
        days += 1;
        millis -= 86_400_000;
    }
    if !date_1904 && days >= 60 {
        days -= 1;
    }
    let date = epoch(date_1904)?.checked_add_signed(Duration::days(days))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (millis / 1000) as u32,
        ((millis % 1000) * 1_000_000) as u32,
    )?;
    Some(date.and_time(time))
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Parse ISO-style date and/or time text into a serial
///
/// A bare time yields a fraction of a day with no date part.
pub fn parse_date_text(text: &str, date_1904: bool) -> Result<f64> {
    let s = text.trim();
    let fail = || Error::not_convertible(text, "date");

    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return date_to_serial(dt, date_1904).ok_or_else(fail);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return date_to_serial(d.and_time(NaiveTime::MIN), date_1904).ok_or_else(fail);
        }
    }
    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Ok(time_fraction(t));
        }
    }
    Err(fail())
}
