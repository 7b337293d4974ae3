use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Fixed-width, lexically sortable wall-clock format with second granularity.
pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format<Tz: TimeZone>(instant: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    instant.format(FORMAT).to_string()
}
