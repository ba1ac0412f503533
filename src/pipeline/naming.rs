//! Generated file names
//!
//! Both patterns sort chronologically. Two saves in the same second share a
//! name; the store's insert decides how to keep them apart.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Filtered copy, e.g. `LUMIFY_EDIT_20240131_235959.jpg`
pub fn edit_file_name<Tz: TimeZone>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{}{}.jpg", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Camera capture, e.g. `2024-01-31-23-59-59-123.jpg`
pub fn capture_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{}.jpg", now.format("%Y-%m-%d-%H-%M-%S-%3f"))
}
