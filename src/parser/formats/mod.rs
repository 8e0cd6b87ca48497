//! One module per log dialect. Every recognizer is a pure function of the
//! line text; prefix-stripping recognizers (docker, kubernetes) delegate to
//! the timestamp recognizers on the remainder.

pub mod apache;
pub mod docker;
pub mod iso;
pub mod journal;
pub mod kubernetes;
pub mod logfmt;
pub mod python;
pub mod syslog;

/// Month abbreviation to number, shared by the syslog and apache formats.
pub(crate) fn month_number(name: &str) -> Option<u32> {
    match name {
        "Jan" => Some(1),
        "Feb" => Some(2),
        "Mar" => Some(3),
        "Apr" => Some(4),
        "May" => Some(5),
        "Jun" => Some(6),
        "Jul" => Some(7),
        "Aug" => Some(8),
        "Sep" => Some(9),
        "Oct" => Some(10),
        "Nov" => Some(11),
        "Dec" => Some(12),
        _ => None,
    }
}
