use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub(crate) fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Wall-clock marker handed out as `sha`. It only orders versions in time;
/// it says nothing about file contents.
pub(crate) fn freshness_marker() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    millis.to_string()
}
