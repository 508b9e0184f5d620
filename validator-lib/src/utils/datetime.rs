/// RFC 3339 UTC timestamp, used for report headers and error-log entries.
pub fn get_utc_iso_datetime() -> String {
    return chrono::Utc::now().to_rfc3339();
}
