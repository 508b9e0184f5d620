use std::fs::OpenOptions;
use std::io::Write;

use crate::ERRORS_LOG_FILE;
use crate::utils::get_utc_iso_datetime;

/// Append one timestamped entry to the shared errors log. Write failures are
/// ignored; logging never interrupts the operation that triggered it.
///
/// # Arguments
/// * `error_type` - Short category line (e.g., "Sheet Header Duplicate Check Error")
/// * `error_message` - The full message body
pub fn write_error_to_log(error_type: &str, error_message: &str) {
    let entry = format!(
        "\n[{}] {}:\n{}\n",
        get_utc_iso_datetime(),
        error_type,
        error_message
    );
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(ERRORS_LOG_FILE)
    {
        let _ = file.write_all(entry.as_bytes());
    }
}
