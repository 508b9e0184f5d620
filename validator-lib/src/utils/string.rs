/// Normalize text by replacing control characters with spaces and collapsing
/// runs of whitespace into single spaces.
///
/// Spreadsheet headers regularly carry embedded newlines or padding from hand
/// editing; normalizing them keeps column lookups and table definitions
/// stable.
pub fn normalize_string(value: &str) -> String {
    return value
        .chars()
        .map(|c| {
            if c.is_control() {
                ' ' // Replace control characters (newlines, tabs, etc.) with spaces
            } else {
                c
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .trim()
        .to_string();
}
