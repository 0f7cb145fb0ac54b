/// Helper utilities for the backup CLI

use chrono::{DateTime, Local};
use std::path::Path;

use crate::utils::{ARTIFACT_SUFFIX, TIMESTAMP_FORMAT};

/// Generate a run timestamp (local time, sortable)
pub fn generate_timestamp() -> String {
    format_run_timestamp(Local::now())
}

/// Format a point in time as a run timestamp
pub fn format_run_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Format duration to human-readable string
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Mask the value of any `--password=` argument
pub fn mask_password_arg(arg: &str) -> String {
    match arg.split_once('=') {
        Some((flag, value)) if flag == "--password" && !value.is_empty() => {
            format!("{}=****", flag)
        }
        _ => arg.to_string(),
    }
}

/// Quote a word for `bash -c`
///
/// Words made only of safe characters pass through unchanged; anything else is
/// wrapped in single quotes with embedded quotes escaped as `'\''`.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@,+%".contains(c));

    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Directory name a backup archive extracts to (`full-backup-<ts>.tar.gz` -> `full-backup-<ts>`)
pub fn extracted_dir_name(archive: &Path) -> Option<String> {
    let file_name = archive.file_name()?.to_str()?;
    let stem = file_name
        .strip_suffix(ARTIFACT_SUFFIX)
        .or_else(|| file_name.strip_suffix(".tgz"))
        .unwrap_or(file_name);

    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3661), "1h 1m");
    }

    #[test]
    fn test_run_timestamp_format() {
        let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format_run_timestamp(at), "20260304-050607");
    }

    #[test]
    fn test_mask_password_arg() {
        assert_eq!(mask_password_arg("--password=hunter2"), "--password=****");
        assert_eq!(mask_password_arg("--password="), "--password=");
        assert_eq!(mask_password_arg("--user=root"), "--user=root");
        assert_eq!(mask_password_arg("--backup"), "--backup");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("--target-dir=/backup/x"), "--target-dir=/backup/x");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }

    #[test]
    fn test_extracted_dir_name() {
        let archive = PathBuf::from("/var/backups/mysql/full-backup-20260101-000000.tar.gz");
        assert_eq!(
            extracted_dir_name(&archive).as_deref(),
            Some("full-backup-20260101-000000")
        );
        assert_eq!(extracted_dir_name(Path::new("dump.tgz")).as_deref(), Some("dump"));
        assert_eq!(extracted_dir_name(Path::new("/")), None);
    }
}
