pub mod fs;
pub mod net;
pub mod logger;

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Album folder used when sanitizing leaves nothing usable
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Utility functions for the application
pub struct Utils;

impl Utils {
    /// Sanitize a track name for use as a file name
    pub fn sanitize_filename(filename: &str) -> String {
        filename
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                ';' => ',',
                c if c.is_control() => '_',
                _ => c,
            })
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Album folder names keep only ASCII letters, digits, space and `-_.()`.
    /// Path separators are dropped, so the result can never escape the base folder.
    pub fn sanitize_album_name(album: &str) -> String {
        let kept: String = album
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')'))
            .collect();
        let kept = kept.trim();

        if kept.is_empty() || kept.chars().all(|c| c == '.') {
            UNKNOWN_ALBUM.to_string()
        } else {
            kept.to_string()
        }
    }

    /// Blob name for a local master: version stamps like ` 1.2.3` or ` 1.2.3_4`
    /// are removed and spaces become dashes
    pub fn upload_name(stem: &str) -> String {
        static VERSION: OnceLock<Option<Regex>> = OnceLock::new();
        let version = VERSION.get_or_init(|| Regex::new(r"\s*\d+\.\d+\.\d+(_\d+)?").ok());

        let stripped = match version {
            Some(re) => re.replace_all(stem, "").into_owned(),
            None => stem.to_string(),
        };

        stripped.trim().replace(' ', "-")
    }

    /// Format duration in human readable format
    pub fn format_duration(seconds: u32) -> String {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        let secs = seconds % 60;

        if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{}:{:02}", minutes, secs)
        }
    }

    /// Get lowercase file extension from path
    pub fn get_file_extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Expand a leading `~` in a user-typed path
    pub fn expand_home(input: &str) -> std::path::PathBuf {
        let trimmed = input.trim();
        if let Some(rest) = trimmed.strip_prefix("~") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest.trim_start_matches(['/', '\\']));
            }
        }
        std::path::PathBuf::from(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(Utils::sanitize_filename("A/B:C"), "A_B_C");
        assert_eq!(Utils::sanitize_filename("  Bring Me To Life  "), "Bring Me To Life");
        assert_eq!(Utils::sanitize_filename("Whisper; Haunted"), "Whisper, Haunted");
    }

    #[test]
    fn test_sanitize_album_name_cannot_escape() {
        assert_eq!(Utils::sanitize_album_name("../../etc"), "....etc");
        assert_eq!(Utils::sanitize_album_name("A/B:C"), "ABC");
        assert_eq!(Utils::sanitize_album_name("Evanescence Remixes (2024)"), "Evanescence Remixes (2024)");
    }

    #[test]
    fn test_sanitize_album_name_fallback() {
        assert_eq!(Utils::sanitize_album_name(""), UNKNOWN_ALBUM);
        assert_eq!(Utils::sanitize_album_name("//"), UNKNOWN_ALBUM);
        assert_eq!(Utils::sanitize_album_name(".."), UNKNOWN_ALBUM);
        assert_eq!(Utils::sanitize_album_name("???"), UNKNOWN_ALBUM);
    }

    #[test]
    fn test_upload_name_strips_versions() {
        assert_eq!(Utils::upload_name("Bring Me To Life 1.2.3"), "Bring-Me-To-Life");
        assert_eq!(Utils::upload_name("Lithium 2.0.1_4"), "Lithium");
        assert_eq!(Utils::upload_name("Call Me When You're Sober"), "Call-Me-When-You're-Sober");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(Utils::format_duration(245), "4:05");
        assert_eq!(Utils::format_duration(3725), "1:02:05");
    }

    #[test]
    fn test_get_file_extension() {
        assert_eq!(Utils::get_file_extension(Path::new("a/b.FLAC")), Some("flac".to_string()));
        assert_eq!(Utils::get_file_extension(Path::new("noext")), None);
    }
}
