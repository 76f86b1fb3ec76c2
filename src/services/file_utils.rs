//! Shared file utility functions
//!
//! Centralizes file extension checks, formatting, and sanitization.

use std::path::Path;

/// Video file extensions (lowercase, without the dot)
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "wmv", "flv", "webm", "m4v", "ts", "m2ts", "mpg", "mpeg", "iso",
    "divx", "ogv",
];

/// Subtitle file extensions (lowercase, without the dot)
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "idx", "vtt", "smi"];

/// Lowercase extension of a path, without the dot
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
}

/// Check a path's extension against a list (case-insensitive, dot optional)
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    match extension_of(path) {
        Some(ext) => extensions
            .iter()
            .any(|e| e.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext)),
        None => false,
    }
}

/// Sanitize a string for use as a filename
///
/// Uses the `sanitize_filename` crate which handles:
/// - Invalid characters for the current OS
/// - Reserved filenames (CON, PRN, etc. on Windows)
///
/// then trims trailing dots and spaces, which Windows shares reject.
pub fn sanitize_for_filename(name: &str) -> String {
    let options = sanitize_filename::Options {
        windows: true,
        truncate: true,
        replacement: "",
    };
    sanitize_filename::sanitize_with_options(name, options)
        .trim_end_matches(['.', ' '])
        .trim_start()
        .to_string()
}

/// Format bytes into a human-readable string
///
/// # Example
/// ```
/// use librarian_organizer::services::file_utils::format_bytes;
/// assert_eq!(format_bytes(1024), "1.0 KB");
/// assert_eq!(format_bytes(1073741824), "1.0 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_extensions() {
        assert!(has_extension(Path::new("movie.mkv"), VIDEO_EXTENSIONS));
        assert!(has_extension(Path::new("MOVIE.MKV"), VIDEO_EXTENSIONS));
        assert!(has_extension(Path::new("/path/to/video.mp4"), VIDEO_EXTENSIONS));
        assert!(has_extension(Path::new("show.S01E01.1080p.ts"), VIDEO_EXTENSIONS));
        assert!(!has_extension(Path::new("music.mp3"), VIDEO_EXTENSIONS));
        assert!(!has_extension(Path::new("no_extension"), VIDEO_EXTENSIONS));
    }

    #[test]
    fn test_subtitle_extensions() {
        assert!(has_extension(Path::new("movie.en.srt"), SUBTITLE_EXTENSIONS));
        assert!(has_extension(Path::new("movie.ASS"), SUBTITLE_EXTENSIONS));
        assert!(!has_extension(Path::new("movie.mkv"), SUBTITLE_EXTENSIONS));
    }

    #[test]
    fn test_has_extension_accepts_dotted_entries() {
        assert!(has_extension(Path::new("a.nfo"), &[".nfo", ".txt"]));
        assert!(has_extension(Path::new("a.TXT"), &["nfo", "txt"]));
        assert!(!has_extension(Path::new("a.mkv"), &["nfo"]));
    }

    #[test]
    fn test_sanitize_for_filename() {
        let result = sanitize_for_filename("Show: The Movie");
        assert!(!result.contains(':'));

        let result = sanitize_for_filename("What/If?");
        assert!(!result.contains('/'));
        assert!(!result.contains('?'));

        assert_eq!(sanitize_for_filename("Normal Name"), "Normal Name");
        assert_eq!(sanitize_for_filename("Trailing dots... "), "Trailing dots");
        assert_eq!(sanitize_for_filename("???"), "");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1099511627776), "1.0 TB");
    }
}
