//! Path validator implementation.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Component, Path, PathBuf};

use super::GuardError;

/// Longest single path component accepted, in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

const SHELL_METACHARACTERS: &[char] = &['$', '`', '|', ';', '&'];

const WINDOWS_FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

static RESERVED_DEVICE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[1-9]|lpt[1-9])(\..*)?$")
        .expect("reserved device name pattern is valid")
});

static DRIVE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]:$").expect("drive prefix pattern is valid"));

/// Options controlling which platform rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardOptions {
    /// Apply Windows naming rules (reserved device names, forbidden
    /// characters, trailing space or period).
    pub windows_rules: bool,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            windows_rules: cfg!(windows),
        }
    }
}

impl GuardOptions {
    /// Forces Windows naming rules on or off regardless of the host.
    pub fn with_windows_rules(mut self, enabled: bool) -> Self {
        self.windows_rules = enabled;
        self
    }
}

/// Validates a raw path with the host platform's rules.
///
/// Returns the normalized absolute path.
pub fn validate_path(raw: &str) -> Result<PathBuf, GuardError> {
    validate_path_with(raw, &GuardOptions::default())
}

/// Validates a raw path with explicit options.
pub fn validate_path_with(raw: &str, options: &GuardOptions) -> Result<PathBuf, GuardError> {
    // Null bytes are stripped, not rejected.
    let cleaned: String = raw.chars().filter(|c| *c != '\0').collect();

    if cleaned.is_empty() {
        return Err(GuardError::invalid(raw, "path is empty"));
    }

    if is_traversal(&cleaned) {
        return Err(GuardError::invalid(raw, "path traversal is not allowed"));
    }

    if let Some(c) = cleaned.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
        return Err(GuardError::invalid(
            raw,
            format!("shell metacharacter {c:?} is not allowed"),
        ));
    }

    for (idx, segment) in cleaned
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .enumerate()
    {
        if segment.len() > MAX_FILENAME_LEN {
            return Err(GuardError::invalid(
                raw,
                format!("component exceeds {MAX_FILENAME_LEN} bytes"),
            ));
        }

        if options.windows_rules {
            check_windows_segment(raw, segment, idx == 0)?;
        }
    }

    let path = Path::new(&cleaned);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(GuardError::CurrentDir)?
            .join(path)
    };

    Ok(normalize_path(&absolute))
}

/// Lexically normalizes a path without touching the filesystem.
///
/// Duplicate separators collapse, `.` components are dropped and `..`
/// pops the previous normal component. A `..` directly under the root is
/// dropped; a leading `..` on a relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            Component::Normal(name) => normalized.push(name),
        }
    }

    normalized
}

fn is_traversal(path: &str) -> bool {
    path == ".."
        || path.contains("../")
        || path.contains("..\\")
        || path.ends_with("/..")
        || path.ends_with("\\..")
}

fn check_windows_segment(raw: &str, segment: &str, first: bool) -> Result<(), GuardError> {
    if segment == "." || segment == ".." {
        return Ok(());
    }

    if first && DRIVE_PREFIX.is_match(segment) {
        return Ok(());
    }

    if RESERVED_DEVICE_NAME.is_match(segment) {
        return Err(GuardError::invalid(
            raw,
            format!("{segment:?} is a reserved device name"),
        ));
    }

    if let Some(c) = segment.chars().find(|c| WINDOWS_FORBIDDEN_CHARS.contains(c)) {
        return Err(GuardError::invalid(
            raw,
            format!("character {c:?} is not allowed"),
        ));
    }

    if segment.ends_with(' ') || segment.ends_with('.') {
        return Err(GuardError::invalid(
            raw,
            "component cannot end with a space or period",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cwd() -> PathBuf {
        std::env::current_dir().unwrap()
    }

    fn windows() -> GuardOptions {
        GuardOptions::default().with_windows_rules(true)
    }

    fn assert_invalid(result: Result<PathBuf, GuardError>) {
        assert!(
            matches!(result, Err(GuardError::InvalidPath { .. })),
            "expected InvalidPath, got {result:?}"
        );
    }

    #[test]
    fn test_rejects_traversal() {
        assert_invalid(validate_path("../etc/passwd"));
        assert_invalid(validate_path(".."));
        assert_invalid(validate_path("docs/../../secret"));
        assert_invalid(validate_path("docs/.."));
        assert_invalid(validate_path("..\\windows\\system32"));
        assert_invalid(validate_path("docs\\.."));
    }

    #[test]
    fn test_accepts_dot_as_cwd() {
        assert_eq!(validate_path(".").unwrap(), cwd());
        assert_eq!(validate_path("./").unwrap(), cwd());
    }

    #[test]
    fn test_normalizes_relative_path() {
        let path = validate_path("./docs//reports/./q1.pdf").unwrap();
        assert_eq!(path, cwd().join("docs").join("reports").join("q1.pdf"));
    }

    #[test]
    fn test_absolute_path_kept() {
        let path = validate_path("/tmp//inbox/").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/inbox"));
    }

    #[test]
    fn test_null_bytes_are_stripped() {
        let path = validate_path("/tmp/rep\0ort.txt").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/report.txt"));
    }

    #[test]
    fn test_only_null_bytes_is_empty() {
        assert_invalid(validate_path("\0\0"));
        assert_invalid(validate_path(""));
    }

    #[test]
    fn test_rejects_shell_metacharacters() {
        for raw in ["$HOME/files", "a`ls`b", "a|b", "a;rm", "a&b"] {
            assert_invalid(validate_path(raw));
        }
    }

    #[test]
    fn test_dots_inside_names_are_fine() {
        let path = validate_path("/tmp/archive..2024/notes...txt").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/archive..2024/notes...txt"));
    }

    #[test]
    fn test_rejects_overlong_component() {
        let long = "a".repeat(MAX_FILENAME_LEN + 1);
        assert_invalid(validate_path(&format!("/tmp/{long}")));

        let max = "b".repeat(MAX_FILENAME_LEN);
        assert!(validate_path(&format!("/tmp/{max}")).is_ok());
    }

    #[test]
    fn test_windows_reserved_names() {
        for raw in ["CON", "con.txt", "docs/aux", "COM1", "lpt9.log", "Nul"] {
            assert_invalid(validate_path_with(raw, &windows()));
        }
        assert!(validate_path_with("console.txt", &windows()).is_ok());
        assert!(validate_path_with("COM10", &windows()).is_ok());
    }

    #[test]
    fn test_windows_forbidden_characters() {
        assert_invalid(validate_path_with("report:v2.txt", &windows()));
        assert_invalid(validate_path_with("what?.txt", &windows()));
        assert_invalid(validate_path_with("a*b", &windows()));
    }

    #[test]
    fn test_windows_trailing_space_or_period() {
        assert_invalid(validate_path_with("notes.", &windows()));
        assert_invalid(validate_path_with("notes ", &windows()));
        assert_invalid(validate_path_with("folder./file.txt", &windows()));
    }

    #[test]
    fn test_windows_rules_off_allow_colon() {
        let unix = GuardOptions::default().with_windows_rules(false);
        assert!(validate_path_with("report:v2.txt", &unix).is_ok());
        assert!(validate_path_with("CON", &unix).is_ok());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("a/b/../../..")), PathBuf::from(".."));
    }
}
