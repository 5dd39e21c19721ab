//! Filename grammar and path cleaning.

use std::sync::LazyLock;

use regex::Regex;

/// Alphanumeric first and last character, `.`, `_` and `-` in between, and a
/// non-empty suffix after the last dot. No path separators can match.
static FILE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9._-]*[a-zA-Z0-9])?\.[a-zA-Z0-9_-]+$")
        .expect("valid regex literal")
});

/// Check a candidate filename against the storage grammar.
pub fn is_valid_file_name(name: &str) -> bool {
    FILE_NAME_RE.is_match(name)
}

/// Normalize a client-supplied filename.
///
/// Backslashes become `/`, empty and `.` segments are dropped and `..`
/// removes the preceding segment. A `..` with nothing left to remove is kept,
/// so `../x.txt` stays `../x.txt` and is later rejected by the grammar rather
/// than resolved outside the storage root.
pub fn clean_path(name: &str) -> String {
    let normalized = name.replace('\\', "/");
    let absolute = normalized.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
