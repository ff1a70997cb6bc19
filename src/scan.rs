//! Directory scanning with glob patterns
//!
//! Patterns are matched against the path relative to the scanned directory,
//! with `/` as separator. A pattern without a `/` matches the file name only.
//!
//! | Glob  | Matches                         |
//! |-------|---------------------------------|
//! | `**/` | zero or more directories        |
//! | `**`  | anything, including `/`         |
//! | `*`   | anything within one component   |
//! | `?`   | one character, not `/`          |

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Result, ZpackError};

/// Compiled glob pattern
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
    name_only: bool,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|e| ZpackError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            name_only: !pattern.contains('/'),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Match a path relative to the scan root
    pub fn matches(&self, relative: &Path) -> bool {
        if self.name_only {
            return relative
                .file_name()
                .map(|n| self.regex.is_match(&n.to_string_lossy()))
                .unwrap_or(false);
        }
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        self.regex.is_match(&joined)
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

/// Regular files under `root` matching `glob`, sorted by path
pub fn find_files(root: &Path, glob: &Glob) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ZpackError::FileNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .map(|rel| glob.matches(rel))
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    files.sort();
    Ok(files)
}
