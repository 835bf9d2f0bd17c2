//! Platform-specific font discovery — finding font files on disk.
//!
//! Pure discovery: directory enumeration, recursive scans, and keyword
//! categorization. No font loading or caching happens here.

use std::path::{Path, PathBuf};

/// CJK-optimized families tried first (variable SourceHan builds, Noto).
const PRIORITY_KEYWORDS: &[&str] = &["sourcehansanssc", "sourcehansc", "noto"];

/// Other CJK-capable families, by filename fragment.
const CJK_KEYWORDS: &[&str] = &[
    "ping", "fang", "hiragino", "gb", "heiti", "song", "kai", "wqy", "microhei", "zenhei", "msyh",
    "yahei", "simsun", "simhei",
];

/// Latin fallback families.
const LATIN_KEYWORDS: &[&str] = &["helvetica", "arial", "dejavu", "liberation"];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Discovered font files, categorized by coverage quality.
#[derive(Debug, Clone, Default)]
pub struct FontCatalog {
    /// CJK-optimized families, tried exhaustively.
    pub priority: Vec<PathBuf>,
    /// Other CJK-capable families (first 3 tried).
    pub chinese: Vec<PathBuf>,
    /// Latin fallbacks (first 2 tried).
    pub english: Vec<PathBuf>,
}

/// System font directories for the current platform.
pub(super) fn platform_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts/Supplemental"));
        if let Some(home) = std::env::var_os("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        dirs.push(PathBuf::from("/usr/share/fonts/truetype"));
        if let Some(home) = std::env::var_os("HOME") {
            let home = PathBuf::from(home);
            dirs.push(home.join(".fonts"));
            dirs.push(home.join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
        if let Some(home) = std::env::var_os("USERPROFILE") {
            dirs.push(PathBuf::from(home).join(r"AppData\Local\Microsoft\Windows\Fonts"));
        }
    }

    dirs
}

/// Recursively scan the given directories and categorize every font file
/// whose name matches a keyword set. Performed at most once per service.
pub(super) fn scan(dirs: &[PathBuf]) -> FontCatalog {
    let mut catalog = FontCatalog::default();
    for dir in dirs {
        scan_dir(dir, &mut catalog);
    }
    catalog
}

fn scan_dir(dir: &Path, catalog: &mut FontCatalog) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, catalog);
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let lower = name.to_lowercase();
        if !FONT_EXTENSIONS.iter().any(|ext| lower.ends_with(&format!(".{ext}"))) {
            continue;
        }
        if PRIORITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
            catalog.priority.push(path);
        } else if CJK_KEYWORDS.iter().any(|k| lower.contains(k)) {
            catalog.chinese.push(path);
        } else if LATIN_KEYWORDS.iter().any(|k| lower.contains(k)) {
            catalog.english.push(path);
        } else {
            // Uncategorized fonts are never picked over the builtin chain.
        }
    }
}

/// Resolve a requested font name within the bundled font directory.
///
/// Tries an exact stem match with each known extension first, then a
/// case-insensitive substring match over every file in the directory.
pub(super) fn find_named(dir: &Path, name: &str) -> Option<PathBuf> {
    for ext in FONT_EXTENSIONS {
        let candidate = dir.join(format!("{name}.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let needle = name.to_lowercase();
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            let lower = file_name.to_lowercase();
            let has_font_ext = FONT_EXTENSIONS.iter().any(|ext| lower.ends_with(&format!(".{ext}")));
            if has_font_ext && lower.contains(&needle) {
                return Some(path);
            }
        }
    }
    None
}
