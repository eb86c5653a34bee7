//! File name sanitization and sibling disambiguation suffixes
//!
//! Remote display names may contain characters that no local filesystem
//! accepts, and several siblings may share one name. [`local_name`] turns a
//! raw remote name plus its disambiguation index into the single path
//! segment used on disk.

/// Maximum length of a single path segment, in bytes
pub const MAX_NAME_BYTES: usize = 255;

/// Substitute for names that sanitize to nothing
pub const EMPTY_NAME_REPLACEMENT: &str = "_";

/// Characters rejected by at least one common filesystem
const ILLEGAL_CHARS: &[char] = &['/', '?', '<', '>', '\\', ':', '*', '|', '"'];

/// Windows device names, matched case-insensitively with or without extension
const WINDOWS_RESERVED: &[&str] = &[
    "con", "prn", "aux", "nul", "com0", "com1", "com2", "com3", "com4", "com5", "com6", "com7",
    "com8", "com9", "lpt0", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8",
    "lpt9",
];

/// Append the disambiguation suffix for `index` to a raw name
///
/// Index 0 leaves the name untouched; any other index appends `", (N)"`.
#[must_use]
pub fn with_unique_suffix(name: &str, index: u32) -> String {
    if index == 0 {
        name.to_string()
    } else {
        format!("{name}, ({index})")
    }
}

/// The on-disk segment for a remote name and its disambiguation index
///
/// The suffix is applied before sanitizing. When the limit would cut into
/// the suffix, the name is shortened instead so the suffix always survives
/// and distinct indices never collapse onto one segment.
#[must_use]
pub fn local_name(name: &str, index: u32) -> String {
    let full = sanitize_name(&with_unique_suffix(name, index));
    if index == 0 {
        return full;
    }
    let suffix = with_unique_suffix("", index);
    if full.ends_with(&suffix) {
        return full;
    }
    let mut base = sanitize_name(name);
    truncate_to_boundary(&mut base, MAX_NAME_BYTES - suffix.len());
    base.push_str(&suffix);
    base
}

/// Make a single path segment safe for local filesystems
///
/// Removes `/ ? < > \ : * | "` and control characters, rejects `.`/`..`
/// and Windows reserved device names, strips trailing dots and spaces, and
/// truncates to [`MAX_NAME_BYTES`] on a character boundary. A name left
/// empty by these rules becomes [`EMPTY_NAME_REPLACEMENT`].
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !is_control(*c))
        .collect();

    if cleaned.chars().all(|c| c == '.') || is_windows_reserved(&cleaned) {
        cleaned.clear();
    }

    let trimmed_len = cleaned.trim_end_matches(['.', ' ']).len();
    cleaned.truncate(trimmed_len);

    truncate_to_boundary(&mut cleaned, MAX_NAME_BYTES);

    if cleaned.is_empty() {
        EMPTY_NAME_REPLACEMENT.to_string()
    } else {
        cleaned
    }
}

fn is_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{80}'..='\u{9f}')
}

fn is_windows_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).to_ascii_lowercase();
    WINDOWS_RESERVED.contains(&stem.as_str())
}

fn truncate_to_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}
