use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;

/// Maximum length of a title slug, in characters
const MAX_SLUG_CHARS: usize = 100;

/// Maximum length of a conversation-set id, in characters
const MAX_SET_ID_CHARS: usize = 64;

/// Maximum number of path components in an accepted archive entry
///
/// Stored media can never sit deeper than this below a media root, which bounds the
/// recursive asset search.
pub const MAX_ENTRY_DEPTH: usize = 32;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static CONVERSATION_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}\.\d{2}\.\d{2}_.+\.json$").expect("valid file regex"));

/// Returns true if the string contains any control character
pub fn has_control_chars(s: &str) -> bool {
    s.chars().any(char::is_control)
}

/// Validates an archive entry name and returns it as a relative path
///
/// Backslashes are treated as separators so Windows-built archives cannot smuggle
/// `..\` segments past the check.
///
/// Returns `None` if the name:
/// - contains control characters
/// - is absolute (leading `/` or `\`, or a drive prefix like `C:`)
/// - contains a `..` segment
/// - has no normal components at all
/// - has more than [`MAX_ENTRY_DEPTH`] components
pub fn validate_entry_path(name: &str) -> Option<PathBuf> {
    if name.is_empty() || has_control_chars(name) {
        return None;
    }

    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') || has_drive_prefix(&normalized) {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    let depth = relative.components().count();
    if depth == 0 || depth > MAX_ENTRY_DEPTH { None } else { Some(relative) }
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// First component of a relative path
pub fn top_level_segment(path: &Path) -> Option<&OsStr> {
    match path.components().next() {
        Some(Component::Normal(part)) => Some(part),
        _ => None,
    }
}

/// Strips the wrapping folder(s) from a relative path, if the path lives under them
pub fn strip_wrapper(path: &Path, wrapper: Option<&Path>) -> PathBuf {
    match wrapper {
        Some(wrapper) => path.strip_prefix(wrapper).unwrap_or(path).to_path_buf(),
        None => path.to_path_buf(),
    }
}

/// Turns a conversation title into a filename slug
///
/// Strips everything outside word characters, whitespace and hyphens, collapses whitespace
/// runs to a single underscore and caps the result at 100 characters.
///
/// # Examples
///
/// ```
/// use chatvault::utils::slugify_title;
///
/// assert_eq!(slugify_title("Hello,   world!"), "Hello_world");
/// assert_eq!(slugify_title("???"), "untitled");
/// ```
pub fn slugify_title(title: &str) -> String {
    let stripped = NON_SLUG_CHARS.replace_all(title, "");
    let collapsed = WHITESPACE_RUNS.replace_all(stripped.trim(), "_");
    let slug: String = collapsed.chars().take(MAX_SLUG_CHARS).collect();

    if slug.is_empty() { "untitled".to_string() } else { slug }
}

/// Derives a filesystem-safe conversation-set id from a caller-chosen name
///
/// Lower-cases, keeps `[a-z0-9-]`, maps everything else to `-` and squeezes repeats.
/// Returns `None` if nothing usable remains.
pub fn set_id_from_name(name: &str) -> Option<String> {
    let mut id = String::with_capacity(name.len());
    for ch in name.trim().chars().flat_map(char::to_lowercase) {
        let mapped = if ch.is_ascii_alphanumeric() { ch } else { '-' };
        if mapped == '-' && (id.is_empty() || id.ends_with('-')) {
            continue;
        }
        id.push(mapped);
        if id.len() >= MAX_SET_ID_CHARS {
            break;
        }
    }

    let id = id.trim_end_matches('-').to_string();
    if id.is_empty() { None } else { Some(id) }
}

/// Returns true for `YYYY.MM.DD_slug.json` file names
pub fn is_conversation_file_name(name: &str) -> bool {
    CONVERSATION_FILE.is_match(name)
}

/// Validates that a path is not a symlink
///
/// # Errors
///
/// Returns an error if the metadata cannot be read or the path is a symlink.
pub fn validate_path_not_symlink(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    if metadata.file_type().is_symlink() {
        bail!("Symlinks are not allowed: {}", path.display());
    }
    Ok(())
}

/// Opens a regular file without following symlinks and checks its size
///
/// The size check runs on the open handle, so the file cannot be swapped between the check
/// and the read (TOCTOU).
///
/// # Errors
///
/// Returns an error if the file cannot be opened, is a symlink, is not a regular file, or is
/// larger than `max_bytes`.
pub fn safe_open_file(path: &Path, max_bytes: u64) -> Result<File> {
    let file = open_no_follow(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;
    if !metadata.is_file() {
        bail!("Not a regular file: {}", path.display());
    }
    if metadata.len() > max_bytes {
        bail!(
            "File too large: {} ({} bytes, max {} bytes)",
            path.display(),
            metadata.len(),
            max_bytes
        );
    }

    Ok(file)
}

#[cfg(unix)]
fn open_no_follow(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new().read(true).custom_flags(libc::O_NOFOLLOW).open(path)
}

#[cfg(not(unix))]
fn open_no_follow(path: &Path) -> std::io::Result<File> {
    if fs::symlink_metadata(path)?.file_type().is_symlink() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "symlink not allowed"));
    }
    File::open(path)
}
