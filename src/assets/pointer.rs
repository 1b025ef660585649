use std::fmt;

pub const FILE_SERVICE_SCHEME: &str = "file-service://";
pub const SEDIMENT_SCHEME: &str = "sediment://";

/// Extensions some exports append to `sediment://` keys; the stored file names lack them
const SEDIMENT_TAIL_EXTENSIONS: &[&str] =
    &[".wav", ".mp3", ".m4a", ".ogg", ".webm", ".mp4", ".png", ".jpg", ".jpeg", ".webp", ".gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerScheme {
    FileService,
    Sediment,
    Unknown,
}

/// An asset pointer split into its scheme and normalized lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPointer {
    original: String,
    scheme: PointerScheme,
    key: String,
}

impl AssetPointer {
    /// Normalizes a pointer string
    ///
    /// `file-service://file-abc` → key `file-abc`; `sediment://file_123.wav` → key `file_123`.
    /// Unknown schemes keep whatever follows `://`, or the whole string if there is none.
    pub fn parse(pointer: &str) -> Self {
        let trimmed = pointer.trim();

        let (scheme, key) = if let Some(rest) = trimmed.strip_prefix(FILE_SERVICE_SCHEME) {
            (PointerScheme::FileService, rest.to_string())
        } else if let Some(rest) = trimmed.strip_prefix(SEDIMENT_SCHEME) {
            (PointerScheme::Sediment, strip_tail_extension(rest).to_string())
        } else if let Some((_, rest)) = trimmed.split_once("://") {
            (PointerScheme::Unknown, rest.to_string())
        } else {
            (PointerScheme::Unknown, trimmed.to_string())
        };

        Self { original: pointer.to_string(), scheme, key: sanitize_key(&key) }
    }

    /// The pointer exactly as it appeared in message content
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn scheme(&self) -> PointerScheme {
        self.scheme
    }

    /// Normalized key used for filename matching; may be empty
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for AssetPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn strip_tail_extension(key: &str) -> &str {
    let lower = key.to_ascii_lowercase();
    SEDIMENT_TAIL_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &key[..key.len() - ext.len()])
        .unwrap_or(key)
}

/// Keys are matched against bare file names, so separators and control characters are dropped
fn sanitize_key(key: &str) -> String {
    key.chars().filter(|c| !c.is_control() && *c != '/' && *c != '\\').collect()
}
