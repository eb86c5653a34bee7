//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for remote identifiers,
//! content hashes, continuation tokens and mirror paths. Each newtype
//! ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Remote identifiers
// ============================================================================

/// Google Drive file ID (opaque, stable across renames)
///
/// Format: URL-safe characters, e.g. `1A2b3C4d5E6f_g-H`. The literal
/// `root` addresses the top of "My Drive".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains characters outside
    /// the URL-safe alphabet Drive uses for identifiers
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// The alias of the drive root folder
    #[must_use]
    pub fn root() -> Self {
        Self("root".to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// Content hash
// ============================================================================

/// Content checksum as reported by Drive (`md5Checksum`)
///
/// Stored lowercase so comparisons against locally computed digests are
/// case-insensitive. Only the hex alphabet is enforced; a digest of the
/// wrong length simply never matches a local file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Md5Hash(String);

impl Md5Hash {
    /// Create a new Md5Hash
    ///
    /// # Errors
    /// Returns error if the value is empty or not hexadecimal
    pub fn new(hash: String) -> Result<Self, DomainError> {
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidHash(format!(
                "Expected hex digits: {hash:?}"
            )));
        }

        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// Build a hash from a raw 16-byte digest
    #[must_use]
    pub fn from_digest(digest: [u8; 16]) -> Self {
        let hex = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `other` names the same digest, ignoring case
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Display for Md5Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Md5Hash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for Md5Hash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Md5Hash> for String {
    fn from(hash: Md5Hash) -> Self {
        hash.0
    }
}

// ============================================================================
// Listing continuation token
// ============================================================================

/// Drive `nextPageToken` (opaque string)
///
/// The token is opaque - we don't validate its contents, only that it's non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageToken(String);

impl PageToken {
    /// Create a new PageToken
    ///
    /// # Errors
    /// Returns error if the token is empty
    pub fn new(token: String) -> Result<Self, DomainError> {
        if token.is_empty() {
            return Err(DomainError::InvalidPageToken(
                "Page token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PageToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PageToken {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PageToken> for String {
    fn from(token: PageToken) -> Self {
        token.0
    }
}

// ============================================================================
// Mirror path
// ============================================================================

/// A path inside the local mirror, relative to the output root
///
/// Segments are sanitized names joined with `/`. The empty path is the
/// mirror root. Construction rejects absolute paths, empty segments and
/// `.`/`..` components so a mirror path can never escape the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MirrorPath(String);

impl MirrorPath {
    /// Create a new MirrorPath
    ///
    /// # Errors
    /// Returns error if the path is absolute or contains invalid segments
    pub fn new(path: String) -> Result<Self, DomainError> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        if path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "Mirror path must be relative: {path}"
            )));
        }
        for segment in path.split('/') {
            Self::validate_segment(segment)?;
        }
        Ok(Self(path))
    }

    /// The mirror root (empty path)
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Returns true for the mirror root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a single (already sanitized) name segment
    ///
    /// # Errors
    /// Returns error if the segment is empty, `.`/`..`, or contains `/`
    pub fn join(&self, segment: &str) -> Result<Self, DomainError> {
        Self::validate_segment(segment)?;
        if self.is_root() {
            Ok(Self(segment.to_string()))
        } else {
            Ok(Self(format!("{}/{segment}", self.0)))
        }
    }

    /// Append a segment produced by [`sanitize_name`](super::naming::sanitize_name)
    ///
    /// Sanitized names are never empty, never `.`/`..` and never contain
    /// `/`, so no validation is repeated here.
    pub(crate) fn join_sanitized(&self, name: &str) -> Self {
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    /// Append `suffix` to the final segment, e.g. `Docs/Report` + `.html`
    ///
    /// `/` characters in the suffix are dropped so the path keeps its depth.
    /// The root has no final segment and is returned unchanged.
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> Self {
        if self.is_root() {
            return self.clone();
        }
        let suffix: String = suffix.chars().filter(|c| *c != '/').collect();
        Self(format!("{}{suffix}", self.0))
    }

    /// The final segment, or `None` for the root
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Iterate over the path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Resolve this path under a local output root
    #[must_use]
    pub fn to_local(&self, root: &Path) -> PathBuf {
        self.segments().fold(root.to_path_buf(), |acc, s| acc.join(s))
    }

    fn validate_segment(segment: &str) -> Result<(), DomainError> {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('/') {
            return Err(DomainError::InvalidPath(format!(
                "Invalid path segment: {segment:?}"
            )));
        }
        Ok(())
    }
}

impl Display for MirrorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MirrorPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for MirrorPath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<MirrorPath> for String {
    fn from(path: MirrorPath) -> Self {
        path.0
    }
}
