use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, stable artifact identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh identifier for an artifact that has none yet.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArtifactId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What an artifact represents in the requirements domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    UserStory,
    Issue,
    Criterion,
    /// Knowledge-base passage (closed issue, pull request, release note, doc page).
    Knowledge,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::UserStory => "user_story",
            ArtifactKind::Issue => "issue",
            ArtifactKind::Criterion => "criterion",
            ArtifactKind::Knowledge => "knowledge",
        };
        f.write_str(name)
    }
}

/// Unit of text with a stable identity. Immutable once built.
///
/// # Example
/// ```rust
/// use reqlens::corpus::{Artifact, ArtifactKind};
///
/// let issue = Artifact::issue("42", "Coupon ignored at checkout", "Discount is not applied.");
/// assert_eq!(issue.kind(), ArtifactKind::Issue);
/// assert_eq!(issue.text(), "Coupon ignored at checkout. Discount is not applied.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    id: ArtifactId,
    text: String,
    kind: ArtifactKind,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(id: impl Into<ArtifactId>, kind: ArtifactKind, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind,
            metadata: BTreeMap::new(),
        }
    }

    /// Issue text is `"{title}. {description}"`; a blank description leaves just the title.
    pub fn issue(id: impl Into<ArtifactId>, title: &str, description: &str) -> Self {
        let title = title.trim();
        let description = description.trim();
        let text = if description.is_empty() {
            title.to_string()
        } else {
            format!("{}. {}", title, description)
        };
        Self::new(id, ArtifactKind::Issue, text).with_metadata("title", title)
    }

    pub fn user_story(id: impl Into<ArtifactId>, text: &str) -> Self {
        Self::new(id, ArtifactKind::UserStory, text.trim())
    }

    pub fn criterion(id: impl Into<ArtifactId>, text: &str) -> Self {
        Self::new(id, ArtifactKind::Criterion, text.trim())
    }

    pub fn knowledge(id: impl Into<ArtifactId>, text: &str) -> Self {
        Self::new(id, ArtifactKind::Knowledge, text.trim())
    }

    /// Returns a copy with one more metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Returns `true` if the text is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Text length in chars (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Corpus input record as produced by the acquisition collaborators.
///
/// `category` is advisory metadata; retrieval never looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub category: String,
}

/// Admission rules applied when records become artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusPolicy {
    /// Records whose trimmed body is shorter are skipped.
    pub min_chars: usize,
    /// Artifact text is truncated to this many chars.
    pub max_chars: usize,
}

impl Default for CorpusPolicy {
    fn default() -> Self {
        Self {
            min_chars: crate::constants::DEFAULT_MIN_ARTIFACT_CHARS,
            max_chars: crate::constants::DEFAULT_MAX_ARTIFACT_CHARS,
        }
    }
}

/// Truncates `text` to at most `max_chars` chars without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
