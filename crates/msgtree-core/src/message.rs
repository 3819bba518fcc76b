//! Message payload model.
//!
//! A [`Message`] is the flat, immutable record delivered by the transport. The
//! tree only reads a handful of fields (`id`, `parent`, `versionIndex`,
//! `sequence`, `created_at`); everything else is carried through untouched in
//! [`Message::extra`].
//!
//! ## Wire shape
//!
//! ```json
//! {
//!   "id": "m3",
//!   "parent": { "id": "m2", "parent": { "id": "m1" } },
//!   "versionIndex": 0,
//!   "sequence": 3,
//!   "created_at": "2025-01-04T10:00:00Z",
//!   "text": "..."
//! }
//! ```

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shallow reference to a message's immediate parent.
///
/// Carries the grandparent id when the sender knew it, which is what makes
/// grandparent repair possible without walking the full ancestry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParentRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<AncestorRef>,
}

/// Grandparent reference. Only the id is ever read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AncestorRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One chat turn, or one edited version of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,

    /// Position among sibling edits of the same logical message.
    #[serde(
        rename = "versionIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub version_index: Option<i64>,

    /// Monotonic creation order, used when `version_index` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,

    /// ISO-8601 creation timestamp, kept as delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Remaining payload fields (text, sender, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Creates a bare root message with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            version_index: None,
            sequence: None,
            created_at: None,
            extra: Map::new(),
        }
    }

    /// Sets the declared parent id (no grandparent).
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        let parent = self.parent.get_or_insert_with(ParentRef::default);
        parent.id = Some(parent_id.into());
        self
    }

    /// Sets the declared grandparent id. Creates an empty parent ref if needed.
    #[must_use]
    pub fn with_grandparent(mut self, grandparent_id: impl Into<String>) -> Self {
        let parent = self.parent.get_or_insert_with(ParentRef::default);
        parent.parent = Some(AncestorRef {
            id: Some(grandparent_id.into()),
        });
        self
    }

    #[must_use]
    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    #[must_use]
    pub fn with_version_index(mut self, version_index: i64) -> Self {
        self.version_index = Some(version_index);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    /// Declared parent id. Empty ids count as absent.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Declared grandparent id. Empty ids count as absent.
    pub fn grandparent_id(&self) -> Option<&str> {
        self.parent
            .as_ref()
            .and_then(|p| p.parent.as_ref())
            .and_then(|gp| gp.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Parsed `created_at`. RFC 3339 first, then a bare
    /// `YYYY-MM-DDTHH:MM:SS[.fff]` read as UTC. Anything else is treated as
    /// missing.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        let ts = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(ts).ok().or_else(|| {
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
    }
}
