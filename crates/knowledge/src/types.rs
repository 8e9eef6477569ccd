//! Domain types for the permission-aware knowledge base.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category assigned to documents that do not carry one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// The set of roles allowed to see a document.
///
/// Roles are trimmed and empty strings are dropped. Matching is exact and
/// case-sensitive. An empty set is visible to nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Build a set from role names.
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            roles
                .into_iter()
                .map(|role| role.as_ref().trim().to_string())
                .filter(|role| !role.is_empty())
                .collect(),
        )
    }

    /// Parse the corpus encoding of a permission field.
    ///
    /// Accepts a JSON array of strings or a single comma-separated string.
    /// Anything else (including `null` and arrays holding non-strings)
    /// yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(list) => Some(Self::new(list.split(','))),
            serde_json::Value::Array(items) => {
                let roles = items
                    .iter()
                    .map(|item| item.as_str())
                    .collect::<Option<Vec<_>>>()?;
                Some(Self::new(roles))
            }
            _ => None,
        }
    }

    /// Whether `role` is a member of the set.
    pub fn allows(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Roles in sorted order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roles: Vec<&str> = self.roles().collect();
        write!(f, "{}", roles.join(", "))
    }
}

/// A document from the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub title: String,
    pub content: String,
    pub category: String,
    pub permission: PermissionSet,
}

/// Metadata a chunk inherits from its parent document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub title: String,
    pub category: String,

    /// `None` only when the metadata was lost; such chunks are never returned.
    pub permission: Option<PermissionSet>,
}

/// A bounded span of document text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identifier (SHA-256 of title, ordinal and text)
    pub id: String,

    /// Position of the parent document in the corpus
    pub document_index: usize,

    /// Position among the parent's chunks (0-based)
    pub source_ordinal: usize,

    pub text: String,

    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Whether a requester holding `role` may see this chunk.
    pub fn is_visible_to(&self, role: &str) -> bool {
        self.metadata
            .permission
            .as_ref()
            .is_some_and(|permission| permission.allows(role))
    }
}

/// A chunk paired with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndexEntry {
    pub embedding: Vec<f32>,
    pub chunk: Chunk,
}

/// A corpus record that was not loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Position of the record in the corpus array
    pub index: usize,

    /// Title, when the record had a readable one
    pub title: Option<String>,

    pub reason: String,
}

/// Result of loading a corpus file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusLoad {
    pub documents: Vec<SourceDocument>,
    pub skipped: Vec<SkippedRecord>,
}

/// A single retrieval request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    pub query: String,
    pub requester_role: String,

    /// Candidates fetched before permission filtering (at least 1)
    pub k: usize,
}

impl QueryContext {
    /// Build a request; `k = 0` is raised to 1.
    pub fn new(query: impl Into<String>, requester_role: impl Into<String>, k: usize) -> Self {
        if k == 0 {
            tracing::warn!("Requested k=0 candidates; using k=1");
        }

        Self {
            query: query.into(),
            requester_role: requester_role.into(),
            k: k.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_permission_from_array() {
        let set = PermissionSet::from_json(&json!(["HR", " PM ", ""])).unwrap();
        assert_eq!(set.roles().collect::<Vec<_>>(), vec!["HR", "PM"]);
    }

    #[test]
    fn test_permission_from_comma_string() {
        let set = PermissionSet::from_json(&json!("HR, PM")).unwrap();
        assert!(set.allows("HR"));
        assert!(set.allows("PM"));
        assert_eq!(set.to_string(), "HR, PM");
    }

    #[test]
    fn test_permission_rejects_other_types() {
        assert!(PermissionSet::from_json(&json!(null)).is_none());
        assert!(PermissionSet::from_json(&json!(42)).is_none());
        assert!(PermissionSet::from_json(&json!({"role": "HR"})).is_none());
        assert!(PermissionSet::from_json(&json!(["HR", 3])).is_none());
    }

    #[test]
    fn test_permission_exact_match() {
        let set = PermissionSet::new(["Engineering"]);
        assert!(set.allows("Engineering"));
        assert!(!set.allows("Eng"));
        assert!(!set.allows("engineering"));
    }

    #[test]
    fn test_chunk_visibility() {
        let mut chunk = Chunk {
            id: "c".to_string(),
            document_index: 0,
            source_ordinal: 0,
            text: "Bonus details".to_string(),
            metadata: ChunkMetadata {
                title: "Bonus Policy".to_string(),
                category: "HR".to_string(),
                permission: Some(PermissionSet::new(["HR"])),
            },
        };

        assert!(chunk.is_visible_to("HR"));
        assert!(!chunk.is_visible_to("Engineer"));

        chunk.metadata.permission = Some(PermissionSet::default());
        assert!(!chunk.is_visible_to("HR"));

        chunk.metadata.permission = None;
        assert!(!chunk.is_visible_to("HR"));
    }

    #[test]
    fn test_permission_serializes_sorted() {
        let set = PermissionSet::new(["PM", "Engineer", "HR"]);
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"["Engineer","HR","PM"]"#
        );
    }

    #[test]
    fn test_query_context_clamps_k() {
        assert_eq!(QueryContext::new("q", "HR", 0).k, 1);
        assert_eq!(QueryContext::new("q", "HR", 4).k, 4);
    }
}
