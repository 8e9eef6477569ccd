//! Corpus loading.
//!
//! The corpus is a single JSON array of records carrying `title`, `content`,
//! `permission` and an optional `category`. Invalid records are skipped and
//! reported; loading continues with the rest.

use crate::types::{CorpusLoad, PermissionSet, SkippedRecord, SourceDocument, DEFAULT_CATEGORY};
use securerag_core::{AppError, AppResult};
use serde_json::Value;
use std::path::Path;

/// Load a corpus file, distinguishing a failed load from an empty one.
pub fn try_load_corpus(path: &Path) -> AppResult<CorpusLoad> {
    tracing::debug!("Loading corpus from {:?}", path);

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::CorpusLoad(format!("Failed to read corpus file {:?}: {}", path, e))
    })?;

    let load = parse_corpus(&contents)?;

    tracing::info!(
        "Loaded {} documents from {:?} ({} skipped)",
        load.documents.len(),
        path,
        load.skipped.len()
    );

    Ok(load)
}

/// Load a corpus file, returning no documents when the file is unusable.
pub fn load_corpus(path: &Path) -> Vec<SourceDocument> {
    match try_load_corpus(path) {
        Ok(load) => load.documents,
        Err(e) => {
            tracing::error!("{}", e);
            Vec::new()
        }
    }
}

/// Parse corpus JSON text.
pub fn parse_corpus(contents: &str) -> AppResult<CorpusLoad> {
    let value: Value = serde_json::from_str(contents)
        .map_err(|e| AppError::CorpusLoad(format!("Corpus is not valid JSON: {}", e)))?;

    let records = value
        .as_array()
        .ok_or_else(|| AppError::CorpusLoad("Corpus top level must be an array".to_string()))?;

    let mut load = CorpusLoad::default();

    for (index, record) in records.iter().enumerate() {
        match parse_record(record) {
            Ok(document) => load.documents.push(document),
            Err(reason) => {
                let title = record
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::to_string);

                tracing::warn!(
                    index,
                    title = title.as_deref().unwrap_or("<untitled>"),
                    "Skipping corpus record: {}",
                    reason
                );

                load.skipped.push(SkippedRecord {
                    index,
                    title,
                    reason,
                });
            }
        }
    }

    Ok(load)
}

fn parse_record(record: &Value) -> Result<SourceDocument, String> {
    let fields = record
        .as_object()
        .ok_or_else(|| "record is not an object".to_string())?;

    let title = required_string(fields.get("title"), "title")?;
    let content = required_string(fields.get("content"), "content")?;

    let permission = fields
        .get("permission")
        .and_then(PermissionSet::from_json)
        .ok_or_else(|| "missing or malformed permission".to_string())?;

    let category = fields
        .get("category")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();

    Ok(SourceDocument {
        title,
        content,
        category,
        permission,
    })
}

fn required_string(value: Option<&Value>, field: &str) -> Result<String, String> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(format!("{} is not a string", field)),
        None => Err(format!("missing {}", field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_valid_records_in_order() {
        let load = parse_corpus(
            r#"[
                {"title": "Deployment Guide", "content": "Use the pipeline.", "category": "Engineering", "permission": ["Engineer"]},
                {"title": "Bonus Policy", "content": "Paid yearly.", "permission": ["HR"], "owner": "ignored"}
            ]"#,
        )
        .unwrap();

        assert_eq!(load.documents.len(), 2);
        assert!(load.skipped.is_empty());
        assert_eq!(load.documents[0].title, "Deployment Guide");
        assert_eq!(load.documents[1].title, "Bonus Policy");
        assert_eq!(load.documents[1].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_invalid_records_are_skipped() {
        let load = parse_corpus(
            r#"[
                {"title": "No Content", "permission": ["HR"]},
                {"title": "Remote Work Policy", "content": "Two days a week.", "permission": ["Engineer", "HR", "PM"]},
                {"title": "Null Permission", "content": "x", "permission": null},
                {"title": "Numeric Permission", "content": "x", "permission": 7},
                "not a record",
                {"content": "orphan", "permission": ["HR"]}
            ]"#,
        )
        .unwrap();

        assert_eq!(load.documents.len(), 1);
        assert_eq!(load.documents[0].title, "Remote Work Policy");

        let skipped: Vec<usize> = load.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![0, 2, 3, 4, 5]);
        assert_eq!(load.skipped[0].title.as_deref(), Some("No Content"));
        assert_eq!(load.skipped[0].reason, "missing content");
        assert!(load.skipped[4].title.is_none());
    }

    #[test]
    fn test_comma_separated_permission() {
        let load = parse_corpus(
            r#"[{"title": "Roadmap", "content": "Q3 goals", "permission": "PM, Engineer"}]"#,
        )
        .unwrap();

        let permission = &load.documents[0].permission;
        assert!(permission.allows("PM"));
        assert!(permission.allows("Engineer"));
    }

    #[test]
    fn test_empty_permission_kept() {
        let load =
            parse_corpus(r#"[{"title": "Sealed", "content": "secret", "permission": []}]"#)
                .unwrap();

        assert_eq!(load.documents.len(), 1);
        assert!(load.documents[0].permission.is_empty());
    }

    #[test]
    fn test_non_array_top_level() {
        let result = parse_corpus(r#"{"title": "x"}"#);
        assert!(matches!(result, Err(AppError::CorpusLoad(_))));
    }

    #[test]
    fn test_missing_file_is_lenient() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("docs.json");

        assert!(matches!(
            try_load_corpus(&missing),
            Err(AppError::CorpusLoad(_))
        ));
        assert!(load_corpus(&missing).is_empty());
    }

    #[test]
    fn test_invalid_json_is_lenient() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docs.json");
        fs::write(&path, "[{not json").unwrap();

        assert!(load_corpus(&path).is_empty());
    }
}
