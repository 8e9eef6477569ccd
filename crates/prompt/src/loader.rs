//! Loader for the answer prompt definition.

use crate::types::PromptDefinition;
use securerag_core::{AppError, AppResult};
use std::path::Path;

/// Override location, relative to the workspace root.
pub const ANSWER_PROMPT_FILE: &str = ".securerag/prompts/answer.yaml";

const DEFAULT_SYSTEM: &str = "You are an assistant for question-answering tasks for \
'AI Tech Solutions Inc.'. Use the following pieces of retrieved context to answer the \
question. If you don't know the answer, just say that you don't know. Keep the answer \
concise and based *only* on the provided context.";

const DEFAULT_TEMPLATE: &str = "Context:\n{{context}}\n\nQuestion:\n{{question}}\n\nAnswer:";

/// The built-in answer prompt.
pub fn default_answer_prompt() -> PromptDefinition {
    PromptDefinition {
        id: "answer".to_string(),
        title: "Answer from retrieved context".to_string(),
        api_version: "1.0".to_string(),
        system: Some(DEFAULT_SYSTEM.to_string()),
        template: DEFAULT_TEMPLATE.to_string(),
    }
}

/// Load the answer prompt for a workspace.
///
/// Reads `.securerag/prompts/answer.yaml` when present and falls back to
/// [`default_answer_prompt`] otherwise. A file that exists but fails to
/// parse or validate is an error.
///
/// # Example
/// ```no_run
/// use securerag_prompt::load_answer_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_answer_prompt(Path::new("."))?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_answer_prompt(workspace_path: &Path) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path.join(ANSWER_PROMPT_FILE);

    if !prompt_file.exists() {
        tracing::debug!("No prompt override at {:?}, using built-in", prompt_file);
        return Ok(default_answer_prompt());
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.api_version.is_empty() || !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {:?}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // Both slots must be rendered or the model never sees them.
    for slot in ["context", "question"] {
        if !def.template.contains(slot) {
            return Err(AppError::Prompt(format!(
                "Prompt template must reference {{{{{}}}}}",
                slot
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, content: &str) {
        let path = dir.join(ANSWER_PROMPT_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_default_when_no_override() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_answer_prompt(temp_dir.path()).unwrap();

        assert_eq!(prompt.id, "answer");
        assert!(prompt.system.unwrap().contains("just say that you don't know"));
        assert!(validate_prompt(&default_answer_prompt()).is_ok());
    }

    #[test]
    fn test_load_override() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            r#"
id: answer.terse
title: Terse
apiVersion: "1.1"
template: "Q: {{question}}\nC: {{context}}"
"#,
        );

        let prompt = load_answer_prompt(temp_dir.path()).unwrap();
        assert_eq!(prompt.id, "answer.terse");
        assert!(prompt.system.is_none());
    }

    #[test]
    fn test_override_must_reference_context() {
        let temp_dir = TempDir::new().unwrap();
        write_override(
            temp_dir.path(),
            r#"
id: answer
title: Broken
apiVersion: "1.0"
template: "{{question}}"
"#,
        );

        let err = load_answer_prompt(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("{{context}}"));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "invalid: yaml: content:");

        assert!(load_answer_prompt(temp_dir.path()).is_err());
    }
}
