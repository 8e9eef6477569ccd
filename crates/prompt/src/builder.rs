//! Prompt builder for rendering the answer template.

use crate::types::{BuiltPrompt, PromptDefinition};
use securerag_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Separator between context passages.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Build the answer prompt for a question and its retrieved passages.
///
/// Passages are joined with a blank line and exposed to the template as
/// `context`; the question is exposed as `question`.
///
/// # Example
/// ```no_run
/// use securerag_prompt::{build_prompt, default_answer_prompt};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let passages = vec!["Bonuses are paid annually.".to_string()];
/// let built = build_prompt(&default_answer_prompt(), "When are bonuses paid?", &passages)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    question: &str,
    passages: &[String],
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt {} with {} passages",
        definition.id,
        passages.len()
    );

    let mut variables = HashMap::new();
    variables.insert("context".to_string(), passages.join(PASSAGE_SEPARATOR));
    variables.insert("question".to_string(), question.to_string());

    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        definition.system.clone(),
        user,
        definition.id.clone(),
        passages.len(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Passages are plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
