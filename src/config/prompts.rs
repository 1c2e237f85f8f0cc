//! Prompt templates for Brosur.
//!
//! Prompts can be customized by placing a `rag.toml` file in the custom prompts directory.

use super::ContextMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for RAG response generation.
///
/// The preambles receive `{{context}}`; every template also sees the custom variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// System preamble when answers must come from the context alone.
    pub context_only: String,
    /// System preamble when general knowledge may fill gaps in the context.
    pub context_preferred: String,
    /// Stand-in for the context block when retrieval found nothing.
    pub no_context: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            context_only: r#"You are a helpful assistant for {{company}}'s products and website.

Guidelines:
- Answer using only the content provided below
- Give answers of moderate length, neither terse nor exhaustive
- If the content does not contain the answer, say clearly that you do not know
- Never invent product details, prices or claims that are not in the content

Content:

{{context}}"#
                .to_string(),

            context_preferred: r#"You are a helpful assistant for {{company}}'s products and website.

Guidelines:
- Prefer the content provided below when answering
- Give answers of moderate length, neither terse nor exhaustive
- If you definitely cannot find the answer in the content, answer from your own knowledge
- After helping with the user's topic, ask whether they would like information about a related topic

Content:

{{context}}"#
                .to_string(),

            no_context: "(No relevant content was found for this question.)".to_string(),
        }
    }
}

impl RagPrompts {
    /// The system preamble for the given context mode.
    pub fn preamble(&self, mode: ContextMode) -> &str {
        match mode {
            ContextMode::ContextOnly => &self.context_only,
            ContextMode::ContextPreferred => &self.context_preferred,
        }
    }
}

impl Prompts {
    /// Load prompts, with optional overrides from a custom directory.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        prompts
            .variables
            .insert("company".to_string(), "the company".to_string());

        // Store custom variables
        if let Some(vars) = custom_variables {
            prompts.variables.extend(vars.clone());
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in a single left-to-right pass; substituted
    /// values are never scanned again. Unknown placeholders are left as they are.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let name = &after[..end];
                    match vars.get(name) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(name);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
