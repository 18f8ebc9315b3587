//! Prompt variants: server-provided definitions and user-defined ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TRANSCRIPT_PLACEHOLDER: &str = "{transcript}";

/// Variant definition served by the remote API. `prompt` may be omitted, in
/// which case the template is fetched separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptVariant {
    pub variant: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomVariant {
    pub variant: String,
    pub description: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub is_custom: bool,
}

/// Fields a user supplies when creating or editing a custom variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomVariantInput {
    pub variant: String,
    #[serde(default)]
    pub description: String,
    pub prompt: String,
}

impl CustomVariantInput {
    pub fn into_variant(self, created_at: DateTime<Utc>) -> CustomVariant {
        CustomVariant {
            variant: self.variant,
            description: self.description,
            prompt: self.prompt,
            created_at,
            is_custom: true,
        }
    }
}

/// Substitutes the rendered transcript into a template. Templates without a
/// placeholder get the transcript appended after a blank line.
pub fn apply_template(template: &str, transcript: &str) -> String {
    if template.contains(TRANSCRIPT_PLACEHOLDER) {
        template.replace(TRANSCRIPT_PLACEHOLDER, transcript)
    } else {
        format!("{}\n\n{}", template.trim_end(), transcript)
    }
}

/// Validation functions for user-defined variants
pub mod validation {
    use anyhow::{bail, Result};

    const MAX_IDENTIFIER_LENGTH: usize = 64;

    /// Identifiers must match `^[a-z0-9-]+$`.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.is_empty() {
            bail!("Variant identifier is required");
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            bail!(
                "Variant identifier must be at most {} characters",
                MAX_IDENTIFIER_LENGTH
            );
        }

        if !identifier
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            bail!("Invalid variant identifier. Use lowercase letters, digits and hyphens only");
        }

        Ok(())
    }

    pub fn validate_prompt(prompt: &str) -> Result<()> {
        if prompt.trim().is_empty() {
            bail!("Prompt template cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::*;

    #[test]
    fn identifiers_follow_the_lowercase_hyphen_pattern() {
        assert!(validate_identifier("exec-summary").is_ok());
        assert!(validate_identifier("v2").is_ok());
        assert!(validate_identifier("-").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("Exec").is_err());
        assert!(validate_identifier("exec summary").is_err());
        assert!(validate_identifier("exec_summary").is_err());
        assert!(validate_identifier("résumé").is_err());
        assert!(validate_identifier(&"a".repeat(65)).is_err());
    }

    #[test]
    fn blank_prompts_are_rejected() {
        assert!(validate_prompt("  \n").is_err());
        assert!(validate_prompt("Summarize: {transcript}").is_ok());
    }

    #[test]
    fn template_substitution_replaces_every_placeholder() {
        assert_eq!(
            apply_template("A {transcript} B {transcript}", "x"),
            "A x B x"
        );
        assert_eq!(apply_template("Summarize this:\n", "body"), "Summarize this:\n\nbody");
    }

    #[test]
    fn remote_variants_may_omit_the_prompt() {
        let variant: PromptVariant =
            serde_json::from_str(r#"{"variant":"summary","description":"Short"}"#).unwrap();
        assert_eq!(variant.prompt, None);
    }
}
