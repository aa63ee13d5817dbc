//! `CodeGenerator` trait — abstraction over LLM backends.
//!
//! Providers (Anthropic, OpenRouter, …) implement this trait so the
//! pipeline can be configured to use any supported backend via the
//! `[llm] provider` config field.

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over code-generating LLM backends.
///
/// Each provider translates the shared prompt material into its own wire
/// format and normalizes responses back into a cleaned source string.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Asks the model for builder code implementing `prompt`.
    ///
    /// `parts_excerpt` and `builder_api` are inserted into the system
    /// prompt; `model` is the already-resolved provider model id.
    async fn generate(
        &self,
        prompt: &str,
        parts_excerpt: &str,
        builder_api: &str,
        model: &str,
    ) -> Result<String>;

    /// Human-readable description of the provider and model.
    ///
    /// Used in status output, e.g. `"anthropic (claude-sonnet-4-5)"`.
    fn description(&self) -> String;
}

/// Normalizes a raw model response into plain source text.
///
/// Strips markdown code fences, trims, and — when the result does not
/// start with a declaration — cuts forward to the first `const builder`
/// occurrence, dropping any leading prose the model added.
pub fn clean_code(raw: &str) -> String {
    let mut cleaned = raw
        .replace("```typescript\n", "")
        .replace("```typescript", "")
        .replace("```javascript\n", "")
        .replace("```javascript", "")
        .replace("```js\n", "")
        .replace("```\n", "")
        .replace("```", "");
    cleaned = cleaned.trim().to_string();

    if !cleaned.starts_with("const") && !cleaned.starts_with("import") {
        if let Some(start) = cleaned.find("const builder") {
            cleaned = cleaned[start..].to_string();
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time verification that `CodeGenerator` is object-safe.
    #[test]
    fn test_code_generator_is_object_safe() {
        fn _assert_object_safe(_: &dyn CodeGenerator) {}
    }

    #[test]
    fn test_clean_code_strips_fences() {
        let raw = "```typescript\nconst builder = new LDrawBuilder();\n```";
        assert_eq!(clean_code(raw), "const builder = new LDrawBuilder();");
    }

    #[test]
    fn test_clean_code_strips_bare_fences() {
        let raw = "```\nconst builder = new LDrawBuilder();\n```";
        assert_eq!(clean_code(raw), "const builder = new LDrawBuilder();");
    }

    #[test]
    fn test_clean_code_drops_leading_prose() {
        let raw = "Here is your model:\n\nconst builder = new LDrawBuilder();\nbuilder.save('m');";
        let cleaned = clean_code(raw);
        assert!(cleaned.starts_with("const builder"));
        assert!(cleaned.ends_with("builder.save('m');"));
    }

    #[test]
    fn test_clean_code_keeps_clean_input_unchanged() {
        let raw = "const builder = new LDrawBuilder();\nbuilder.addStep();";
        assert_eq!(clean_code(raw), raw);
    }

    #[test]
    fn test_clean_code_trims_whitespace() {
        assert_eq!(clean_code("  const x = 1;  "), "const x = 1;");
    }
}
