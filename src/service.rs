//! The build pipeline — the single entry point of the system.
//!
//! One call takes a natural-language prompt through part selection, code
//! generation, the static safety filter, and sandboxed execution, and
//! returns the rendered LDraw document. Every failure is typed and
//! recovered here; nothing in the pipeline terminates the process.

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm::{ModelRouter, Provider};
use crate::parts::PartSelector;
use crate::sandbox::{self, ExecError, Sandbox};

/// Maximum length of the derived model-name slug.
const MAX_SLUG_LEN: usize = 30;

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub prompt: String,
    /// Model name or alias; falls back to the configured default.
    pub model: Option<String>,
    /// Explicit provider choice; otherwise derived from the model id.
    pub provider: Option<Provider>,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Rendered LDraw document.
    pub ldr_content: String,
    /// Derived file name, e.g. `red_sports_car.ldr`.
    pub model_name: String,
    /// The generated source that produced the model.
    pub generated_code: String,
    /// Part placements in the document.
    pub part_count: usize,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("prompt is required")]
    EmptyPrompt,
    #[error("failed to generate building code: {0}")]
    Generation(#[source] anyhow::Error),
    #[error(transparent)]
    Execution(#[from] ExecError),
}

/// Wires the collaborators of one build pipeline.
pub struct BuildService {
    router: ModelRouter,
    sandbox: Sandbox,
    selector: PartSelector,
}

impl BuildService {
    pub fn new(router: ModelRouter, sandbox: Sandbox, selector: PartSelector) -> Self {
        Self {
            router,
            sandbox,
            selector,
        }
    }

    /// Runs the full pipeline: selection → generation → filter → sandbox.
    pub async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, BuildError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(BuildError::EmptyPrompt);
        }

        let build_id = Uuid::new_v4();
        info!("[{build_id}] Building model from prompt: {prompt}");

        let parts_excerpt = self.selector.relevant_parts(prompt);
        let builder_api = self.selector.builder_api_documentation();

        let code = self
            .router
            .generate_building_code(
                prompt,
                &parts_excerpt,
                builder_api,
                request.model.as_deref(),
                request.provider,
            )
            .await
            .map_err(BuildError::Generation)?;

        self.build_from_code(&code, prompt).await
    }

    /// The post-generation half of the pipeline. Split out so the filter
    /// and sandbox path can run against known source.
    pub async fn build_from_code(
        &self,
        code: &str,
        prompt: &str,
    ) -> Result<BuildOutcome, BuildError> {
        if !sandbox::validate(code) {
            warn!("Generated code failed validation, not executing");
            return Err(ExecError::Rejected.into());
        }

        let slug = slugify(prompt);
        let model = self.sandbox.execute(code, &slug).await?;

        Ok(BuildOutcome {
            ldr_content: model.content,
            model_name: format!("{slug}.ldr"),
            generated_code: code.to_string(),
            part_count: model.part_count,
        })
    }
}

/// Derives a filesystem-safe model name from the prompt.
pub fn slugify(prompt: &str) -> String {
    prompt
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_SLUG_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::parts::PartsCatalog;

    fn service() -> BuildService {
        let router = ModelRouter::new(&LlmConfig {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            api_key: "test-key".to_string(),
            openrouter_api_key: None,
            max_tokens_per_request: 2000,
        });
        BuildService::new(
            router,
            Sandbox::default(),
            PartSelector::new(PartsCatalog::minimal()),
        )
    }

    // ── slugify ─────────────────────────────────────────

    #[test]
    fn test_slugify_lowercases_and_replaces() {
        assert_eq!(slugify("A Red Sports Car!"), "a_red_sports_car_");
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "a".repeat(100);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_slugify_keeps_digits() {
        assert_eq!(slugify("tower 42"), "tower_42");
    }

    // ── Pipeline from known source ──────────────────────

    #[tokio::test]
    async fn test_build_from_code_happy_path() {
        let code = "const builder = new LDrawBuilder('Car');\n\
                    builder.addPart('3001', Colors.RED, 0, 0, 0);\n\
                    builder.addWheel('98302', -30, 6, 60);\n\
                    builder.save('model.ldr');";
        let outcome = service().build_from_code(code, "a red car").await.unwrap();
        assert_eq!(outcome.model_name, "a_red_car.ldr");
        assert_eq!(outcome.part_count, 2);
        assert!(outcome.ldr_content.contains("3001.dat"));
        assert!(outcome.ldr_content.contains("98302.dat"));
        assert_eq!(outcome.generated_code, code);
    }

    #[tokio::test]
    async fn test_build_from_code_rejects_forbidden_source() {
        let code = "const builder = new LDrawBuilder();\n\
                    process.exit(1);";
        let err = service().build_from_code(code, "x").await.unwrap_err();
        assert!(matches!(err, BuildError::Execution(ExecError::Rejected)));
    }

    #[tokio::test]
    async fn test_build_from_code_surfaces_exec_errors() {
        let err = service()
            .build_from_code("const x = builder + 1;", "x")
            .await
            .unwrap_err();
        // `builder` referenced but never defined — runtime error, after
        // passing the textual filter.
        assert!(matches!(err, BuildError::Execution(ExecError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_build_empty_prompt() {
        let request = BuildRequest {
            prompt: "   ".to_string(),
            model: None,
            provider: None,
        };
        let err = service().build(&request).await.unwrap_err();
        assert!(matches!(err, BuildError::EmptyPrompt));
    }
}
