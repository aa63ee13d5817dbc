use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    /// Supports ${ENV_VAR} substitution
    pub api_key: String,
    /// Supports ${ENV_VAR} substitution. Optional; without it the
    /// OpenRouter provider is unavailable.
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens_per_request: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    /// Wall-clock budget for one generated-code execution.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./parts.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${ANTHROPIC_API_KEY}
        let expanded = shellexpand::env(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[llm]
provider = "anthropic"
model = "claude-sonnet-4-5"
api_key = "test-key"
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.llm.max_tokens_per_request, 2000);
        assert!(config.llm.openrouter_api_key.is_none());
        assert_eq!(config.executor.timeout_ms, 5000);
        assert_eq!(config.executor.timeout(), Duration::from_millis(5000));
        assert_eq!(config.catalog.path, PathBuf::from("./parts.csv"));
        assert_eq!(config.output.dir, PathBuf::from("./output"));
    }

    #[test]
    fn test_full_config() {
        let config: Config = toml::from_str(
            r#"
[llm]
provider = "openrouter"
model = "openai/gpt-4o-mini"
api_key = "a"
openrouter_api_key = "b"
max_tokens_per_request = 4000

[executor]
timeout_ms = 2500

[catalog]
path = "/data/parts.csv"

[output]
dir = "/tmp/models"
"#,
        )
        .unwrap();
        assert_eq!(config.llm.provider, "openrouter");
        assert_eq!(config.llm.openrouter_api_key.as_deref(), Some("b"));
        assert_eq!(config.executor.timeout_ms, 2500);
        assert_eq!(config.catalog.path, PathBuf::from("/data/parts.csv"));
    }

    #[test]
    fn test_env_expansion_on_load() {
        std::env::set_var("BRICKFORGE_TEST_KEY", "expanded-key");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[llm]\nprovider = \"anthropic\"\nmodel = \"m\"\napi_key = \"${BRICKFORGE_TEST_KEY}\"\n",
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.llm.api_key, "expanded-key");
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(Config::load("/nonexistent/config.toml").is_err());
    }
}
