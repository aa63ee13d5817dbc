use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use brickforge::config::Config;
use brickforge::llm::{ModelRouter, Provider};
use brickforge::parts::{PartSelector, PartsCatalog};
use brickforge::sandbox::Sandbox;
use brickforge::service::{BuildRequest, BuildService};

fn print_help() {
    println!(
        "\
brickforge v{}

Generates LDraw brick models from natural-language prompts.

USAGE:
    brickforge [OPTIONS] <PROMPT>

ARGUMENTS:
    PROMPT    What to build, e.g. \"a small red sports car\"

OPTIONS:
    -c, --config PATH      Path to TOML configuration file
                           [default: config/brickforge.toml]
    -m, --model NAME       Model name or alias (sonnet, gpt-4o-mini, ...)
    -p, --provider NAME    Force a provider: anthropic or openrouter
    -o, --output DIR       Output directory for the .ldr file
        --show-code        Print the generated source before the summary
    -h, --help             Print this help message and exit
    -V, --version          Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG              Log level filter for tracing
                          (e.g. debug, brickforge=debug,warn)
    ANTHROPIC_API_KEY     API key for Anthropic Claude models
                          (from https://console.anthropic.com/)
    OPEN_ROUTER_KEY       API key for OpenRouter models
                          (from https://openrouter.ai/)

EXAMPLES:
    brickforge \"a medieval castle with two towers\"
    brickforge -m gpt-4o-mini \"a small house\"
    RUST_LOG=debug brickforge \"a red car\"",
        env!("CARGO_PKG_VERSION"),
    );
}

struct CliArgs {
    config_path: String,
    prompt: String,
    model: Option<String>,
    provider: Option<Provider>,
    output_dir: Option<PathBuf>,
    show_code: bool,
}

fn parse_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut config_path = "config/brickforge.toml".to_string();
    let mut prompt_words: Vec<String> = Vec::new();
    let mut model = None;
    let mut provider = None;
    let mut output_dir = None;
    let mut show_code = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("brickforge v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--config" | "-c" => {
                config_path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
            }
            "--model" | "-m" => {
                model = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("--model requires a name"))?,
                );
            }
            "--provider" | "-p" => {
                let name = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--provider requires a name"))?;
                provider = Some(name.parse::<Provider>()?);
            }
            "--output" | "-o" => {
                output_dir = Some(PathBuf::from(args.next().ok_or_else(|| {
                    anyhow::anyhow!("--output requires a directory")
                })?));
            }
            "--show-code" => show_code = true,
            other if other.starts_with('-') => {
                bail!("unknown option: {other} (see --help)");
            }
            word => prompt_words.push(word.to_string()),
        }
    }

    if prompt_words.is_empty() {
        bail!("a prompt is required (see --help)");
    }

    Ok(CliArgs {
        config_path,
        prompt: prompt_words.join(" "),
        model,
        provider,
        output_dir,
        show_code,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for debug mode)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("brickforge=info")),
        )
        .init();

    let args = parse_args()?;

    info!("Loading configuration from {}", args.config_path);
    let config = Config::load(&args.config_path)?;

    info!("LLM: {} ({})", config.llm.provider, config.llm.model);
    info!("Execution timeout: {}ms", config.executor.timeout_ms);

    let catalog = PartsCatalog::load(&config.catalog.path);
    info!("Parts catalog: {} parts", catalog.len());

    let router = ModelRouter::new(&config.llm);
    let sandbox = Sandbox::new(Duration::from_millis(config.executor.timeout_ms));
    let selector = PartSelector::new(catalog);
    let service = BuildService::new(router, sandbox, selector);

    let request = BuildRequest {
        prompt: args.prompt.clone(),
        model: args.model,
        provider: args.provider,
    };

    let outcome = match service.build(&request).await {
        Ok(outcome) => outcome,
        Err(e) => bail!("Build failed: {e}"),
    };

    if args.show_code {
        println!("--- generated code ---");
        println!("{}", outcome.generated_code);
        println!("--- end generated code ---");
    }

    let output_dir = args.output_dir.unwrap_or(config.output.dir);
    std::fs::create_dir_all(&output_dir)?;
    let output_path = output_dir.join(&outcome.model_name);
    std::fs::write(&output_path, &outcome.ldr_content)?;

    println!(
        "Model '{}' written to {} ({} parts)",
        outcome.model_name,
        output_path.display(),
        outcome.part_count
    );

    Ok(())
}
