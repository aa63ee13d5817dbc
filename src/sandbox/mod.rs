//! Execution sandbox for generated builder code.
//!
//! Runs one block of untrusted, model-generated source against the
//! `LdrawBuilder` API and captures the rendered document in-process
//! instead of letting the code write files.
//!
//! The security model is layered:
//!
//! 1. Static filter (`filter::validate`) — rejects source that textually
//!    references forbidden capabilities. Advisory only.
//! 2. Restricted interpreter — the execution environment exposes exactly
//!    the builder constructor, the `Colors` table, a `console` shim, and
//!    `Math`. There is no ambient filesystem, process, network, or eval.
//! 3. Wall-clock deadline — the evaluator aborts runaway code itself, so
//!    no thread is ever killed from outside.
//!
//! Every `execute` call gets a fresh environment and a fresh capture
//! slot; nothing is shared across invocations.

pub mod filter;
mod interp;
mod lexer;
mod parser;

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use interp::{Interp, Interrupt};

pub use filter::validate;

/// Default wall-clock budget for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Why an execution failed. All variants are recovered at the call
/// boundary and surfaced to the caller; none terminate the process.
#[derive(Debug, Error, PartialEq)]
pub enum ExecError {
    /// The static filter refused the source before execution.
    #[error("generated code failed validation")]
    Rejected,
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),
    /// The generated code itself raised; the message is preserved.
    #[error("generated code failed: {0}")]
    Runtime(String),
    #[error("no builder instance found")]
    NoBuilder,
    #[error("no content was generated")]
    NoOutput,
}

/// A successfully rendered model.
#[derive(Debug, Clone)]
pub struct RenderedModel {
    /// Full LDraw document text.
    pub content: String,
    /// Number of part placements, taken from the builder directly.
    pub part_count: usize,
}

/// Executes generated builder code with a bounded wall-clock budget.
#[derive(Debug, Clone)]
pub struct Sandbox {
    timeout: Duration,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Sandbox {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Runs `code` and returns the captured document.
    ///
    /// The code is expected to bind a builder to the name `builder` and
    /// (usually) call `save`. After it runs, the guard captures the
    /// builder's rendered output regardless, so a missing `save` call
    /// still produces the document — but a missing `builder` binding is
    /// an error even if some other builder saved content.
    pub async fn execute(&self, code: &str, model_name: &str) -> Result<RenderedModel, ExecError> {
        debug!("Executing generated code ({} bytes)", code.len());

        let code = code.to_string();
        let model_name = model_name.to_string();
        let timeout = self.timeout;

        // The interpreter is CPU-bound and checks its own deadline, so a
        // blocking task is enough; no outer watchdog is needed.
        let result = tokio::task::spawn_blocking(move || run_program(&code, timeout))
            .await
            .map_err(|e| ExecError::Runtime(format!("executor task failed: {e}")))?;

        match &result {
            Ok(model) => {
                info!(
                    "Model '{model_name}' generated: {} parts, {} bytes",
                    model.part_count,
                    model.content.len()
                );
            }
            Err(e) => {
                debug!("Execution failed: {e}");
            }
        }
        result
    }
}

fn run_program(code: &str, timeout: Duration) -> Result<RenderedModel, ExecError> {
    let program = parser::parse(code)
        .map_err(|msg| ExecError::Runtime(format!("syntax error: {msg}")))?;

    let mut interp = Interp::new(Instant::now() + timeout);
    match interp.run(&program) {
        Ok(()) => {}
        Err(Interrupt::Timeout) => return Err(ExecError::Timeout(timeout)),
        Err(Interrupt::Error(msg)) => return Err(ExecError::Runtime(msg)),
    }

    if !interp.capture_builder_output() {
        return Err(ExecError::NoBuilder);
    }

    match interp.take_captured() {
        Some(captured) if !captured.content.is_empty() => Ok(RenderedModel {
            content: captured.content,
            part_count: captured.part_count,
        }),
        _ => Err(ExecError::NoOutput),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_placement_lines(content: &str) -> usize {
        content.lines().filter(|l| l.starts_with("1 ")).count()
    }

    #[tokio::test]
    async fn test_execute_simple_model() {
        let sandbox = Sandbox::default();
        let code = "const builder = new LDrawBuilder('x');\n\
                    builder.addPart('3001', 4, 0, 0, 0);\n\
                    builder.save('m');";
        let model = sandbox.execute(code, "m").await.unwrap();
        assert!(!model.content.is_empty());
        assert!(model.content.contains("3001.dat"));
        assert_eq!(count_placement_lines(&model.content), 1);
        assert_eq!(model.part_count, 1);
    }

    #[tokio::test]
    async fn test_execute_without_save_still_captures() {
        let sandbox = Sandbox::default();
        let code = "const builder = new LDrawBuilder('x');\n\
                    builder.addPart('3001', 4, 0, 0, 0);";
        let model = sandbox.execute(code, "m").await.unwrap();
        assert_eq!(model.part_count, 1);
    }

    #[tokio::test]
    async fn test_execute_no_builder_binding() {
        let sandbox = Sandbox::default();
        let err = sandbox
            .execute("const x = 1 + 1;", "m")
            .await
            .unwrap_err();
        assert_eq!(err, ExecError::NoBuilder);
        assert_eq!(err.to_string(), "no builder instance found");
    }

    #[tokio::test]
    async fn test_execute_differently_named_builder_is_no_builder() {
        // The guard only looks for a binding named `builder`.
        let sandbox = Sandbox::default();
        let code = "const b = new LDrawBuilder('x');\n\
                    b.addPart('3001', 4, 0, 0, 0);\n\
                    b.save('m');";
        let err = sandbox.execute(code, "m").await.unwrap_err();
        assert_eq!(err, ExecError::NoBuilder);
    }

    #[tokio::test]
    async fn test_execute_runtime_error_preserves_message() {
        let sandbox = Sandbox::default();
        let err = sandbox
            .execute("builder.addPart('3001', 4, 0, 0, 0);", "m")
            .await
            .unwrap_err();
        match err {
            ExecError::Runtime(msg) => assert!(msg.contains("'builder' is not defined")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_syntax_error() {
        let sandbox = Sandbox::default();
        let err = sandbox
            .execute("const builder = = 1;", "m")
            .await
            .unwrap_err();
        match err {
            ExecError::Runtime(msg) => assert!(msg.contains("syntax error")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_infinite_loop_times_out() {
        let sandbox = Sandbox::new(Duration::from_millis(100));
        let started = Instant::now();
        let err = sandbox
            .execute("const builder = 1; while (true) {}", "m")
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout(_)));
        // Bounded wait: well under the test harness timeout.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_executions_are_independent() {
        let sandbox = Sandbox::default();
        let code = "const builder = new LDrawBuilder('x');\n\
                    builder.addPart('3001', 4, 0, 0, 0);";
        let first = sandbox.execute(code, "a").await.unwrap();
        let second = sandbox.execute(code, "b").await.unwrap();
        // Fresh environment each time — counts do not accumulate.
        assert_eq!(first.part_count, 1);
        assert_eq!(second.part_count, 1);
        assert_eq!(first.content, second.content);
    }

    #[tokio::test]
    async fn test_execute_loop_driven_model() {
        let sandbox = Sandbox::default();
        let code = "const builder = new LDrawBuilder('Wall');\n\
                    const colors = [Colors.RED, Colors.BLUE];\n\
                    for (let row = 0; row < 3; row++) {\n\
                      for (let col = 0; col < 4; col++) {\n\
                        builder.addPart('3001', colors[row % 2], col * 40, 0 - row * 24, 0);\n\
                      }\n\
                      builder.addStep();\n\
                    }\n\
                    builder.save('wall.ldr');";
        let model = sandbox.execute(code, "wall").await.unwrap();
        assert_eq!(model.part_count, 12);
        assert_eq!(model.content.matches("0 STEP").count(), 3);
    }
}
