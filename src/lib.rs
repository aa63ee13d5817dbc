//! brickforge — LDraw brick models from natural-language prompts.
//!
//! The pipeline: a prompt goes to an LLM provider, the provider returns
//! builder-script source, a static filter screens it, a restricted
//! interpreter executes it against the [`ldraw::LdrawBuilder`] API, and
//! the rendered `.ldr` document comes back with a part count.

pub mod config;
pub mod ldraw;
pub mod llm;
pub mod parts;
pub mod sandbox;
pub mod service;
