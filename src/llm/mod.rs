pub mod anthropic;
pub mod client;
pub mod openrouter;
pub mod prompt;
pub mod router;

pub use client::{clean_code, CodeGenerator};
pub use router::{ModelRouter, Provider};
