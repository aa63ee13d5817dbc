//! Static safety filter for generated code.
//!
//! A textual pre-check run before execution: it rejects source that
//! references process control, filesystem access, dynamic evaluation, or
//! module loading, and requires that the source actually uses the builder
//! API. This is advisory hardening, not a security boundary — it is
//! trivially bypassed by obfuscation. The real restriction is the
//! interpreter's capability allow-list; this filter just refuses the
//! obvious cases before they reach it.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Forbidden capability references. The `require` pattern has one
/// whitelisted exception, checked separately below.
static FORBIDDEN: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"process\.",
        r#"require\s*\(\s*['"`][^'"`]*['"`]\s*\)"#,
        r"\bimport\s",
        r"\beval\s*\(",
        r"\bFunction\s*\(",
        r"\bexec\s*\(",
        r"\bspawn\s*\(",
        r"__dirname",
        r"__filename",
        r"\bfs\.",
        r"\bpath\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("forbidden pattern must compile"))
    .collect()
});

/// The only module reference generated code is allowed to make.
const ALLOWED_MODULE: &str = "./ldrawBuilder";

/// Returns true when the source looks safe to hand to the sandbox.
///
/// Callers must run this before `execute`; the sandbox itself does not
/// re-check.
pub fn validate(code: &str) -> bool {
    for pattern in FORBIDDEN.iter() {
        // The builder module itself may be required; every other require
        // is rejected.
        if pattern.as_str().contains("require") {
            for found in pattern.find_iter(code) {
                if !found.as_str().contains(ALLOWED_MODULE) {
                    warn!(
                        "Generated code rejected, forbidden module reference: {}",
                        found.as_str()
                    );
                    return false;
                }
            }
            continue;
        }
        if pattern.is_match(code) {
            warn!("Generated code rejected, matches forbidden pattern: {pattern}");
            return false;
        }
    }

    // Code that never touches the builder API cannot produce a model.
    if !code.contains("new LDrawBuilder") && !code.contains("builder") {
        warn!("Generated code does not appear to use the builder API");
        return false;
    }

    true
}
