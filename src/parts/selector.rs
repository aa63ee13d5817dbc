//! Chooses the catalog excerpt shown to the model for a given prompt.
//!
//! Keyword matches from the prompt come first, then the always-useful
//! common parts, deduplicated and capped so the excerpt stays small
//! enough for the system prompt.

use std::collections::HashSet;

use crate::llm::prompt::BUILDER_API;

use super::catalog::{Part, PartsCatalog};

/// Maximum parts listed in the excerpt.
const MAX_PARTS: usize = 60;

/// Words too generic to be useful as part-name keywords.
const STOPWORDS: &[&str] = &[
    "the", "and", "with", "for", "from", "that", "this", "build", "make",
    "made", "model", "lego", "using", "small", "large", "big",
];

pub struct PartSelector {
    catalog: PartsCatalog,
}

impl PartSelector {
    pub fn new(catalog: PartsCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PartsCatalog {
        &self.catalog
    }

    /// The builder API description inserted into the system prompt.
    pub fn builder_api_documentation(&self) -> &'static str {
        BUILDER_API
    }

    /// Builds the parts excerpt for `prompt`: a header line, then one
    /// `part_num,name` line per part.
    pub fn relevant_parts(&self, prompt: &str) -> String {
        let keywords = extract_keywords(prompt);
        let keyword_refs: Vec<&str> = keywords.iter().map(String::as_str).collect();

        let mut selected: Vec<&Part> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for part in self.catalog.search(&keyword_refs) {
            if selected.len() >= MAX_PARTS {
                break;
            }
            if seen.insert(part.part_num.as_str()) {
                selected.push(part);
            }
        }

        let common = self.catalog.common_parts();
        for part in common
            .bricks
            .into_iter()
            .chain(common.plates)
            .chain(common.wheels)
            .chain(common.windows)
        {
            if selected.len() >= MAX_PARTS {
                break;
            }
            if seen.insert(part.part_num.as_str()) {
                selected.push(part);
            }
        }

        let mut excerpt = String::from("part_num,name");
        for part in selected {
            excerpt.push('\n');
            excerpt.push_str(&part.part_num);
            excerpt.push(',');
            excerpt.push_str(&part.name);
        }
        excerpt
    }
}

/// Lowercased prompt words usable as part-name keywords.
fn extract_keywords(prompt: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    prompt
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}
