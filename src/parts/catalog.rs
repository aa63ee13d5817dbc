//! Parts catalog — the list of known part numbers and names.
//!
//! Loaded once from a Rebrickable-style CSV (`part_num,name,part_cat_id,
//! part_material`) and kept in memory for the process lifetime. A missing
//! or unreadable file falls back to a built-in minimal set so the
//! pipeline still works without the full catalog.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub part_num: String,
    pub name: String,
    pub category_id: String,
    pub material: String,
}

#[derive(Debug, Clone)]
pub struct PartsCatalog {
    parts: Vec<Part>,
    by_num: HashMap<String, usize>,
}

/// Excerpts of the most commonly needed part groups.
#[derive(Debug)]
pub struct CommonParts<'a> {
    pub bricks: Vec<&'a Part>,
    pub plates: Vec<&'a Part>,
    pub wheels: Vec<&'a Part>,
    pub windows: Vec<&'a Part>,
}

impl PartsCatalog {
    /// Loads the catalog from `path`. A missing or unreadable file is
    /// not an error: the built-in minimal set is used instead.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Parts CSV not readable at {} ({e}), using minimal set",
                    path.display()
                );
                return Self::minimal();
            }
        };

        let mut parts = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            // Header row
            if i == 0 && line.starts_with("part_num") {
                continue;
            }
            let fields = split_csv_line(line);
            if fields.len() < 2 {
                continue;
            }
            parts.push(Part {
                part_num: fields[0].clone(),
                name: fields[1].clone(),
                category_id: fields.get(2).cloned().unwrap_or_default(),
                material: fields.get(3).cloned().unwrap_or_default(),
            });
        }

        if parts.is_empty() {
            warn!("Parts CSV at {} contained no parts, using minimal set", path.display());
            return Self::minimal();
        }

        info!("Loaded {} parts from {}", parts.len(), path.display());
        Self::from_parts(parts)
    }

    /// Essential parts for basic building, used when no CSV is available.
    pub fn minimal() -> Self {
        let minimal = [
            ("3001", "Brick 2 x 4", "5"),
            ("3003", "Brick 2 x 2", "5"),
            ("3004", "Brick 1 x 2", "5"),
            ("3005", "Brick 1 x 1", "5"),
            ("3020", "Plate 2 x 4", "26"),
            ("3021", "Plate 2 x 3", "26"),
            ("3022", "Plate 2 x 2", "26"),
            ("3023", "Plate 1 x 2", "26"),
            ("3024", "Plate 1 x 1", "26"),
            ("3068", "Tile 2 x 2", "37"),
            ("3069", "Tile 1 x 2", "37"),
            ("3070", "Tile 1 x 1", "37"),
            ("4070", "Brick 1 x 1 with Headlight", "5"),
            ("30414", "Brick 1 x 4", "5"),
            ("3010", "Brick 1 x 4", "5"),
            ("3039", "Slope 45 2 x 2", "31"),
            ("3040", "Slope 45 1 x 2", "31"),
            ("6091", "Brick 2 x 1 x 1 1/3 with Curved Top", "5"),
            ("98302", "Wheel", "59"),
            ("3626", "Minifigure Head", "65"),
        ];
        let parts = minimal
            .iter()
            .map(|(num, name, cat)| Part {
                part_num: num.to_string(),
                name: name.to_string(),
                category_id: cat.to_string(),
                material: "Plastic".to_string(),
            })
            .collect();
        Self::from_parts(parts)
    }

    fn from_parts(parts: Vec<Part>) -> Self {
        let by_num = parts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.part_num.clone(), i))
            .collect();
        Self { parts, by_num }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, part_num: &str) -> Option<&Part> {
        self.by_num.get(part_num).map(|&i| &self.parts[i])
    }

    /// Parts whose name contains any of the keywords (case-insensitive).
    pub fn search(&self, keywords: &[&str]) -> Vec<&Part> {
        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.parts
            .iter()
            .filter(|part| {
                let name = part.name.to_lowercase();
                lowered.iter().any(|k| name.contains(k))
            })
            .collect()
    }

    pub fn search_category(&self, category_id: &str) -> Vec<&Part> {
        self.parts
            .iter()
            .filter(|part| part.category_id == category_id)
            .collect()
    }

    pub fn common_parts(&self) -> CommonParts<'_> {
        CommonParts {
            bricks: self.search(&["brick"]).into_iter().take(20).collect(),
            plates: self.search(&["plate"]).into_iter().take(20).collect(),
            wheels: self.search(&["wheel"]).into_iter().take(10).collect(),
            windows: self
                .search(&["window", "windscreen", "glass"])
                .into_iter()
                .take(10)
                .collect(),
        }
    }
}

/// Splits one CSV line, honoring double-quoted fields (a quoted field may
/// contain commas; `""` inside quotes is an escaped quote).
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_set_lookup() {
        let catalog = PartsCatalog::minimal();
        assert_eq!(catalog.len(), 20);
        assert_eq!(catalog.get("3001").unwrap().name, "Brick 2 x 4");
        assert!(catalog.get("99999").is_none());
    }

    #[test]
    fn test_search_by_keyword() {
        let catalog = PartsCatalog::minimal();
        let wheels = catalog.search(&["wheel"]);
        assert_eq!(wheels.len(), 1);
        assert_eq!(wheels[0].part_num, "98302");

        let bricks = catalog.search(&["brick"]);
        assert!(bricks.len() >= 6);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = PartsCatalog::minimal();
        assert_eq!(
            catalog.search(&["BRICK"]).len(),
            catalog.search(&["brick"]).len()
        );
    }

    #[test]
    fn test_search_category() {
        let catalog = PartsCatalog::minimal();
        let plates = catalog.search_category("26");
        assert_eq!(plates.len(), 5);
    }

    #[test]
    fn test_common_parts_groups() {
        let catalog = PartsCatalog::minimal();
        let common = catalog.common_parts();
        assert!(!common.bricks.is_empty());
        assert!(!common.plates.is_empty());
        assert_eq!(common.wheels.len(), 1);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let catalog = PartsCatalog::load(Path::new("/nonexistent/parts.csv"));
        assert_eq!(catalog.len(), 20);
    }

    #[test]
    fn test_load_csv_with_header_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.csv");
        std::fs::write(
            &path,
            "part_num,name,part_cat_id,part_material\n\
             3001,Brick 2 x 4,5,Plastic\n\
             973,\"Torso, Plain\",60,Plastic\n",
        )
        .unwrap();

        let catalog = PartsCatalog::load(&path);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("973").unwrap().name, "Torso, Plain");
    }

    #[test]
    fn test_load_empty_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.csv");
        std::fs::write(&path, "part_num,name,part_cat_id,part_material\n").unwrap();
        let catalog = PartsCatalog::load(&path);
        assert_eq!(catalog.len(), 20);
    }

    #[test]
    fn test_split_csv_line_escaped_quote() {
        assert_eq!(
            split_csv_line(r#"1,"say ""hi""",2"#),
            vec!["1", "say \"hi\"", "2"]
        );
    }
}
