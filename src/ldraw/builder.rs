//! LDraw document builder.
//!
//! Accumulates part placements and step markers in order and renders them
//! to LDraw text. Rendering is pure; `save()` is the only operation that
//! touches the filesystem. The builder never validates part numbers,
//! colors, or coordinates — an unknown part simply renders as an
//! unresolved reference in the viewer.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

/// The 3×3 identity matrix, row-major.
pub const IDENTITY: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// 90° rotation around the Y axis, row-major.
const ROT_Y90: [f32; 9] = [0.0, 0.0, -1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0];

/// 90° rotation around the X axis, row-major.
const ROT_X90: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0];

/// One placed part: color, position, and row-major orientation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub color: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub matrix: [f32; 9],
    /// Part file reference, always carrying the `.dat` suffix.
    pub part: String,
}

/// An entry in the build sequence: either a part or a step boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildElement {
    Part(Placement),
    Step,
}

/// Builds an LDraw model as an ordered sequence of parts and steps.
///
/// All mutators return `&mut Self` so calls chain. The element order is
/// preserved exactly and becomes the line order of the rendered file.
#[derive(Debug, Clone)]
pub struct LdrawBuilder {
    elements: Vec<BuildElement>,
    model_name: String,
    author: String,
    /// Default color. Settable, but no placement helper reads it — each
    /// takes an explicit color argument.
    current_color: u32,
}

impl Default for LdrawBuilder {
    fn default() -> Self {
        Self::new("Untitled Model")
    }
}

impl LdrawBuilder {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            elements: Vec::new(),
            model_name: model_name.into(),
            author: "AI Builder".to_string(),
            current_color: super::colors::MAIN_COLOR,
        }
    }

    pub fn set_model_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.model_name = name.into();
        self
    }

    pub fn set_author(&mut self, author: impl Into<String>) -> &mut Self {
        self.author = author.into();
        self
    }

    /// Sets the default color. Not consumed by any placement helper.
    pub fn set_color(&mut self, color: u32) -> &mut Self {
        self.current_color = color;
        self
    }

    /// Appends a step boundary, unless the sequence is empty or already
    /// ends with one.
    pub fn add_step(&mut self) -> &mut Self {
        if matches!(self.elements.last(), Some(el) if *el != BuildElement::Step) {
            self.elements.push(BuildElement::Step);
        }
        self
    }

    /// Appends a part with an explicit orientation matrix (row-major).
    /// The part number gets a `.dat` suffix if it does not already have one.
    pub fn add_part_with_matrix(
        &mut self,
        part: &str,
        color: u32,
        x: f32,
        y: f32,
        z: f32,
        matrix: [f32; 9],
    ) -> &mut Self {
        let part = if part.ends_with(".dat") {
            part.to_string()
        } else {
            format!("{part}.dat")
        };
        self.elements.push(BuildElement::Part(Placement {
            color,
            x,
            y,
            z,
            matrix,
            part,
        }));
        self
    }

    /// Appends a part with the identity orientation.
    pub fn add_part(&mut self, part: &str, color: u32, x: f32, y: f32, z: f32) -> &mut Self {
        self.add_part_with_matrix(part, color, x, y, z, IDENTITY)
    }

    pub fn add_brick(&mut self, part: &str, color: u32, x: f32, y: f32, z: f32) -> &mut Self {
        self.add_part(part, color, x, y, z)
    }

    pub fn add_plate(&mut self, part: &str, color: u32, x: f32, y: f32, z: f32) -> &mut Self {
        self.add_part(part, color, x, y, z)
    }

    /// Wheels are always black (color 0).
    pub fn add_wheel(&mut self, part: &str, x: f32, y: f32, z: f32) -> &mut Self {
        self.add_part(part, super::colors::BLACK, x, y, z)
    }

    pub fn add_part_rotated_y90(
        &mut self,
        part: &str,
        color: u32,
        x: f32,
        y: f32,
        z: f32,
    ) -> &mut Self {
        self.add_part_with_matrix(part, color, x, y, z, ROT_Y90)
    }

    pub fn add_part_rotated_x90(
        &mut self,
        part: &str,
        color: u32,
        x: f32,
        y: f32,
        z: f32,
    ) -> &mut Self {
        self.add_part_with_matrix(part, color, x, y, z, ROT_X90)
    }

    /// Drops all elements. Model name and author are kept.
    pub fn clear(&mut self) -> &mut Self {
        self.elements.clear();
        self
    }

    /// Number of placed parts (step markers excluded).
    pub fn part_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|el| matches!(el, BuildElement::Part(_)))
            .count()
    }

    pub fn elements(&self) -> &[BuildElement] {
        &self.elements
    }

    /// Renders the model to LDraw text. Pure: repeated calls on an
    /// unchanged builder return identical output.
    ///
    /// If the stored sequence does not end with a step marker, a final
    /// `0 STEP` is synthesized in the output only — it is never pushed
    /// into the stored sequence.
    pub fn to_ldraw(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(format!("0 {}", self.model_name));
        lines.push("0 Name: model.ldr".to_string());
        lines.push(format!("0 Author: {}", self.author));
        lines.push("0 !LICENSE Licensed under CC BY 4.0".to_string());
        lines.push(String::new());
        lines.push("0 BFC CERTIFY CCW".to_string());
        lines.push(String::new());

        for element in &self.elements {
            match element {
                BuildElement::Step => {
                    lines.push("0 STEP".to_string());
                    lines.push(String::new());
                }
                BuildElement::Part(p) => {
                    let [a, b, c, d, e, f, g, h, i] = p.matrix;
                    lines.push(format!(
                        "1 {} {} {} {} {a} {b} {c} {d} {e} {f} {g} {h} {i} {}",
                        p.color, p.x, p.y, p.z, p.part
                    ));
                }
            }
        }

        if !matches!(self.elements.last(), Some(BuildElement::Step)) {
            lines.push("0 STEP".to_string());
        }
        lines.push(String::new());

        lines.join("\n")
    }

    /// Writes the rendered model to `path`, appending `.ldr` if absent.
    /// Returns the path actually written. Storage errors propagate as-is.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let output = if path.extension().and_then(|ext| ext.to_str()) == Some("ldr") {
            path.to_path_buf()
        } else {
            let mut s = path.as_os_str().to_os_string();
            s.push(".ldr");
            PathBuf::from(s)
        };
        std::fs::write(&output, self.to_ldraw())?;
        info!("Model saved to {}", output.display());
        Ok(output)
    }
}
