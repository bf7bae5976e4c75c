//! SVG preview of a drawing

mod writer;

use std::path::Path;

use serde::Deserialize;

use crate::drawing::io::DrawingIoError;
use crate::drawing::Drawing;

pub use writer::{render_svg, SvgBuilder};

/// Preview options, read from the `[svg]` table of a settings file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvgConfig {
    /// Margin around the drawing extents, in drawing units
    pub padding: f64,
    pub stroke_width: f64,
    /// Prepended to every generated class name
    pub class_prefix: String,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            padding: 10.0,
            stroke_width: 1.0,
            class_prefix: "ps-".to_string(),
        }
    }
}

impl SvgConfig {
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }
}

/// Render `drawing` and write the SVG to `path`
pub fn save_svg(drawing: &Drawing, config: &SvgConfig, path: &Path) -> Result<(), DrawingIoError> {
    std::fs::write(path, render_svg(drawing, config)).map_err(|e| DrawingIoError::io(path, e))
}
