//! Configuration for rendering and parameterization
//!
//! Both pipelines take a plain config struct with `Default` values and
//! `with_*` builders. A [`Settings`] file in TOML can override any of them:
//!
//! ```toml
//! [render]
//! precision = 3
//! offset = [100.0, 0.0]
//!
//! [repair]
//! default_annotation = "c"
//!
//! [variables]
//! width = 1200
//!
//! [svg]
//! padding = 0.0
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::drawing::Coord;
use crate::svg::SvgConfig;

/// Layer holding construction geometry that is never drawn in the output
pub const AUX_LAYER: &str = "VIRTUAL_LAYER";

/// Non-plotting layer that receives auxiliary geometry inside imported blocks
pub const HIDDEN_LAYER: &str = "DEFPOINTS";

/// Configuration options for rendering a parametric drawing
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Decimal places coordinates are rounded to before being used as graph keys
    pub precision: u32,

    /// Layer whose lines shape the graph but are not emitted
    pub aux_layer: String,

    /// Layer that replaces `aux_layer` inside imported block definitions
    pub hidden_layer: String,

    /// Placement of the normalized drawing in the output
    pub offset: Coord,

    /// Constants available to every annotation
    pub variables: BTreeMap<String, f64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            precision: 3,
            aux_layer: AUX_LAYER.to_string(),
            hidden_layer: HIDDEN_LAYER.to_string(),
            offset: Coord::ORIGIN,
            variables: BTreeMap::new(),
        }
    }
}

impl RenderConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rounding precision
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Set the placement offset
    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.offset = Coord::new(x, y);
        self
    }

    /// Add one constant
    pub fn with_variable(mut self, name: impl Into<String>, value: f64) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Set the auxiliary layer name
    pub fn with_aux_layer(mut self, layer: impl Into<String>) -> Self {
        self.aux_layer = layer.into();
        self
    }

    pub fn with_hidden_layer(mut self, layer: impl Into<String>) -> Self {
        self.hidden_layer = layer.into();
        self
    }
}

/// Configuration options for turning a freehand drawing into a parametric one
#[derive(Debug, Clone, PartialEq)]
pub struct RepairConfig {
    /// Decimal places coordinates are rounded to
    pub precision: u32,

    /// Expression written as `c:<expr>` on every kept entity
    pub default_annotation: String,

    /// Layer receiving connector lines
    pub aux_layer: String,

    /// Color index of the auxiliary layer when it has to be created
    pub aux_color: u8,

    /// Insertion point of the variables text
    pub text_insert: Coord,

    /// Character height of the variables text
    pub text_height: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            precision: 3,
            default_annotation: "c".to_string(),
            aux_layer: AUX_LAYER.to_string(),
            aux_color: 40,
            text_insert: Coord::new(-100.0, 100.0),
            text_height: 10.0,
        }
    }
}

impl RepairConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rounding precision
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Set the annotation expression written on every entity
    pub fn with_default_annotation(mut self, expr: impl Into<String>) -> Self {
        self.default_annotation = expr.into();
        self
    }

    /// Set the auxiliary layer name
    pub fn with_aux_layer(mut self, layer: impl Into<String>) -> Self {
        self.aux_layer = layer.into();
        self
    }
}

/// Errors that can occur when loading settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings file contents; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub render: RenderSettings,
    pub repair: RepairSettings,
    pub variables: BTreeMap<String, f64>,
    pub svg: SvgConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSettings {
    pub precision: Option<u32>,
    pub aux_layer: Option<String>,
    pub hidden_layer: Option<String>,
    pub offset: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepairSettings {
    pub precision: Option<u32>,
    pub default_annotation: Option<String>,
    pub aux_layer: Option<String>,
    pub aux_color: Option<u8>,
    pub text_insert: Option<[f64; 2]>,
    pub text_height: Option<f64>,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Render configuration with these settings applied over the defaults
    pub fn render_config(&self) -> RenderConfig {
        let defaults = RenderConfig::default();
        let r = &self.render;
        RenderConfig {
            precision: r.precision.unwrap_or(defaults.precision),
            aux_layer: r.aux_layer.clone().unwrap_or(defaults.aux_layer),
            hidden_layer: r.hidden_layer.clone().unwrap_or(defaults.hidden_layer),
            offset: r.offset.map(Coord::from).unwrap_or(defaults.offset),
            variables: self.variables.clone(),
        }
    }

    /// Repair configuration with these settings applied over the defaults
    pub fn repair_config(&self) -> RepairConfig {
        let defaults = RepairConfig::default();
        let r = &self.repair;
        RepairConfig {
            precision: r.precision.unwrap_or(defaults.precision),
            default_annotation: r
                .default_annotation
                .clone()
                .unwrap_or(defaults.default_annotation),
            aux_layer: r.aux_layer.clone().unwrap_or(defaults.aux_layer),
            aux_color: r.aux_color.unwrap_or(defaults.aux_color),
            text_insert: r.text_insert.map(Coord::from).unwrap_or(defaults.text_insert),
            text_height: r.text_height.unwrap_or(defaults.text_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.precision, 3);
        assert_eq!(config.aux_layer, "VIRTUAL_LAYER");
        assert_eq!(config.hidden_layer, "DEFPOINTS");
        assert_eq!(config.offset, Coord::ORIGIN);
        assert!(config.variables.is_empty());

        let repair = RepairConfig::default();
        assert_eq!(repair.default_annotation, "c");
        assert_eq!(repair.aux_color, 40);
        assert_eq!(repair.text_insert, Coord::new(-100.0, 100.0));
    }

    #[test]
    fn test_builder_pattern() {
        let config = RenderConfig::new()
            .with_precision(2)
            .with_offset(10.0, -5.0)
            .with_variable("width", 4.0);
        assert_eq!(config.precision, 2);
        assert_eq!(config.offset, Coord::new(10.0, -5.0));
        assert_eq!(config.variables.get("width"), Some(&4.0));
    }

    #[test]
    fn test_settings_override_defaults() {
        let settings = Settings::from_str(
            r#"
[render]
offset = [100.0, 0.0]

[repair]
default_annotation = "c*2"
aux_color = 1

[variables]
width = 1200
"#,
        )
        .unwrap();

        let render = settings.render_config();
        assert_eq!(render.precision, 3);
        assert_eq!(render.offset, Coord::new(100.0, 0.0));
        assert_eq!(render.variables.get("width"), Some(&1200.0));

        let repair = settings.repair_config();
        assert_eq!(repair.default_annotation, "c*2");
        assert_eq!(repair.aux_color, 1);
        assert_eq!(repair.aux_layer, "VIRTUAL_LAYER");
    }

    #[test]
    fn test_svg_table() {
        let settings = Settings::from_str("[svg]\npadding = 0.0\nclass_prefix = \"room-\"\n").unwrap();
        assert_eq!(settings.svg.padding, 0.0);
        assert_eq!(settings.svg.class_prefix, "room-");
        assert_eq!(settings.svg.stroke_width, 1.0);
        assert_eq!(Settings::default().svg, SvgConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            Settings::from_str("[render]\nprecison = 2\n"),
            Err(SettingsError::Parse(_))
        ));
    }
}
