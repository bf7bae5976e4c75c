//! SVG generation from a drawing
//!
//! Drawing space has y pointing up; every coordinate is flipped on output.
//! Block references are expanded into groups carrying the insertion
//! transform. Entities on non-plotting layers are skipped.

use crate::drawing::entity::MAX_BLOCK_DEPTH;
use crate::drawing::{BoundingBox, Coord, Drawing, Entity, Shape, BY_LAYER};

use super::SvgConfig;

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    styles: Vec<String>,
    elements: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    /// Create a new SVG builder
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            styles: vec![],
            elements: vec![],
            indent: 1,
        }
    }

    fn prefix(&self) -> &str {
        &self.config.class_prefix
    }

    fn indent_str(&self) -> String {
        "  ".repeat(self.indent)
    }

    fn class_list(&self, kind: &str, classes: &[String]) -> String {
        std::iter::once(format!("{}{}", self.prefix(), kind))
            .chain(classes.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Add a CSS rule
    pub fn add_style(&mut self, rule: impl Into<String>) {
        self.styles.push(rule.into());
    }

    /// Add a line element
    pub fn add_line(&mut self, from: Coord, to: Coord, classes: &[String], styles: &str) {
        self.elements.push(format!(
            r#"{}<line class="{}" x1="{}" y1="{}" x2="{}" y2="{}"{}/>"#,
            self.indent_str(),
            self.class_list("line", classes),
            from.x,
            -from.y,
            to.x,
            -to.y,
            styles
        ));
    }

    /// Add a circle element
    pub fn add_circle(&mut self, center: Coord, radius: f64, classes: &[String], styles: &str) {
        self.elements.push(format!(
            r#"{}<circle class="{}" cx="{}" cy="{}" r="{}" fill="none"{}/>"#,
            self.indent_str(),
            self.class_list("circle", classes),
            center.x,
            -center.y,
            radius,
            styles
        ));
    }

    /// Add a counter-clockwise arc (angles in degrees). A zero sweep is a
    /// full circle.
    pub fn add_arc(
        &mut self,
        center: Coord,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        classes: &[String],
        styles: &str,
    ) {
        let sweep = (end_angle - start_angle).rem_euclid(360.0);
        if sweep == 0.0 {
            self.add_circle(center, radius, classes, styles);
            return;
        }
        let start = center.polar(radius, start_angle);
        let end = center.polar(radius, end_angle);
        let large_arc = if sweep > 180.0 { 1 } else { 0 };
        // Counter-clockwise with y up is the negative-angle direction once flipped
        let d = format!(
            "M{} {} A{} {} 0 {} 0 {} {}",
            start.x, -start.y, radius, radius, large_arc, end.x, -end.y
        );
        self.elements.push(format!(
            r#"{}<path class="{}" d="{}" fill="none"{}/>"#,
            self.indent_str(),
            self.class_list("arc", classes),
            d,
            styles
        ));
    }

    /// Add a text element; paragraph breaks become spaces
    pub fn add_text(&mut self, insert: Coord, text: &str, height: f64, classes: &[String]) {
        let flat = text.replace("\\P", " ");
        self.elements.push(format!(
            r#"{}<text class="{}" x="{}" y="{}" font-size="{}">{}</text>"#,
            self.indent_str(),
            self.class_list("text", classes),
            insert.x,
            -insert.y,
            height,
            escape_xml(&flat)
        ));
    }

    /// Add a group element with optional classes and transform
    pub fn start_group(&mut self, classes: &[String], transform: Option<&str>) {
        let class_attr = if classes.is_empty() {
            String::new()
        } else {
            format!(r#" class="{}""#, classes.join(" "))
        };
        let transform_attr = transform
            .map(|t| format!(r#" transform="{}""#, t))
            .unwrap_or_default();

        self.elements.push(format!(
            "{}<g{}{}>",
            self.indent_str(),
            class_attr,
            transform_attr
        ));
        self.indent += 1;
    }

    /// Close a group element
    pub fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.elements.push(format!("{}</g>", self.indent_str()));
    }

    /// Build the final SVG string. `bounds` is in drawing space.
    pub fn build(self, bounds: BoundingBox) -> String {
        let padding = self.config.padding;
        let vb_x = bounds.x - padding;
        let vb_y = -bounds.top() - padding;
        let vb_w = bounds.width + 2.0 * padding;
        let vb_h = bounds.height + 2.0 * padding;

        let nl = "\n";

        let mut svg = String::new();
        svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        svg.push_str(nl);

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            vb_x, vb_y, vb_w, vb_h
        ));
        svg.push_str(nl);

        if !self.styles.is_empty() {
            svg.push_str("  <style>");
            svg.push_str(nl);
            for style in &self.styles {
                svg.push_str("    ");
                svg.push_str(style);
                svg.push_str(nl);
            }
            svg.push_str("  </style>");
            svg.push_str(nl);
        }

        for elem in &self.elements {
            svg.push_str(elem);
            svg.push_str(nl);
        }

        svg.push_str("</svg>");

        svg
    }
}

/// Render every plotted entity of `drawing` as SVG
pub fn render_svg(drawing: &Drawing, config: &SvgConfig) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    let prefix = builder.prefix().to_string();
    builder.add_style(format!(
        ".{p}line, .{p}circle, .{p}arc {{ stroke: currentColor; stroke-width: {w}; vector-effect: non-scaling-stroke; }}",
        p = prefix,
        w = config.stroke_width
    ));

    for entity in &drawing.entities {
        render_entity(&mut builder, drawing, entity, 0);
    }

    let bounds = drawing
        .extents()
        .unwrap_or_else(|| BoundingBox::at(Coord::ORIGIN));
    builder.build(bounds)
}

fn render_entity(builder: &mut SvgBuilder, drawing: &Drawing, entity: &Entity, depth: usize) {
    if !drawing.is_plotted(&entity.layer) {
        return;
    }
    let classes = vec![format!("{}layer-{}", builder.prefix(), css_ident(&entity.layer))];
    let styles = entity_styles(drawing, entity);

    match &entity.shape {
        Shape::Line { start, end } => builder.add_line(*start, *end, &classes, &styles),
        Shape::Circle { center, radius } => builder.add_circle(*center, *radius, &classes, &styles),
        Shape::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        } => builder.add_arc(*center, *radius, *start_angle, *end_angle, &classes, &styles),
        Shape::Point { .. } => {}
        Shape::Text {
            insert,
            text,
            char_height,
        } => builder.add_text(*insert, text, *char_height, &classes),
        Shape::Insert {
            block,
            insert,
            x_scale,
            y_scale,
        } => {
            let Some(definition) = drawing.blocks.get(block) else {
                return;
            };
            if depth >= MAX_BLOCK_DEPTH {
                return;
            }
            // Block-space (u, -v) maps to flipped world space through this transform
            let transform = format!(
                "translate({} {}) scale({} {})",
                insert.x - x_scale * definition.base.x,
                -insert.y + y_scale * definition.base.y,
                x_scale,
                y_scale
            );
            let mut group_classes = classes;
            group_classes.push(format!("{}block-{}", builder.prefix(), css_ident(block)));
            builder.start_group(&group_classes, Some(&transform));
            for inner in &definition.entities {
                render_entity(builder, drawing, inner, depth + 1);
            }
            builder.end_group();
        }
    }
}

/// Stroke color from the layer's color index and dash pattern from the
/// entity's line-style
fn entity_styles(drawing: &Drawing, entity: &Entity) -> String {
    let mut styles = String::new();
    if let Some(layer) = drawing.layers.get(&entity.layer) {
        styles.push_str(&format!(r#" stroke="{}""#, color_index_to_hex(layer.color)));
    }
    if entity.linetype != BY_LAYER {
        if let Some(linetype) = drawing.linetypes.get(&entity.linetype) {
            let dashes = linetype
                .segments()
                .iter()
                .map(|v| v.abs().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            if !dashes.is_empty() {
                styles.push_str(&format!(r#" stroke-dasharray="{}""#, dashes));
            }
        }
    }
    styles
}

/// The first standard color indices; anything else renders gray
fn color_index_to_hex(index: u8) -> &'static str {
    match index {
        1 => "#ff0000",
        2 => "#ffff00",
        3 => "#00ff00",
        4 => "#00ffff",
        5 => "#0000ff",
        6 => "#ff00ff",
        7 => "#000000",
        _ => "#808080",
    }
}

fn css_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
