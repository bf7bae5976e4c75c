//! Rendering of parametric drawings
//!
//! The pipeline, per source drawing:
//!
//! 1. Seed the variable environment with caller constants and the
//!    declarations of the drawing's variables text
//! 2. Build the graph, evaluating every annotation
//! 3. Propagate offsets depth-first from the root
//! 4. Draw deferred lines between their final endpoints
//! 5. Normalize the new geometry to the origin, then place it at the offset
//!
//! Several drawings can be rendered into one output by reusing a [`Renderer`].

mod deferred;
mod normalize;
mod propagate;

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::RenderConfig;
use crate::drawing::{Coord, Drawing, Shape};
use crate::error::RenderError;
use crate::graph::GraphBuilder;
use crate::variables::{parse_declarations, Environment, CUSTOM_MARKER};

pub use propagate::Propagation;

/// Final landmark positions by label, relative to the normalized origin
pub type Landmarks = BTreeMap<String, Coord>;

/// Renders parametric drawings into an output drawing
pub struct Renderer<'a> {
    output: &'a mut Drawing,
    config: RenderConfig,
}

impl<'a> Renderer<'a> {
    pub fn new(output: &'a mut Drawing, config: RenderConfig) -> Self {
        Self { output, config }
    }

    /// Render `source` into the output and return its landmarks
    pub fn render(&mut self, source: &Drawing) -> Result<Landmarks, RenderError> {
        let config = &self.config;
        let mut env = Environment::with_constants(config.variables.clone());
        match variables_text(source) {
            Some(text) => env.declare(&parse_declarations(text)?)?,
            None => warn!("drawing has no variables text; only constants are available"),
        }

        for (name, layer) in &source.layers {
            if *name != config.aux_layer {
                self.output.ensure_layer(name, layer.clone());
            }
        }

        let built = GraphBuilder::new(config, &mut env, self.output).build(source)?;
        let graph = built.graph;
        let mut pending = built.pending;

        let Propagation {
            positions,
            mut entities,
            mut landmarks,
        } = propagate::Traversal::new(&graph, &mut pending, &config.aux_layer, config.precision).run()?;

        deferred::resolve_deferred(&graph, &mut pending, &positions, &config.aux_layer, &mut entities)?;

        normalize::normalize(
            &mut entities,
            &mut landmarks,
            &self.output.blocks,
            config.offset,
            config.precision,
        );

        info!(
            entities = entities.len(),
            landmarks = landmarks.len(),
            "rendered drawing"
        );
        self.output.entities.extend(entities);
        Ok(landmarks)
    }

    /// Width and height of everything rendered so far
    pub fn dimensions(&self) -> (f64, f64) {
        self.output.dimensions()
    }
}

/// The first text entity carrying a custom variables section
fn variables_text(source: &Drawing) -> Option<&str> {
    source.entities.iter().find_map(|e| match &e.shape {
        Shape::Text { text, .. } if text.contains(CUSTOM_MARKER) => Some(text.as_str()),
        _ => None,
    })
}

/// Render `source` into a fresh drawing
pub fn render(source: &Drawing, config: RenderConfig) -> Result<(Drawing, Landmarks), RenderError> {
    let mut output = Drawing::new();
    let landmarks = Renderer::new(&mut output, config).render(source)?;
    Ok((output, landmarks))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::drawing::{Entity, Layer};

    use super::*;

    #[test]
    fn test_variables_text_declarations() {
        let mut source = Drawing::new();
        source.add(Entity::text((0.0, 0.0), "header\\P----- custom -----\\Pside: 5", 1.0));
        source.add(Entity::line((0.0, 0.0), (1.0, 0.0)).with_xdata("c:side"));
        let (output, _) = render(&source, RenderConfig::default()).unwrap();
        assert_eq!(output.dimensions(), (5.0, 0.0));
    }

    #[test]
    fn test_constants_without_text() {
        let mut source = Drawing::new();
        source.add(Entity::line((0.0, 0.0), (0.0, 1.0)).with_xdata("c:h"));
        let (output, _) = render(&source, RenderConfig::new().with_variable("h", 7.0)).unwrap();
        assert_eq!(output.dimensions(), (0.0, 7.0));
    }

    #[test]
    fn test_layers_copied_except_aux() {
        let mut source = Drawing::new();
        source.ensure_layer("walls", Layer::with_color(2));
        source.ensure_layer("VIRTUAL_LAYER", Layer::with_color(40));
        source.add(Entity::line((0.0, 0.0), (1.0, 0.0)));
        let (output, _) = render(&source, RenderConfig::default()).unwrap();
        assert!(output.layers.contains_key("walls"));
        assert!(!output.layers.contains_key("VIRTUAL_LAYER"));
    }

    #[test]
    fn test_renderer_accumulates_into_one_output() {
        let mut first = Drawing::new();
        first.add(Entity::line((0.0, 0.0), (1.0, 0.0)).with_xdata("c:2"));
        let mut second = Drawing::new();
        second.add(Entity::line((0.0, 0.0), (0.0, 1.0)).with_xdata("c:3"));

        let mut output = Drawing::new();
        let mut renderer = Renderer::new(&mut output, RenderConfig::default());
        renderer.render(&first).unwrap();
        renderer.render(&second).unwrap();
        assert_eq!(renderer.dimensions(), (2.0, 3.0));
        assert_eq!(output.entities.len(), 2);
    }

    #[test]
    fn test_bad_declaration_is_fatal() {
        let mut source = Drawing::new();
        source.add(Entity::text((0.0, 0.0), "----- custom -----\\Pw: nope + 1", 1.0));
        source.add(Entity::line((0.0, 0.0), (1.0, 0.0)));
        assert!(matches!(
            render(&source, RenderConfig::default()),
            Err(RenderError::Variables(_))
        ));
    }
}
