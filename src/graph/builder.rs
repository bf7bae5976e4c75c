//! Builds the constraint graph from drawing entities
//!
//! Every annotation is parsed and evaluated here, so the traversal only sees
//! numbers (or the deferred marker). Side effects on the output drawing:
//! custom dash styles are registered, used layers are created, and referenced
//! block definitions are imported.

use thiserror::Error;
use tracing::{debug, trace};

use crate::annotation::{AnnotationError, Annotations, Constraint, Dash, Target};
use crate::config::RenderConfig;
use crate::drawing::{Coord, Drawing, Entity, Layer, Linetype, Shape, BY_LAYER, DEFAULT_LAYER};
use crate::error::EntityRef;
use crate::expr::ExprError;
use crate::variables::Environment;

use super::{Edge, EdgeKind, Graph, Length, PendingEdges, Point};

/// Errors raised while turning entities into graph edges
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("bad annotation on {entity}: {source}")]
    Annotation {
        entity: EntityRef,
        #[source]
        source: AnnotationError,
    },

    #[error("cannot evaluate '{expression}' on {entity}: {source}")]
    Expression {
        entity: EntityRef,
        expression: String,
        #[source]
        source: ExprError,
    },

    #[error("{entity}: {reason}")]
    InvalidConstraint { entity: EntityRef, reason: String },

    #[error("both scales of {entity} are deferred; at least one side needs an expression")]
    AmbiguousScale { entity: EntityRef },

    #[error("{entity} references undefined block '{name}'")]
    UnknownBlock { entity: EntityRef, name: String },

    #[error("block '{name}' used by {entity} has zero {side}; cannot scale it to a target")]
    DegenerateBlock {
        entity: EntityRef,
        name: String,
        side: &'static str,
    },

    #[error("{entity} has zero length after rounding and cannot be stretched")]
    DegenerateLine { entity: EntityRef },
}

impl GraphError {
    fn invalid(entity: &EntityRef, reason: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            entity: entity.clone(),
            reason: reason.into(),
        }
    }

    /// The entity the error was raised for
    pub fn entity(&self) -> &EntityRef {
        match self {
            Self::Annotation { entity, .. }
            | Self::Expression { entity, .. }
            | Self::InvalidConstraint { entity, .. }
            | Self::AmbiguousScale { entity }
            | Self::UnknownBlock { entity, .. }
            | Self::DegenerateBlock { entity, .. }
            | Self::DegenerateLine { entity } => entity,
        }
    }
}

/// Graph and pending line set produced from one drawing
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub graph: Graph,
    pub pending: PendingEdges,
}

/// Scans source entities into a [`Graph`], evaluating annotations against
/// `env` and registering styles, layers and blocks in `output`
pub struct GraphBuilder<'a> {
    config: &'a RenderConfig,
    env: &'a mut Environment,
    output: &'a mut Drawing,
    graph: Graph,
    pending: PendingEdges,
    linetype_counter: usize,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a RenderConfig, env: &'a mut Environment, output: &'a mut Drawing) -> Self {
        Self {
            config,
            env,
            output,
            graph: Graph::new(),
            pending: PendingEdges::new(),
            linetype_counter: 0,
        }
    }

    pub fn build(mut self, source: &Drawing) -> Result<BuildOutput, GraphError> {
        for (index, entity) in source.entities.iter().enumerate() {
            self.add_entity(source, index, entity)?;
        }
        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            pending = self.pending.len(),
            "built graph"
        );
        Ok(BuildOutput {
            graph: self.graph,
            pending: self.pending,
        })
    }

    fn point(&self, c: Coord) -> Point {
        Point::from_coord(c, self.config.precision)
    }

    fn add_entity(&mut self, source: &Drawing, index: usize, entity: &Entity) -> Result<(), GraphError> {
        let entity_ref = EntityRef::new(index, entity);

        // The variables text is read separately and never becomes geometry
        if matches!(entity.shape, Shape::Text { .. }) {
            return Ok(());
        }

        let annotations = Annotations::parse(&entity.xdata).map_err(|source| GraphError::Annotation {
            entity: entity_ref.clone(),
            source,
        })?;

        match &entity.shape {
            Shape::Line { start, end } => {
                let (start, end) = (self.point(*start), self.point(*end));
                let natural = start.distance(&end);
                let length = match &annotations.constraint {
                    None => Length::Resolved(natural),
                    Some(Constraint::Single(Target::Deferred)) => Length::Deferred,
                    Some(Constraint::Single(Target::Expr(expr))) => {
                        self.env.bind_natural(natural);
                        Length::Resolved(self.eval(&entity_ref, expr)?)
                    }
                    Some(Constraint::Pair { .. }) => {
                        return Err(GraphError::invalid(
                            &entity_ref,
                            "width@height targets only apply to block references",
                        ))
                    }
                };
                if natural == 0.0 && matches!(length, Length::Resolved(_)) {
                    return Err(GraphError::DegenerateLine { entity: entity_ref });
                }
                let linetype = self.linetype(entity, annotations.dash);
                self.note_layer(source, &entity.layer);
                trace!(%start, %end, ?length, "line");
                self.graph
                    .add_line(start, end, length, &entity.layer, &linetype);
                self.pending.insert(start, end, &entity.layer);
            }
            Shape::Circle { center, radius } => {
                let radius = self.radius(&entity_ref, &annotations, *radius)?;
                let center = self.point(*center);
                let edge = self.self_loop(source, entity, center, annotations.dash, EdgeKind::Circle { radius });
                self.graph.add_edge(center, edge);
            }
            Shape::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let radius = self.radius(&entity_ref, &annotations, *radius)?;
                let center = self.point(*center);
                let kind = EdgeKind::Arc {
                    radius,
                    start_angle: *start_angle,
                    end_angle: *end_angle,
                };
                let edge = self.self_loop(source, entity, center, annotations.dash, kind);
                self.graph.add_edge(center, edge);
            }
            Shape::Point { location } => {
                let label = match (&annotations.label, entity.layer == self.config.aux_layer) {
                    (Some(label), true) => label.clone(),
                    _ => {
                        debug!(entity = %entity_ref, "skipping point without a landmark label");
                        return Ok(());
                    }
                };
                let location = self.point(*location);
                self.graph.add_edge(
                    location,
                    Edge {
                        target: location,
                        kind: EdgeKind::Landmark { label },
                        layer: entity.layer.clone(),
                        linetype: BY_LAYER.to_string(),
                    },
                );
            }
            Shape::Insert {
                block,
                insert,
                x_scale,
                y_scale,
            } => {
                let (x_scale, y_scale) =
                    self.block_scale(source, &entity_ref, &annotations, block, (*x_scale, *y_scale))?;
                self.import_block(source, &entity_ref, block)?;
                let insert = self.point(*insert);
                let kind = EdgeKind::Block {
                    name: block.clone(),
                    x_scale,
                    y_scale,
                };
                let edge = self.self_loop(source, entity, insert, annotations.dash, kind);
                self.graph.add_edge(insert, edge);
            }
            Shape::Text { .. } => {}
        }
        Ok(())
    }

    fn eval(&self, entity: &EntityRef, expr: &crate::expr::Expression) -> Result<f64, GraphError> {
        self.env.eval(expr).map_err(|source| GraphError::Expression {
            entity: entity.clone(),
            expression: expr.source().to_string(),
            source,
        })
    }

    /// Resolve a circle or arc radius; these are never deferred
    fn radius(&mut self, entity: &EntityRef, annotations: &Annotations, natural: f64) -> Result<f64, GraphError> {
        match &annotations.constraint {
            None => Ok(natural),
            Some(Constraint::Single(Target::Expr(expr))) => {
                self.env.bind_natural(natural);
                self.eval(entity, expr)
            }
            Some(Constraint::Single(Target::Deferred)) => Err(GraphError::invalid(
                entity,
                "a radius cannot be deferred with '?'",
            )),
            Some(Constraint::Pair { .. }) => Err(GraphError::invalid(
                entity,
                "width@height targets only apply to block references",
            )),
        }
    }

    fn block_scale(
        &mut self,
        source: &Drawing,
        entity: &EntityRef,
        annotations: &Annotations,
        name: &str,
        current: (f64, f64),
    ) -> Result<(f64, f64), GraphError> {
        let definition = source.blocks.get(name).ok_or_else(|| GraphError::UnknownBlock {
            entity: entity.clone(),
            name: name.to_string(),
        })?;
        let (width, height) = source
            .bounds_of(&definition.entities)
            .map_or((0.0, 0.0), |bb| (bb.width, bb.height));

        let (w, h) = match &annotations.constraint {
            None => return Ok(current),
            Some(Constraint::Single(_)) => {
                return Err(GraphError::invalid(
                    entity,
                    "block references need a width@height target",
                ))
            }
            Some(Constraint::Pair { width, height }) => (width, height),
        };

        let env = &mut *self.env;
        let mut side_scale = |target: &Target, natural: f64, side: &'static str| -> Result<Option<f64>, GraphError> {
            match target {
                Target::Deferred => Ok(None),
                Target::Expr(expr) => {
                    if natural == 0.0 {
                        return Err(GraphError::DegenerateBlock {
                            entity: entity.clone(),
                            name: name.to_string(),
                            side,
                        });
                    }
                    env.bind_natural(natural);
                    let target = env.eval(expr).map_err(|source| GraphError::Expression {
                        entity: entity.clone(),
                        expression: expr.source().to_string(),
                        source,
                    })?;
                    Ok(Some(target / natural))
                }
            }
        };

        match (side_scale(w, width, "width")?, side_scale(h, height, "height")?) {
            (Some(x), Some(y)) => Ok((x, y)),
            (Some(x), None) => Ok((x, x)),
            (None, Some(y)) => Ok((y, y)),
            (None, None) => Err(GraphError::AmbiguousScale {
                entity: entity.clone(),
            }),
        }
    }

    fn import_block(&mut self, source: &Drawing, entity: &EntityRef, name: &str) -> Result<(), GraphError> {
        self.output
            .ensure_layer(&self.config.hidden_layer, Layer::hidden());
        let imported = self
            .output
            .import_block(source, name, &self.config.aux_layer, &self.config.hidden_layer)
            .map_err(|_| GraphError::UnknownBlock {
                entity: entity.clone(),
                name: name.to_string(),
            })?;
        if imported {
            debug!(block = name, "imported block definition");
        }
        Ok(())
    }

    fn self_loop(
        &mut self,
        source: &Drawing,
        entity: &Entity,
        at: Point,
        dash: Option<Dash>,
        kind: EdgeKind,
    ) -> Edge {
        let linetype = self.linetype(entity, dash);
        self.note_layer(source, &entity.layer);
        Edge {
            target: at,
            kind,
            layer: entity.layer.clone(),
            linetype,
        }
    }

    /// Line-style name for an entity, registering a fresh style for `line:`
    /// annotations
    fn linetype(&mut self, entity: &Entity, dash: Option<Dash>) -> String {
        let Some(Dash { dash, space }) = dash else {
            return entity.linetype.clone();
        };
        loop {
            self.linetype_counter += 1;
            let name = format!("{:?}_{:?}_{}", dash, space, self.linetype_counter);
            if self.output.add_linetype(&name, Linetype::dashed(dash, space)).is_ok() {
                return name;
            }
            trace!(linetype = %name, "linetype name taken");
        }
    }

    /// Make sure a used layer exists in the output. The auxiliary layer is
    /// never created there.
    fn note_layer(&mut self, source: &Drawing, layer: &str) {
        if layer == self.config.aux_layer || layer == DEFAULT_LAYER {
            return;
        }
        let props = source.layers.get(layer).cloned().unwrap_or_default();
        self.output.ensure_layer(layer, props);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::drawing::Block;

    use super::*;

    fn build(source: &Drawing) -> Result<(BuildOutput, Drawing), GraphError> {
        let config = RenderConfig::default();
        let mut env = Environment::new();
        let mut output = Drawing::new();
        let built = GraphBuilder::new(&config, &mut env, &mut output).build(source)?;
        Ok((built, output))
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y, 3)
    }

    #[test]
    fn test_line_length_uses_natural_length_as_c() {
        let mut source = Drawing::new();
        source.add(Entity::line((0.0, 0.0), (3.0, 4.0)).with_xdata("c:c*2"));
        let (built, _) = build(&source).unwrap();
        let edge = &built.graph.edges(&p(0.0, 0.0))[0];
        assert_eq!(
            edge.kind,
            EdgeKind::Line {
                length: Length::Resolved(10.0),
                anchor: true
            }
        );
        assert!(built.pending.contains(&p(3.0, 4.0), "0", &p(0.0, 0.0)));
    }

    #[test]
    fn test_missing_annotation_keeps_length() {
        let mut source = Drawing::new();
        source.add(Entity::line((0.0, 0.0), (0.0, 2.0)));
        let (built, _) = build(&source).unwrap();
        assert!(matches!(
            built.graph.edges(&p(0.0, 0.0))[0].kind,
            EdgeKind::Line {
                length: Length::Resolved(l),
                ..
            } if l == 2.0
        ));
    }

    #[test]
    fn test_coordinates_are_rounded() {
        let mut source = Drawing::new();
        source.add(Entity::line((0.0001, 0.0), (1.0, 0.0)).with_xdata("c:?"));
        source.add(Entity::line((1.0004, 0.0), (1.0, 1.0)).with_xdata("c:?"));
        let (built, _) = build(&source).unwrap();
        assert_eq!(built.graph.node_count(), 3);
        assert_eq!(built.graph.edges(&p(1.0, 0.0)).len(), 2);
    }

    #[test]
    fn test_dash_registers_unique_linetypes() {
        let mut source = Drawing::new();
        source.add(Entity::line((0.0, 0.0), (1.0, 0.0)).with_xdata("line:10 5"));
        source.add(Entity::circle((0.0, 0.0), 1.0).with_xdata("line:10 5"));
        let (built, output) = build(&source).unwrap();
        let names: Vec<_> = output.linetypes.keys().cloned().collect();
        assert_eq!(names, vec!["10.0_5.0_1".to_string(), "10.0_5.0_2".to_string()]);
        assert_eq!(output.linetypes["10.0_5.0_1"].pattern, vec![15.0, 10.0, -5.0]);
        assert_eq!(built.graph.edges(&p(1.0, 0.0))[0].linetype, "10.0_5.0_1");
    }

    #[test]
    fn test_dash_skips_taken_linetype_names() {
        let mut source = Drawing::new();
        source.add(Entity::line((0.0, 0.0), (1.0, 0.0)).with_xdata("line:2 1"));

        let config = RenderConfig::default();
        let mut env = Environment::new();
        let mut output = Drawing::new();
        output.add_linetype("2.0_1.0_1", Linetype::dashed(9.0, 9.0)).unwrap();
        let built = GraphBuilder::new(&config, &mut env, &mut output).build(&source).unwrap();

        assert_eq!(built.graph.edges(&p(1.0, 0.0))[0].linetype, "2.0_1.0_2");
        assert_eq!(output.linetypes["2.0_1.0_1"].pattern, vec![18.0, 9.0, -9.0]);
        assert_eq!(output.linetypes["2.0_1.0_2"].pattern, vec![3.0, 2.0, -1.0]);
    }

    #[test]
    fn test_landmark_only_on_aux_layer() {
        let mut source = Drawing::new();
        source.add(Entity::point((5.0, 5.0)).on_layer("VIRTUAL_LAYER").with_xdata("origin:origin"));
        source.add(Entity::point((1.0, 1.0)).on_layer("walls").with_xdata("other:other"));
        let (built, output) = build(&source).unwrap();
        assert_eq!(built.graph.node_count(), 1);
        assert_eq!(
            built.graph.edges(&p(5.0, 5.0))[0].kind,
            EdgeKind::Landmark {
                label: "origin".to_string()
            }
        );
        assert!(!output.layers.contains_key("VIRTUAL_LAYER"));
    }

    #[test]
    fn test_layers_created_in_output() {
        let mut source = Drawing::new();
        source.ensure_layer("walls", Layer::with_color(3));
        source.add(Entity::line((0.0, 0.0), (1.0, 0.0)).on_layer("walls"));
        source.add(Entity::line((1.0, 0.0), (1.0, 1.0)).on_layer("VIRTUAL_LAYER"));
        let (_, output) = build(&source).unwrap();
        assert_eq!(output.layers.get("walls"), Some(&Layer::with_color(3)));
        assert!(!output.layers.contains_key("VIRTUAL_LAYER"));
    }

    fn source_with_block() -> Drawing {
        let mut source = Drawing::new();
        source.add_block(
            "box",
            Block {
                base: Coord::ORIGIN,
                entities: vec![
                    Entity::line((0.0, 0.0), (10.0, 0.0)),
                    Entity::line((10.0, 0.0), (10.0, 5.0)),
                    Entity::line((0.0, 0.0), (10.0, 5.0)).on_layer("VIRTUAL_LAYER"),
                ],
            },
        );
        source
    }

    #[test]
    fn test_block_scale_from_width() {
        let mut source = source_with_block();
        source.add(Entity::insert("box", (1.0, 1.0), 1.0, 1.0).with_xdata("c:2*100@?"));
        let (built, output) = build(&source).unwrap();
        assert_eq!(
            built.graph.edges(&p(1.0, 1.0))[0].kind,
            EdgeKind::Block {
                name: "box".to_string(),
                x_scale: 20.0,
                y_scale: 20.0
            }
        );
        let imported = &output.blocks["box"];
        assert_eq!(imported.entities[2].layer, "DEFPOINTS");
        assert!(!output.layers["DEFPOINTS"].plot);
    }

    #[test]
    fn test_block_scale_binds_c_per_side() {
        let mut source = source_with_block();
        source.add(Entity::insert("box", (0.0, 0.0), 1.0, 1.0).with_xdata("c:c*3@c*2"));
        let (built, _) = build(&source).unwrap();
        assert_eq!(
            built.graph.edges(&p(0.0, 0.0))[0].kind,
            EdgeKind::Block {
                name: "box".to_string(),
                x_scale: 3.0,
                y_scale: 2.0
            }
        );
    }

    #[test]
    fn test_ambiguous_block_scale() {
        let mut source = source_with_block();
        source.add(Entity::insert("box", (0.0, 0.0), 1.0, 1.0).with_xdata("c:?@?"));
        assert!(matches!(build(&source), Err(GraphError::AmbiguousScale { .. })));
    }

    #[test]
    fn test_unknown_block() {
        let mut source = Drawing::new();
        source.add(Entity::insert("ghost", (0.0, 0.0), 1.0, 1.0).with_xdata("c:1@1"));
        assert!(matches!(build(&source), Err(GraphError::UnknownBlock { .. })));
    }

    #[test]
    fn test_deferred_radius_rejected() {
        let mut source = Drawing::new();
        source.add(Entity::circle((0.0, 0.0), 1.0).with_xdata("c:?"));
        assert!(matches!(build(&source), Err(GraphError::InvalidConstraint { .. })));
    }

    #[test]
    fn test_zero_length_line() {
        let mut source = Drawing::new();
        source.add(Entity::line((1.0, 1.0), (1.0001, 1.0)).with_xdata("c:5"));
        assert!(matches!(build(&source), Err(GraphError::DegenerateLine { .. })));
    }

    #[test]
    fn test_unknown_variable_reports_entity() {
        let mut source = Drawing::new();
        source.add(Entity::line((0.0, 0.0), (1.0, 0.0)));
        source.add(Entity::line((1.0, 0.0), (2.0, 0.0)).on_layer("walls").with_xdata("c:widht"));
        let err = build(&source).unwrap_err();
        assert_eq!(err.entity().index, 1);
        assert!(err.to_string().starts_with("cannot evaluate 'widht' on line #1 on layer 'walls'"));
    }
}
