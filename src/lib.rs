//! paramsketch - parametric 2D drawings
//!
//! Lines, circles, arcs and block references in a drawing carry short text
//! annotations such as `c:width*2` or `c:?`. Rendering evaluates those
//! annotations, stretches every line to its target length while keeping its
//! direction, and lets the rest of the drawing follow.
//!
//! # Example
//!
//! ```rust
//! use paramsketch::{render, Drawing, Entity, RenderConfig};
//!
//! let mut source = Drawing::new();
//! source.add(Entity::line((0.0, 0.0), (1.0, 0.0)).with_xdata("c:w"));
//! source.add(Entity::line((1.0, 0.0), (1.0, 1.0)).with_xdata("c:2"));
//! source.add(Entity::line((1.0, 1.0), (0.0, 0.0)).with_xdata("c:?"));
//!
//! let config = RenderConfig::new().with_variable("w", 5.0);
//! let (output, _landmarks) = render(&source, config).unwrap();
//! assert_eq!(output.dimensions(), (5.0, 2.0));
//! ```
//!
//! [`parameterize`] prepares a freehand drawing for this: it annotates every
//! entity with a default expression and links disconnected clusters.

pub mod annotation;
pub mod config;
pub mod drawing;
pub mod error;
pub mod expr;
pub mod graph;
pub mod render;
pub mod repair;
pub mod suggest;
pub mod svg;
pub mod variables;

pub use config::{RenderConfig, RepairConfig, Settings};
pub use drawing::{Coord, Drawing, Entity, Shape};
pub use error::{Error, RenderError};
pub use expr::{evaluate, Expression};
pub use render::{render, Landmarks, Renderer};
pub use repair::{parameterize, RepairReport};
pub use svg::{render_svg, SvgConfig};
