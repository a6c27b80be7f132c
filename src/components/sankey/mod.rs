//! Interactive Sankey diagrams: layout, geometry, flow statistics, drag and
//! snap interaction, and a Leptos canvas component that hosts them.

pub mod config;
pub mod drag;
pub mod error;
pub mod events;
pub mod flow;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod snap;
pub mod state;
pub mod types;

mod component;
mod render;

pub use component::SankeyCanvas;
pub use config::{Arrangement, Orientation, SceneSize, TraceOptions};
pub use error::{LayoutError, LayoutResult};
pub use events::{Entity, InteractionEvent, InteractionKind, InteractionSink};
pub use layout::{LayeredLayout, SankeyLayout};
pub use model::{DiagramModel, TraceId, build_model};
pub use state::SankeyState;
pub use types::{SankeyData, SankeyLink, SankeyNode, SankeyTrace};
