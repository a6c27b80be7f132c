//! Drag sessions over diagram nodes.
//!
//! Each arrangement mode is one [`ArrangementPolicy`], picked once when the
//! drag starts. Direct modes write the node rectangle and re-route links on
//! every move; the snap mode only records the pointer-derived center, which
//! pins the node inside its column simulator, and leaves publishing to the
//! frame loop.

use log::debug;

use super::config::Arrangement;
use super::events::InteractionSink;
use super::geometry::{Extent, Point};
use super::layout::SankeyLayout;
use super::model::{DiagramModel, RedrawScope, TraceId};
use super::snap::FrameScheduler;

/// Limits a policy may place a node within, in layout space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragBounds {
	/// Extent across columns.
	pub column_extent: f64,
	/// Trace box, when freeform drags should stay inside it.
	pub canvas: Option<Extent>,
}

pub trait ArrangementPolicy: Sync {
	fn arrangement(&self) -> Arrangement;

	/// CSS cursor shown over draggable nodes.
	fn cursor(&self, horizontal: bool) -> &'static str;

	fn draggable(&self) -> bool {
		true
	}

	/// Whether positions come from the column simulator instead of `place`.
	fn simulated(&self) -> bool {
		false
	}

	/// Where `extent` goes when its center is wanted at `wanted`.
	fn place(&self, extent: &Extent, wanted: Point, bounds: &DragBounds) -> Extent;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedPolicy;

#[derive(Clone, Copy, Debug)]
pub struct FreeformPolicy;

#[derive(Clone, Copy, Debug)]
pub struct PerpendicularPolicy;

#[derive(Clone, Copy, Debug)]
pub struct SnapPolicy;

impl ArrangementPolicy for FixedPolicy {
	fn arrangement(&self) -> Arrangement {
		Arrangement::Fixed
	}

	fn cursor(&self, _horizontal: bool) -> &'static str {
		"default"
	}

	fn draggable(&self) -> bool {
		false
	}

	fn place(&self, extent: &Extent, _wanted: Point, _bounds: &DragBounds) -> Extent {
		*extent
	}
}

impl ArrangementPolicy for FreeformPolicy {
	fn arrangement(&self) -> Arrangement {
		Arrangement::Freeform
	}

	fn cursor(&self, _horizontal: bool) -> &'static str {
		"move"
	}

	fn place(&self, extent: &Extent, wanted: Point, bounds: &DragBounds) -> Extent {
		let placed = extent.recentered(wanted);
		let Some(canvas) = bounds.canvas else {
			return placed;
		};
		let x0 = placed.x0.min(canvas.x1 - placed.width()).max(canvas.x0);
		let y0 = placed.y0.min(canvas.y1 - placed.height()).max(canvas.y0);
		Extent::new(x0, x0 + placed.width(), y0, y0 + placed.height())
	}
}

/// Perpendicular follow, clamped so the node stays inside the column.
fn slide_across(extent: &Extent, wanted: Point, bounds: &DragBounds) -> Extent {
	let h = extent.height();
	let y0 = (wanted.y - h / 2.0)
		.min(bounds.column_extent - h)
		.max(0.0);
	Extent::new(extent.x0, extent.x1, y0, y0 + h)
}

impl ArrangementPolicy for PerpendicularPolicy {
	fn arrangement(&self) -> Arrangement {
		Arrangement::Perpendicular
	}

	fn cursor(&self, horizontal: bool) -> &'static str {
		if horizontal { "ns-resize" } else { "ew-resize" }
	}

	fn place(&self, extent: &Extent, wanted: Point, bounds: &DragBounds) -> Extent {
		slide_across(extent, wanted, bounds)
	}
}

impl ArrangementPolicy for SnapPolicy {
	fn arrangement(&self) -> Arrangement {
		Arrangement::Snap
	}

	fn cursor(&self, _horizontal: bool) -> &'static str {
		"move"
	}

	fn simulated(&self) -> bool {
		true
	}

	fn place(&self, extent: &Extent, wanted: Point, bounds: &DragBounds) -> Extent {
		slide_across(extent, wanted, bounds)
	}
}

pub fn policy_for(arrangement: Arrangement) -> &'static dyn ArrangementPolicy {
	match arrangement {
		Arrangement::Fixed => &FixedPolicy,
		Arrangement::Freeform => &FreeformPolicy,
		Arrangement::Perpendicular => &PerpendicularPolicy,
		Arrangement::Snap => &SnapPolicy,
	}
}

impl DiagramModel {
	/// Freeform drags may leave the trace box.
	pub fn drag_bounds(&self) -> DragBounds {
		DragBounds {
			column_extent: self.params.column_extent,
			canvas: None,
		}
	}
}

/// One active drag of one node.
#[derive(Clone, Copy)]
pub struct DragSession {
	pub trace: TraceId,
	pub node: usize,
	policy: &'static dyn ArrangementPolicy,
	/// Node center minus the pointer at drag start.
	grab_offset: Point,
}

impl std::fmt::Debug for DragSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DragSession")
			.field("trace", &self.trace)
			.field("node", &self.node)
			.field("arrangement", &self.policy.arrangement())
			.field("grab_offset", &self.grab_offset)
			.finish()
	}
}

/// Starts dragging `node` from `pointer`. Returns `None` when the trace's
/// arrangement does not allow dragging; nothing is changed in that case.
pub fn drag_start(
	model: &mut DiagramModel,
	node: usize,
	pointer: Point,
	sink: &mut dyn InteractionSink,
	frames: &mut dyn FrameScheduler,
) -> Option<DragSession> {
	let policy = policy_for(model.params.arrangement);
	if !policy.draggable() || node >= model.nodes.len() {
		return None;
	}
	let center = model.node_extent(node).center();
	model.raise(node);
	model.interaction.drag_in_progress = Some(node);
	model.interaction.last_dragged = Some(center);
	model.interaction.clear_hover(model.trace, sink);
	if policy.simulated() {
		let key = model.ensure_simulator(node);
		frames.request_frame(key);
	}
	debug!(
		"drag start on node {} of {:?} ({:?})",
		node,
		model.trace,
		policy.arrangement()
	);
	Some(DragSession {
		trace: model.trace,
		node,
		policy,
		grab_offset: Point::new(center.x - pointer.x, center.y - pointer.y),
	})
}

impl DragSession {
	pub fn arrangement(&self) -> Arrangement {
		self.policy.arrangement()
	}

	/// Applies a pointer move. Returns what to repaint now; snap drags
	/// repaint from the frame loop and return `None`.
	pub fn drag_move(
		&self,
		model: &mut DiagramModel,
		pointer: Point,
		layout: &dyn SankeyLayout,
	) -> Option<RedrawScope> {
		let wanted = Point::new(pointer.x + self.grab_offset.x, pointer.y + self.grab_offset.y);
		let placed = self
			.policy
			.place(&model.node_extent(self.node), wanted, &model.drag_bounds());
		model.interaction.last_dragged = Some(placed.center());
		if self.policy.simulated() {
			return None;
		}
		model.graph.nodes[self.node].extent = placed;
		layout.update(&mut model.graph);
		let mut scope = model.redraw_scope(model.nodes[self.node].column);
		let node = &model.graph.nodes[self.node];
		scope.nodes.insert(self.node);
		scope
			.links
			.extend(node.source_links.iter().chain(&node.target_links).copied());
		Some(scope)
	}

	/// Releases the node. A running simulator settles on its own.
	pub fn drag_end(self, model: &mut DiagramModel) {
		model.interaction.drag_in_progress = None;
		debug!("drag end on node {} of {:?}", self.node, self.trace);
	}
}
