use std::collections::BTreeMap;

use log::{debug, warn};

use super::config::SceneSize;
use super::drag::{DragSession, drag_start, policy_for};
use super::error::LayoutResult;
use super::events::{Entity, InteractionSink, LogSink};
use super::geometry::Point;
use super::layout::{LayeredLayout, SankeyLayout};
use super::model::{DiagramModel, RedrawScope, TraceId, build_model};
use super::snap::{FrameQueue, FrameScheduler, LoopState};
use super::types::SankeyData;

/// What the renderer has to repaint.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Redraw {
	#[default]
	Nothing,
	Full,
	Scoped(Vec<RedrawScope>),
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub target: Option<(TraceId, Entity)>,
	/// Fade-in progress of the hover highlight, 0 to 1.
	pub highlight_t: f64,
	/// Target that is still fading out.
	pub prev_target: Option<(TraceId, Entity)>,
}

/// Every diagram on one canvas, plus the pointer and frame plumbing between
/// them and the host.
pub struct SankeyState {
	data: SankeyData,
	pub scene: SceneSize,
	layout: Box<dyn SankeyLayout>,
	models: BTreeMap<TraceId, DiagramModel>,
	sink: Box<dyn InteractionSink>,
	drag: Option<DragSession>,
	/// The current drag has moved, so the click that follows is not a select.
	dragged: bool,
	suppress_click: bool,
	frames: FrameQueue,
	redraw: Redraw,
	pub hover: HoverState,
}

impl SankeyState {
	pub fn new(data: SankeyData, width: f64, height: f64) -> LayoutResult<Self> {
		Self::with_layout(data, SceneSize::new(width, height), Box::new(LayeredLayout::default()))
	}

	pub fn with_layout(
		data: SankeyData,
		scene: SceneSize,
		layout: Box<dyn SankeyLayout>,
	) -> LayoutResult<Self> {
		let mut state = Self {
			data,
			scene,
			layout,
			models: BTreeMap::new(),
			sink: Box::new(LogSink),
			drag: None,
			dragged: false,
			suppress_click: false,
			frames: FrameQueue::default(),
			redraw: Redraw::Full,
			hover: HoverState::default(),
		};
		state.rebuild()?;
		Ok(state)
	}

	/// Routes hover and select reports to `sink` from now on.
	pub fn set_sink(&mut self, sink: Box<dyn InteractionSink>) {
		self.sink = sink;
	}

	pub fn set_data(&mut self, data: SankeyData) -> LayoutResult<()> {
		self.data = data;
		self.rebuild()
	}

	pub fn resize(&mut self, width: f64, height: f64) -> LayoutResult<()> {
		self.scene.width = width;
		self.scene.height = height;
		self.rebuild()
	}

	/// Rebuilds every model from scratch. Drags and running loops are dropped.
	fn rebuild(&mut self) -> LayoutResult<()> {
		let mut models = BTreeMap::new();
		for (i, trace) in self.data.traces.iter().enumerate() {
			if !trace.options.visible {
				debug!("skipping hidden trace {}", i);
				continue;
			}
			let id = TraceId(i);
			models.insert(id, build_model(id, trace, &self.scene, self.layout.as_ref())?);
		}
		self.models = models;
		self.drag = None;
		self.frames = FrameQueue::default();
		self.hover = HoverState::default();
		self.redraw = Redraw::Full;
		Ok(())
	}

	pub fn models(&self) -> impl Iterator<Item = &DiagramModel> {
		self.models.values()
	}

	pub fn model(&self, trace: TraceId) -> Option<&DiagramModel> {
		self.models.get(&trace)
	}

	pub fn is_dragging(&self) -> bool {
		self.drag.is_some()
	}

	/// Topmost entity under a canvas point; later traces paint over earlier ones.
	pub fn hit_test(&self, screen: Point) -> Option<(TraceId, Entity)> {
		self.models.values().rev().find_map(|model| {
			model
				.hit_test(model.to_layout_space(screen))
				.map(|entity| (model.trace, entity))
		})
	}

	pub fn cursor_at(&self, screen: Point) -> &'static str {
		let target = match self.drag {
			Some(session) => Some((session.trace, Entity::Node(session.node))),
			None => self.hit_test(screen),
		};
		match target {
			Some((trace, Entity::Node(_))) => self.models.get(&trace).map_or("default", |m| {
				policy_for(m.params.arrangement).cursor(m.params.horizontal)
			}),
			Some((_, Entity::Link(_))) => "pointer",
			None => "default",
		}
	}

	fn mark_full(&mut self) {
		self.redraw = Redraw::Full;
	}

	fn mark_scope(&mut self, scope: RedrawScope) {
		match &mut self.redraw {
			Redraw::Full => {}
			Redraw::Scoped(scopes) => scopes.push(scope),
			Redraw::Nothing => self.redraw = Redraw::Scoped(vec![scope]),
		}
	}

	fn set_hover_target(&mut self, target: Option<(TraceId, Entity)>) {
		if self.hover.target == target {
			return;
		}
		if target.is_none() {
			self.hover.prev_target = self.hover.target.take();
		} else {
			self.hover.prev_target = None;
			self.hover.highlight_t = 0.0;
		}
		self.hover.target = target;
		self.mark_full();
	}

	pub fn pointer_down(&mut self, screen: Point) {
		let Some((trace, Entity::Node(node))) = self.hit_test(screen) else {
			return;
		};
		let Some(model) = self.models.get_mut(&trace) else {
			return;
		};
		let pointer = model.to_layout_space(screen);
		self.drag = drag_start(model, node, pointer, self.sink.as_mut(), &mut self.frames);
		self.dragged = false;
		if self.drag.is_some() {
			self.set_hover_target(None);
		}
	}

	pub fn pointer_move(&mut self, screen: Point) {
		if let Some(session) = self.drag {
			let Some(model) = self.models.get_mut(&session.trace) else {
				return;
			};
			let pointer = model.to_layout_space(screen);
			self.dragged = true;
			if let Some(scope) = session.drag_move(model, pointer, self.layout.as_ref()) {
				self.mark_scope(scope);
			}
			return;
		}

		let hit = self.hit_test(screen);
		let sink = self.sink.as_mut();
		match (self.hover.target, hit) {
			(Some(old), Some(new)) if old == new => {
				if let Some(model) = self.models.get_mut(&new.0) {
					model.interaction.pointer_move(new.0, new.1, sink);
				}
			}
			(old, new) => {
				if let Some((trace, entity)) = old
					&& let Some(model) = self.models.get_mut(&trace)
				{
					model.interaction.pointer_out(trace, entity, sink);
				}
				if let Some((trace, entity)) = new
					&& let Some(model) = self.models.get_mut(&trace)
				{
					model.interaction.pointer_over(trace, entity, sink);
				}
			}
		}
		self.set_hover_target(hit);
	}

	pub fn pointer_up(&mut self) {
		if let Some(session) = self.drag.take() {
			if let Some(model) = self.models.get_mut(&session.trace) {
				session.drag_end(model);
			}
			self.suppress_click = self.dragged;
		}
	}

	/// Ends any drag and hover when the pointer leaves the canvas.
	pub fn pointer_leave(&mut self) {
		self.pointer_up();
		self.suppress_click = false;
		if let Some((trace, _)) = self.hover.target
			&& let Some(model) = self.models.get_mut(&trace)
		{
			model.interaction.clear_hover(trace, self.sink.as_mut());
		}
		self.set_hover_target(None);
	}

	pub fn click(&mut self, screen: Point) {
		if std::mem::take(&mut self.suppress_click) {
			return;
		}
		let Some((trace, entity)) = self.hit_test(screen) else {
			return;
		};
		if let Some(model) = self.models.get_mut(&trace) {
			model.interaction.click(trace, entity, self.sink.as_mut());
		}
		self.set_hover_target(None);
	}

	/// Runs every column loop due this frame and resubmits the ones still
	/// running. Returns whether anything needs repainting.
	pub fn on_animation_frame(&mut self) -> bool {
		for key in self.frames.take() {
			let Some(model) = self.models.get_mut(&key.trace) else {
				warn!("frame requested for unknown trace {:?}", key.trace);
				continue;
			};
			let Some((state, scope)) = model.advance_column(key, self.layout.as_ref()) else {
				continue;
			};
			if state == LoopState::Running {
				self.frames.request_frame(key);
			}
			self.mark_scope(scope);
		}
		self.redraw != Redraw::Nothing
	}

	/// Eases the hover highlight toward its target. Returns whether it moved.
	pub fn advance_highlight(&mut self, dt: f64) -> bool {
		let before = self.hover.highlight_t;
		if self.hover.target.is_some() {
			self.hover.highlight_t += (1.0 - self.hover.highlight_t) * 1.8 * dt;
			if self.hover.highlight_t > 0.99 {
				self.hover.highlight_t = 1.0;
			}
		} else if self.hover.highlight_t > 0.0 {
			self.hover.highlight_t -= self.hover.highlight_t * 1.26 * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_target = None;
			}
		}
		before != self.hover.highlight_t
	}

	pub fn take_redraw(&mut self) -> Redraw {
		std::mem::take(&mut self.redraw)
	}

	/// Loops still waiting for a host frame.
	pub fn is_animating(&self) -> bool {
		!self.frames.is_idle()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::components::sankey::config::{Arrangement, TraceOptions};
	use crate::components::sankey::events::{InteractionEvent, InteractionKind};
	use crate::components::sankey::types::{SankeyLink, SankeyNode, SankeyTrace};

	fn trace(arrangement: Arrangement) -> SankeyTrace {
		SankeyTrace {
			nodes: ["a", "b", "c"].into_iter().map(SankeyNode::new).collect(),
			links: vec![SankeyLink::new(0, 2, 3.0), SankeyLink::new(1, 2, 2.0)],
			options: TraceOptions {
				arrangement,
				..TraceOptions::default()
			},
		}
	}

	fn state(arrangement: Arrangement) -> (SankeyState, Rc<RefCell<Vec<InteractionKind>>>) {
		let data = SankeyData {
			traces: vec![trace(arrangement)],
		};
		let mut state = SankeyState::new(data, 600.0, 400.0).unwrap();
		let events = Rc::new(RefCell::new(Vec::new()));
		let sink_events = events.clone();
		state.set_sink(Box::new(move |e: InteractionEvent| {
			sink_events.borrow_mut().push(e.kind)
		}));
		assert_eq!(state.take_redraw(), Redraw::Full);
		(state, events)
	}

	fn center(state: &SankeyState, node: usize) -> Point {
		state.model(TraceId(0)).unwrap().node_extent(node).center()
	}

	#[test]
	fn hidden_traces_are_skipped() {
		let mut hidden = trace(Arrangement::Snap);
		hidden.options.visible = false;
		let data = SankeyData {
			traces: vec![hidden, trace(Arrangement::Snap)],
		};
		let state = SankeyState::new(data, 600.0, 400.0).unwrap();
		let ids: Vec<TraceId> = state.models().map(|m| m.trace).collect();
		assert_eq!(ids, vec![TraceId(1)]);
	}

	#[test]
	fn hover_then_leave_reports_in_order() {
		let (mut state, events) = state(Arrangement::Snap);
		let p = center(&state, 0);
		state.pointer_move(p);
		state.pointer_move(Point::new(p.x, p.y + 1.0));
		state.pointer_leave();
		assert_eq!(
			*events.borrow(),
			vec![
				InteractionKind::Hover,
				InteractionKind::Follow,
				InteractionKind::Unhover
			]
		);
		assert_eq!(state.hover.target, None);
	}

	#[test]
	fn snap_drag_runs_until_settled_after_release() {
		let (mut state, events) = state(Arrangement::Snap);
		let p = center(&state, 2);
		state.pointer_down(p);
		assert!(state.is_dragging());
		assert!(state.is_animating());
		state.pointer_move(Point::new(p.x, p.y + 100.0));
		assert_eq!(state.take_redraw(), Redraw::Nothing);

		assert!(state.on_animation_frame());
		match state.take_redraw() {
			Redraw::Scoped(scopes) => assert!(scopes[0].nodes.contains(&2)),
			other => panic!("expected a scoped redraw, got {other:?}"),
		}

		state.pointer_up();
		state.click(Point::new(p.x, p.y + 100.0));
		assert!(events.borrow().is_empty());

		let mut frames = 0;
		while state.is_animating() && frames < 1000 {
			state.on_animation_frame();
			frames += 1;
		}
		assert!(!state.is_animating(), "loop never settled");
	}

	#[test]
	fn click_without_drag_selects() {
		let (mut state, events) = state(Arrangement::Fixed);
		let p = center(&state, 2);
		state.pointer_down(p);
		assert!(!state.is_dragging());
		state.pointer_up();
		state.click(p);
		assert_eq!(*events.borrow(), vec![InteractionKind::Select]);
	}

	#[test]
	fn perpendicular_drag_redraws_immediately() {
		let (mut state, _) = state(Arrangement::Perpendicular);
		let p = center(&state, 2);
		state.pointer_down(p);
		state.pointer_move(Point::new(p.x, p.y - 10.0));
		assert!(matches!(state.take_redraw(), Redraw::Scoped(_)));
		assert!(!state.is_animating());
		assert_eq!(state.cursor_at(p), "ns-resize");
	}

	#[test]
	fn highlight_fades_in_and_out() {
		let (mut state, _) = state(Arrangement::Snap);
		state.pointer_move(center(&state, 0));
		for _ in 0..200 {
			state.advance_highlight(0.016);
		}
		assert_eq!(state.hover.highlight_t, 1.0);
		state.pointer_leave();
		for _ in 0..400 {
			state.advance_highlight(0.016);
		}
		assert_eq!(state.hover.highlight_t, 0.0);
		assert_eq!(state.hover.prev_target, None);
	}
}
