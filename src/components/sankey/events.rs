use log::debug;

use super::geometry::Point;
use super::model::TraceId;

/// Something a pointer can be over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
	Node(usize),
	Link(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
	Hover,
	Follow,
	Unhover,
	Select,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InteractionEvent {
	pub kind: InteractionKind,
	pub trace: TraceId,
	pub entity: Entity,
}

/// Receives hover and select reports. What it does with them is up to the host.
pub trait InteractionSink {
	fn emit(&mut self, event: InteractionEvent);
}

impl<F: FnMut(InteractionEvent)> InteractionSink for F {
	fn emit(&mut self, event: InteractionEvent) {
		self(event)
	}
}

/// Sink that only logs, used when the host registers nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl InteractionSink for LogSink {
	fn emit(&mut self, event: InteractionEvent) {
		debug!("{:?} {:?} on {:?}", event.kind, event.entity, event.trace);
	}
}

/// Per-diagram interaction flags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractionState {
	/// Node currently being dragged.
	pub drag_in_progress: Option<usize>,
	pub hovered: Option<Entity>,
	/// Center of the dragged node as last derived from the pointer.
	pub last_dragged: Option<Point>,
}

impl InteractionState {
	fn report(sink: &mut dyn InteractionSink, kind: InteractionKind, trace: TraceId, entity: Entity) {
		sink.emit(InteractionEvent {
			kind,
			trace,
			entity,
		});
	}

	pub fn pointer_over(&mut self, trace: TraceId, entity: Entity, sink: &mut dyn InteractionSink) {
		if self.drag_in_progress.is_none() {
			Self::report(sink, InteractionKind::Hover, trace, entity);
			self.hovered = Some(entity);
		}
	}

	pub fn pointer_move(&mut self, trace: TraceId, entity: Entity, sink: &mut dyn InteractionSink) {
		if self.drag_in_progress.is_none() {
			Self::report(sink, InteractionKind::Follow, trace, entity);
			self.hovered = Some(entity);
		}
	}

	pub fn pointer_out(&mut self, trace: TraceId, entity: Entity, sink: &mut dyn InteractionSink) {
		if self.drag_in_progress.is_none() {
			Self::report(sink, InteractionKind::Unhover, trace, entity);
			self.hovered = None;
		}
	}

	pub fn click(&mut self, trace: TraceId, entity: Entity, sink: &mut dyn InteractionSink) {
		self.clear_hover(trace, sink);
		if self.drag_in_progress.is_none() {
			Self::report(sink, InteractionKind::Select, trace, entity);
		}
	}

	/// Ends any hover, reporting it, regardless of drag state.
	pub fn clear_hover(&mut self, trace: TraceId, sink: &mut dyn InteractionSink) {
		if let Some(entity) = self.hovered.take() {
			Self::report(sink, InteractionKind::Unhover, trace, entity);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hover_is_suppressed_while_dragging() {
		let mut events = Vec::new();
		let mut sink = |e: InteractionEvent| events.push(e);
		let mut state = InteractionState {
			drag_in_progress: Some(0),
			..InteractionState::default()
		};
		state.pointer_over(TraceId(0), Entity::Link(1), &mut sink);
		state.click(TraceId(0), Entity::Link(1), &mut sink);
		assert!(events.is_empty());
		assert_eq!(state.hovered, None);
	}

	#[test]
	fn click_ends_hover_then_selects() {
		let mut events = Vec::new();
		let mut sink = |e: InteractionEvent| events.push(e.kind);
		let mut state = InteractionState::default();
		state.pointer_over(TraceId(1), Entity::Node(2), &mut sink);
		state.pointer_move(TraceId(1), Entity::Node(2), &mut sink);
		state.click(TraceId(1), Entity::Node(2), &mut sink);
		assert_eq!(
			events,
			vec![
				InteractionKind::Hover,
				InteractionKind::Follow,
				InteractionKind::Unhover,
				InteractionKind::Select
			]
		);
		assert_eq!(state.hovered, None);
	}
}
