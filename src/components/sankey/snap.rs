//! Collision relaxation for the nodes of one column while a drag is in
//! progress, plus the frame queue that drives it.
//!
//! A simulator is created lazily the first time a node of its column is
//! dragged. It ticks a fixed number of times per host frame until, with no
//! drag held in its column, every velocity component falls below
//! [`CONVERGENCE_VELOCITY`]; its energy is then zeroed and the column stops
//! requesting frames. A new drag re-arms it.

use log::debug;

use super::config::{COLLIDE_ITERATIONS, CONVERGENCE_VELOCITY, TICKS_PER_FRAME, VELOCITY_DECAY};
use super::geometry::{CenterForm, Point};
use super::layout::{LayoutGraph, SankeyLayout};
use super::model::TraceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
	pub trace: TraceId,
	/// Index of the column among the trace's distinct column coordinates.
	pub column: usize,
}

/// The dragged node, held at the last pointer-derived center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pin {
	pub node: usize,
	pub position: Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
	Running,
	Settled,
}

#[derive(Clone, Debug)]
struct SimNode {
	node: usize,
	pos: CenterForm,
	vx: f64,
	vy: f64,
	original_x: f64,
	radius: f64,
}

#[derive(Clone, Debug)]
pub struct ColumnSnapSimulator {
	key: ColumnKey,
	nodes: Vec<SimNode>,
	alpha: f64,
	size: f64,
}

impl ColumnSnapSimulator {
	/// `members` pairs each graph node index with its original column coordinate.
	pub fn new(
		key: ColumnKey,
		graph: &LayoutGraph,
		members: &[(usize, f64)],
		node_pad: f64,
		size: f64,
	) -> Self {
		let nodes = members
			.iter()
			.map(|&(node, original_x)| {
				let pos = CenterForm::from_extent(&graph.nodes[node].extent);
				SimNode {
					node,
					radius: pos.dy / 2.0 + node_pad / 2.0,
					pos,
					vx: 0.0,
					vy: 0.0,
					original_x,
				}
			})
			.collect::<Vec<_>>();
		debug!("snap simulator for {:?} with {} nodes", key, nodes.len());
		Self {
			key,
			nodes,
			alpha: 1.0,
			size,
		}
	}

	pub fn key(&self) -> ColumnKey {
		self.key
	}

	/// Graph indices of the simulated nodes.
	pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
		self.nodes.iter().map(|n| n.node)
	}

	pub fn contains(&self, node: usize) -> bool {
		self.nodes.iter().any(|n| n.node == node)
	}

	pub fn is_running(&self) -> bool {
		self.alpha > 0.0
	}

	/// Restores full energy for a new drag.
	pub fn rearm(&mut self) {
		self.alpha = 1.0;
	}

	/// Current center of a member node in simulation space.
	pub fn center(&self, node: usize) -> Option<Point> {
		self.nodes
			.iter()
			.find(|n| n.node == node)
			.map(|n| Point::new(n.pos.x, n.pos.y))
	}

	/// Summed perpendicular overlap over all node pairs, ignoring padding.
	pub fn total_overlap(&self) -> f64 {
		let mut total = 0.0;
		for (i, a) in self.nodes.iter().enumerate() {
			for b in &self.nodes[i + 1..] {
				let lo = (a.pos.y - a.pos.dy / 2.0).max(b.pos.y - b.pos.dy / 2.0);
				let hi = (a.pos.y + a.pos.dy / 2.0).min(b.pos.y + b.pos.dy / 2.0);
				total += (hi - lo).max(0.0);
			}
		}
		total
	}

	pub fn tick(&mut self, pin: Option<Pin>) {
		// A drag in another column of the trace does not hold this one
		// running; only a pin on one of our own nodes does.
		let pin = pin.filter(|p| self.contains(p.node));
		self.collide();
		self.constrain(pin);
		for n in &mut self.nodes {
			if pin.is_some_and(|p| p.node == n.node) {
				continue;
			}
			n.vx *= VELOCITY_DECAY;
			n.vy *= VELOCITY_DECAY;
			n.pos.x += n.vx;
			n.pos.y += n.vy;
		}
		self.separate(pin);
	}

	/// Advances one host frame. Stops early once settled.
	pub fn run_frame(&mut self, pin: Option<Pin>) -> LoopState {
		for _ in 0..TICKS_PER_FRAME {
			self.tick(pin);
			if !self.is_running() {
				debug!("snap simulator for {:?} settled", self.key);
				return LoopState::Settled;
			}
		}
		LoopState::Running
	}

	/// Writes simulated positions back as corner pairs.
	pub fn publish(&self, graph: &mut LayoutGraph) {
		for n in &self.nodes {
			graph.nodes[n.node].extent = n.pos.to_extent();
		}
	}

	/// Pairwise overlap removal on predicted positions, fully resolving each contact.
	fn collide(&mut self) {
		let count = self.nodes.len();
		for _ in 0..COLLIDE_ITERATIONS {
			for i in 0..count {
				for j in i + 1..count {
					let (head, tail) = self.nodes.split_at_mut(j);
					let (a, b) = (&mut head[i], &mut tail[0]);
					let mut x = (a.pos.x + a.vx) - (b.pos.x + b.vx);
					let mut y = (a.pos.y + a.vy) - (b.pos.y + b.vy);
					let mut l = x * x + y * y;
					let r = a.radius + b.radius;
					if l >= r * r {
						continue;
					}
					if x == 0.0 {
						x = jiggle(i, j);
						l += x * x;
					}
					if y == 0.0 {
						y = jiggle(j, i);
						l += y * y;
					}
					let len = l.sqrt();
					let f = (r - len) / len;
					x *= f;
					y *= f;
					let (ri2, rj2) = (a.radius * a.radius, b.radius * b.radius);
					let share = rj2 / (ri2 + rj2);
					a.vx += x * share;
					a.vy += y * share;
					b.vx -= x * (1.0 - share);
					b.vy -= y * (1.0 - share);
				}
			}
		}
	}

	/// Removes any perpendicular overlap left after integration and holds every
	/// free node inside `[dy / 2, size - dy / 2]`. Free nodes keep their order
	/// and stay on their side of the pin. A node stopped here loses its
	/// perpendicular velocity.
	fn separate(&mut self, pin: Option<Pin>) {
		let pinned = pin.and_then(|p| self.nodes.iter().position(|n| n.node == p.node));
		let mut order: Vec<usize> = (0..self.nodes.len()).filter(|&i| Some(i) != pinned).collect();
		order.sort_by(|&a, &b| {
			let (a, b) = (&self.nodes[a], &self.nodes[b]);
			a.pos.y.total_cmp(&b.pos.y).then(a.node.cmp(&b.node))
		});
		let (above, below): (Vec<usize>, Vec<usize>) = match pinned {
			Some(p) => {
				let pin = &self.nodes[p];
				order.into_iter().partition(|&i| {
					let n = &self.nodes[i];
					n.pos.y < pin.pos.y || (n.pos.y == pin.pos.y && n.node < pin.node)
				})
			}
			None => (order, Vec::new()),
		};
		let (upper, lower) = match pinned {
			Some(p) => {
				let pin = &self.nodes[p].pos;
				(pin.y - pin.dy / 2.0, pin.y + pin.dy / 2.0)
			}
			None => (self.size, self.size),
		};
		self.pack(&above, 0.0, upper);
		self.pack(&below, lower, self.size);
	}

	/// Fits `group`, sorted by center, between `lo` and `hi` with minimal moves.
	/// When the group is longer than the span the column bounds win.
	fn pack(&mut self, group: &[usize], lo: f64, hi: f64) {
		if group.is_empty() {
			return;
		}
		let original: Vec<f64> = group
			.iter()
			.map(|&i| self.nodes[i].pos.y - self.nodes[i].pos.dy / 2.0)
			.collect();
		let mut tops = original.clone();
		let mut cursor = lo;
		for (top, &i) in tops.iter_mut().zip(group) {
			*top = top.max(cursor);
			cursor = *top + self.nodes[i].pos.dy;
		}
		cursor = hi;
		for (top, &i) in tops.iter_mut().zip(group).rev() {
			let dy = self.nodes[i].pos.dy;
			*top = top.min(cursor - dy);
			cursor = *top;
		}
		let size = self.size;
		for ((&top, &was), &i) in tops.iter().zip(&original).zip(group) {
			let n = &mut self.nodes[i];
			let half = n.pos.dy / 2.0;
			let y = if top == was { n.pos.y } else { top + half };
			let y = y.max(half).min(size - half);
			if y != n.pos.y {
				n.pos.y = y;
				n.vy = 0.0;
			}
		}
	}

	/// Holds the pinned node, pulls the rest back to their column and into range.
	fn constrain(&mut self, pin: Option<Pin>) {
		let mut max_velocity: f64 = 0.0;
		for n in &mut self.nodes {
			match pin {
				Some(p) if p.node == n.node => {
					n.pos.x = p.position.x;
					n.pos.y = p.position.y;
					n.vx = 0.0;
					n.vy = 0.0;
				}
				_ => {
					n.vx = (n.original_x - n.pos.x) / TICKS_PER_FRAME as f64;
					let half = n.pos.dy / 2.0;
					n.pos.y = n.pos.y.max(half).min(self.size - half);
				}
			}
			max_velocity = max_velocity.max(n.vx.abs()).max(n.vy.abs());
		}
		if pin.is_none() && max_velocity < CONVERGENCE_VELOCITY && self.alpha > 0.0 {
			self.alpha = 0.0;
		}
	}
}

/// Deterministic nudge for exactly coincident centers.
fn jiggle(i: usize, j: usize) -> f64 {
	if (i + j) % 2 == 0 { 1e-6 } else { -1e-6 }
}

/// Ticks one column for a frame, publishes it and reroutes links.
pub fn run_column_frame(
	sim: &mut ColumnSnapSimulator,
	graph: &mut LayoutGraph,
	pin: Option<Pin>,
	layout: &dyn SankeyLayout,
) -> LoopState {
	let state = sim.run_frame(pin);
	sim.publish(graph);
	layout.update(graph);
	state
}

/// Host-side "run on the next frame" primitive.
pub trait FrameScheduler {
	fn request_frame(&mut self, key: ColumnKey);
}

/// Columns waiting for the next host frame, at most one entry per column.
#[derive(Clone, Debug, Default)]
pub struct FrameQueue {
	pending: Vec<ColumnKey>,
}

impl FrameQueue {
	pub fn is_idle(&self) -> bool {
		self.pending.is_empty()
	}

	/// Takes every column due this frame; loops that keep running re-request.
	pub fn take(&mut self) -> Vec<ColumnKey> {
		std::mem::take(&mut self.pending)
	}

	pub fn is_pending(&self, key: &ColumnKey) -> bool {
		self.pending.contains(key)
	}
}

impl FrameScheduler for FrameQueue {
	fn request_frame(&mut self, key: ColumnKey) {
		if !self.pending.contains(&key) {
			self.pending.push(key);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::sankey::geometry::Extent;
	use crate::components::sankey::layout::LayoutNode;

	const KEY: ColumnKey = ColumnKey {
		trace: TraceId(0),
		column: 0,
	};

	fn column(spans: &[(f64, f64)]) -> LayoutGraph {
		LayoutGraph {
			nodes: spans
				.iter()
				.map(|&(y0, y1)| LayoutNode {
					extent: Extent::new(100.0, 120.0, y0, y1),
					value: y1 - y0,
					layer: 0,
					source_links: Vec::new(),
					target_links: Vec::new(),
				})
				.collect(),
			height: 400.0,
			..LayoutGraph::default()
		}
	}

	fn simulator(graph: &LayoutGraph) -> ColumnSnapSimulator {
		let members: Vec<(usize, f64)> = (0..graph.nodes.len()).map(|i| (i, 110.0)).collect();
		ColumnSnapSimulator::new(KEY, graph, &members, 10.0, 400.0)
	}

	fn settle(sim: &mut ColumnSnapSimulator, pin: Option<Pin>, max_frames: usize) -> usize {
		for frame in 0..max_frames {
			if sim.run_frame(pin) == LoopState::Settled {
				return frame;
			}
		}
		max_frames
	}

	#[test]
	fn overlapping_nodes_separate_and_settle() {
		let graph = column(&[(100.0, 160.0), (120.0, 180.0), (140.0, 200.0)]);
		let mut sim = simulator(&graph);
		let before = sim.total_overlap();
		assert!(before > 0.0);
		let frames = settle(&mut sim, None, 500);
		assert!(frames < 500, "did not settle");
		assert!(!sim.is_running());
		assert!(sim.total_overlap() < 1.0, "overlap left: {}", sim.total_overlap());
	}

	#[test]
	fn pinned_node_stays_put_and_keeps_running() {
		let graph = column(&[(100.0, 160.0), (120.0, 180.0)]);
		let mut sim = simulator(&graph);
		let pin = Pin {
			node: 0,
			position: Point::new(110.0, 150.0),
		};
		for _ in 0..50 {
			sim.run_frame(Some(pin));
		}
		assert_eq!(sim.center(0), Some(Point::new(110.0, 150.0)));
		assert!(sim.is_running());
		assert!(sim.total_overlap() < 1.0);

		assert!(settle(&mut sim, None, 500) < 500);
	}

	#[test]
	fn pin_from_another_column_is_ignored() {
		let graph = column(&[(100.0, 140.0), (200.0, 240.0)]);
		let mut sim = simulator(&graph);
		let foreign = Pin {
			node: 9,
			position: Point::new(0.0, 0.0),
		};
		assert!(settle(&mut sim, Some(foreign), 100) < 100);
	}

	#[test]
	fn nodes_are_held_inside_the_column_extent() {
		let graph = column(&[(-50.0, 10.0), (390.0, 450.0)]);
		let mut sim = simulator(&graph);
		sim.tick(None);
		let top = sim.center(0).unwrap();
		let bottom = sim.center(1).unwrap();
		assert!(top.y - 30.0 >= -1e-9);
		assert!(bottom.y + 30.0 <= 400.0 + 1e-9);
	}

	#[test]
	fn sibling_pressed_against_the_edge_stays_inside() {
		let mut graph = column(&[(100.0, 160.0), (120.0, 180.0), (140.0, 200.0)]);
		let mut sim = simulator(&graph);
		let pin = Pin {
			node: 1,
			position: Point::new(110.0, 150.0),
		};
		for _ in 0..200 {
			sim.run_frame(Some(pin));
			sim.publish(&mut graph);
			for node in &graph.nodes {
				assert!(node.extent.y0 >= -1e-9, "top edge at {}", node.extent.y0);
				assert!(node.extent.y1 <= 400.0 + 1e-9, "bottom edge at {}", node.extent.y1);
			}
		}
		assert!(sim.total_overlap() < 1e-9, "overlap left: {}", sim.total_overlap());
		assert!(sim.center(0).unwrap().y < 150.0);
		assert!(sim.center(2).unwrap().y > 150.0);
	}

	#[test]
	fn overlap_never_grows_between_ticks() {
		let graph = column(&[(100.0, 160.0), (120.0, 180.0), (140.0, 200.0)]);
		let mut sim = simulator(&graph);
		let pin = Pin {
			node: 1,
			position: Point::new(110.0, 150.0),
		};
		let mut last = sim.total_overlap();
		for _ in 0..100 {
			sim.tick(Some(pin));
			let now = sim.total_overlap();
			assert!(now <= last + 1e-9, "overlap grew from {last} to {now}");
			last = now;
		}
		assert!(last < 1e-9);
	}

	#[test]
	fn displaced_node_returns_to_its_column() {
		let mut graph = column(&[(100.0, 140.0)]);
		graph.nodes[0].extent = Extent::new(160.0, 180.0, 100.0, 140.0);
		let mut sim = simulator(&graph);
		settle(&mut sim, None, 500);
		assert!((sim.center(0).unwrap().x - 110.0).abs() < 2.0);
	}

	#[test]
	fn rearm_restarts_a_settled_loop() {
		let graph = column(&[(100.0, 140.0)]);
		let mut sim = simulator(&graph);
		settle(&mut sim, None, 10);
		assert!(!sim.is_running());
		sim.rearm();
		assert!(sim.is_running());
	}

	#[test]
	fn publish_without_motion_keeps_exact_corners() {
		let mut graph = column(&[(100.0 / 3.0, 200.0 / 3.0)]);
		let original = graph.nodes[0].extent;
		let sim = simulator(&graph);
		sim.publish(&mut graph);
		assert_eq!(graph.nodes[0].extent, original);
	}

	#[test]
	fn frame_queue_keeps_one_entry_per_column() {
		let mut queue = FrameQueue::default();
		let other = ColumnKey {
			trace: TraceId(0),
			column: 1,
		};
		queue.request_frame(KEY);
		queue.request_frame(KEY);
		queue.request_frame(other);
		assert!(queue.is_pending(&KEY));
		assert_eq!(queue.take(), vec![KEY, other]);
		assert!(queue.is_idle());
	}
}
