//! Property tests for the column snap simulator.
//!
//! 1. Without a drag, overlapping nodes in a roomy column separate and the
//!    loop settles within a bounded number of frames.
//! 2. A pinned node stays exactly at its pin while its siblings move aside.
//! 3. Publishing never changes a node's length along either axis.
//! 4. Total overlap never grows from one tick to the next and reaches zero
//!    whenever a zero-overlap arrangement exists, with or without a pin.

use proptest::prelude::*;
use sankey_canvas::sankey::TraceId;
use sankey_canvas::sankey::geometry::{Extent, Point};
use sankey_canvas::sankey::layout::{LayoutGraph, LayoutNode};
use sankey_canvas::sankey::snap::{ColumnKey, ColumnSnapSimulator, LoopState, Pin};

const PAD: f64 = 10.0;
const MAX_FRAMES: usize = 2000;
const KEY: ColumnKey = ColumnKey {
	trace: TraceId(0),
	column: 0,
};

/// Node spans plus a column long enough to hold them all with padding.
fn column_strategy() -> impl Strategy<Value = (Vec<(f64, f64)>, f64)> {
	prop::collection::vec((10.0f64..60.0, 0.0f64..1.0), 2..6).prop_map(|raw| {
		let needed: f64 = raw.iter().map(|&(h, _)| h + PAD).sum();
		let size = needed * 2.0;
		let spans = raw
			.into_iter()
			.map(|(h, f)| {
				// Start everything bunched into the first third.
				let y0 = f * size / 3.0;
				(y0, y0 + h)
			})
			.collect();
		(spans, size)
	})
}

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
		..LayoutGraph::default()
	}
}

fn simulator(graph: &LayoutGraph, size: f64) -> ColumnSnapSimulator {
	let members: Vec<(usize, f64)> = (0..graph.nodes.len()).map(|i| (i, 110.0)).collect();
	ColumnSnapSimulator::new(KEY, graph, &members, PAD, size)
}

proptest! {
	#[test]
	fn free_column_settles_without_overlap((spans, size) in column_strategy()) {
		let mut graph = column(&spans);
		let mut sim = simulator(&graph, size);
		let settled = (0..MAX_FRAMES).any(|_| sim.run_frame(None) == LoopState::Settled);
		prop_assert!(settled, "still running after {} frames", MAX_FRAMES);
		prop_assert!(sim.total_overlap() < 1.0, "overlap left: {}", sim.total_overlap());

		sim.publish(&mut graph);
		for (node, &(y0, y1)) in graph.nodes.iter().zip(&spans) {
			prop_assert!((node.extent.height() - (y1 - y0)).abs() < 1e-6);
			prop_assert!((node.extent.width() - 20.0).abs() < 1e-6);
			prop_assert!(node.extent.y0 >= -1e-6 && node.extent.y1 <= size + 1e-6);
		}
	}
}

proptest! {
	#[test]
	fn pinned_node_holds_its_position(
		(spans, size) in column_strategy(),
		at in 0.0f64..1.0,
	) {
		let graph = column(&spans);
		let mut sim = simulator(&graph, size);
		let half = (spans[0].1 - spans[0].0) / 2.0;
		let pin = Pin {
			node: 0,
			position: Point::new(110.0, half + at * (size - 2.0 * half)),
		};
		for _ in 0..50 {
			prop_assert_eq!(sim.run_frame(Some(pin)), LoopState::Running);
		}
		prop_assert_eq!(sim.center(0), Some(pin.position));
	}
}

proptest! {
	#[test]
	fn overlap_shrinks_tick_by_tick_without_a_pin((spans, size) in column_strategy()) {
		let mut graph = column(&spans);
		let mut sim = simulator(&graph, size);
		let mut last = sim.total_overlap();
		for _ in 0..200 {
			sim.tick(None);
			let now = sim.total_overlap();
			prop_assert!(now <= last + 1e-9, "overlap grew from {} to {}", last, now);
			last = now;
		}
		prop_assert!(last < 1e-9, "overlap left: {}", last);

		sim.publish(&mut graph);
		for node in &graph.nodes {
			prop_assert!(node.extent.y0 >= -1e-6 && node.extent.y1 <= size + 1e-6);
		}
	}
}

proptest! {
	#[test]
	fn overlap_shrinks_tick_by_tick_around_a_pin(
		(spans, size) in column_strategy(),
		at in 0.0f64..1.0,
	) {
		// Half the column on either side of the pin holds every other node.
		let size = size * 1.5;
		let mut graph = column(&spans);
		let mut sim = simulator(&graph, size);
		let pin = Pin {
			node: 0,
			position: Point::new(110.0, size / 3.0 + at * size / 3.0),
		};
		let mut last = sim.total_overlap();
		for _ in 0..200 {
			sim.tick(Some(pin));
			let now = sim.total_overlap();
			prop_assert!(now <= last + 1e-9, "overlap grew from {} to {}", last, now);
			last = now;
		}
		prop_assert!(last < 1e-9, "overlap left: {}", last);
		prop_assert_eq!(sim.center(0), Some(pin.position));

		sim.publish(&mut graph);
		for node in &graph.nodes {
			prop_assert!(node.extent.y0 >= -1e-6 && node.extent.y1 <= size + 1e-6);
		}
	}
}
