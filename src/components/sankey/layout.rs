//! Layout collaborator contract and a default layered implementation.
//!
//! The layout assigns every node a rectangle and every link its attachment
//! points and width. Coordinates are in layout space: `x` runs along the
//! layering axis, `y` across it.

use log::debug;

use super::config::LAYOUT_ITERATIONS;
use super::error::{LayoutError, LayoutResult};
use super::geometry::{CircularLinkType, CircularPathData, Extent, LinkShape, RibbonEnds};

const LOOP_BASE_RADIUS: f64 = 10.0;
const LOOP_NODE_BUFFER: f64 = 10.0;
const LOOP_VERTICAL_MARGIN: f64 = 25.0;
const LOOP_GAP: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct LinkRequest {
	pub source: usize,
	pub target: usize,
	pub value: f64,
}

/// Input to a layout pass. Node `i` of the result corresponds to `columns[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutRequest {
	/// Optional column hint per node.
	pub columns: Vec<Option<usize>>,
	pub links: Vec<LinkRequest>,
	/// Extent along the layering axis.
	pub width: f64,
	/// Extent across the layering axis.
	pub height: f64,
	pub node_thickness: f64,
	pub node_padding: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
	pub extent: Extent,
	pub value: f64,
	pub layer: usize,
	/// Outgoing link indices.
	pub source_links: Vec<usize>,
	/// Incoming link indices.
	pub target_links: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutLink {
	pub source: usize,
	pub target: usize,
	pub value: f64,
	pub width: f64,
	/// Center of the link where it leaves the source.
	pub y0: f64,
	/// Center of the link where it enters the target.
	pub y1: f64,
	pub circular: bool,
	pub circular_link_type: Option<CircularLinkType>,
	pub circular_path_data: Option<CircularPathData>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutGraph {
	pub nodes: Vec<LayoutNode>,
	pub links: Vec<LayoutLink>,
	/// Padding actually used, which may be below the requested one.
	pub node_padding: f64,
	pub width: f64,
	pub height: f64,
}

impl LayoutGraph {
	/// Drawable shape of link `index`.
	///
	/// # Panics
	///
	/// When the layout marked the link circular without attaching arc geometry.
	pub fn link_shape(&self, index: usize) -> LinkShape {
		let link = &self.links[index];
		if link.circular {
			match (link.circular_link_type, link.circular_path_data) {
				(Some(kind), Some(data)) => LinkShape::Loop {
					kind,
					data,
					width: link.width,
				},
				_ => panic!("layout marked link {index} circular without arc geometry"),
			}
		} else {
			LinkShape::Ribbon(RibbonEnds {
				x0: self.nodes[link.source].extent.x1,
				x1: self.nodes[link.target].extent.x0,
				y0: link.y0,
				y1: link.y1,
				width: link.width,
			})
		}
	}
}

/// External graph layout, as seen by the diagram.
pub trait SankeyLayout {
	/// Full layout: layering, node placement and link routing.
	fn layout(&self, request: &LayoutRequest) -> LayoutResult<LayoutGraph>;

	/// Re-routes links around the current node rectangles without re-layering.
	fn update(&self, graph: &mut LayoutGraph);
}

/// Longest-path layering with weighted relaxation inside columns.
#[derive(Clone, Debug)]
pub struct LayeredLayout {
	pub iterations: usize,
}

impl Default for LayeredLayout {
	fn default() -> Self {
		Self {
			iterations: LAYOUT_ITERATIONS,
		}
	}
}

impl SankeyLayout for LayeredLayout {
	fn layout(&self, request: &LayoutRequest) -> LayoutResult<LayoutGraph> {
		validate(request)?;
		let mut graph = build_graph(request);
		mark_circular_links(&mut graph);
		let columns = assign_layers(&mut graph, &request.columns);

		let max_len = columns.iter().map(Vec::len).max().unwrap_or(0);
		graph.node_padding = if max_len > 1 {
			request
				.node_padding
				.min(request.height / (max_len - 1) as f64)
		} else {
			request.node_padding
		};

		place_columns(&mut graph, &columns, request.node_thickness);
		let ky = value_scale(&graph, &columns);
		for link in &mut graph.links {
			link.width = link.value * ky;
		}
		initialize_breadths(&mut graph, &columns, ky);

		let mut columns = columns;
		for i in 0..self.iterations {
			let alpha = 0.99_f64.powi(i as i32);
			let beta = (1.0 - alpha).max((i + 1) as f64 / self.iterations as f64);
			relax(&mut graph, &mut columns, alpha, beta, Sweep::RightToLeft);
			relax(&mut graph, &mut columns, alpha, beta, Sweep::LeftToRight);
		}

		assign_loop_sides(&mut graph);
		self.update(&mut graph);
		debug!(
			"layered {} nodes into {} columns (ky = {ky})",
			graph.nodes.len(),
			columns.len()
		);
		Ok(graph)
	}

	fn update(&self, graph: &mut LayoutGraph) {
		compute_link_breadths(graph);
		compute_loop_geometry(graph);
	}
}

fn validate(request: &LayoutRequest) -> LayoutResult<()> {
	let usable = |v: f64| v.is_finite() && v > 0.0;
	if !usable(request.width) || !usable(request.height) {
		return Err(LayoutError::InvalidSize {
			width: request.width,
			height: request.height,
		});
	}
	let count = request.columns.len();
	for (i, link) in request.links.iter().enumerate() {
		for node in [link.source, link.target] {
			if node >= count {
				return Err(LayoutError::UnknownNode {
					link: i,
					node,
					count,
				});
			}
		}
		if !link.value.is_finite() {
			return Err(LayoutError::NonFiniteValue {
				link: i,
				value: link.value,
			});
		}
	}
	Ok(())
}

fn build_graph(request: &LayoutRequest) -> LayoutGraph {
	let mut nodes: Vec<LayoutNode> = (0..request.columns.len())
		.map(|_| LayoutNode {
			extent: Extent::default(),
			value: 0.0,
			layer: 0,
			source_links: Vec::new(),
			target_links: Vec::new(),
		})
		.collect();
	let links = request
		.links
		.iter()
		.enumerate()
		.map(|(i, l)| {
			nodes[l.source].source_links.push(i);
			nodes[l.target].target_links.push(i);
			LayoutLink {
				source: l.source,
				target: l.target,
				value: l.value,
				width: 0.0,
				y0: 0.0,
				y1: 0.0,
				circular: false,
				circular_link_type: None,
				circular_path_data: None,
			}
		})
		.collect::<Vec<_>>();
	for node in &mut nodes {
		let sum = |ids: &[usize]| ids.iter().map(|&i| links[i].value).sum::<f64>();
		node.value = sum(&node.source_links).max(sum(&node.target_links));
	}
	LayoutGraph {
		nodes,
		links,
		node_padding: request.node_padding,
		width: request.width,
		height: request.height,
	}
}

/// Marks DFS back edges, self loops included, as circular.
fn mark_circular_links(graph: &mut LayoutGraph) {
	#[derive(Clone, Copy, PartialEq)]
	enum Mark {
		New,
		Active,
		Done,
	}
	let mut marks = vec![Mark::New; graph.nodes.len()];
	for root in 0..graph.nodes.len() {
		if marks[root] != Mark::New {
			continue;
		}
		let mut stack = vec![(root, 0usize)];
		marks[root] = Mark::Active;
		while let Some(top) = stack.last_mut() {
			let (node, next) = *top;
			let Some(&link) = graph.nodes[node].source_links.get(next) else {
				marks[node] = Mark::Done;
				stack.pop();
				continue;
			};
			top.1 += 1;
			let target = graph.links[link].target;
			match marks[target] {
				Mark::Active => graph.links[link].circular = true,
				Mark::New => {
					marks[target] = Mark::Active;
					stack.push((target, 0));
				}
				Mark::Done => {}
			}
		}
	}
}

/// Longest path over acyclic links; sinks are pushed to the last column.
fn assign_layers(graph: &mut LayoutGraph, hints: &[Option<usize>]) -> Vec<Vec<usize>> {
	let n = graph.nodes.len();
	let acyclic = |links: &[LayoutLink], ids: &[usize]| -> Vec<usize> {
		ids.iter().copied().filter(|&i| !links[i].circular).collect()
	};
	let mut indegree: Vec<usize> = graph
		.nodes
		.iter()
		.map(|node| acyclic(&graph.links, &node.target_links).len())
		.collect();
	let mut layer = vec![0usize; n];
	let mut queue: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
	while let Some(node) = queue.pop() {
		for link in acyclic(&graph.links, &graph.nodes[node].source_links) {
			let target = graph.links[link].target;
			layer[target] = layer[target].max(layer[node] + 1);
			indegree[target] -= 1;
			if indegree[target] == 0 {
				queue.push(target);
			}
		}
	}

	let last = layer.iter().copied().max().unwrap_or(0);
	for (i, node) in graph.nodes.iter().enumerate() {
		if acyclic(&graph.links, &node.source_links).is_empty()
			&& !acyclic(&graph.links, &node.target_links).is_empty()
		{
			layer[i] = last;
		}
	}
	for (i, hint) in hints.iter().enumerate() {
		if let Some(column) = hint {
			layer[i] = *column;
		}
	}

	let count = layer.iter().copied().max().map_or(0, |m| m + 1);
	let mut columns = vec![Vec::new(); count];
	for (i, &l) in layer.iter().enumerate() {
		graph.nodes[i].layer = l;
		columns[l].push(i);
	}
	columns
}

fn place_columns(graph: &mut LayoutGraph, columns: &[Vec<usize>], thickness: f64) {
	let kx = if columns.len() > 1 {
		(graph.width - thickness) / (columns.len() - 1) as f64
	} else {
		0.0
	};
	for (layer, column) in columns.iter().enumerate() {
		for &i in column {
			let x0 = layer as f64 * kx;
			graph.nodes[i].extent.x0 = x0;
			graph.nodes[i].extent.x1 = x0 + thickness;
		}
	}
}

fn value_scale(graph: &LayoutGraph, columns: &[Vec<usize>]) -> f64 {
	columns
		.iter()
		.filter_map(|column| {
			let total: f64 = column.iter().map(|&i| graph.nodes[i].value).sum();
			(total > 0.0).then(|| {
				(graph.height - (column.len() - 1) as f64 * graph.node_padding) / total
			})
		})
		.fold(f64::INFINITY, f64::min)
		.clamp(0.0, f64::MAX)
}

/// Stacks each column and spreads the leftover space evenly between nodes.
fn initialize_breadths(graph: &mut LayoutGraph, columns: &[Vec<usize>], ky: f64) {
	let py = graph.node_padding;
	for column in columns {
		let mut y = 0.0;
		for &i in column {
			let node = &mut graph.nodes[i];
			node.extent.y0 = y;
			node.extent.y1 = y + node.value * ky;
			y = node.extent.y1 + py;
		}
		let slack = (graph.height - y + py) / (column.len() + 1) as f64;
		for (k, &i) in column.iter().enumerate() {
			let node = &mut graph.nodes[i];
			node.extent.y0 += slack * (k + 1) as f64;
			node.extent.y1 += slack * (k + 1) as f64;
		}
	}
}

#[derive(Clone, Copy)]
enum Sweep {
	LeftToRight,
	RightToLeft,
}

/// Moves nodes toward the value-weighted centre of their neighbours.
fn relax(
	graph: &mut LayoutGraph,
	columns: &mut [Vec<usize>],
	alpha: f64,
	beta: f64,
	sweep: Sweep,
) {
	let order: Vec<usize> = match sweep {
		Sweep::LeftToRight => (1..columns.len()).collect(),
		Sweep::RightToLeft => (0..columns.len().saturating_sub(1)).rev().collect(),
	};
	for c in order {
		for &i in &columns[c] {
			let node = &graph.nodes[i];
			let neighbours = match sweep {
				Sweep::LeftToRight => &node.target_links,
				Sweep::RightToLeft => &node.source_links,
			};
			let (mut y, mut w) = (0.0, 0.0);
			for &l in neighbours {
				let link = &graph.links[l];
				if link.circular {
					continue;
				}
				let other = match sweep {
					Sweep::LeftToRight => link.source,
					Sweep::RightToLeft => link.target,
				};
				let span = graph.nodes[other].layer.abs_diff(node.layer).max(1) as f64;
				let v = link.value * span;
				y += graph.nodes[other].extent.center().y * v;
				w += v;
			}
			if w > 0.0 {
				let dy = (y / w - node.extent.center().y) * alpha;
				let node = &mut graph.nodes[i];
				node.extent.y0 += dy;
				node.extent.y1 += dy;
			}
		}
		columns[c].sort_by(|&a, &b| {
			graph.nodes[a]
				.extent
				.y0
				.total_cmp(&graph.nodes[b].extent.y0)
				.then(a.cmp(&b))
		});
		resolve_collisions(graph, &columns[c], beta);
	}
}

fn resolve_collisions(graph: &mut LayoutGraph, column: &[usize], alpha: f64) {
	if column.is_empty() {
		return;
	}
	let py = graph.node_padding;
	let mid = column.len() / 2;
	let subject = graph.nodes[column[mid]].extent;
	push_up(graph, column, subject.y0 - py, mid as isize - 1, alpha);
	push_down(graph, column, subject.y1 + py, mid + 1, alpha);
	push_up(graph, column, graph.height, column.len() as isize - 1, alpha);
	push_down(graph, column, 0.0, 0, alpha);
}

fn push_down(graph: &mut LayoutGraph, column: &[usize], mut y: f64, from: usize, alpha: f64) {
	let py = graph.node_padding;
	for &i in column.iter().skip(from) {
		let node = &mut graph.nodes[i];
		let dy = (y - node.extent.y0) * alpha;
		if dy > 1e-6 {
			node.extent.y0 += dy;
			node.extent.y1 += dy;
		}
		y = node.extent.y1 + py;
	}
}

fn push_up(graph: &mut LayoutGraph, column: &[usize], mut y: f64, from: isize, alpha: f64) {
	let py = graph.node_padding;
	let mut k = from;
	while k >= 0 {
		let node = &mut graph.nodes[column[k as usize]];
		let dy = (node.extent.y1 - y) * alpha;
		if dy > 1e-6 {
			node.extent.y0 -= dy;
			node.extent.y1 -= dy;
		}
		y = node.extent.y0 - py;
		k -= 1;
	}
}

/// Alternates loop sides so top and bottom stay balanced.
fn assign_loop_sides(graph: &mut LayoutGraph) {
	let (mut top, mut bottom) = (0usize, 0usize);
	for link in graph.links.iter_mut().filter(|l| l.circular) {
		if top <= bottom {
			link.circular_link_type = Some(CircularLinkType::Top);
			top += 1;
		} else {
			link.circular_link_type = Some(CircularLinkType::Bottom);
			bottom += 1;
		}
	}
}

/// Sort key placing top loops first, bottom loops last, ribbons by the far node.
fn attachment_key(graph: &LayoutGraph, link: usize, far: usize) -> f64 {
	match graph.links[link].circular_link_type {
		Some(CircularLinkType::Top) => f64::NEG_INFINITY,
		Some(CircularLinkType::Bottom) => f64::INFINITY,
		None => graph.nodes[far].extent.y0,
	}
}

fn compute_link_breadths(graph: &mut LayoutGraph) {
	for n in 0..graph.nodes.len() {
		let mut outgoing = graph.nodes[n].source_links.clone();
		outgoing.sort_by(|&a, &b| {
			attachment_key(graph, a, graph.links[a].target)
				.total_cmp(&attachment_key(graph, b, graph.links[b].target))
				.then(a.cmp(&b))
		});
		let mut y = graph.nodes[n].extent.y0;
		for l in outgoing {
			let link = &mut graph.links[l];
			link.y0 = y + link.width / 2.0;
			y += link.width;
		}

		let mut incoming = graph.nodes[n].target_links.clone();
		incoming.sort_by(|&a, &b| {
			attachment_key(graph, a, graph.links[a].source)
				.total_cmp(&attachment_key(graph, b, graph.links[b].source))
				.then(a.cmp(&b))
		});
		let mut y = graph.nodes[n].extent.y0;
		for l in incoming {
			let link = &mut graph.links[l];
			link.y1 = y + link.width / 2.0;
			y += link.width;
		}
	}
}

/// Nests loops of the same side outward in link order.
fn compute_loop_geometry(graph: &mut LayoutGraph) {
	let top = graph
		.nodes
		.iter()
		.map(|n| n.extent.y0)
		.fold(f64::INFINITY, f64::min);
	let bottom = graph
		.nodes
		.iter()
		.map(|n| n.extent.y1)
		.fold(f64::NEG_INFINITY, f64::max);
	let (mut top_stack, mut bottom_stack) = (0.0, 0.0);

	for l in 0..graph.links.len() {
		let link = &graph.links[l];
		let Some(kind) = link.circular_link_type.filter(|_| link.circular) else {
			continue;
		};
		let (source, target) = (&graph.nodes[link.source], &graph.nodes[link.target]);
		let half = link.width / 2.0;
		let stack = match kind {
			CircularLinkType::Top => &mut top_stack,
			CircularLinkType::Bottom => &mut bottom_stack,
		};
		let small = LOOP_BASE_RADIUS + half;
		let large = small + *stack;
		let left_inner = source.extent.x1 + LOOP_NODE_BUFFER;
		let right_inner = target.extent.x0 - LOOP_NODE_BUFFER;
		let mid = (link.y0 + link.y1) / 2.0;
		let reach = small + large + link.width;
		let vertical_buffer = match kind {
			CircularLinkType::Top => {
				let track = (top - LOOP_VERTICAL_MARGIN - *stack - half)
					.min(link.y0.min(link.y1) - reach);
				mid - track
			}
			CircularLinkType::Bottom => {
				let track = (bottom + LOOP_VERTICAL_MARGIN + *stack + half)
					.max(link.y0.max(link.y1) + reach);
				track - mid
			}
		};
		*stack += link.width + LOOP_GAP;

		let data = CircularPathData {
			source_x: source.extent.x1,
			source_y: link.y0,
			target_x: target.extent.x0,
			target_y: link.y1,
			left_small_arc_radius: small,
			left_large_arc_radius: large,
			right_small_arc_radius: small,
			right_large_arc_radius: large,
			left_inner_extent: left_inner,
			left_full_extent: left_inner + large,
			right_inner_extent: right_inner,
			right_full_extent: right_inner - large,
			vertical_buffer,
		};
		graph.links[l].circular_path_data = Some(data);
	}
}
