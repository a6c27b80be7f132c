//! Per-trace view model: display parameters, the laid-out graph, render
//! records for nodes and links, and the column simulators of one diagram.

use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};

use super::config::{
	Arrangement, COLORS, DEFAULT_LINK_COLOR, NODE_PAD_ACROSS, NODE_TEXT_OFFSET, Orientation,
	SceneSize, ValueFormat, color_brightness,
};
use super::error::{LayoutError, LayoutResult};
use super::events::{Entity, InteractionState};
use super::flow::{LinkStats, compute_flow_stats};
use super::geometry::{Extent, LinkShape, Path, Point, node_shape};
use super::layout::{LayoutGraph, LayoutRequest, LinkRequest, SankeyLayout};
use super::snap::{ColumnKey, ColumnSnapSimulator, LoopState, Pin, run_column_frame};
use super::types::SankeyTrace;

/// Identity of a diagram on the canvas; views refer to their diagram by it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct DiagramParams {
	pub horizontal: bool,
	/// Trace box size on screen.
	pub width: f64,
	pub height: f64,
	pub translate_x: f64,
	pub translate_y: f64,
	/// Requested node padding.
	pub node_pad: f64,
	pub node_thickness: f64,
	/// Layout-space extent along the layering axis.
	pub layer_extent: f64,
	/// Layout-space extent across columns.
	pub column_extent: f64,
	pub arrangement: Arrangement,
	pub node_line_color: String,
	pub node_line_width: f64,
	pub link_line_color: String,
	pub link_line_width: f64,
	pub value_format: ValueFormat,
	pub font_size: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlign {
	Start,
	End,
}

/// Label position relative to the node's top-left corner, in layout space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelAnchor {
	pub x: f64,
	pub y: f64,
	pub align: TextAlign,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
	pub key: String,
	pub trace: TraceId,
	/// Index in the caller's node list.
	pub point_number: usize,
	pub label: String,
	pub color: String,
	pub column: usize,
	pub original_center: Point,
	pub visible_width: f64,
	pub visible_height: f64,
	/// Hit box relative to the node's top-left corner.
	pub zone: Extent,
	pub label_anchor: LabelAnchor,
	pub show_label: bool,
	/// Fill color is dark enough for light text on top of it.
	pub dark_background: bool,
	pub hover_text: String,
}

impl NodeView {
	/// Horizontal labels sit beside the node on the canvas background;
	/// vertical labels sit on the node itself.
	pub fn label_color(&self, horizontal: bool) -> &'static str {
		if horizontal {
			"rgba(255, 255, 255, 0.85)"
		} else if self.dark_background {
			"rgb(255, 255, 255)"
		} else {
			"rgb(0, 0, 0)"
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkView {
	pub key: String,
	pub trace: TraceId,
	pub point_number: usize,
	pub color: String,
	/// Outline is drawn with the line style rather than the fill color.
	pub salient: bool,
	pub stats: LinkStats,
	pub hover_text: String,
}

/// Stroke and highlight allowance around a repaint box.
const SCOPE_MARGIN: f64 = 4.0;

/// Nodes and links to repaint after a change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RedrawScope {
	pub trace: TraceId,
	pub nodes: BTreeSet<usize>,
	pub links: BTreeSet<usize>,
}

/// Everything one diagram needs between full rebuilds.
///
/// Node and link views are index-aligned with `graph.nodes` and `graph.links`.
#[derive(Clone, Debug)]
pub struct DiagramModel {
	pub trace: TraceId,
	pub params: DiagramParams,
	pub graph: LayoutGraph,
	pub nodes: Vec<NodeView>,
	pub links: Vec<LinkView>,
	/// Node indices, bottom-most first.
	pub paint_order: Vec<usize>,
	pub simulators: HashMap<ColumnKey, ColumnSnapSimulator>,
	pub interaction: InteractionState,
}

fn params_for(trace: &SankeyTrace, scene: &SceneSize) -> DiagramParams {
	let opts = &trace.options;
	let domain = &opts.domain;
	let horizontal = opts.orientation == Orientation::Horizontal;
	let width = scene.width * (domain.x[1] - domain.x[0]);
	let height = scene.height * (domain.y[1] - domain.y[0]);
	let (layer_extent, column_extent) = if horizontal {
		(width, height)
	} else {
		(height, width)
	};
	DiagramParams {
		horizontal,
		width,
		height,
		translate_x: domain.x[0] * scene.width + scene.margin_left,
		translate_y: scene.height - domain.y[1] * scene.height + scene.margin_top,
		node_pad: opts.node.pad,
		node_thickness: opts.node.thickness,
		layer_extent,
		column_extent,
		arrangement: opts.arrangement,
		node_line_color: opts.node.line_color.clone(),
		node_line_width: opts.node.line_width,
		link_line_color: opts.link.line_color.clone(),
		link_line_width: opts.link.line_width,
		value_format: opts.value_format.clone(),
		font_size: opts.font_size,
	}
}

/// Builds the view model for one trace.
///
/// Zero-value links, and nodes left without links, are dropped here and only
/// here. A degenerate request yields an empty model without calling `layout`.
pub fn build_model(
	trace_id: TraceId,
	trace: &SankeyTrace,
	scene: &SceneSize,
	layout: &dyn SankeyLayout,
) -> LayoutResult<DiagramModel> {
	let params = params_for(trace, scene);
	let node_count = trace.nodes.len();

	for (i, link) in trace.links.iter().enumerate() {
		if let Some(&node) = [link.source, link.target].iter().find(|&&n| n >= node_count) {
			return Err(LayoutError::UnknownNode {
				link: i,
				node,
				count: node_count,
			});
		}
	}

	let kept_links: Vec<usize> = (0..trace.links.len())
		.filter(|&i| trace.links[i].value > 0.0)
		.collect();
	// Surviving nodes keep caller order.
	let kept_nodes: Vec<usize> = kept_links
		.iter()
		.flat_map(|&l| [trace.links[l].source, trace.links[l].target])
		.collect::<BTreeSet<_>>()
		.into_iter()
		.collect();
	let mut renumber: Vec<Option<usize>> = vec![None; node_count];
	for (new, &old) in kept_nodes.iter().enumerate() {
		renumber[old] = Some(new);
	}

	let requested_columns = kept_nodes
		.iter()
		.filter_map(|&n| trace.nodes[n].column)
		.max()
		.map_or(0, |c| c + 1);
	if kept_nodes.is_empty() || requested_columns > kept_nodes.len() {
		warn!(
			"trace {:?}: {} columns requested for {} nodes, drawing nothing",
			trace_id,
			requested_columns,
			kept_nodes.len()
		);
		return Ok(DiagramModel::empty(trace_id, params));
	}

	let request = LayoutRequest {
		columns: kept_nodes.iter().map(|&n| trace.nodes[n].column).collect(),
		links: kept_links
			.iter()
			.map(|&l| LinkRequest {
				source: renumber[trace.links[l].source].unwrap_or_default(),
				target: renumber[trace.links[l].target].unwrap_or_default(),
				value: trace.links[l].value,
			})
			.collect(),
		width: params.layer_extent,
		height: params.column_extent,
		node_thickness: params.node_thickness,
		node_padding: params.node_pad,
	};
	let graph = layout.layout(&request)?;
	if graph.node_padding < params.node_pad {
		warn!(
			"node pad was reduced to {} to fit within the figure",
			graph.node_padding
		);
	}

	let labels: Vec<Option<String>> = kept_links
		.iter()
		.map(|&l| trace.links[l].label.clone())
		.collect();
	let stats = compute_flow_stats(&graph, &labels);

	// Distinct column coordinates, left to right.
	let mut columns: Vec<f64> = graph.nodes.iter().map(|n| n.extent.center().x).collect();
	columns.sort_by(f64::total_cmp);
	columns.dedup();
	let last_column = columns.len().saturating_sub(1);

	let fmt = &params.value_format;
	let nodes: Vec<NodeView> = graph
		.nodes
		.iter()
		.enumerate()
		.map(|(i, n)| {
			let source = &trace.nodes[kept_nodes[i]];
			let shape = node_shape(&n.extent);
			let center = n.extent.center();
			let column = columns
				.iter()
				.position(|&c| c == center.x)
				.unwrap_or_default();
			let left = column == last_column && last_column > 0;
			let label_anchor = match (params.horizontal, left) {
				(true, true) => LabelAnchor {
					x: -NODE_TEXT_OFFSET,
					y: n.extent.height() / 2.0 + 1.0,
					align: TextAlign::End,
				},
				(true, false) => LabelAnchor {
					x: shape.width.ceil() + NODE_TEXT_OFFSET,
					y: n.extent.height() / 2.0 + 1.0,
					align: TextAlign::Start,
				},
				(false, _) => LabelAnchor {
					x: shape.width / 2.0 + 1.0,
					y: NODE_TEXT_OFFSET,
					align: TextAlign::Start,
				},
			};
			let color = source
				.color
				.clone()
				.unwrap_or_else(|| COLORS[kept_nodes[i] % COLORS.len()].into());
			NodeView {
				key: format!("{}__{}", source.label, i),
				trace: trace_id,
				point_number: kept_nodes[i],
				label: source.label.clone(),
				dark_background: color_brightness(&color).is_none_or(|b| b <= 128.0),
				color,
				column,
				original_center: center,
				visible_width: shape.width.ceil(),
				visible_height: shape.height,
				zone: Extent::new(
					-NODE_PAD_ACROSS,
					shape.width + NODE_PAD_ACROSS,
					-params.node_pad / 2.0,
					shape.height + params.node_pad / 2.0,
				),
				label_anchor,
				show_label: params.horizontal || n.extent.height() > 5.0,
				hover_text: format!("{}: {}", source.label, fmt.format(n.value)),
			}
		})
		.collect();

	let links: Vec<LinkView> = graph
		.links
		.iter()
		.enumerate()
		.map(|(i, l)| {
			let source = &trace.links[kept_links[i]];
			let stats = stats[i].clone();
			let scaled = trace
				.options
				.concentration_scale
				.as_ref()
				.and_then(|scale| scale.color_at(stats.flow.label_concentration));
			let color = scaled
				.or_else(|| source.color.clone())
				.unwrap_or_else(|| DEFAULT_LINK_COLOR.into());
			let (from, to) = (&nodes[l.source].label, &nodes[l.target].label);
			LinkView {
				key: format!("{}|{}__{}", from, to, i),
				trace: trace_id,
				point_number: kept_links[i],
				color,
				salient: l.width > 1.0 || params.link_line_width > 0.0,
				stats,
				hover_text: match &source.label {
					Some(label) => format!("{}: {}", label, fmt.format(l.value)),
					None => format!("{} → {}: {}", from, to, fmt.format(l.value)),
				},
			}
		})
		.collect();

	debug!(
		"trace {:?}: {} nodes, {} links after filtering",
		trace_id,
		nodes.len(),
		links.len()
	);
	Ok(DiagramModel {
		trace: trace_id,
		params,
		paint_order: (0..nodes.len()).collect(),
		graph,
		nodes,
		links,
		simulators: HashMap::new(),
		interaction: InteractionState::default(),
	})
}

impl DiagramModel {
	pub fn empty(trace: TraceId, params: DiagramParams) -> Self {
		Self {
			trace,
			params,
			graph: LayoutGraph::default(),
			nodes: Vec::new(),
			links: Vec::new(),
			paint_order: Vec::new(),
			simulators: HashMap::new(),
			interaction: InteractionState::default(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn node_extent(&self, node: usize) -> Extent {
		self.graph.nodes[node].extent
	}

	pub fn link_shape(&self, link: usize) -> LinkShape {
		self.graph.link_shape(link)
	}

	pub fn link_path(&self, link: usize) -> Path {
		self.link_shape(link).path()
	}

	pub fn column_key(&self, node: usize) -> ColumnKey {
		ColumnKey {
			trace: self.trace,
			column: self.nodes[node].column,
		}
	}

	/// Nodes laid out in `column`, by original position.
	pub fn column_members(&self, column: usize) -> Vec<usize> {
		(0..self.nodes.len())
			.filter(|&i| self.nodes[i].column == column)
			.collect()
	}

	/// The nodes of `column` and every link touching them.
	pub fn redraw_scope(&self, column: usize) -> RedrawScope {
		let nodes: BTreeSet<usize> = self.column_members(column).into_iter().collect();
		let links = nodes
			.iter()
			.flat_map(|&n| {
				let node = &self.graph.nodes[n];
				node.source_links.iter().chain(&node.target_links).copied()
			})
			.collect();
		RedrawScope {
			trace: self.trace,
			nodes,
			links,
		}
	}

	/// Moves `node` to the top of the paint order.
	pub fn raise(&mut self, node: usize) {
		self.paint_order.retain(|&n| n != node);
		self.paint_order.push(node);
	}

	/// Topmost node whose hit box contains `p` (layout space).
	pub fn node_at(&self, p: Point) -> Option<usize> {
		self.paint_order.iter().rev().copied().find(|&n| {
			let extent = self.node_extent(n);
			let zone = self.nodes[n].zone;
			Extent::new(
				extent.x0 + zone.x0,
				extent.x0 + zone.x1,
				extent.y0 + zone.y0,
				extent.y0 + zone.y1,
			)
			.contains(p)
		})
	}

	pub fn link_at(&self, p: Point) -> Option<usize> {
		(0..self.links.len())
			.rev()
			.find(|&l| self.link_shape(l).contains(p))
	}

	/// Nodes take precedence over the links beneath them.
	pub fn hit_test(&self, p: Point) -> Option<Entity> {
		self.node_at(p)
			.map(Entity::Node)
			.or_else(|| self.link_at(p).map(Entity::Link))
	}

	/// Converts a point relative to the canvas into this trace's layout space.
	pub fn to_layout_space(&self, screen: Point) -> Point {
		let local = Point::new(
			screen.x - self.params.translate_x,
			screen.y - self.params.translate_y,
		);
		if self.params.horizontal {
			local
		} else {
			local.swapped()
		}
	}

	/// Inverse of [`Self::to_layout_space`].
	pub fn to_screen(&self, p: Point) -> Point {
		let p = if self.params.horizontal { p } else { p.swapped() };
		Point::new(p.x + self.params.translate_x, p.y + self.params.translate_y)
	}

	fn screen_extent(&self, e: &Extent) -> Extent {
		let (a, b) = (
			self.to_screen(Point::new(e.x0, e.y0)),
			self.to_screen(Point::new(e.x1, e.y1)),
		);
		Extent::new(a.x.min(b.x), a.x.max(b.x), a.y.min(b.y), a.y.max(b.y))
	}

	/// Canvas box covering every node, link and label in `scope`, with a
	/// margin for strokes. Label widths are bounded by one em per character.
	pub fn scope_bounds(&self, scope: &RedrawScope) -> Option<Extent> {
		let font = self.params.font_size;
		let nodes = scope.nodes.iter().filter(|&&i| i < self.nodes.len()).flat_map(|&i| {
			let view = &self.nodes[i];
			let extent = self.node_extent(i);
			let body = self.screen_extent(&Extent::new(
				extent.x0,
				extent.x0 + view.visible_width.max(extent.width()),
				extent.y0,
				extent.y0 + view.visible_height.max(extent.height()),
			));
			let label = view.show_label.then(|| {
				let at = self.to_screen(Point::new(
					extent.x0 + view.label_anchor.x,
					extent.y0 + view.label_anchor.y,
				));
				let width = view.label.chars().count() as f64 * font;
				let (x0, x1) = match view.label_anchor.align {
					TextAlign::Start => (at.x, at.x + width),
					TextAlign::End => (at.x - width, at.x),
				};
				Extent::new(x0, x1, at.y - font, at.y + font)
			});
			std::iter::once(body).chain(label)
		});
		let links = scope
			.links
			.iter()
			.filter(|&&i| i < self.links.len())
			.filter_map(|&i| self.link_path(i).bounds())
			.map(|e| self.screen_extent(&e));
		nodes
			.chain(links)
			.reduce(|a, b| a.union(&b))
			.map(|e| e.grown(SCOPE_MARGIN, SCOPE_MARGIN))
	}

	/// Returns the column simulator for `node`, creating or re-arming it.
	pub fn ensure_simulator(&mut self, node: usize) -> ColumnKey {
		let key = self.column_key(node);
		if let Some(sim) = self.simulators.get_mut(&key) {
			debug!("re-arming snap simulator for {:?}", key);
			sim.rearm();
		} else {
			let members: Vec<(usize, f64)> = self
				.column_members(key.column)
				.into_iter()
				.map(|n| (n, self.nodes[n].original_center.x))
				.collect();
			let sim = ColumnSnapSimulator::new(
				key,
				&self.graph,
				&members,
				self.params.node_pad,
				self.params.column_extent,
			);
			self.simulators.insert(key, sim);
		}
		key
	}

	/// Advances one column's loop by a frame. `None` if the column has no simulator.
	pub fn advance_column(
		&mut self,
		key: ColumnKey,
		layout: &dyn SankeyLayout,
	) -> Option<(LoopState, RedrawScope)> {
		let pin = self
			.interaction
			.drag_in_progress
			.zip(self.interaction.last_dragged)
			.map(|(node, position)| Pin { node, position });
		let sim = self.simulators.get_mut(&key)?;
		// The pin only counts for its own column, so other columns of a
		// dragged trace may settle while the drag goes on.
		let state = run_column_frame(sim, &mut self.graph, pin, layout);
		Some((state, self.redraw_scope(key.column)))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::components::sankey::config::{ColorScale, TraceOptions};
	use crate::components::sankey::layout::LayeredLayout;
	use crate::components::sankey::types::{SankeyLink, SankeyNode};

	fn trace(nodes: &[&str], links: &[(usize, usize, f64)]) -> SankeyTrace {
		SankeyTrace {
			nodes: nodes.iter().map(|&l| SankeyNode::new(l)).collect(),
			links: links
				.iter()
				.map(|&(s, t, v)| SankeyLink::new(s, t, v))
				.collect(),
			options: TraceOptions::default(),
		}
	}

	fn build(trace: &SankeyTrace) -> DiagramModel {
		build_model(
			TraceId(0),
			trace,
			&SceneSize::new(600.0, 400.0),
			&LayeredLayout::default(),
		)
		.unwrap()
	}

	#[test]
	fn zero_value_links_and_orphaned_nodes_are_dropped() {
		let t = trace(&["a", "b", "c", "d"], &[(0, 1, 3.0), (1, 2, 0.0), (3, 1, 2.0)]);
		let model = build(&t);
		let labels: Vec<&str> = model.nodes.iter().map(|n| n.label.as_str()).collect();
		assert_eq!(labels, vec!["a", "b", "d"]);
		assert_eq!(model.links.len(), 2);
		assert_eq!(model.links[1].point_number, 2);
		assert_eq!(model.nodes[2].point_number, 3);
	}

	#[test]
	fn too_many_requested_columns_is_degenerate() {
		let mut t = trace(&["a", "b"], &[(0, 1, 1.0)]);
		t.nodes[1].column = Some(4);
		let model = build(&t);
		assert!(model.is_empty());
		assert!(model.graph.links.is_empty());
	}

	#[test]
	fn unknown_link_endpoint_is_an_error() {
		let t = trace(&["a"], &[(0, 3, 1.0)]);
		let err = build_model(
			TraceId(0),
			&t,
			&SceneSize::new(600.0, 400.0),
			&LayeredLayout::default(),
		)
		.unwrap_err();
		assert_eq!(
			err,
			LayoutError::UnknownNode {
				link: 0,
				node: 3,
				count: 1
			}
		);
	}

	#[test]
	fn columns_and_label_sides_follow_layers() {
		let model = build(&trace(&["a", "b", "c"], &[(0, 1, 2.0), (1, 2, 2.0)]));
		let columns: Vec<usize> = model.nodes.iter().map(|n| n.column).collect();
		assert_eq!(columns, vec![0, 1, 2]);
		assert_eq!(model.nodes[0].label_anchor.align, TextAlign::Start);
		assert_eq!(model.nodes[2].label_anchor.align, TextAlign::End);
		assert_eq!(model.nodes[0].key, "a__0");
		assert_eq!(model.links[0].key, "a|b__0");
	}

	#[test]
	fn concentration_scale_colors_links() {
		let mut t = trace(&["a", "b"], &[(0, 1, 1.0)]);
		t.options.concentration_scale =
			Some(ColorScale::new(vec![(0.0, [0, 0, 0]), (1.0, [255, 0, 0])]));
		let model = build(&t);
		assert_eq!(model.links[0].color, "rgb(255, 0, 0)");
	}

	#[test]
	fn vertical_labels_contrast_with_their_node() {
		let mut t = trace(&["a", "b"], &[(0, 1, 1.0)]);
		t.nodes[0].color = Some("#ffffff".into());
		t.nodes[1].color = Some("rgb(20, 20, 60)".into());
		let horizontal = build(&t);
		assert_eq!(horizontal.nodes[0].label_color(true), "rgba(255, 255, 255, 0.85)");

		t.options.orientation = Orientation::Vertical;
		let model = build(&t);
		assert!(!model.nodes[0].dark_background);
		assert!(model.nodes[1].dark_background);
		assert_eq!(model.nodes[0].label_color(false), "rgb(0, 0, 0)");
		assert_eq!(model.nodes[1].label_color(false), "rgb(255, 255, 255)");
	}

	#[test]
	fn vertical_traces_swap_pointer_axes() {
		let mut t = trace(&["a", "b"], &[(0, 1, 1.0)]);
		t.options.orientation = Orientation::Vertical;
		let model = build(&t);
		assert_eq!(model.params.layer_extent, 400.0);
		assert_eq!(model.params.column_extent, 600.0);
		assert_eq!(
			model.to_layout_space(Point::new(30.0, 70.0)),
			Point::new(70.0, 30.0)
		);
	}

	#[test]
	fn hit_test_prefers_nodes_and_uses_the_padded_zone() {
		let model = build(&trace(&["a", "b"], &[(0, 1, 1.0)]));
		let extent = model.node_extent(0);
		let inside_zone = Point::new(extent.x1 + NODE_PAD_ACROSS / 2.0, extent.center().y);
		assert_eq!(model.hit_test(inside_zone), Some(Entity::Node(0)));
		let link = &model.graph.links[0];
		let on_link = Point::new(
			(model.node_extent(0).x1 + model.node_extent(1).x0) / 2.0,
			(link.y0 + link.y1) / 2.0,
		);
		assert_eq!(model.hit_test(on_link), Some(Entity::Link(0)));
	}

	#[test]
	fn redraw_scope_covers_column_and_incident_links() {
		let model = build(&trace(
			&["a", "b", "c", "d"],
			&[(0, 2, 2.0), (1, 2, 2.0), (2, 3, 4.0)],
		));
		let scope = model.redraw_scope(model.nodes[0].column);
		assert_eq!(scope.nodes, BTreeSet::from([0, 1]));
		assert_eq!(scope.links, BTreeSet::from([0, 1]));
	}

	#[test]
	fn scope_bounds_cover_column_nodes_and_links() {
		let model = build(&trace(
			&["a", "b", "c", "d"],
			&[(0, 2, 2.0), (1, 2, 2.0), (2, 3, 4.0)],
		));
		let scope = model.redraw_scope(model.nodes[0].column);
		let Some(bounds) = model.scope_bounds(&scope) else {
			panic!("empty scope");
		};
		for &n in &scope.nodes {
			let e = model.node_extent(n);
			assert!(bounds.contains(model.to_screen(Point::new(e.x0, e.y0))));
			assert!(bounds.contains(model.to_screen(Point::new(e.x1, e.y1))));
		}
		for &l in &scope.links {
			let e = model.link_path(l).bounds().unwrap();
			assert!(bounds.contains(model.to_screen(e.center())));
		}
		assert_eq!(model.scope_bounds(&RedrawScope::default()), None);
	}

	#[test]
	fn to_screen_inverts_to_layout_space() {
		let model = build(&trace(&["a", "b"], &[(0, 1, 1.0)]));
		let p = Point::new(37.0, 12.5);
		let back = model.to_layout_space(model.to_screen(p));
		assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
	}
}
