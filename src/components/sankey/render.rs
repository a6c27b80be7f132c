use log::warn;
use web_sys::{CanvasRenderingContext2d, Path2d};

use super::events::Entity;
use super::geometry::{Extent, Path, Point};
use super::model::{DiagramModel, RedrawScope, TextAlign, TraceId};
use super::state::SankeyState;

const BACKGROUND: &str = "#1a1a2e";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Repaints every diagram over the whole canvas.
pub fn render(state: &SankeyState, ctx: &CanvasRenderingContext2d) {
	paint(state, ctx, &Extent::new(0.0, state.scene.width, 0.0, state.scene.height));
}

/// Repaints only inside `region`. Everything crossing it is drawn again, so
/// the pixels outside stay valid.
pub fn render_clipped(state: &SankeyState, ctx: &CanvasRenderingContext2d, region: &Extent) {
	ctx.save();
	ctx.begin_path();
	ctx.rect(region.x0, region.y0, region.width(), region.height());
	ctx.clip();
	paint(state, ctx, region);
	ctx.restore();
}

/// Canvas box touched by `scopes` in the current state, tooltip included.
pub fn dirty_region(
	state: &SankeyState,
	ctx: &CanvasRenderingContext2d,
	scopes: &[RedrawScope],
) -> Option<Extent> {
	let tooltip = tooltip_box(state, ctx).map(|(_, _, bounds)| bounds);
	scopes
		.iter()
		.filter_map(|scope| state.model(scope.trace)?.scope_bounds(scope))
		.chain(tooltip)
		.reduce(|a, b| a.union(&b))
}

fn paint(state: &SankeyState, ctx: &CanvasRenderingContext2d, region: &Extent) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(region.x0, region.y0, region.width(), region.height());
	let t = ease_out_cubic(state.hover.highlight_t);
	let hovered = state.hover.target.or(state.hover.prev_target);
	for model in state.models() {
		let highlight = hovered.filter(|(trace, _)| *trace == model.trace).map(|(_, e)| e);
		ctx.save();
		let _ = ctx.translate(model.params.translate_x, model.params.translate_y);
		if !model.params.horizontal {
			// Layout x runs down the screen, layout y across it.
			let _ = ctx.transform(0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
		}
		draw_links(model, ctx, highlight, t);
		draw_nodes(model, ctx, highlight, t);
		ctx.restore();
		draw_labels(model, ctx);
	}
	draw_tooltip(state, ctx);
}

fn path2d(path: &Path) -> Option<Path2d> {
	match Path2d::new_with_path_string(&path.to_string()) {
		Ok(p) => Some(p),
		Err(err) => {
			warn!("rejected path {}: {:?}", path, err);
			None
		}
	}
}

fn draw_links(
	model: &DiagramModel,
	ctx: &CanvasRenderingContext2d,
	highlight: Option<Entity>,
	t: f64,
) {
	let dim = matches!(highlight, Some(Entity::Link(_)));
	for (i, view) in model.links.iter().enumerate() {
		let Some(shape) = path2d(&model.link_path(i)) else {
			continue;
		};
		let lit = highlight == Some(Entity::Link(i));
		let alpha = match (dim, lit) {
			(true, true) => 1.0,
			(true, false) => 1.0 - 0.5 * t,
			(false, _) => 1.0,
		};
		ctx.set_global_alpha(alpha);
		ctx.set_fill_style_str(&view.color);
		ctx.fill_with_path_2d(&shape);
		if model.params.link_line_width > 0.0 {
			ctx.set_stroke_style_str(&model.params.link_line_color);
			ctx.set_line_width(model.params.link_line_width);
			ctx.stroke_with_path(&shape);
		} else if !view.salient {
			// Hairline flows would vanish as a fill alone.
			ctx.set_stroke_style_str(&view.color);
			ctx.set_line_width(1.0);
			ctx.stroke_with_path(&shape);
		}
		if lit && t > 0.01 {
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5);
			ctx.stroke_with_path(&shape);
		}
	}
	ctx.set_global_alpha(1.0);
}

fn draw_nodes(
	model: &DiagramModel,
	ctx: &CanvasRenderingContext2d,
	highlight: Option<Entity>,
	t: f64,
) {
	let params = &model.params;
	for &i in &model.paint_order {
		let view = &model.nodes[i];
		let extent = model.node_extent(i);
		let (w, h) = (view.visible_width, view.visible_height);
		ctx.set_fill_style_str(&view.color);
		ctx.fill_rect(extent.x0, extent.y0, w, h);
		if params.node_line_width > 0.0 {
			ctx.set_stroke_style_str(&params.node_line_color);
			ctx.set_line_width(params.node_line_width);
			ctx.stroke_rect(extent.x0, extent.y0, w, h);
		}
		if highlight == Some(Entity::Node(i)) && t > 0.01 {
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(2.0);
			ctx.stroke_rect(extent.x0 - 1.0, extent.y0 - 1.0, w + 2.0, h + 2.0);
		}
	}
}

/// Labels are drawn untransformed so vertical diagrams keep upright text.
fn draw_labels(model: &DiagramModel, ctx: &CanvasRenderingContext2d) {
	ctx.set_font(&format!("{}px sans-serif", model.params.font_size));
	ctx.set_text_baseline("middle");
	for &i in &model.paint_order {
		let view = &model.nodes[i];
		if !view.show_label {
			continue;
		}
		ctx.set_fill_style_str(view.label_color(model.params.horizontal));
		let Extent { x0, y0, .. } = model.node_extent(i);
		let anchor =
			model.to_screen(Point::new(x0 + view.label_anchor.x, y0 + view.label_anchor.y));
		ctx.set_text_align(match view.label_anchor.align {
			TextAlign::Start => "start",
			TextAlign::End => "end",
		});
		let _ = ctx.fill_text(&view.label, anchor.x, anchor.y);
	}
	ctx.set_text_align("start");
}

/// Hover text for the entity under the pointer, with its canvas position.
pub fn tooltip(state: &SankeyState, target: (TraceId, Entity)) -> Option<(String, Point)> {
	let (trace, entity) = target;
	let model = state.model(trace)?;
	match entity {
		Entity::Node(i) => {
			let extent = model.node_extent(i);
			let at = model.to_screen(Point::new(extent.x1, extent.y0));
			Some((model.nodes.get(i)?.hover_text.clone(), at))
		}
		Entity::Link(i) => {
			let bounds = model.link_path(i).bounds()?;
			Some((model.links.get(i)?.hover_text.clone(), model.to_screen(bounds.center())))
		}
	}
}

/// Tooltip text, text origin and background box for the hovered entity.
fn tooltip_box(
	state: &SankeyState,
	ctx: &CanvasRenderingContext2d,
) -> Option<(String, Point, Extent)> {
	let (text, at) = state.hover.target.and_then(|target| tooltip(state, target))?;
	ctx.set_font("12px sans-serif");
	let width = ctx
		.measure_text(&text)
		.map(|m| m.width())
		.unwrap_or(text.len() as f64 * 7.0);
	let (x, y) = (
		at.x.min(state.scene.width - width - 12.0).max(0.0),
		(at.y - 24.0).max(0.0),
	);
	Some((text, Point::new(x + 6.0, y + 10.0), Extent::new(x, x + width + 12.0, y, y + 20.0)))
}

fn draw_tooltip(state: &SankeyState, ctx: &CanvasRenderingContext2d) {
	let Some((text, origin, bounds)) = tooltip_box(state, ctx) else {
		return;
	};
	ctx.set_fill_style_str("rgba(0, 0, 0, 0.75)");
	ctx.fill_rect(bounds.x0, bounds.y0, bounds.width(), bounds.height());
	ctx.set_fill_style_str("white");
	ctx.set_text_align("start");
	ctx.set_text_baseline("middle");
	let _ = ctx.fill_text(&text, origin.x, origin.y);
}
