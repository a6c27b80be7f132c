use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::error;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, Window};

use super::events::InteractionEvent;
use super::geometry::{Extent, Point};
use super::render;
use super::state::{Redraw, SankeyState};
use super::types::SankeyData;

/// Upper bound on the hover fade step, so a background tab does not jump.
const MAX_FRAME_DT: f64 = 0.1;

fn window_size(window: &Window) -> (f64, f64) {
	let read = |v: Result<JsValue, JsValue>, fallback: f64| {
		v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	(read(window.inner_width(), 800.0), read(window.inner_height(), 600.0))
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn set_cursor(canvas_ref: NodeRef<leptos::html::Canvas>, cursor: &str) {
	if let Some(canvas) = canvas_ref.get() {
		let canvas: HtmlCanvasElement = canvas.into();
		let _ = web_sys::HtmlElement::style(&canvas).set_property("cursor", cursor);
	}
}

/// Interactive Sankey diagram drawn on a 2D canvas.
///
/// Nodes can be dragged according to each trace's arrangement. Hover and
/// select reports go to `on_event`, or to the debug log when it is unset.
#[component]
pub fn SankeyCanvas(
	#[prop(into)] data: Signal<SankeyData>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(default = None)] on_event: Option<Callback<InteractionEvent>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<SankeyState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let data = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();

		// New data on a running canvas only rebuilds the models.
		if let Some(ref mut s) = *state_init.borrow_mut() {
			if let Err(err) = s.set_data(data) {
				error!("cannot lay out sankey data: {err}");
			}
			return;
		}

		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into().ok())
		{
			Some(ctx) => ctx,
			None => {
				error!("2d canvas context unavailable");
				return;
			}
		};
		let mut sankey = match SankeyState::new(data, w, h) {
			Ok(s) => s,
			Err(err) => {
				error!("cannot lay out sankey data: {err}");
				return;
			}
		};
		if let Some(callback) = on_event {
			sankey.set_sink(Box::new(move |event: InteractionEvent| callback.run(event)));
		}
		*state_init.borrow_mut() = Some(sankey);

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut()
					&& let Err(err) = s.resize(nw, nh)
				{
					error!("cannot lay out sankey data after resize: {err}");
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		let mut last_frame = js_sys::Date::now();
		// Box painted by the previous scoped frame, `None` after a full repaint.
		let mut painted: Option<Extent> = None;
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let now = js_sys::Date::now();
			let dt = ((now - last_frame) / 1000.0).min(MAX_FRAME_DT);
			last_frame = now;
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.on_animation_frame();
				let faded = s.advance_highlight(dt);
				painted = match (s.take_redraw(), faded) {
					(Redraw::Nothing, false) => painted,
					(Redraw::Scoped(scopes), false) => {
						let region = render::dirty_region(s, &ctx, &scopes);
						match (painted, region) {
							(Some(before), Some(after)) => {
								render::render_clipped(s, &ctx, &before.union(&after))
							}
							_ => render::render(s, &ctx),
						}
						region
					}
					_ => {
						render::render(s, &ctx);
						None
					}
				};
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(p) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(p);
			set_cursor(canvas_ref, s.cursor_at(p));
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(p) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(p);
			set_cursor(canvas_ref, s.cursor_at(p));
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.pointer_up();
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
		set_cursor(canvas_ref, "default");
	};

	let state_cl = state.clone();
	let on_click = move |ev: MouseEvent| {
		let Some(p) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_cl.borrow_mut() {
			s.click(p);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="sankey-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:click=on_click
			style="display: block;"
		/>
	}
}
