use leptos::prelude::*;

use crate::components::sankey::config::{ColorScale, Domain, ValueFormat};
use crate::components::sankey::{
	Entity, InteractionEvent, InteractionKind, SankeyCanvas, SankeyData, SankeyLink, SankeyNode,
	SankeyTrace, TraceOptions,
};

/// Energy balance with a recycling loop back into the first column.
fn energy_trace() -> SankeyTrace {
	let nodes = [
		"Coal", "Gas", "Solar", "Wind", "Power plants", "Grid", "Homes", "Industry", "Losses",
		"Recycling",
	]
	.into_iter()
	.map(SankeyNode::new)
	.collect();
	let links = vec![
		SankeyLink::new(0, 4, 35.0).with_label("fossil"),
		SankeyLink::new(1, 4, 25.0).with_label("fossil"),
		SankeyLink::new(2, 5, 12.0).with_label("renewable"),
		SankeyLink::new(3, 5, 18.0).with_label("renewable"),
		SankeyLink::new(4, 5, 40.0).with_label("fossil"),
		SankeyLink::new(4, 8, 20.0),
		SankeyLink::new(5, 6, 30.0),
		SankeyLink::new(5, 7, 35.0),
		SankeyLink::new(5, 8, 5.0),
		SankeyLink::new(7, 9, 8.0),
		SankeyLink::new(9, 4, 8.0).with_label("fossil"),
	];
	SankeyTrace {
		nodes,
		links,
		options: TraceOptions {
			domain: Domain {
				x: [0.05, 0.95],
				y: [0.1, 0.9],
			},
			value_format: ValueFormat {
				decimals: 1,
				suffix: " TWh".into(),
			},
			concentration_scale: Some(ColorScale::new(vec![
				(0.0, [70, 90, 160]),
				(1.0, [240, 170, 60]),
			])),
			font_size: 12.0,
			..TraceOptions::default()
		},
	}
}

fn describe(event: &InteractionEvent) -> String {
	let verb = match event.kind {
		InteractionKind::Hover => "hovering",
		InteractionKind::Follow => "over",
		InteractionKind::Unhover => "left",
		InteractionKind::Select => "selected",
	};
	match event.entity {
		Entity::Node(i) => format!("{verb} node {i}"),
		Entity::Link(i) => format!("{verb} link {i}"),
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let data = Signal::derive(move || SankeyData {
		traces: vec![energy_trace()],
	});
	let (last_event, set_last_event) = signal(String::new());
	let on_event = Callback::new(move |event: InteractionEvent| {
		if event.kind != InteractionKind::Follow {
			set_last_event.set(describe(&event));
		}
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<SankeyCanvas data=data fullscreen=true on_event=Some(on_event) />
				<div class="graph-overlay">
					<h1>"Energy Flows"</h1>
					<p class="subtitle">"Drag nodes within their column. Siblings move aside."</p>
					<p class="subtitle">{move || last_event.get()}</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
