//! Concentration statistics over a laid-out graph.
//!
//! Two independent normalisations are produced for each link:
//!
//! - flow level: links joining the same source and target form one flow, and
//!   each link (and each link label) gets its share of the flow total;
//! - node level: each link's share of its source's total outflow and of its
//!   target's total inflow.
//!
//! A zero total yields `NaN`, which renderers read as "do not color-encode".

use std::collections::HashMap;

use super::layout::LayoutGraph;

/// Aggregate over all links sharing one (source, target) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowSummary {
	/// Total value of the flow.
	pub value: f64,
	/// This link's value over the flow total.
	pub concentration: f64,
	/// Total of links with this link's label, over the flow total.
	pub label_concentration: f64,
	/// Link indices in the flow.
	pub links: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkStats {
	pub flow: FlowSummary,
	/// Share of the source node's outflow.
	pub out_concentration: f64,
	/// Share of the target node's inflow.
	pub in_concentration: f64,
}

/// Computes statistics for every link of `graph`, indexed like `graph.links`.
///
/// `labels[i]` is the label of link `i`; unlabelled links group together.
pub fn compute_flow_stats(graph: &LayoutGraph, labels: &[Option<String>]) -> Vec<LinkStats> {
	let mut stats: Vec<LinkStats> = graph
		.links
		.iter()
		.map(|_| LinkStats {
			flow: FlowSummary {
				value: f64::NAN,
				concentration: f64::NAN,
				label_concentration: f64::NAN,
				links: Vec::new(),
			},
			out_concentration: f64::NAN,
			in_concentration: f64::NAN,
		})
		.collect();
	let label_of = |link: usize| labels.get(link).and_then(|l| l.as_deref());

	for node in &graph.nodes {
		// Every incoming link shares the target, so the source alone keys the flow.
		let mut flows: HashMap<usize, Vec<usize>> = HashMap::new();
		for &link in &node.target_links {
			flows.entry(graph.links[link].source).or_default().push(link);
		}

		for members in flows.into_values() {
			let mut total = 0.0;
			let mut per_label: HashMap<Option<&str>, f64> = HashMap::new();
			for &link in &members {
				let value = graph.links[link].value;
				*per_label.entry(label_of(link)).or_default() += value;
				total += value;
			}
			for &link in &members {
				stats[link].flow = FlowSummary {
					value: total,
					concentration: graph.links[link].value / total,
					label_concentration: per_label[&label_of(link)] / total,
					links: members.clone(),
				};
			}
		}

		let outflow: f64 = node.source_links.iter().map(|&l| graph.links[l].value).sum();
		for &link in &node.source_links {
			stats[link].out_concentration = graph.links[link].value / outflow;
		}

		let inflow: f64 = node.target_links.iter().map(|&l| graph.links[l].value).sum();
		for &link in &node.target_links {
			stats[link].in_concentration = graph.links[link].value / inflow;
		}
	}
	stats
}
