use super::config::TraceOptions;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SankeyNode {
	pub label: String,
	pub color: Option<String>,
	/// Requested layout column, counted from the left.
	pub column: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SankeyLink {
	/// Index into the trace's node list.
	pub source: usize,
	pub target: usize,
	pub value: f64,
	pub label: Option<String>,
	pub color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SankeyTrace {
	pub nodes: Vec<SankeyNode>,
	pub links: Vec<SankeyLink>,
	pub options: TraceOptions,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SankeyData {
	pub traces: Vec<SankeyTrace>,
}

impl SankeyNode {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			..Self::default()
		}
	}
}

impl SankeyLink {
	pub fn new(source: usize, target: usize, value: f64) -> Self {
		Self {
			source,
			target,
			value,
			label: None,
			color: None,
		}
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}
}
