use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
	#[error("link {link} references node {node}, but only {count} nodes exist")]
	UnknownNode {
		link: usize,
		node: usize,
		count: usize,
	},

	#[error("link {link} has non-finite value {value}")]
	NonFiniteValue { link: usize, value: f64 },

	#[error("layout size {width}x{height} is not usable")]
	InvalidSize { width: f64, height: f64 },
}

pub type LayoutResult<T> = Result<T, LayoutError>;
