//! Per-trace options, arrangement modes and engine constants.

/// Extra hit-box reach along the primary axis, on each side of a node.
pub const NODE_PAD_ACROSS: f64 = 10.0;
/// Gap between a node and its label.
pub const NODE_TEXT_OFFSET: f64 = 4.0;
/// Relaxation passes run by the layered layout.
pub const LAYOUT_ITERATIONS: usize = 50;
/// Collision passes per simulator tick.
pub const COLLIDE_ITERATIONS: usize = 5;
/// Simulator ticks advanced per host frame.
pub const TICKS_PER_FRAME: usize = 10;
/// A column loop settles once every velocity component is below this.
pub const CONVERGENCE_VELOCITY: f64 = 0.1;
/// Fraction of velocity kept after each simulator tick.
pub const VELOCITY_DECAY: f64 = 0.6;
/// Nodes thinner than this are still drawn and hit-tested at this size.
pub const MIN_VISIBLE_LENGTH: f64 = 0.5;

pub const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

pub const DEFAULT_LINK_COLOR: &str = "rgba(0, 0, 0, 0.2)";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
	#[default]
	Horizontal,
	Vertical,
}

/// How pointer drags map onto node positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Arrangement {
	/// Perpendicular drag with collision avoidance inside the column.
	#[default]
	Snap,
	/// Perpendicular drag only.
	Perpendicular,
	/// Both axes follow the pointer.
	Freeform,
	/// Nodes cannot be dragged.
	Fixed,
}

/// Fractions of the plot area covered by one trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
	pub x: [f64; 2],
	pub y: [f64; 2],
}

impl Default for Domain {
	fn default() -> Self {
		Self {
			x: [0.0, 1.0],
			y: [0.0, 1.0],
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeStyle {
	pub pad: f64,
	pub thickness: f64,
	pub line_color: String,
	pub line_width: f64,
}

impl Default for NodeStyle {
	fn default() -> Self {
		Self {
			pad: 20.0,
			thickness: 20.0,
			line_color: "#444".into(),
			line_width: 0.5,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkStyle {
	pub line_color: String,
	pub line_width: f64,
}

impl Default for LinkStyle {
	fn default() -> Self {
		Self {
			line_color: "#444".into(),
			line_width: 0.0,
		}
	}
}

/// Number formatting for hover text.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueFormat {
	pub decimals: usize,
	pub suffix: String,
}

impl Default for ValueFormat {
	fn default() -> Self {
		Self {
			decimals: 3,
			suffix: String::new(),
		}
	}
}

impl ValueFormat {
	/// Formats a value with fixed decimals, dropping trailing zeros.
	pub fn format(&self, value: f64) -> String {
		let mut text = format!("{:.*}", self.decimals, value);
		if text.contains('.') {
			let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
			text.truncate(trimmed);
		}
		format!("{}{}", text, self.suffix)
	}
}

/// Piecewise-linear RGB color scale over [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct ColorScale {
	stops: Vec<(f64, [u8; 3])>,
}

impl ColorScale {
	/// Builds a scale from `(position, rgb)` stops; positions are sorted.
	pub fn new(mut stops: Vec<(f64, [u8; 3])>) -> Self {
		stops.sort_by(|a, b| a.0.total_cmp(&b.0));
		Self { stops }
	}

	/// Returns an `rgb(...)` color, or `None` for a non-finite input or empty scale.
	pub fn color_at(&self, t: f64) -> Option<String> {
		if !t.is_finite() {
			return None;
		}
		let (first, last) = (self.stops.first()?, self.stops.last()?);
		let t = t.clamp(first.0, last.0);
		let upper = self.stops.iter().position(|s| s.0 >= t).unwrap_or(self.stops.len() - 1);
		let (hi_pos, hi) = self.stops[upper];
		let (lo_pos, lo) = self.stops[upper.saturating_sub(1)];
		let f = if hi_pos > lo_pos {
			(t - lo_pos) / (hi_pos - lo_pos)
		} else {
			1.0
		};
		let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
		Some(format!(
			"rgb({}, {}, {})",
			mix(lo[0], hi[0]),
			mix(lo[1], hi[1]),
			mix(lo[2], hi[2])
		))
	}
}

/// Perceived brightness in `0..=255` of a `#rgb`, `#rrggbb`, `rgb()` or
/// `rgba()` color. Alpha is ignored.
pub fn color_brightness(color: &str) -> Option<f64> {
	let color = color.trim();
	let rgb: [f64; 3] = if let Some(hex) = color.strip_prefix('#') {
		let digits: Vec<u32> = hex.chars().map(|c| c.to_digit(16)).collect::<Option<_>>()?;
		match digits.as_slice() {
			&[r, g, b] => [r * 17, g * 17, b * 17].map(f64::from),
			&[r1, r0, g1, g0, b1, b0] => {
				[r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0].map(f64::from)
			}
			_ => return None,
		}
	} else {
		let inner = color
			.strip_prefix("rgba(")
			.or_else(|| color.strip_prefix("rgb("))?
			.strip_suffix(')')?;
		let mut parts = inner.split(',').map(|p| p.trim().parse::<f64>().ok());
		[parts.next()??, parts.next()??, parts.next()??]
	};
	Some((rgb[0] * 299.0 + rgb[1] * 587.0 + rgb[2] * 114.0) / 1000.0)
}

/// Display options for a single Sankey trace.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceOptions {
	pub visible: bool,
	pub orientation: Orientation,
	pub arrangement: Arrangement,
	pub domain: Domain,
	pub node: NodeStyle,
	pub link: LinkStyle,
	pub value_format: ValueFormat,
	pub font_size: f64,
	pub concentration_scale: Option<ColorScale>,
}

impl Default for TraceOptions {
	fn default() -> Self {
		Self {
			visible: true,
			orientation: Orientation::default(),
			arrangement: Arrangement::default(),
			domain: Domain::default(),
			node: NodeStyle::default(),
			link: LinkStyle::default(),
			value_format: ValueFormat::default(),
			font_size: 10.0,
			concentration_scale: None,
		}
	}
}

/// Plot area shared by every trace on one canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSize {
	pub width: f64,
	pub height: f64,
	pub margin_left: f64,
	pub margin_top: f64,
}

impl SceneSize {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			margin_left: 0.0,
			margin_top: 0.0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn value_format_trims_trailing_zeros() {
		let fmt = ValueFormat {
			decimals: 3,
			suffix: " TWh".into(),
		};
		assert_eq!(fmt.format(10.0), "10 TWh");
		assert_eq!(fmt.format(2.5), "2.5 TWh");
		assert_eq!(fmt.format(1.23456), "1.235 TWh");
	}

	#[test]
	fn color_scale_interpolates_between_stops() {
		let scale = ColorScale::new(vec![(1.0, [255, 255, 255]), (0.0, [0, 0, 0])]);
		assert_eq!(scale.color_at(0.0).as_deref(), Some("rgb(0, 0, 0)"));
		assert_eq!(scale.color_at(0.5).as_deref(), Some("rgb(128, 128, 128)"));
		assert_eq!(scale.color_at(2.0).as_deref(), Some("rgb(255, 255, 255)"));
		assert_eq!(scale.color_at(f64::NAN), None);
	}

	#[test]
	fn color_brightness_reads_hex_and_rgb() {
		assert_eq!(color_brightness("#fff"), Some(255.0));
		assert_eq!(color_brightness("#000000"), Some(0.0));
		assert_eq!(color_brightness("rgb(255, 255, 255)"), Some(255.0));
		assert_eq!(color_brightness("rgba(0, 0, 0, 0.2)"), Some(0.0));
		assert!(color_brightness("#1f77b4").is_some_and(|b| b <= 128.0));
		assert!(color_brightness("#bcbd22").is_some_and(|b| b > 128.0));
		assert_eq!(color_brightness("teal"), None);
		assert_eq!(color_brightness("#12"), None);
	}
}
