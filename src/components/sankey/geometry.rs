//! Shapes for nodes and links, and the two node coordinate representations.
//!
//! Layout code works on [`Extent`] (corner pairs). The column simulator works
//! on [`CenterForm`] (center plus fixed size). [`CenterForm::from_extent`] and
//! [`CenterForm::to_extent`] are the only crossings between the two.

use std::fmt;

use super::config::MIN_VISIBLE_LENGTH;

/// Horizontal control point placement for ribbons, as a fraction of the gap.
const CURVATURE: f64 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn swapped(self) -> Self {
		Self {
			x: self.y,
			y: self.x,
		}
	}
}

/// Axis-aligned rectangle as two corners. `x` is the primary (layering) axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Extent {
	pub x0: f64,
	pub x1: f64,
	pub y0: f64,
	pub y1: f64,
}

impl Extent {
	pub fn new(x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
		Self { x0, x1, y0, y1 }
	}

	pub fn width(&self) -> f64 {
		self.x1 - self.x0
	}

	pub fn height(&self) -> f64 {
		self.y1 - self.y0
	}

	pub fn center(&self) -> Point {
		Point::new(
			self.x0 + self.width() / 2.0,
			self.y0 + self.height() / 2.0,
		)
	}

	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
	}

	/// Grows the rectangle by `dx` on both primary sides and `dy` on both perpendicular sides.
	pub fn grown(&self, dx: f64, dy: f64) -> Self {
		Self::new(self.x0 - dx, self.x1 + dx, self.y0 - dy, self.y1 + dy)
	}

	/// Same size, recentered on `center`.
	pub fn recentered(&self, center: Point) -> Self {
		let (w, h) = (self.width(), self.height());
		let x0 = center.x - w / 2.0;
		let y0 = center.y - h / 2.0;
		Self::new(x0, x0 + w, y0, y0 + h)
	}

	/// Smallest rectangle covering both.
	pub fn union(&self, other: &Extent) -> Self {
		Self::new(
			self.x0.min(other.x0),
			self.x1.max(other.x1),
			self.y0.min(other.y0),
			self.y1.max(other.y1),
		)
	}

	/// Overlap length of two perpendicular spans, zero when disjoint.
	pub fn perpendicular_overlap(&self, other: &Extent) -> f64 {
		(self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
	}
}

/// Center-plus-size form used by the column simulator.
///
/// Keeps the corner pair it was created from so that an unmoved axis
/// converts back to exactly the same corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenterForm {
	pub x: f64,
	pub y: f64,
	pub dx: f64,
	pub dy: f64,
	origin: Extent,
	origin_center: Point,
}

impl CenterForm {
	pub fn from_extent(extent: &Extent) -> Self {
		let center = extent.center();
		Self {
			x: center.x,
			y: center.y,
			dx: extent.width(),
			dy: extent.height(),
			origin: *extent,
			origin_center: center,
		}
	}

	pub fn to_extent(&self) -> Extent {
		let (x0, x1) = if self.x == self.origin_center.x {
			(self.origin.x0, self.origin.x1)
		} else {
			let x0 = self.x - self.dx / 2.0;
			(x0, x0 + self.dx)
		};
		let (y0, y1) = if self.y == self.origin_center.y {
			(self.origin.y0, self.origin.y1)
		} else {
			let y0 = self.y - self.dy / 2.0;
			(y0, y0 + self.dy)
		};
		Extent::new(x0, x1, y0, y1)
	}
}

/// Drawable node rectangle with a guaranteed minimum length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeShape {
	pub width: f64,
	pub height: f64,
}

pub fn node_shape(extent: &Extent) -> NodeShape {
	NodeShape {
		width: extent.width(),
		height: extent.height().max(MIN_VISIBLE_LENGTH),
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
	MoveTo(Point),
	LineTo(Point),
	CubicTo {
		c1: Point,
		c2: Point,
		to: Point,
	},
	ArcTo {
		rx: f64,
		ry: f64,
		large_arc: bool,
		sweep: bool,
		to: Point,
	},
	Close,
}

/// A closed outline, printable as SVG path data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
	pub commands: Vec<PathCommand>,
}

impl Path {
	fn move_to(&mut self, x: f64, y: f64) {
		self.commands.push(PathCommand::MoveTo(Point::new(x, y)));
	}

	fn line_to(&mut self, x: f64, y: f64) {
		self.commands.push(PathCommand::LineTo(Point::new(x, y)));
	}

	fn cubic_to(&mut self, c1: Point, c2: Point, to: Point) {
		self.commands.push(PathCommand::CubicTo { c1, c2, to });
	}

	fn arc_to(&mut self, rx: f64, ry: f64, sweep: bool, x: f64, y: f64) {
		self.commands.push(PathCommand::ArcTo {
			rx,
			ry,
			large_arc: false,
			sweep,
			to: Point::new(x, y),
		});
	}

	fn close(&mut self) {
		self.commands.push(PathCommand::Close);
	}

	/// Bounding box of every end and control point.
	pub fn bounds(&self) -> Option<Extent> {
		let mut points = self.commands.iter().flat_map(|cmd| match *cmd {
			PathCommand::MoveTo(p) | PathCommand::LineTo(p) => vec![p],
			PathCommand::CubicTo { c1, c2, to } => vec![c1, c2, to],
			PathCommand::ArcTo { to, .. } => vec![to],
			PathCommand::Close => vec![],
		});
		let first = points.next()?;
		Some(points.fold(
			Extent::new(first.x, first.x, first.y, first.y),
			|e, p| Extent::new(e.x0.min(p.x), e.x1.max(p.x), e.y0.min(p.y), e.y1.max(p.y)),
		))
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for cmd in &self.commands {
			match cmd {
				PathCommand::MoveTo(p) => write!(f, "M{},{}", p.x, p.y)?,
				PathCommand::LineTo(p) => write!(f, "L{},{}", p.x, p.y)?,
				PathCommand::CubicTo { c1, c2, to } => write!(
					f,
					"C{},{} {},{} {},{}",
					c1.x, c1.y, c2.x, c2.y, to.x, to.y
				)?,
				PathCommand::ArcTo {
					rx,
					ry,
					large_arc,
					sweep,
					to,
				} => write!(
					f,
					"A{} {} 0 {} {} {},{}",
					rx,
					ry,
					*large_arc as u8,
					*sweep as u8,
					to.x,
					to.y
				)?,
				PathCommand::Close => f.write_str("Z")?,
			}
		}
		Ok(())
	}
}

/// Which side of the node band a looping link is routed around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CircularLinkType {
	Top,
	Bottom,
}

/// Arc geometry for a looping link, as produced by the layout.
///
/// "Left" fields belong to the source end, "right" fields to the target end.
/// `vertical_buffer` is the distance from the midline of the two link ends to
/// the centre of the loop's outer track.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CircularPathData {
	pub source_x: f64,
	pub source_y: f64,
	pub target_x: f64,
	pub target_y: f64,
	pub left_small_arc_radius: f64,
	pub left_large_arc_radius: f64,
	pub right_small_arc_radius: f64,
	pub right_large_arc_radius: f64,
	pub left_inner_extent: f64,
	pub left_full_extent: f64,
	pub right_inner_extent: f64,
	pub right_full_extent: f64,
	pub vertical_buffer: f64,
}

impl CircularPathData {
	pub fn midline(&self) -> f64 {
		(self.source_y + self.target_y) / 2.0
	}

	fn vertical_full_extent(&self, kind: CircularLinkType) -> f64 {
		match kind {
			CircularLinkType::Top => self.midline() - self.vertical_buffer,
			CircularLinkType::Bottom => self.midline() + self.vertical_buffer,
		}
	}
}

/// Endpoints of an acyclic ribbon: source right edge to target left edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RibbonEnds {
	pub x0: f64,
	pub x1: f64,
	pub y0: f64,
	pub y1: f64,
	pub width: f64,
}

/// Everything needed to outline or hit-test one link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinkShape {
	Ribbon(RibbonEnds),
	Loop {
		kind: CircularLinkType,
		data: CircularPathData,
		width: f64,
	},
}

impl LinkShape {
	pub fn path(&self) -> Path {
		match self {
			LinkShape::Ribbon(ends) => ribbon_path(ends),
			LinkShape::Loop { kind, data, width } => circular_path(*kind, data, *width),
		}
	}

	pub fn contains(&self, p: Point) -> bool {
		match self {
			LinkShape::Ribbon(ends) => ribbon_contains(ends, p),
			LinkShape::Loop { kind, data, width } => circular_contains(*kind, data, *width, p),
		}
	}
}

fn interpolate(a: f64, b: f64, t: f64) -> f64 {
	a + (b - a) * t
}

pub fn ribbon_path(ends: &RibbonEnds) -> Path {
	let half = ends.width / 2.0;
	let x2 = interpolate(ends.x0, ends.x1, CURVATURE);
	let x3 = interpolate(ends.x0, ends.x1, 1.0 - CURVATURE);
	let (y0a, y0b) = (ends.y0 - half, ends.y0 + half);
	let (y1a, y1b) = (ends.y1 - half, ends.y1 + half);

	let mut path = Path::default();
	path.move_to(ends.x0, y0a);
	path.cubic_to(
		Point::new(x2, y0a),
		Point::new(x3, y1a),
		Point::new(ends.x1, y1a),
	);
	path.line_to(ends.x1, y1b);
	path.cubic_to(
		Point::new(x3, y1b),
		Point::new(x2, y0b),
		Point::new(ends.x0, y0b),
	);
	path.close();
	path
}

/// Closed outline of a looping link. Top and bottom loops differ only in
/// direction and arc sweep.
pub fn circular_path(kind: CircularLinkType, c: &CircularPathData, width: f64) -> Path {
	let o = width / 2.0;
	// -1 routes the loop upwards, +1 downwards.
	let (dir, outer_sweep) = match kind {
		CircularLinkType::Top => (-1.0, true),
		CircularLinkType::Bottom => (1.0, false),
	};
	let inner_sweep = !outer_sweep;
	let v_full = c.vertical_full_extent(kind);
	let v_left = v_full - dir * c.left_large_arc_radius;
	let v_right = v_full - dir * c.right_large_arc_radius;
	let (tx, ty, sx, sy) = (c.target_x, c.target_y, c.source_x, c.source_y);
	let (l_small, l_large) = (c.left_small_arc_radius, c.left_large_arc_radius);
	let (r_small, r_large) = (c.right_small_arc_radius, c.right_large_arc_radius);

	let mut path = Path::default();
	// Outer edge, from the target back around to the source.
	path.move_to(tx, ty - dir * o);
	path.line_to(c.right_inner_extent, ty - dir * o);
	path.arc_to(
		r_large + o,
		r_small + o,
		outer_sweep,
		c.right_full_extent - o,
		ty + dir * r_small,
	);
	path.line_to(c.right_full_extent - o, v_right);
	path.arc_to(r_large + o, r_large + o, outer_sweep, c.right_inner_extent, v_full + dir * o);
	path.line_to(c.left_inner_extent, v_full + dir * o);
	path.arc_to(l_large + o, l_large + o, outer_sweep, c.left_full_extent + o, v_left);
	path.line_to(c.left_full_extent + o, sy + dir * l_small);
	path.arc_to(l_large + o, l_small + o, outer_sweep, c.left_inner_extent, sy - dir * o);
	path.line_to(sx, sy - dir * o);

	// Inner edge, walking back.
	path.line_to(sx, sy + dir * o);
	path.line_to(c.left_inner_extent, sy + dir * o);
	path.arc_to(
		l_large - o,
		l_small - o,
		inner_sweep,
		c.left_full_extent - o,
		sy + dir * l_small,
	);
	path.line_to(c.left_full_extent - o, v_left);
	path.arc_to(l_large - o, l_large - o, inner_sweep, c.left_inner_extent, v_full - dir * o);
	path.line_to(c.right_inner_extent, v_full - dir * o);
	path.arc_to(r_large - o, r_large - o, inner_sweep, c.right_full_extent + o, v_right);
	path.line_to(c.right_full_extent + o, ty + dir * r_small);
	path.arc_to(r_large - o, r_small - o, inner_sweep, c.right_inner_extent, ty + dir * o);
	path.line_to(tx, ty + dir * o);
	path.close();
	path
}

fn cubic(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
	let u = 1.0 - t;
	u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

fn ribbon_contains(ends: &RibbonEnds, p: Point) -> bool {
	let (lo, hi) = (ends.x0.min(ends.x1), ends.x0.max(ends.x1));
	if hi - lo <= f64::EPSILON || p.x < lo || p.x > hi {
		return false;
	}
	let x2 = interpolate(ends.x0, ends.x1, CURVATURE);
	let x3 = interpolate(ends.x0, ends.x1, 1.0 - CURVATURE);
	let increasing = ends.x1 > ends.x0;

	// x(t) is monotone, so bisection finds the parameter under the pointer.
	let (mut t0, mut t1) = (0.0, 1.0);
	for _ in 0..40 {
		let mid = (t0 + t1) / 2.0;
		let x = cubic(ends.x0, x2, x3, ends.x1, mid);
		if (x < p.x) == increasing {
			t0 = mid;
		} else {
			t1 = mid;
		}
	}
	let t = (t0 + t1) / 2.0;
	let center = cubic(ends.y0, ends.y0, ends.y1, ends.y1, t);
	(p.y - center).abs() <= ends.width / 2.0
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len2 = dx * dx + dy * dy;
	let t = if len2 > 0.0 {
		(((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
	} else {
		0.0
	};
	let (cx, cy) = (a.x + dx * t - p.x, a.y + dy * t - p.y);
	(cx * cx + cy * cy).sqrt()
}

fn circular_contains(kind: CircularLinkType, c: &CircularPathData, width: f64, p: Point) -> bool {
	let v_full = c.vertical_full_extent(kind);
	let skeleton = [
		Point::new(c.source_x, c.source_y),
		Point::new(c.left_full_extent, c.source_y),
		Point::new(c.left_full_extent, v_full),
		Point::new(c.right_full_extent, v_full),
		Point::new(c.right_full_extent, c.target_y),
		Point::new(c.target_x, c.target_y),
	];
	skeleton
		.windows(2)
		.any(|seg| distance_to_segment(p, seg[0], seg[1]) <= width / 2.0)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn loop_data() -> CircularPathData {
		CircularPathData {
			source_x: 300.0,
			source_y: 120.0,
			target_x: 100.0,
			target_y: 80.0,
			left_small_arc_radius: 14.0,
			left_large_arc_radius: 14.0,
			right_small_arc_radius: 14.0,
			right_large_arc_radius: 14.0,
			left_inner_extent: 310.0,
			left_full_extent: 324.0,
			right_inner_extent: 90.0,
			right_full_extent: 76.0,
			vertical_buffer: 150.0,
		}
	}

	#[test]
	fn ribbon_path_matches_svg_outline() {
		let ends = RibbonEnds {
			x0: 10.0,
			x1: 110.0,
			y0: 50.0,
			y1: 70.0,
			width: 10.0,
		};
		assert_eq!(
			ribbon_path(&ends).to_string(),
			"M10,45C60,45 60,65 110,65L110,75C60,75 60,55 10,55Z"
		);
	}

	#[test]
	fn ribbon_hit_test_follows_the_curve() {
		let ends = RibbonEnds {
			x0: 0.0,
			x1: 100.0,
			y0: 0.0,
			y1: 100.0,
			width: 10.0,
		};
		let shape = LinkShape::Ribbon(ends);
		assert!(shape.contains(Point::new(50.0, 50.0)));
		assert!(shape.contains(Point::new(1.0, 2.0)));
		assert!(!shape.contains(Point::new(50.0, 80.0)));
		assert!(!shape.contains(Point::new(150.0, 100.0)));
	}

	#[test]
	fn node_shape_has_minimum_length() {
		let shape = node_shape(&Extent::new(0.0, 20.0, 5.0, 5.1));
		assert_eq!(shape.width, 20.0);
		assert_eq!(shape.height, MIN_VISIBLE_LENGTH);
		assert_eq!(node_shape(&Extent::new(0.0, 20.0, 5.0, 45.0)).height, 40.0);
	}

	#[test]
	fn top_loop_rises_above_both_ends() {
		let data = loop_data();
		let path = circular_path(CircularLinkType::Top, &data, 10.0);
		let bounds = path.bounds().unwrap();
		assert_eq!(bounds.y0, data.midline() - data.vertical_buffer - 5.0);
		assert_eq!(bounds.y1, data.source_y + 5.0);
		assert!(matches!(path.commands.last(), Some(PathCommand::Close)));
		assert!(path.to_string().starts_with("M100,85L90,85A"));
	}

	#[test]
	fn loop_sweeps_flip_between_variants() {
		let sweeps = |kind| {
			circular_path(kind, &loop_data(), 4.0)
				.commands
				.iter()
				.filter_map(|c| match c {
					PathCommand::ArcTo { sweep, .. } => Some(*sweep),
					_ => None,
				})
				.collect::<Vec<_>>()
		};
		let top = sweeps(CircularLinkType::Top);
		let bottom = sweeps(CircularLinkType::Bottom);
		assert_eq!(top.len(), 8);
		assert!(top.iter().zip(&bottom).all(|(a, b)| a != b));
	}

	#[test]
	fn loop_hit_test_uses_the_outer_track() {
		let shape = LinkShape::Loop {
			kind: CircularLinkType::Top,
			data: loop_data(),
			width: 10.0,
		};
		assert!(shape.contains(Point::new(200.0, 100.0 - 150.0 + 3.0)));
		assert!(!shape.contains(Point::new(200.0, 100.0)));
	}

	#[test]
	fn unmoved_center_form_restores_corners() {
		let extent = Extent::new(0.1, 0.7, 1.0 / 3.0, 2.0 / 3.0);
		let center = CenterForm::from_extent(&extent);
		assert_eq!(center.to_extent(), extent);
	}

	#[test]
	fn moved_center_form_keeps_size() {
		let mut center = CenterForm::from_extent(&Extent::new(0.0, 20.0, 10.0, 50.0));
		center.y = 100.0;
		assert_eq!(center.to_extent(), Extent::new(0.0, 20.0, 80.0, 120.0));
	}
}
