// ============================================================================
// DIAL GEOMETRY
// ============================================================================
//
// Angle mapping and screen-space geometry of the compass dial.
//
// Compass angles are measured from 12 o'clock. The direction flag decides
// whether they grow clockwise or counter-clockwise on screen; screen space
// has y pointing down, as in the pixel frame.

use crate::config::DialStyle;
use crate::reading::{Direction, COUNTS_PER_TURN};
use std::f64::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn rounded(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Where the dial sits on the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialLayout {
    pub center: Point,
    pub radius: f64,
}

impl DialLayout {
    pub fn for_surface(width: usize, height: usize) -> Self {
        Self {
            center: Point::new(width as f64 * 0.5, height as f64 * 0.5),
            radius: height as f64 * 0.4,
        }
    }

    pub fn point_at(&self, radius: f64, screen_angle: f64) -> Point {
        Point::new(
            self.center.x + radius * screen_angle.cos(),
            self.center.y + radius * screen_angle.sin(),
        )
    }
}

/// Screen angle in radians for a compass angle in degrees.
pub fn screen_angle(degrees: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Clockwise => (degrees - 90.0).to_radians(),
        Direction::CounterClockwise => (-degrees - 90.0).to_radians(),
    }
}

/// Compass angle in degrees of a raw position count.
pub fn position_to_degrees(raw: u16) -> f64 {
    f64::from(raw % COUNTS_PER_TURN) * 360.0 / f64::from(COUNTS_PER_TURN)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickGeometry {
    pub outer: Point,
    pub inner: Point,
    pub label_anchor: Point,
    pub width: f32,
    pub major: bool,
}

impl TickGeometry {
    pub fn compute(layout: &DialLayout, style: &DialStyle, angle: u16, direction: Direction) -> Self {
        let major = DialStyle::is_major(angle);
        let (length, width) = if major {
            (style.major_tick_length, style.major_tick_width)
        } else {
            (style.minor_tick_length, style.minor_tick_width)
        };
        let theta = screen_angle(f64::from(angle), direction);
        Self {
            outer: layout.point_at(layout.radius, theta),
            inner: layout.point_at(layout.radius - length, theta),
            label_anchor: layout.point_at(layout.radius + style.label_offset, theta),
            width,
            major,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeedleGeometry {
    Line { from: Point, to: Point },
    /// Apex first, then the two base corners.
    Triangle([Point; 3]),
}

impl NeedleGeometry {
    pub fn line(layout: &DialLayout, style: &DialStyle, position: u16, direction: Direction) -> Self {
        let theta = screen_angle(position_to_degrees(position), direction);
        NeedleGeometry::Line {
            from: layout.center,
            to: layout.point_at(layout.radius - style.needle_margin, theta),
        }
    }

    pub fn triangle(
        layout: &DialLayout,
        style: &DialStyle,
        position: u16,
        direction: Direction,
    ) -> Self {
        let theta = screen_angle(position_to_degrees(position), direction);
        let apex = layout.point_at(layout.radius - style.needle_margin, theta);
        let across = theta + FRAC_PI_2;
        NeedleGeometry::Triangle([
            apex,
            layout.point_at(style.needle_half_width, across),
            layout.point_at(-style.needle_half_width, across),
        ])
    }

    pub fn tip(&self) -> Point {
        match self {
            NeedleGeometry::Line { to, .. } => *to,
            NeedleGeometry::Triangle(points) => points[0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn layout() -> DialLayout {
        DialLayout::for_surface(1000, 1000)
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    #[test]
    fn position_maps_onto_a_full_turn() {
        assert!(position_to_degrees(0).abs() < EPS);
        assert!((position_to_degrees(1024) - 90.0).abs() < EPS);
        assert!((position_to_degrees(4095) - 359.912_109_375).abs() < EPS);
        assert!(position_to_degrees(4096).abs() < EPS);
        assert!((position_to_degrees(4096 + 2048) - 180.0).abs() < EPS);
    }

    #[test]
    fn zero_degrees_points_up_in_both_directions() {
        let l = layout();
        for direction in [Direction::Clockwise, Direction::CounterClockwise] {
            let p = l.point_at(100.0, screen_angle(0.0, direction));
            assert!(close(p, Point::new(500.0, 400.0)));
        }
    }

    #[test]
    fn direction_mirrors_the_dial() {
        let l = layout();
        let cw = l.point_at(100.0, screen_angle(90.0, Direction::Clockwise));
        let ccw = l.point_at(100.0, screen_angle(90.0, Direction::CounterClockwise));
        assert!(close(cw, Point::new(600.0, 500.0)));
        assert!(close(ccw, Point::new(400.0, 500.0)));
    }

    #[test]
    fn tick_geometry_is_idempotent() {
        let l = layout();
        let style = DialStyle::default();
        for direction in [Direction::Clockwise, Direction::CounterClockwise] {
            for angle in style.tick_angles() {
                let first = TickGeometry::compute(&l, &style, angle, direction);
                let second = TickGeometry::compute(&l, &style, angle, direction);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn major_ticks_are_longer_and_wider() {
        let l = layout();
        let style = DialStyle::default();
        let major = TickGeometry::compute(&l, &style, 45, Direction::Clockwise);
        let minor = TickGeometry::compute(&l, &style, 50, Direction::Clockwise);
        assert!(major.major && !minor.major);
        assert!(major.width > minor.width);
        let len = |t: &TickGeometry| ((t.outer.x - t.inner.x).powi(2) + (t.outer.y - t.inner.y).powi(2)).sqrt();
        assert!((len(&major) - style.major_tick_length).abs() < 1e-6);
        assert!((len(&minor) - style.minor_tick_length).abs() < 1e-6);
    }

    #[test]
    fn triangle_base_is_perpendicular_to_the_needle() {
        let l = layout();
        let style = DialStyle::default();
        let NeedleGeometry::Triangle([apex, left, right]) =
            NeedleGeometry::triangle(&l, &style, 1024, Direction::Clockwise)
        else {
            panic!("expected a triangle");
        };
        // 90 degrees clockwise points right.
        assert!(close(apex, Point::new(500.0 + 400.0 - style.needle_margin, 500.0)));
        assert!(close(left, Point::new(500.0, 510.0)));
        assert!(close(right, Point::new(500.0, 490.0)));
    }

    #[test]
    fn line_needle_starts_at_the_hub() {
        let l = layout();
        let style = DialStyle::default();
        let needle = NeedleGeometry::line(&l, &style, 0, Direction::CounterClockwise);
        assert_eq!(
            needle,
            NeedleGeometry::Line {
                from: l.center,
                to: l.point_at(l.radius - style.needle_margin, screen_angle(0.0, Direction::CounterClockwise)),
            }
        );
        assert!(close(needle.tip(), Point::new(500.0, 500.0 - 380.0)));
    }
}
