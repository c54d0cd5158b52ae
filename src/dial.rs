// ============================================================================
// RETAINED DIAL STATE
// ============================================================================
//
// Every drawable is created once and then mutated in place: ticks are keyed
// by their compass angle, the needle appears on the first position update.
// The frame is re-rasterised from this state, nothing here is rebuilt.

use crate::config::{DialStyle, NeedleShape};
use crate::geometry::{DialLayout, NeedleGeometry, Point, TickGeometry};
use crate::reading::{ConnectionStatus, Direction, Reading};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Updates posted by the poller, applied on the UI thread in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    SetStatus(ConnectionStatus),
    /// Recompute every tick for a new counting direction.
    RegenerateTicks(Direction),
    SetNeedle { position: u16, direction: Direction },
    SetReadouts(Reading),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub anchor: Point,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickMark {
    pub from: Point,
    pub to: Point,
    pub width: f32,
    /// Only major ticks carry one.
    pub label: Option<Label>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readouts {
    pub position: String,
    pub turns: String,
    pub velocity: String,
    pub direction: String,
}

impl Readouts {
    fn placeholder() -> Self {
        Self {
            position: "Position: --".to_string(),
            turns: "Turns: --".to_string(),
            velocity: "Velocity: --".to_string(),
            direction: "Direction: --".to_string(),
        }
    }

    pub fn lines(&self) -> [&str; 4] {
        [&self.position, &self.turns, &self.velocity, &self.direction]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= f64::from(self.x)
            && x < f64::from(self.x + self.width)
            && y >= f64::from(self.y)
            && y < f64::from(self.y + self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }
}

/// Button that asks the device to count the other way
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleControl {
    pub label: String,
    pub bounds: Rect,
    enabled_at: Option<Instant>,
    debounce: Duration,
}

impl ToggleControl {
    fn new(bounds: Rect, debounce: Duration) -> Self {
        Self {
            label: "Switch direction".to_string(),
            bounds,
            enabled_at: None,
            debounce,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled_at.is_none()
    }

    /// Accepts a press when enabled and disables the control for the debounce window.
    pub fn press(&mut self, now: Instant) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.enabled_at = Some(now + self.debounce);
        true
    }

    pub fn refresh(&mut self, now: Instant) {
        if self.enabled_at.is_some_and(|at| now >= at) {
            self.enabled_at = None;
        }
    }
}

pub struct Dial {
    layout: DialLayout,
    style: DialStyle,
    surface: (usize, usize),
    direction: Direction,
    ticks: BTreeMap<u16, TickMark>,
    needle: Option<NeedleGeometry>,
    position: Option<u16>,
    status: ConnectionStatus,
    readouts: Readouts,
    toggle: ToggleControl,
}

impl Dial {
    /// Creates the full tick set assuming clockwise counting until the device says otherwise.
    pub fn new(width: usize, height: usize, style: DialStyle, toggle_debounce: Duration) -> Self {
        let mut dial = Self {
            layout: DialLayout::for_surface(width, height),
            style,
            surface: (width, height),
            direction: Direction::Clockwise,
            ticks: BTreeMap::new(),
            needle: None,
            position: None,
            status: ConnectionStatus::Disconnected,
            readouts: Readouts::placeholder(),
            toggle: ToggleControl::new(toggle_bounds(height), toggle_debounce),
        };
        let angles: Vec<u16> = dial.style.tick_angles().collect();
        for angle in angles {
            dial.update_tick(angle, Direction::Clockwise);
        }
        dial
    }

    pub fn update_tick(&mut self, angle: u16, direction: Direction) {
        let geometry = TickGeometry::compute(&self.layout, &self.style, angle, direction);
        match self.ticks.get_mut(&angle) {
            Some(tick) => {
                tick.from = geometry.outer;
                tick.to = geometry.inner;
                tick.width = geometry.width;
                if let Some(label) = tick.label.as_mut() {
                    label.anchor = geometry.label_anchor;
                }
            }
            None => {
                let label = geometry.major.then(|| Label {
                    anchor: geometry.label_anchor,
                    text: angle.to_string(),
                });
                self.ticks.insert(
                    angle,
                    TickMark {
                        from: geometry.outer,
                        to: geometry.inner,
                        width: geometry.width,
                        label,
                    },
                );
            }
        }
    }

    pub fn regenerate_ticks(&mut self, direction: Direction) {
        self.direction = direction;
        let angles: Vec<u16> = self.ticks.keys().copied().collect();
        for angle in angles {
            self.update_tick(angle, direction);
        }
    }

    pub fn update_needle(&mut self, position: u16, direction: Direction) {
        let geometry = match self.style.needle {
            NeedleShape::Line => NeedleGeometry::line(&self.layout, &self.style, position, direction),
            NeedleShape::Triangle => {
                NeedleGeometry::triangle(&self.layout, &self.style, position, direction)
            }
        };
        self.position = Some(position);
        match self.needle.as_mut() {
            Some(needle) => *needle = geometry,
            None => self.needle = Some(geometry),
        }
    }

    pub fn update_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn update_readouts(&mut self, reading: &Reading) {
        self.readouts.position = format!("Position: {}", reading.position);
        self.readouts.turns = format!("Turns: {}", reading.turns);
        self.readouts.velocity = format!("Velocity: {} RPM", reading.velocity);
        self.readouts.direction = format!("Direction: {}", reading.direction);
        self.toggle.label = format!("Switch to {}", reading.direction.toggled());
    }

    pub fn apply(&mut self, command: DashboardCommand) {
        match command {
            DashboardCommand::SetStatus(status) => self.update_status(status),
            DashboardCommand::RegenerateTicks(direction) => self.regenerate_ticks(direction),
            DashboardCommand::SetNeedle {
                position,
                direction,
            } => self.update_needle(position, direction),
            DashboardCommand::SetReadouts(reading) => self.update_readouts(&reading),
        }
    }

    /// Moves everything to a new surface size, keeping tick identities.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.surface = (width, height);
        self.layout = DialLayout::for_surface(width, height);
        self.toggle.bounds = toggle_bounds(height);
        self.regenerate_ticks(self.direction);
        if let Some(position) = self.position {
            self.update_needle(position, self.direction);
        }
    }

    pub fn layout(&self) -> &DialLayout {
        &self.layout
    }

    pub fn style(&self) -> &DialStyle {
        &self.style
    }

    pub fn surface(&self) -> (usize, usize) {
        self.surface
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn ticks(&self) -> impl Iterator<Item = (&u16, &TickMark)> {
        self.ticks.iter()
    }

    pub fn tick(&self, angle: u16) -> Option<&TickMark> {
        self.ticks.get(&angle)
    }

    pub fn needle(&self) -> Option<&NeedleGeometry> {
        self.needle.as_ref()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn readouts(&self) -> &Readouts {
        &self.readouts
    }

    pub fn toggle(&self) -> &ToggleControl {
        &self.toggle
    }

    pub fn toggle_mut(&mut self) -> &mut ToggleControl {
        &mut self.toggle
    }
}

fn toggle_bounds(surface_height: usize) -> Rect {
    Rect {
        x: 30,
        y: surface_height as i32 - 80,
        width: 220,
        height: 50,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dial() -> Dial {
        Dial::new(800, 600, DialStyle::default(), Duration::from_millis(500))
    }

    #[test]
    fn tick_set_is_fixed_at_creation() {
        let mut dial = dial();
        let before: Vec<u16> = dial.ticks().map(|(a, _)| *a).collect();
        assert_eq!(before.len(), 40);
        dial.regenerate_ticks(Direction::CounterClockwise);
        dial.resize(1024, 768);
        let after: Vec<u16> = dial.ticks().map(|(a, _)| *a).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn only_major_ticks_are_labelled() {
        let dial = dial();
        for (angle, tick) in dial.ticks() {
            assert_eq!(tick.label.is_some(), angle % 45 == 0, "angle {angle}");
        }
        assert_eq!(dial.tick(90).and_then(|t| t.label.as_ref()).map(|l| l.text.as_str()), Some("90"));
    }

    #[test]
    fn diagonal_majors_exist_on_the_dense_dial() {
        let dial = dial();
        for angle in [45u16, 135, 225, 315] {
            let label = dial.tick(angle).and_then(|t| t.label.as_ref());
            assert_eq!(label.map(|l| l.text.clone()), Some(angle.to_string()));
        }
        assert_eq!(dial.ticks().filter(|(_, t)| t.label.is_some()).count(), 8);
        assert!(dial.tick(40).is_some_and(|t| t.label.is_none()));
    }

    #[test]
    fn update_tick_is_idempotent() {
        let mut dial = dial();
        for direction in [Direction::Clockwise, Direction::CounterClockwise] {
            dial.update_tick(30, direction);
            let first = dial.tick(30).cloned();
            dial.update_tick(30, direction);
            assert_eq!(dial.tick(30).cloned(), first);
        }
    }

    #[test]
    fn direction_change_moves_every_tick() {
        let mut dial = dial();
        let before: Vec<TickMark> = dial.ticks().map(|(_, t)| t.clone()).collect();
        dial.regenerate_ticks(Direction::CounterClockwise);
        for ((angle, tick), old) in dial.ticks().zip(before.iter()) {
            // 0 and 180 sit on the mirror axis.
            if *angle == 0 || *angle == 180 {
                assert!((tick.from.x - old.from.x).abs() < 1e-6);
            } else {
                assert!((tick.from.x - old.from.x).abs() > 1e-6, "angle {angle} did not move");
            }
        }
        assert_eq!(dial.direction(), Direction::CounterClockwise);
    }

    #[test]
    fn needle_is_created_lazily_then_updated() {
        let mut dial = dial();
        assert!(dial.needle().is_none());
        dial.update_needle(0, Direction::Clockwise);
        let first = *dial.needle().expect("needle");
        dial.update_needle(1024, Direction::Clockwise);
        let second = *dial.needle().expect("needle");
        assert_ne!(first, second);
    }

    #[test]
    fn readouts_and_toggle_label_follow_the_reading() {
        let mut dial = dial();
        assert_eq!(dial.readouts().position, "Position: --");
        dial.apply(DashboardCommand::SetReadouts(Reading {
            position: 2048,
            turns: -3,
            velocity: 120,
            direction: Direction::Clockwise,
        }));
        assert_eq!(
            dial.readouts().lines(),
            ["Position: 2048", "Turns: -3", "Velocity: 120 RPM", "Direction: CW"]
        );
        assert_eq!(dial.toggle().label, "Switch to CCW");
    }

    #[test]
    fn status_follows_commands() {
        let mut dial = dial();
        assert_eq!(dial.status(), ConnectionStatus::Disconnected);
        dial.apply(DashboardCommand::SetStatus(ConnectionStatus::Connected));
        assert_eq!(dial.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn toggle_is_debounced() {
        let mut dial = dial();
        let now = Instant::now();
        assert!(dial.toggle_mut().press(now));
        assert!(!dial.toggle().is_enabled());
        assert!(!dial.toggle_mut().press(now + Duration::from_millis(100)));
        dial.toggle_mut().refresh(now + Duration::from_millis(499));
        assert!(!dial.toggle().is_enabled());
        dial.toggle_mut().refresh(now + Duration::from_millis(500));
        assert!(dial.toggle().is_enabled());
        assert!(dial.toggle_mut().press(now + Duration::from_millis(600)));
    }

    #[test]
    fn toggle_bounds_track_the_surface() {
        let mut dial = dial();
        assert!(dial.toggle().bounds.contains(40.0, 530.0));
        dial.resize(800, 900);
        assert!(dial.toggle().bounds.contains(40.0, 830.0));
        assert!(!dial.toggle().bounds.contains(40.0, 530.0));
    }
}
