// ============================================================================
// DASHBOARD CONFIGURATION
// ============================================================================

use bon::Builder;
use std::path::PathBuf;
use std::time::Duration;

/// Color representation for dial elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Holding-register addresses exposed by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    pub direction: u16,
    pub position: u16,
    pub turns: u16,
    pub velocity: u16,
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self {
            direction: 18,
            position: 1,
            turns: 7,
            velocity: 3,
        }
    }
}

/// Where the encoder lives on the network
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    pub registers: RegisterMap,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "192.168.30.218".to_string(),
            port: 502,
            unit_id: 1,
            registers: RegisterMap::default(),
        }
    }
}

/// Delays used by the polling loop and the UI around it
#[derive(Debug, Clone, Copy)]
pub struct PollTiming {
    /// Pause between two successful cycles.
    pub interval: Duration,
    /// Pause after the device answered a read with an error.
    pub read_error_backoff: Duration,
    /// Pause after the transport failed or could not be opened.
    pub connection_backoff: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// How long the UI waits for the poller thread on exit.
    pub shutdown_grace: Duration,
    /// How long the toggle control stays disabled after a press.
    pub toggle_debounce: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            read_error_backoff: Duration::from_secs(1),
            connection_backoff: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(1),
            toggle_debounce: Duration::from_millis(500),
        }
    }
}

/// Shape used to draw the position needle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeedleShape {
    /// Shaft from the hub with an arrowhead at the tip.
    Line,
    /// Filled triangle whose base straddles the hub.
    Triangle,
}

/// Configuration for the compass dial appearance
#[derive(Debug, Clone)]
pub struct DialStyle {
    /// Angular distance between two ticks, in degrees.
    pub tick_step: u16,
    pub ring_width: f32,
    pub major_tick_length: f64,
    pub major_tick_width: f32,
    pub minor_tick_length: f64,
    pub minor_tick_width: f32,
    /// Distance of tick labels outside the ring.
    pub label_offset: f64,
    pub label_font_size: f32,
    pub needle: NeedleShape,
    pub needle_width: f32,
    /// Gap between the needle tip and the ring.
    pub needle_margin: f64,
    pub needle_half_width: f64,
    pub hub_radius: i32,
    pub readout_font_size: f32,
}

impl Default for DialStyle {
    fn default() -> Self {
        Self {
            tick_step: 10,
            ring_width: 20.0,
            major_tick_length: 40.0,
            major_tick_width: 10.0,
            minor_tick_length: 20.0,
            minor_tick_width: 4.0,
            label_offset: 55.0,
            label_font_size: 32.0,
            needle: NeedleShape::Line,
            needle_width: 10.0,
            needle_margin: 20.0,
            needle_half_width: 10.0,
            hub_radius: 8,
            readout_font_size: 22.0,
        }
    }
}

impl DialStyle {
    /// Tick identities, fixed for the lifetime of a dial: every step
    /// multiple plus every major angle.
    pub fn tick_angles(&self) -> impl Iterator<Item = u16> {
        let step = self.tick_step.clamp(1, 360);
        (0..360).filter(move |angle| angle % step == 0 || Self::is_major(*angle))
    }

    pub fn is_major(angle: u16) -> bool {
        angle % 45 == 0
    }
}

/// Colors of everything drawn on the dashboard
#[derive(Debug, Clone)]
pub struct Palette {
    pub background: Color,
    pub ring: Color,
    pub ticks: Color,
    pub text: Color,
    pub needle: Color,
    pub connected: Color,
    pub disconnected: Color,
    pub button: Color,
    pub button_disabled: Color,
    pub button_text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::new(0xff, 0xff, 0xff),
            ring: Color::new(0x00, 0x00, 0x00),
            ticks: Color::new(0x00, 0x00, 0x00),
            text: Color::new(0x00, 0x00, 0x00),
            needle: Color::new(0xff, 0x00, 0x00),
            connected: Color::new(0x00, 0xa0, 0x00),
            disconnected: Color::new(0xd0, 0x00, 0x00),
            button: Color::new(0x30, 0x60, 0xc0),
            button_disabled: Color::new(0xb0, 0xb0, 0xb0),
            button_text: Color::new(0xff, 0xff, 0xff),
        }
    }
}

/// Configuration for application window
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: usize,
    pub height: usize,
    pub max_framerate: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Rotary Ethernet/IP Encoder Visualizer".to_string(),
            width: 960,
            height: 720,
            max_framerate: 60.0,
        }
    }
}

/// Font locations tried when the bundled asset is missing.
pub const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Top-level configuration, every field has a hard-coded default
#[derive(Debug, Clone, Builder)]
pub struct DashboardConfig {
    #[builder(default)]
    pub device: DeviceConfig,
    #[builder(default)]
    pub timing: PollTiming,
    #[builder(default)]
    pub style: DialStyle,
    #[builder(default)]
    pub palette: Palette,
    #[builder(default)]
    pub window: WindowConfig,
    #[builder(default = PathBuf::from("assets/dial.ttf"))]
    pub font_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_dial_has_every_ten_degrees_plus_the_45_degree_majors() {
        let style = DialStyle::default();
        let angles: Vec<u16> = style.tick_angles().collect();
        assert_eq!(angles.len(), 40);
        for major in [45, 135, 225, 315] {
            assert!(angles.contains(&major), "missing major {major}");
        }
        assert_eq!(angles.first(), Some(&0));
        assert_eq!(angles.last(), Some(&350));
        assert_eq!(angles.iter().filter(|a| DialStyle::is_major(**a)).count(), 8);
    }

    #[test]
    fn sparse_dial_uses_45_degree_steps() {
        let style = DialStyle {
            tick_step: 45,
            ..DialStyle::default()
        };
        let angles: Vec<u16> = style.tick_angles().collect();
        assert_eq!(angles, vec![0, 45, 90, 135, 180, 225, 270, 315]);
    }

    #[test]
    fn zero_step_does_not_hang() {
        let style = DialStyle {
            tick_step: 0,
            ..DialStyle::default()
        };
        assert_eq!(style.tick_angles().count(), 360);
    }

    #[test]
    fn builder_keeps_defaults_for_unset_sections() {
        let config = DashboardConfig::builder()
            .device(DeviceConfig {
                host: "127.0.0.1".to_string(),
                ..DeviceConfig::default()
            })
            .build();
        assert_eq!(config.device.host, "127.0.0.1");
        assert_eq!(config.device.unit_id, 1);
        assert_eq!(config.device.registers.direction, 18);
        assert_eq!(config.timing.connection_backoff, Duration::from_secs(2));
        assert_eq!(config.font_path, PathBuf::from("assets/dial.ttf"));
    }
}
