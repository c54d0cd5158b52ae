// ============================================================================
// WINDOW AND EVENT LOOP
// ============================================================================

use crate::config::{DashboardConfig, FALLBACK_FONTS};
use crate::dial::{DashboardCommand, Dial};
use crate::draw::{Canvas, Scene};
use crate::error::Result;
use crate::link::{EncoderLink, ModbusLink};
use crate::poller::{Poller, PollerCommand, PollerHandle};
use log::{debug, error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use rusttype::Font;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::WindowBuilder;

/// The encoder dashboard: one window, one poller thread
pub struct Dashboard {
    config: DashboardConfig,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self { config }
    }

    /// Runs against the configured Modbus device until the window is closed.
    pub fn run(self) -> Result<()> {
        let link = ModbusLink::new(
            &self.config.device,
            self.config.timing.connect_timeout,
            self.config.timing.request_timeout,
        );
        self.run_with_link(link)
    }

    pub fn run_with_link<L>(self, link: L) -> Result<()>
    where
        L: EncoderLink + Send + 'static,
    {
        let config = self.config;
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&config.window.title)
            .with_inner_size(LogicalSize::new(
                config.window.width as f64,
                config.window.height as f64,
            ))
            .build(&event_loop)?;
        let window = Arc::new(window);

        let size = window.inner_size();
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;
        let mut fb_width = size.width as usize;
        let mut fb_height = size.height as usize;

        let font = load_font(&config.font_path);
        let mut dial = Dial::new(
            fb_width,
            fb_height,
            config.style.clone(),
            config.timing.toggle_debounce,
        );

        let (updates, receiver) = mpsc::channel();
        let poller = Poller::new(link, config.device.registers, config.timing, updates);
        let mut poller = Some(poller.spawn()?);
        let grace = config.timing.shutdown_grace;

        let frame_duration = Duration::from_secs_f64(1.0 / config.window.max_framerate.max(1.0));
        let mut last_frame = Instant::now();
        let mut cursor: Option<(f64, f64)> = None;
        let window_clone = window.clone();

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        info!("closing dashboard");
                        stop_poller(&mut poller, grace);
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if new_size.width == 0 || new_size.height == 0 {
                            return;
                        }
                        fb_width = new_size.width as usize;
                        fb_height = new_size.height as usize;
                        if let Err(err) = pixels.resize_buffer(new_size.width, new_size.height) {
                            warn!("failed to resize frame buffer: {err}");
                        }
                        if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                            warn!("failed to resize surface: {err}");
                        }
                        dial.resize(fb_width, fb_height);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = Some((position.x, position.y));
                    }
                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button: MouseButton::Left,
                        ..
                    } => {
                        if let Some((x, y)) = cursor {
                            if dial.toggle().bounds.contains(x, y) {
                                press_toggle(&mut dial, poller.as_ref());
                            }
                        }
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        let is_toggle_key = matches!(
                            event.logical_key.as_ref(),
                            Key::Character(c) if c.eq_ignore_ascii_case("d")
                        );
                        if event.state == ElementState::Pressed && !event.repeat && is_toggle_key {
                            press_toggle(&mut dial, poller.as_ref());
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        apply_updates(&mut dial, &receiver);
                        dial.toggle_mut().refresh(Instant::now());

                        let frame = pixels.frame_mut();
                        let mut canvas = Canvas::new(frame, fb_width, fb_height);
                        Scene::for_dial(&dial, &config.palette).render(&mut canvas, font.as_ref());
                        if let Err(err) = pixels.render() {
                            error!("failed to present frame: {err}");
                            stop_poller(&mut poller, grace);
                            window_target.exit();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if last_frame.elapsed() >= frame_duration {
                        window_clone.request_redraw();
                        last_frame = Instant::now();
                    }
                }
                Event::LoopExiting => stop_poller(&mut poller, grace),
                _ => {}
            }
        })?;

        Ok(())
    }
}

/// Applies everything the poller posted since the last frame, in order.
pub fn apply_updates(dial: &mut Dial, receiver: &Receiver<DashboardCommand>) -> usize {
    let mut applied = 0;
    while let Ok(command) = receiver.try_recv() {
        dial.apply(command);
        applied += 1;
    }
    applied
}

fn press_toggle(dial: &mut Dial, poller: Option<&PollerHandle>) {
    if !dial.toggle_mut().press(Instant::now()) {
        debug!("direction toggle ignored while the control is disabled");
        return;
    }
    if let Some(poller) = poller {
        poller.request(PollerCommand::ToggleDirection);
    }
}

fn stop_poller(poller: &mut Option<PollerHandle>, grace: Duration) {
    if let Some(handle) = poller.take() {
        handle.shutdown(grace);
    }
}

/// Loads the dial font, trying `preferred` first and then well-known system fonts.
pub fn load_font(preferred: &Path) -> Option<Font<'static>> {
    let candidates = std::iter::once(preferred.to_path_buf())
        .chain(FALLBACK_FONTS.iter().map(PathBuf::from));
    for path in candidates {
        if let Some(font) = load_font_from(&path) {
            info!("using font {}", path.display());
            return Some(font);
        }
    }
    warn!("no usable font found, the dial is drawn without text");
    None
}

pub fn load_font_from(path: &Path) -> Option<Font<'static>> {
    match fs::read(path) {
        Ok(bytes) => {
            let font = Font::try_from_vec(bytes);
            if font.is_none() {
                warn!("{} is not a usable font", path.display());
            }
            font
        }
        Err(err) => {
            debug!("no font at {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialStyle;
    use crate::reading::{ConnectionStatus, Direction, Reading};
    use std::io::Write;

    #[test]
    fn missing_font_is_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_font_from(&dir.path().join("absent.ttf")).is_none());
    }

    #[test]
    fn garbage_font_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"definitely not a font").expect("write");
        assert!(load_font_from(file.path()).is_none());
    }

    #[test]
    fn updates_are_applied_in_posting_order() {
        let mut dial = Dial::new(640, 480, DialStyle::default(), Duration::from_millis(500));
        let (tx, rx) = mpsc::channel();
        let reading = Reading {
            position: 100,
            turns: 2,
            velocity: 10,
            direction: Direction::CounterClockwise,
        };
        for command in [
            DashboardCommand::SetStatus(ConnectionStatus::Connected),
            DashboardCommand::RegenerateTicks(Direction::CounterClockwise),
            DashboardCommand::SetNeedle {
                position: 100,
                direction: Direction::CounterClockwise,
            },
            DashboardCommand::SetReadouts(reading),
            DashboardCommand::SetStatus(ConnectionStatus::Disconnected),
        ] {
            tx.send(command).expect("send");
        }
        assert_eq!(apply_updates(&mut dial, &rx), 5);
        assert_eq!(dial.status(), ConnectionStatus::Disconnected);
        assert_eq!(dial.direction(), Direction::CounterClockwise);
        assert_eq!(dial.readouts().turns, "Turns: 2");
        assert!(dial.needle().is_some());
        assert_eq!(apply_updates(&mut dial, &rx), 0);
    }
}
