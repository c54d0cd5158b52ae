// ============================================================================
// SOFTWARE RASTERISER
// ============================================================================
//
// The dial is described as a list of draw commands built from the retained
// `Dial` state, then rasterised into the RGBA frame owned by `pixels`.

use crate::config::{Color, Palette};
use crate::dial::{Dial, Rect};
use crate::geometry::{NeedleGeometry, Point};
use rusttype::{point, Font, PositionedGlyph, Scale};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
    Center,
    /// Vertically centred, starting at the anchor.
    Left,
}

#[derive(Clone, Debug)]
pub enum DrawCommand {
    Clear(Color),
    Ring {
        cx: i32,
        cy: i32,
        r: i32,
        thickness: i32,
        color: Color,
    },
    Line {
        from: Point,
        to: Point,
        thickness: f32,
        color: Color,
    },
    Triangle {
        points: [Point; 3],
        color: Color,
    },
    Rect {
        rect: Rect,
        color: Color,
    },
    Circle {
        cx: i32,
        cy: i32,
        radius: i32,
        color: Color,
    },
    Text {
        anchor: Point,
        align: TextAnchor,
        text: String,
        font_size: f32,
        color: Color,
    },
}

#[derive(Default)]
pub struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Builds the full frame for the current dial state.
    pub fn for_dial(dial: &Dial, palette: &Palette) -> Self {
        let mut scene = Scene::new();
        let style = dial.style();
        let layout = dial.layout();
        let (cx, cy) = layout.center.rounded();
        let ring_width = style.ring_width.round() as i32;

        scene.add_command(DrawCommand::Clear(palette.background));
        scene.add_command(DrawCommand::Ring {
            cx,
            cy,
            r: layout.radius.round() as i32 + ring_width / 2,
            thickness: ring_width,
            color: palette.ring,
        });

        for (_, tick) in dial.ticks() {
            scene.add_command(DrawCommand::Line {
                from: tick.from,
                to: tick.to,
                thickness: tick.width,
                color: palette.ticks,
            });
            if let Some(label) = &tick.label {
                scene.add_command(DrawCommand::Text {
                    anchor: label.anchor,
                    align: TextAnchor::Center,
                    text: label.text.clone(),
                    font_size: style.label_font_size,
                    color: palette.text,
                });
            }
        }

        if let Some(needle) = dial.needle() {
            add_needle(&mut scene, needle, style.needle_width, palette.needle);
            scene.add_command(DrawCommand::Circle {
                cx,
                cy,
                radius: style.hub_radius,
                color: palette.needle,
            });
        }

        let line_height = f64::from(style.readout_font_size) * 1.4;
        for (i, line) in dial.readouts().lines().iter().enumerate() {
            scene.add_command(DrawCommand::Text {
                anchor: Point::new(30.0, 30.0 + line_height * i as f64),
                align: TextAnchor::Left,
                text: line.to_string(),
                font_size: style.readout_font_size,
                color: palette.text,
            });
        }

        let status = dial.status();
        let status_color = if status.is_connected() {
            palette.connected
        } else {
            palette.disconnected
        };
        let (width, _) = dial.surface();
        let status_x = width as i32 - 200;
        scene.add_command(DrawCommand::Circle {
            cx: status_x,
            cy: 30,
            radius: 9,
            color: status_color,
        });
        scene.add_command(DrawCommand::Text {
            anchor: Point::new(f64::from(status_x + 20), 30.0),
            align: TextAnchor::Left,
            text: status.label().to_string(),
            font_size: style.readout_font_size,
            color: status_color,
        });

        let toggle = dial.toggle();
        scene.add_command(DrawCommand::Rect {
            rect: toggle.bounds,
            color: if toggle.is_enabled() {
                palette.button
            } else {
                palette.button_disabled
            },
        });
        scene.add_command(DrawCommand::Text {
            anchor: toggle.bounds.center(),
            align: TextAnchor::Center,
            text: toggle.label.clone(),
            font_size: style.readout_font_size,
            color: palette.button_text,
        });

        scene
    }

    /// Text commands are skipped when no font could be loaded.
    pub fn render(&self, canvas: &mut Canvas, font: Option<&Font<'static>>) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => canvas.clear(*color),
                DrawCommand::Ring {
                    cx,
                    cy,
                    r,
                    thickness,
                    color,
                } => draw_ring(canvas, *cx, *cy, *r, *thickness, *color),
                DrawCommand::Line {
                    from,
                    to,
                    thickness,
                    color,
                } => {
                    let (x0, y0) = from.rounded();
                    let (x1, y1) = to.rounded();
                    draw_thick_line_aa(canvas, x0, y0, x1, y1, *thickness, *color);
                }
                DrawCommand::Triangle { points, color } => fill_triangle(canvas, points, *color),
                DrawCommand::Rect { rect, color } => fill_rect(canvas, rect, *color),
                DrawCommand::Circle {
                    cx,
                    cy,
                    radius,
                    color,
                } => draw_circle(canvas, *cx, *cy, *radius, *color),
                DrawCommand::Text {
                    anchor,
                    align,
                    text,
                    font_size,
                    color,
                } => {
                    if let Some(font) = font {
                        draw_text(canvas, *anchor, *align, text, font, Scale::uniform(*font_size), *color);
                    }
                }
            }
        }
    }
}

fn add_needle(scene: &mut Scene, needle: &NeedleGeometry, width: f32, color: Color) {
    match needle {
        NeedleGeometry::Triangle(points) => {
            scene.add_command(DrawCommand::Triangle {
                points: *points,
                color,
            });
        }
        NeedleGeometry::Line { from, to } => {
            let dx = to.x - from.x;
            let dy = to.y - from.y;
            let len = (dx * dx + dy * dy).sqrt();
            if len < f64::EPSILON {
                return;
            }
            let (ux, uy) = (dx / len, dy / len);
            let head = f64::from(width) * 2.5;
            let base = Point::new(to.x - ux * head, to.y - uy * head);
            scene.add_command(DrawCommand::Line {
                from: *from,
                to: base,
                thickness: width,
                color,
            });
            scene.add_command(DrawCommand::Triangle {
                points: [
                    *to,
                    Point::new(base.x - uy * head * 0.6, base.y + ux * head * 0.6),
                    Point::new(base.x + uy * head * 0.6, base.y - ux * head * 0.6),
                ],
                color,
            });
        }
    }
}

// ============================================================================
// CANVAS
// ============================================================================

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        self.frame
            .get(idx..idx + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    fn blend(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        let Some(dst) = self.frame.get_mut(idx..idx + 4) else {
            return;
        };
        let a = alpha.clamp(0.0, 1.0);
        let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        dst[0] = mix(color.r, dst[0]);
        dst[1] = mix(color.g, dst[1]);
        dst[2] = mix(color.b, dst[2]);
        dst[3] = 0xff;
    }
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

fn draw_thick_line_aa(canvas: &mut Canvas, x0: i32, y0: i32, x1: i32, y1: i32, thickness: f32, color: Color) {
    let min_x = x0.min(x1) - thickness.ceil() as i32 - 1;
    let max_x = x0.max(x1) + thickness.ceil() as i32 + 1;
    let min_y = y0.min(y1) - thickness.ceil() as i32 - 1;
    let max_y = y0.max(y1) + thickness.ceil() as i32 + 1;
    let dx = (x1 - x0) as f32;
    let dy = (y1 - y0) as f32;
    let len_sq = (dx * dx + dy * dy).max(f32::EPSILON);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 - x0 as f32;
            let py = y as f32 - y0 as f32;
            let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);
            let lx = x0 as f32 + t * dx;
            let ly = y0 as f32 + t * dy;
            let dist = ((lx - x as f32).powi(2) + (ly - y as f32).powi(2)).sqrt();
            let aa = (1.0 - (dist - thickness / 2.0).clamp(0.0, 1.0)).clamp(0.0, 1.0);
            if aa > 0.01 {
                canvas.blend(x, y, color, aa);
            }
        }
    }
}

/// Band between `r - thickness` and `r`, antialiased on both edges.
fn draw_ring(canvas: &mut Canvas, cx: i32, cy: i32, r: i32, thickness: i32, color: Color) {
    let inner = f64::from(r - thickness);
    let outer = f64::from(r);
    for y in (cy - r - 1)..=(cy + r + 1) {
        for x in (cx - r - 1)..=(cx + r + 1) {
            let dx = f64::from(x - cx);
            let dy = f64::from(y - cy);
            let dist = (dx * dx + dy * dy).sqrt();
            let aa = if dist > outer {
                1.0 - (dist - outer).min(1.0)
            } else if dist < inner {
                1.0 - (inner - dist).min(1.0)
            } else {
                1.0
            };
            if aa > 0.0 {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
}

fn draw_circle(canvas: &mut Canvas, cx: i32, cy: i32, radius: i32, color: Color) {
    for y in -radius - 1..=radius + 1 {
        for x in -radius - 1..=radius + 1 {
            let dist = f64::from(x * x + y * y).sqrt();
            let aa = if dist > f64::from(radius) {
                1.0 - (dist - f64::from(radius)).min(1.0)
            } else {
                1.0
            };
            if aa > 0.0 {
                canvas.blend(cx + x, cy + y, color, aa as f32);
            }
        }
    }
}

fn fill_rect(canvas: &mut Canvas, rect: &Rect, color: Color) {
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            canvas.blend(x, y, color, 1.0);
        }
    }
}

/// Coverage is estimated from the signed distance to the nearest edge.
fn fill_triangle(canvas: &mut Canvas, points: &[Point; 3], color: Color) {
    let [a, b, c] = *points;
    let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if area.abs() < f64::EPSILON {
        return;
    }
    let orient = area.signum();
    let min_x = a.x.min(b.x).min(c.x).floor() as i32 - 1;
    let max_x = a.x.max(b.x).max(c.x).ceil() as i32 + 1;
    let min_y = a.y.min(b.y).min(c.y).floor() as i32 - 1;
    let max_y = a.y.max(b.y).max(c.y).ceil() as i32 + 1;

    let edge = |p: Point, q: Point, x: f64, y: f64| {
        let len = ((q.x - p.x).powi(2) + (q.y - p.y).powi(2)).sqrt();
        orient * ((q.x - p.x) * (y - p.y) - (q.y - p.y) * (x - p.x)) / len
    };

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (sx, sy) = (f64::from(x), f64::from(y));
            let d = edge(a, b, sx, sy).min(edge(b, c, sx, sy)).min(edge(c, a, sx, sy));
            let aa = (d + 0.5).clamp(0.0, 1.0);
            if aa > 0.01 {
                canvas.blend(x, y, color, aa as f32);
            }
        }
    }
}

fn draw_text(
    canvas: &mut Canvas,
    anchor: Point,
    align: TextAnchor,
    text: &str,
    font: &Font,
    scale: Scale,
    color: Color,
) {
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .collect();
    let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), bb| {
            (
                min_x.min(bb.min.x),
                max_x.max(bb.max.x),
                min_y.min(bb.min.y),
                max_y.max(bb.max.y),
            )
        },
    );
    if min_x >= max_x || min_y >= max_y {
        return;
    }
    let (x, y) = anchor.rounded();
    let offset_x = match align {
        TextAnchor::Center => x - (max_x - min_x) / 2,
        TextAnchor::Left => x,
    };
    let offset_y = y - (max_y - min_y) / 2;
    for glyph in &glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                let px = offset_x + gx as i32 + bb.min.x - min_x;
                let py = offset_y + gy as i32 + bb.min.y - min_y;
                canvas.blend(px, py, color, v);
            });
        }
    }
}
