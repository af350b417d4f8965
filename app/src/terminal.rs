//! Crossterm render surface
//!
//! The canvas is scaled onto the terminal grid at two pixels per cell: the
//! upper half-block glyph takes the top pixel as foreground and the bottom
//! pixel as background. Text is laid over the grid a cell at a time.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor,
        SetForegroundColor,
    },
    terminal::{
        disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use pulsar_visual::{DrawRect, Key, RenderSurface, RenderSurfaceError, Rgb, TextStyle};

const HALF_BLOCK: char = '▀';

#[derive(Clone, Copy, PartialEq)]
struct TextCell {
    ch: char,
    color: Rgb,
    bold: bool,
}

/// Pixel grid plus text overlay, independent of the terminal itself
struct Raster {
    canvas: (u32, u32),
    cols: usize,
    rows: usize,
    pixels: Vec<Rgb>,
    text: Vec<Option<TextCell>>,
}

impl Raster {
    fn new(canvas: (u32, u32), cols: u16, rows: u16) -> Self {
        let (cols, rows) = (cols.max(1) as usize, rows.max(1) as usize);
        Self {
            canvas: (canvas.0.max(1), canvas.1.max(1)),
            cols,
            rows,
            pixels: vec![Rgb::BLACK; cols * rows * 2],
            text: vec![None; cols * rows],
        }
    }

    fn pixel_size(&self) -> (usize, usize) {
        (self.cols, self.rows * 2)
    }

    fn scale(&self) -> (f64, f64) {
        let (pw, ph) = self.pixel_size();
        (
            pw as f64 / self.canvas.0 as f64,
            ph as f64 / self.canvas.1 as f64,
        )
    }

    fn set(&mut self, px: i64, py: i64, color: Rgb) {
        let (pw, ph) = self.pixel_size();
        if px >= 0 && py >= 0 && (px as usize) < pw && (py as usize) < ph {
            self.pixels[py as usize * pw + px as usize] = color;
        }
    }

    fn pixel(&self, px: usize, py: usize) -> Rgb {
        self.pixels[py * self.cols + px]
    }

    fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
        self.text.fill(None);
    }

    /// Canvas span to pixel span, never narrower than one pixel
    fn span(start: i32, len: u32, scale: f64) -> (i64, i64) {
        let lo = (start as f64 * scale).floor() as i64;
        let hi = ((start as f64 + len as f64) * scale).ceil() as i64;
        (lo, hi.max(lo + 1))
    }

    fn rect(&mut self, rect: &DrawRect) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let (sx, sy) = self.scale();
        let (x0, x1) = Self::span(rect.x, rect.width, sx);
        let (y0, y1) = Self::span(rect.y, rect.height, sy);

        for py in y0..y1 {
            for px in x0..x1 {
                let edge = px == x0 || px == x1 - 1 || py == y0 || py == y1 - 1;
                if rect.filled || edge {
                    self.set(px, py, rect.color);
                }
            }
        }
    }

    fn line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb) {
        let (sx, sy) = self.scale();
        let (mut x, mut y) = ((from.0 as f64 * sx) as i64, (from.1 as f64 * sy) as i64);
        let (x1, y1) = ((to.0 as f64 * sx) as i64, (to.1 as f64 * sy) as i64);

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let step_x = if x < x1 { 1 } else { -1 };
        let step_y = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.set(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += step_x;
            }
            if e2 <= dx {
                err += dx;
                y += step_y;
            }
        }
    }

    fn text(&mut self, text: &str, position: (i32, i32), style: TextStyle, color: Rgb) {
        let (sx, sy) = self.scale();
        let col = (position.0 as f64 * sx) as i64;
        let row = (position.1 as f64 * sy / 2.0) as i64;
        if row < 0 || row as usize >= self.rows {
            return;
        }

        for (i, ch) in text.chars().enumerate() {
            let c = col + i as i64;
            if c >= 0 && (c as usize) < self.cols {
                self.text[row as usize * self.cols + c as usize] = Some(TextCell {
                    ch,
                    color,
                    bold: style == TextStyle::Title,
                });
            }
        }
    }
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

fn map_key(event: KeyEvent) -> Option<Key> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    match event.code {
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Key::Interrupt)
        }
        KeyCode::Char(c) => Some(Key::Char(c)),
        _ => None,
    }
}

/// Switch `out` to the alternate screen, calling `restore` if that fails
fn enter_alternate_screen<W: Write>(out: &mut W, restore: impl FnOnce()) -> io::Result<()> {
    let result = execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All));
    if result.is_err() {
        let _ = execute!(out, Show, LeaveAlternateScreen);
        restore();
    }
    result
}

/// Full-screen terminal surface; restores the terminal on drop
pub struct TerminalSurface {
    raster: Raster,
    stdout: Stdout,
}

impl TerminalSurface {
    pub fn new(canvas_width: u32, canvas_height: u32) -> io::Result<Self> {
        let (cols, rows) = size()?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        enter_alternate_screen(&mut stdout, || {
            let _ = disable_raw_mode();
        })?;

        Ok(Self {
            raster: Raster::new((canvas_width, canvas_height), cols, rows),
            stdout,
        })
    }

    fn resize(&mut self, cols: u16, rows: u16) -> io::Result<()> {
        self.raster = Raster::new(self.raster.canvas, cols, rows);
        execute!(self.stdout, Clear(ClearType::All))
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = execute!(self.stdout, ResetColor, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

impl RenderSurface for TerminalSurface {
    fn size(&self) -> (u32, u32) {
        self.raster.canvas
    }

    fn fill(&mut self, color: Rgb) {
        self.raster.fill(color);
    }

    fn draw_rect(&mut self, rect: &DrawRect) {
        self.raster.rect(rect);
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb) {
        self.raster.line(from, to, color);
    }

    fn draw_text(&mut self, text: &str, position: (i32, i32), style: TextStyle, color: Rgb) {
        self.raster.text(text, position, style, color);
    }

    fn poll_keys(&mut self) -> Result<Vec<Key>, RenderSurfaceError> {
        let mut keys = Vec::new();
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(event) => keys.extend(map_key(event)),
                Event::Resize(cols, rows) => self.resize(cols, rows)?,
                _ => {}
            }
        }
        Ok(keys)
    }

    fn present(&mut self) -> Result<(), RenderSurfaceError> {
        let raster = &self.raster;
        let out = &mut self.stdout;
        let mut colors: Option<(Rgb, Rgb)> = None;

        for row in 0..raster.rows {
            queue!(out, MoveTo(0, row as u16))?;
            for col in 0..raster.cols {
                let bottom = raster.pixel(col, row * 2 + 1);
                let (ch, fg, bold) = match raster.text[row * raster.cols + col] {
                    Some(cell) => (cell.ch, cell.color, cell.bold),
                    None => (HALF_BLOCK, raster.pixel(col, row * 2), false),
                };

                if colors != Some((fg, bottom)) {
                    queue!(
                        out,
                        SetForegroundColor(to_color(fg)),
                        SetBackgroundColor(to_color(bottom))
                    )?;
                    colors = Some((fg, bottom));
                }
                if bold {
                    queue!(
                        out,
                        SetAttribute(Attribute::Bold),
                        Print(ch),
                        SetAttribute(Attribute::NormalIntensity)
                    )?;
                } else {
                    queue!(out, Print(ch))?;
                }
            }
        }

        queue!(out, ResetColor)?;
        out.flush()?;
        Ok(())
    }
}
