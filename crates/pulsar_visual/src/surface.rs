//! Render Surface Interface
//!
//! The drawing collaborator the scene is composed onto. Coordinates are
//! canvas pixels; implementations scale them to their own resolution.
//! Drawing calls only touch the back buffer, so only input polling and
//! presentation can fail.

use crate::color::Rgb;
use crate::error::RenderSurfaceError;

/// Axis-aligned rectangle in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub color: Rgb,
    /// Outlined when false
    pub filled: bool,
}

impl DrawRect {
    pub fn filled(x: i32, y: i32, width: u32, height: u32, color: Rgb) -> Self {
        Self {
            x,
            y,
            width,
            height,
            color,
            filled: true,
        }
    }

    pub fn outlined(x: i32, y: i32, width: u32, height: u32, color: Rgb) -> Self {
        Self {
            filled: false,
            ..Self::filled(x, y, width, height, color)
        }
    }
}

/// Text sizes used by the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Title,
    Label,
}

/// Keys the visualizer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Escape,
    /// Ctrl+C arrives as a key press while the terminal is in raw mode
    Interrupt,
    Char(char),
}

pub trait RenderSurface {
    /// Canvas size in pixels
    fn size(&self) -> (u32, u32);

    fn fill(&mut self, color: Rgb);

    fn draw_rect(&mut self, rect: &DrawRect);

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb);

    fn draw_text(&mut self, text: &str, position: (i32, i32), style: TextStyle, color: Rgb);

    /// Keys newly pressed since the previous call
    fn poll_keys(&mut self) -> Result<Vec<Key>, RenderSurfaceError>;

    /// Show the composed frame
    fn present(&mut self) -> Result<(), RenderSurfaceError>;
}

/// Surface that records every call, for tests and headless runs
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub size: (u32, u32),
    pub commands: Vec<DrawCommand>,
    pub pending_keys: Vec<Key>,
    pub frames_presented: usize,
    pub closed: bool,
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill(Rgb),
    Rect(DrawRect),
    Line {
        from: (i32, i32),
        to: (i32, i32),
        color: Rgb,
    },
    Text {
        text: String,
        position: (i32, i32),
        style: TextStyle,
        color: Rgb,
    },
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Self::default()
        }
    }

    /// Queue keys for the next `poll_keys`
    pub fn press(&mut self, keys: &[Key]) {
        self.pending_keys.extend_from_slice(keys);
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn rects(&self) -> Vec<DrawRect> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Rect(rect) => Some(*rect),
                _ => None,
            })
            .collect()
    }
}

impl RenderSurface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn fill(&mut self, color: Rgb) {
        self.commands.clear();
        self.commands.push(DrawCommand::Fill(color));
    }

    fn draw_rect(&mut self, rect: &DrawRect) {
        self.commands.push(DrawCommand::Rect(*rect));
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb) {
        self.commands.push(DrawCommand::Line { from, to, color });
    }

    fn draw_text(&mut self, text: &str, position: (i32, i32), style: TextStyle, color: Rgb) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position,
            style,
            color,
        });
    }

    fn poll_keys(&mut self) -> Result<Vec<Key>, RenderSurfaceError> {
        if self.closed {
            return Err(RenderSurfaceError::Closed);
        }
        Ok(std::mem::take(&mut self.pending_keys))
    }

    fn present(&mut self) -> Result<(), RenderSurfaceError> {
        if self.closed {
            return Err(RenderSurfaceError::Closed);
        }
        self.frames_presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_constructors() {
        let rect = DrawRect::outlined(1, 2, 3, 4, Rgb::WHITE);
        assert!(!rect.filled);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (1, 2, 3, 4));
        assert!(DrawRect::filled(0, 0, 1, 1, Rgb::BLACK).filled);
    }

    #[test]
    fn test_recording_surface_keys_are_drained() {
        let mut surface = RecordingSurface::new(100, 100);
        surface.press(&[Key::Up, Key::Enter]);
        assert_eq!(surface.poll_keys().unwrap(), vec![Key::Up, Key::Enter]);
        assert!(surface.poll_keys().unwrap().is_empty());
    }

    #[test]
    fn test_fill_starts_new_frame() {
        let mut surface = RecordingSurface::new(100, 100);
        surface.draw_line((0, 0), (10, 10), Rgb::WHITE);
        surface.fill(Rgb::BLACK);
        assert_eq!(surface.commands, vec![DrawCommand::Fill(Rgb::BLACK)]);
    }

    #[test]
    fn test_closed_surface_errors() {
        let mut surface = RecordingSurface::new(100, 100);
        surface.closed = true;
        assert!(matches!(surface.present(), Err(RenderSurfaceError::Closed)));
        assert!(matches!(surface.poll_keys(), Err(RenderSurfaceError::Closed)));
    }
}
