//! Canvas Geometry
//!
//! The visualizer box is centred on the canvas and divided into one
//! equal-width area per bar. Each bar takes two fifths of its area and the
//! rest is padding, split evenly on both sides.

use crate::error::VisualError;

/// Default canvas size
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Default visualizer box size
pub const DEFAULT_VISUALIZER_WIDTH: u32 = 400;
pub const DEFAULT_VISUALIZER_HEIGHT: u32 = 200;

/// Canvas and visualizer box dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub visualizer_width: u32,
    pub visualizer_height: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            visualizer_width: DEFAULT_VISUALIZER_WIDTH,
            visualizer_height: DEFAULT_VISUALIZER_HEIGHT,
        }
    }
}

/// Placement of one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    /// Left edge
    pub x: i32,
    /// Vertical centre line
    pub y: i32,
    pub width: u32,
    pub max_height: f64,
}

impl Layout {
    pub fn new(
        width: u32,
        height: u32,
        visualizer_width: u32,
        visualizer_height: u32,
    ) -> Result<Self, VisualError> {
        if visualizer_width == 0
            || visualizer_height == 0
            || visualizer_width > width
            || visualizer_height > height
        {
            return Err(VisualError::InvalidLayout {
                width,
                height,
                visualizer_width,
                visualizer_height,
            });
        }

        Ok(Self {
            width,
            height,
            visualizer_width,
            visualizer_height,
        })
    }

    /// Canvas centre, the vanishing point of the particle field
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Top-left corner of the visualizer box
    pub fn visualizer_origin(&self) -> (i32, i32) {
        (
            (self.width / 2) as i32 - (self.visualizer_width / 2) as i32,
            (self.height / 2) as i32 - (self.visualizer_height / 2) as i32,
        )
    }

    /// Whether a point lies on the canvas, edges included
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width as f64).contains(&x) && (0.0..=self.height as f64).contains(&y)
    }

    /// Width of the slot each bar occupies (whole pixels)
    pub fn bar_area_width(&self, count: usize) -> f64 {
        (self.visualizer_width / count.max(1) as u32) as f64
    }

    /// Placement of bar `index` out of `count`
    pub fn bar_geometry(&self, index: usize, count: usize) -> BarGeometry {
        let area = self.bar_area_width(count);
        let bar_width = area * 2.0 / 5.0;
        let padding = area - bar_width;
        let (origin_x, _) = self.visualizer_origin();

        BarGeometry {
            x: (padding / 2.0 + origin_x as f64 + index as f64 * area) as i32,
            y: (self.height / 2) as i32,
            width: bar_width as u32,
            max_height: self.visualizer_height as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bar_geometry() {
        let layout = Layout::default();
        assert_eq!(layout.bar_area_width(20), 20.0);

        let first = layout.bar_geometry(0, 20);
        assert_eq!(first.x, 766);
        assert_eq!(first.y, 540);
        assert_eq!(first.width, 8);
        assert_eq!(first.max_height, 200.0);

        let last = layout.bar_geometry(19, 20);
        assert_eq!(last.x, 766 + 19 * 20);
        // Right edge stays inside the box
        assert!(last.x + last.width as i32 <= 960 + 200);
    }

    #[test]
    fn test_visualizer_origin() {
        assert_eq!(Layout::default().visualizer_origin(), (760, 440));
        assert_eq!(Layout::default().center(), (960.0, 540.0));
    }

    #[test]
    fn test_contains_edges() {
        let layout = Layout::default();
        assert!(layout.contains(0.0, 0.0));
        assert!(layout.contains(1920.0, 1080.0));
        assert!(!layout.contains(-0.1, 10.0));
        assert!(!layout.contains(10.0, 1080.5));
    }

    #[test]
    fn test_layout_validation() {
        assert!(Layout::new(800, 600, 400, 200).is_ok());
        assert!(Layout::new(300, 600, 400, 200).is_err());
        assert!(Layout::new(800, 600, 0, 200).is_err());
    }
}
