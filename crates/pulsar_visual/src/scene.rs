//! Scene Composition
//!
//! Draw order, back to front: background, particles, captions, the
//! visualizer box, bars.

use crate::color::Rgb;
use crate::layout::Layout;
use crate::mapper::VisualStateMapper;
use crate::surface::{DrawRect, RenderSurface, TextStyle};

const BACKGROUND: Rgb = Rgb::BLACK;
const TEXT: Rgb = Rgb::WHITE;
const BOX_FILL: Rgb = Rgb::new(20, 20, 20);
const BOX_OUTLINE: Rgb = Rgb::new(150, 150, 150);

/// Gap between the visualizer box and its outline
const BOX_MARGIN: i32 = 10;

/// Static captions around the visualizer
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    title: String,
    low_label: String,
    high_label: String,
}

impl Scene {
    pub fn new(title: impl Into<String>, min_freq: f32, max_freq: f32) -> Self {
        Self {
            title: title.into(),
            low_label: format_frequency(min_freq),
            high_label: format_frequency(max_freq),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Compose one frame; the caller presents it
    pub fn draw<S: RenderSurface + ?Sized>(&self, surface: &mut S, mapper: &VisualStateMapper) {
        let layout = mapper.layout();

        surface.fill(BACKGROUND);

        for rect in mapper.particle_rects() {
            surface.draw_rect(&rect);
        }

        self.draw_captions(surface, layout, mapper.max_intensity().get());

        let (left, top) = layout.visualizer_origin();
        let frame = (
            left - BOX_MARGIN,
            top - BOX_MARGIN,
            layout.visualizer_width + 2 * BOX_MARGIN as u32,
            layout.visualizer_height + 2 * BOX_MARGIN as u32,
        );
        surface.draw_rect(&DrawRect::filled(frame.0, frame.1, frame.2, frame.3, BOX_FILL));
        surface.draw_rect(&DrawRect::outlined(frame.0, frame.1, frame.2, frame.3, BOX_OUTLINE));

        for rect in mapper.bar_rects() {
            surface.draw_rect(&rect);
        }
    }

    fn draw_captions<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        layout: &Layout,
        max_intensity: u32,
    ) {
        let (cx, cy) = ((layout.width / 2) as i32, (layout.height / 2) as i32);
        let half_w = (layout.visualizer_width / 2) as i32;
        let half_h = (layout.visualizer_height / 2) as i32;

        surface.draw_text(&self.title, (10, 10), TextStyle::Title, TEXT);
        surface.draw_text(
            &self.low_label,
            (cx - half_w - 70, cy - 11),
            TextStyle::Label,
            TEXT,
        );
        surface.draw_text(
            &self.high_label,
            (cx + half_w + 20, cy - 11),
            TextStyle::Label,
            TEXT,
        );
        surface.draw_text(
            &format!("Max intensity: {}", max_intensity),
            (cx - half_w - 10, cy + half_h + 20),
            TextStyle::Label,
            TEXT,
        );
    }
}

/// "20 Hz", "440 Hz", "20 kHz", "2.5 kHz"
pub fn format_frequency(hz: f32) -> String {
    if hz >= 1000.0 {
        let khz = hz / 1000.0;
        if khz.fract() == 0.0 {
            format!("{} kHz", khz as u32)
        } else {
            format!("{:.1} kHz", khz)
        }
    } else {
        format!("{} Hz", hz.round() as u32)
    }
}
