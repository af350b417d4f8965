//! Colours

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Multiply every channel by `factor`, saturating at 0 and 255
    pub fn scaled(self, factor: f64) -> Self {
        let channel = |c: u8| (c as f64 * factor).clamp(0.0, 255.0) as u8;
        Self::new(channel(self.r), channel(self.g), channel(self.b))
    }
}

/// Red-to-green gradient colour for bar `index` of `count`
///
/// Uses a whole-number step of `255 / count`, so the last bar stops short
/// of pure green unless `count` divides 255.
pub fn bar_gradient(index: usize, count: usize) -> Rgb {
    let step = 255 / count.max(1) as u32;
    let green = (step * index as u32).min(255);
    Rgb::new((255 - green) as u8, green as u8, 0)
}
