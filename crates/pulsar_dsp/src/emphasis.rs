//! Pre-emphasis Filter
//!
//! First-order high-pass `y[i] = x[i] - alpha * x[i - 1]` applied to the
//! mono downmix, with `x[-1] = 0`. Lifts the upper bands that a raw
//! magnitude spectrum under-represents.

/// Default pre-emphasis coefficient
pub const PRE_EMPHASIS_ALPHA: f64 = 0.97;

/// Downmix interleaved frames to mono and apply pre-emphasis
///
/// Writes one output sample per frame into `out` (cleared first, capacity
/// reused). A trailing partial frame is ignored.
pub fn apply_pre_emphasis(interleaved: &[i16], channels: usize, alpha: f64, out: &mut Vec<f64>) {
    out.clear();
    if channels == 0 {
        return;
    }

    let mut previous = 0.0_f64;
    for frame in interleaved.chunks_exact(channels) {
        let sum: f64 = frame.iter().map(|&s| s as f64).sum();
        let current = sum / channels as f64;
        out.push(current - alpha * previous);
        previous = current;
    }
}
