//! Proportional approach toward a target
//!
//! Bars and particle brightness both move toward their targets at a speed
//! proportional to the remaining distance, scaled by frame time.

/// Move `current` toward `target` by `|target - current| * rate * elapsed_ms`
///
/// The result always lies between `current` and `target`, inclusive.
pub fn approach(current: f64, target: f64, rate: f64, elapsed_ms: f64) -> f64 {
    let difference = target - current;
    let step = difference.abs() * rate * elapsed_ms.max(0.0);

    if difference > 0.0 {
        (current + step).min(target)
    } else if difference < 0.0 {
        (current - step).max(target)
    } else {
        current
    }
}
