//! Keyboard Controls

use tracing::info;

use crate::intensity::MaxIntensityReference;
use crate::surface::Key;

/// What the presentation loop should do after handling input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Continue,
    Quit,
}

/// Apply this frame's key presses
///
/// Up/Down step the max-intensity ceiling and Enter resets it. `q`, Esc and
/// Ctrl+C quit; keys after a quit request are ignored.
pub fn handle_keys(keys: &[Key], max_intensity: &MaxIntensityReference) -> ControlOutcome {
    for key in keys {
        match key {
            Key::Up => {
                let value = max_intensity.increase();
                info!("Max intensity raised to {}", value);
            }
            Key::Down => {
                let value = max_intensity.decrease();
                if value == max_intensity.floor() {
                    info!("Max intensity at its floor of {}", value);
                } else {
                    info!("Max intensity lowered to {}", value);
                }
            }
            Key::Enter => {
                let value = max_intensity.reset();
                info!("Max intensity reset to {}", value);
            }
            Key::Escape | Key::Interrupt | Key::Char('q') | Key::Char('Q') => {
                info!("Quit requested from keyboard");
                return ControlOutcome::Quit;
            }
            Key::Char(_) => {}
        }
    }
    ControlOutcome::Continue
}
