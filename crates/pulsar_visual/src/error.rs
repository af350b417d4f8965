//! Visual Error Types

use thiserror::Error;

/// Invalid visual-state construction parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisualError {
    #[error("Invalid bar count: {0} (must be at least 1)")]
    InvalidBarCount(usize),

    #[error(
        "Visualizer {visualizer_width}x{visualizer_height} does not fit a {width}x{height} canvas"
    )]
    InvalidLayout {
        width: u32,
        height: u32,
        visualizer_width: u32,
        visualizer_height: u32,
    },
}

/// Failure of the drawing surface
#[derive(Error, Debug)]
pub enum RenderSurfaceError {
    #[error("Render surface I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render surface is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VisualError::InvalidBarCount(0);
        assert!(err.to_string().contains("at least 1"));

        let err = VisualError::InvalidLayout {
            width: 100,
            height: 100,
            visualizer_width: 400,
            visualizer_height: 200,
        };
        assert!(err.to_string().contains("400x200"));
        assert!(err.to_string().contains("100x100"));
    }

    #[test]
    fn test_surface_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "tty gone");
        let err: RenderSurfaceError = io.into();
        assert!(matches!(err, RenderSurfaceError::Io(_)));
        assert!(err.to_string().contains("tty gone"));
    }
}
