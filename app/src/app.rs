//! Presentation loop
//!
//! Owns the audio thread handle and drives analysis, animation and drawing
//! once per frame until the interrupt flag is raised.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use pulsar_core::{AudioHandle, Event, InterruptFlag, PcmPair, PulsarSettings};
use pulsar_dsp::{generate_frequency_bands, AnalysisContext, SpectralAnalyzer};
use pulsar_visual::{
    handle_keys, ControlOutcome, Layout, MaxIntensityReference, RenderSurface, Scene,
    VisualConfig, VisualStateMapper,
};

use crate::limiter::FrameLimiter;
use crate::terminal::TerminalSurface;

const TITLE: &str = "Pulsar";

/// Base pitch of the synthetic capture tone
const DEMO_TONE_HZ: f64 = 220.0;

/// Everything the loop needs besides the surface
pub struct Visualizer {
    analyzer: SpectralAnalyzer,
    mapper: VisualStateMapper,
    scene: Scene,
    limiter: FrameLimiter,
}

impl Visualizer {
    pub fn new(settings: &PulsarSettings, handle: &AudioHandle) -> Result<Self> {
        let negotiated = handle.negotiated();
        let analysis = &settings.analysis;
        let display = &settings.display;

        let context = AnalysisContext::new(
            negotiated.sample_rate,
            negotiated.channels as usize,
            negotiated.frames_per_period as usize,
        )?;
        let bands =
            generate_frequency_bands(analysis.bar_count, analysis.min_freq, analysis.max_freq)
                .context("Invalid analysis band settings")?;
        let analyzer =
            SpectralAnalyzer::new(context, bands)?.with_pre_emphasis(analysis.pre_emphasis);

        let reference = MaxIntensityReference::new(
            display.max_intensity_default,
            display.max_intensity_step,
            display.max_intensity_floor,
        );
        let config = VisualConfig {
            layout: Layout::default(),
            bar_count: analysis.bar_count,
            particle_count: display.particle_count,
        };
        let mapper = VisualStateMapper::from_entropy(config, reference)?;

        Ok(Self {
            analyzer,
            mapper,
            scene: Scene::new(TITLE, analysis.min_freq, analysis.max_freq),
            limiter: FrameLimiter::new(display.target_fps),
        })
    }

    /// Run frames until `interrupt` is set or the surface fails
    pub fn run<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        handle: &AudioHandle,
        interrupt: &InterruptFlag,
    ) -> Result<()> {
        let mut elapsed = 0.0;

        while !interrupt.is_set() {
            let intensities = self.analyzer.compute_spectrum(handle.shared_buffer());
            self.mapper.update_visual_state(&intensities, elapsed);

            self.scene.draw(surface, &self.mapper);
            surface.present()?;

            let keys = surface.poll_keys()?;
            if handle_keys(&keys, self.mapper.max_intensity()) == ControlOutcome::Quit {
                interrupt.trigger();
            }

            while let Some(event) = handle.poll_event() {
                log_event(&event);
            }
            if handle.is_finished() {
                warn!("Audio thread stopped, leaving presentation loop");
                interrupt.trigger();
            }

            elapsed = self.limiter.wait();
        }

        Ok(())
    }
}

fn log_event(event: &Event) {
    match event {
        Event::Started(config) => info!(
            "Audio running at {} Hz, {} ch, {} frames/period",
            config.sample_rate, config.channels, config.frames_per_period
        ),
        Event::Stopped => info!("Audio stopped"),
        Event::Error { message } => error!("Audio error: {}", message),
        // Already logged by the audio thread
        _ => {}
    }
}

/// Start audio, visualize until interrupted, then shut down in order
pub fn run(settings: &PulsarSettings, demo: bool) -> Result<()> {
    let interrupt = InterruptFlag::new();
    let engine_config = settings.engine_config();

    let handle = if demo {
        let stream = engine_config.stream;
        info!("Using synthetic capture");
        AudioHandle::spawn_with(interrupt.clone(), move |_| {
            Ok(PcmPair::synthetic(stream, DEMO_TONE_HZ, true))
        })
    } else {
        AudioHandle::spawn(engine_config, interrupt.clone())
    }
    .context("Failed to start audio")?;

    let visual_result = Visualizer::new(settings, &handle).and_then(|mut visualizer| {
        let layout = Layout::default();
        let mut surface = TerminalSurface::new(layout.width, layout.height)
            .context("Failed to initialise terminal")?;
        visualizer.run(&mut surface, &handle, &interrupt)
        // Surface dropped here, before any diagnostics are printed
    });

    if visual_result.is_err() {
        interrupt.trigger();
    }
    let audio_result = handle.join();

    info!("Shutting down");
    visual_result?;
    audio_result.context("Audio engine failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsar_core::StreamConfig;
    use pulsar_visual::{Key, RecordingSurface};

    fn demo_handle(interrupt: &InterruptFlag) -> AudioHandle {
        let stream = StreamConfig::from_period_ms(44100, 2, 10);
        AudioHandle::spawn_with(interrupt.clone(), move |_| {
            Ok(PcmPair::synthetic(stream, DEMO_TONE_HZ, true))
        })
        .unwrap()
    }

    fn small_settings() -> PulsarSettings {
        let mut settings = PulsarSettings::default();
        settings.display.particle_count = 20;
        settings.display.target_fps = 200;
        settings
    }

    #[test]
    fn test_quit_key_stops_loop() {
        let interrupt = InterruptFlag::new();
        let handle = demo_handle(&interrupt);
        let mut visualizer = Visualizer::new(&small_settings(), &handle).unwrap();

        let mut surface = RecordingSurface::new(1920, 1080);
        surface.press(&[Key::Up, Key::Char('q')]);
        visualizer.run(&mut surface, &handle, &interrupt).unwrap();

        assert!(interrupt.is_set());
        assert_eq!(surface.frames_presented, 1);
        assert!(surface.texts().contains(&"Max intensity: 600000"));
        assert_eq!(visualizer.mapper.max_intensity().get(), 700_000);
        handle.join().unwrap();
    }

    #[test]
    fn test_surface_failure_is_reported() {
        let interrupt = InterruptFlag::new();
        let handle = demo_handle(&interrupt);
        let mut visualizer = Visualizer::new(&small_settings(), &handle).unwrap();

        let mut surface = RecordingSurface::new(1920, 1080);
        surface.closed = true;
        assert!(visualizer.run(&mut surface, &handle, &interrupt).is_err());
        handle.join().unwrap();
    }

    #[test]
    fn test_analysis_uses_negotiated_period() {
        let interrupt = InterruptFlag::new();
        let handle = demo_handle(&interrupt);
        let visualizer = Visualizer::new(&small_settings(), &handle).unwrap();
        assert_eq!(visualizer.analyzer.context().frames_per_period, 441);
        assert_eq!(visualizer.mapper.bars().len(), 20);
        handle.join().unwrap();
    }
}
