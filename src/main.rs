use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use winit::{
    event::{ElementState, Event, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

mod audio;
mod bands;
mod clock;
mod graphics;
mod ui;
mod wave;

use audio::{SourceMode, SpectrumSource};
use bands::BANDS;
use clock::Clock;
use graphics::{BandWave, GraphicsEngine};
use ui::{UiStatus, UserInterface};

#[derive(Debug, Parser)]
#[command(name = "freqwave", about = "Animated multi-band audio visualizer")]
struct Args {
    /// Audio file to start playing on launch
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Animation clock step per frame
    #[arg(long, default_value_t = 0.01)]
    step: f32,

    /// Disable the glow pass behind each band
    #[arg(long)]
    no_glow: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    info!("Starting freqwave visualizer");

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("freqwave")
            .with_inner_size(winit::dpi::LogicalSize::new(1200, 800))
            .build(&event_loop)?,
    );

    let mut graphics_engine = pollster::block_on(GraphicsEngine::new(&window, !args.no_glow))?;
    let mut ui = UserInterface::new(&window, &graphics_engine);
    let mut source = SpectrumSource::new();
    let mut draw_clock = Clock::new(args.step);
    let mut last_file = args.file.clone();

    if let Some(path) = &args.file {
        activate_path(&mut source, path);
    }

    info!("Visualizer initialized");

    let window_clone = Arc::clone(&window);
    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    info!("Close requested");
                    elwt.exit();
                }
                WindowEvent::Resized(physical_size) => {
                    graphics_engine.resize(physical_size);
                }
                WindowEvent::DroppedFile(path) => {
                    last_file = Some(path.clone());
                    activate_path(&mut source, &path);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed && !event.repeat {
                        match event.physical_key {
                            PhysicalKey::Code(KeyCode::Escape) => source.deactivate(),
                            PhysicalKey::Code(KeyCode::KeyV) => toggle_microphone(&mut source),
                            PhysicalKey::Code(KeyCode::KeyF) => {
                                if let Some(path) = last_file.clone() {
                                    activate_path(&mut source, &path);
                                }
                            }
                            PhysicalKey::Code(KeyCode::Space) => draw_clock.toggle_paused(),
                            PhysicalKey::Code(KeyCode::KeyR) => draw_clock.reset(),
                            PhysicalKey::Code(KeyCode::KeyD) => ui.toggle_debug(),
                            _ => {}
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    draw_clock.forward();

                    let size = window_clone.inner_size();
                    let width = size.width.max(1);
                    let center = size.height as f32 / 2.0;

                    let (waves, peaks) = {
                        let snapshot = source.snapshot();
                        let waves: Vec<BandWave> = BANDS
                            .iter()
                            .enumerate()
                            .map(|(index, band)| {
                                let params = bands::compute_band_params(
                                    band,
                                    index,
                                    snapshot,
                                    draw_clock.value,
                                );
                                BandWave {
                                    points: wave::compute_wave_points(
                                        &params,
                                        index,
                                        draw_clock.value,
                                        width,
                                        center,
                                    ),
                                    color: band.color,
                                    glow_color: band.glow_color,
                                }
                            })
                            .collect();
                        (waves, snapshot.map(band_peaks))
                    };

                    let status = UiStatus {
                        mode: source.current_mode(),
                        file_name: source.current_file_name(),
                        sample_rate: source.sample_rate(),
                        band_peaks: peaks,
                        clock_paused: draw_clock.is_paused(),
                    };

                    if let Err(e) = graphics_engine.render(&waves, &window_clone, &mut ui, &status)
                    {
                        error!("Render error: {}", e);
                    }
                }
                _ => {
                    ui.handle_event(&event, &window_clone);
                }
            },
            Event::AboutToWait => {
                window_clone.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

fn toggle_microphone(source: &mut SpectrumSource) {
    if source.current_mode() == SourceMode::Microphone {
        source.deactivate();
    } else if let Err(e) = pollster::block_on(source.activate_microphone()) {
        error!("Microphone error: {}", e);
    }
}

fn activate_path(source: &mut SpectrumSource, path: &Path) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match std::fs::read(path) {
        Ok(bytes) => {
            if let Err(e) = pollster::block_on(source.activate_file(bytes, &name)) {
                error!("Could not play {:?}: {}", name, e);
            }
        }
        Err(e) => error!("Could not read {:?}: {}", path, e),
    }
}

/// Per-band maxima of the snapshot, for the debug overlay.
fn band_peaks(snapshot: &[u8]) -> [u8; 5] {
    let mut peaks = [0u8; 5];
    if snapshot.is_empty() {
        return peaks;
    }
    for (index, band) in BANDS.iter().enumerate() {
        let (start, end) = band.range;
        let safe_start = start.min(snapshot.len() - 1);
        let safe_end = end.min(snapshot.len() - 1);
        peaks[index] = snapshot[safe_start..=safe_end]
            .iter()
            .copied()
            .max()
            .unwrap_or(0);
    }
    peaks
}
