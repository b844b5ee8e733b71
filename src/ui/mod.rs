use anyhow::Result;
use egui_wgpu::Renderer;
use egui_winit::State;
use wgpu::{CommandEncoder, Device, Queue, TextureView};
use winit::{event::WindowEvent, window::Window};

use crate::audio::analyzer::bin_frequency_hz;
use crate::audio::SourceMode;
use crate::bands::BANDS;
use crate::clock::Clock;
use crate::graphics::GraphicsEngine;

/// Read-only view of the core state, assembled by the host once per frame.
pub struct UiStatus<'a> {
    pub mode: SourceMode,
    pub file_name: Option<&'a str>,
    pub sample_rate: Option<u32>,
    /// Per-band byte maxima from the current snapshot, when one exists.
    pub band_peaks: Option<[u8; 5]>,
    pub clock_paused: bool,
}

pub struct UserInterface {
    context: egui::Context,
    state: State,
    renderer: Renderer,
    show_debug: bool,
    // Drives the recording indicator pulse; paused while idle so the
    // phase freezes instead of resetting.
    indicator_clock: Clock,
}

impl UserInterface {
    pub fn new(window: &Window, graphics_engine: &GraphicsEngine) -> Self {
        let context = egui::Context::default();

        let egui_state = State::new(context.clone(), egui::ViewportId::ROOT, &window, None, None);

        let renderer = Renderer::new(
            &graphics_engine.device,
            graphics_engine.config.format,
            None,
            1,
        );

        Self {
            context,
            state: egui_state,
            renderer,
            show_debug: false,
            indicator_clock: Clock::new(0.05),
        }
    }

    pub fn handle_event(&mut self, event: &WindowEvent, window: &Window) {
        let _ = self.state.on_window_event(window, event);
    }

    pub fn toggle_debug(&mut self) {
        self.show_debug = !self.show_debug;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        encoder: &mut CommandEncoder,
        target: &TextureView,
        device: &Device,
        queue: &Queue,
        window: &Window,
        screen_size: [u32; 2],
        status: &UiStatus,
    ) -> Result<()> {
        let raw_input = self.state.take_egui_input(window);

        let show_debug = self.show_debug;
        let indicator_clock = &mut self.indicator_clock;

        let full_output = self.context.run(raw_input, |ctx| {
            Self::ui_content(ctx, status, show_debug, indicator_clock);
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: screen_size,
            pixels_per_point: full_output.pixels_per_point,
        };

        self.renderer
            .update_buffers(device, queue, encoder, &tris, &screen_descriptor);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }

        Ok(())
    }

    fn ui_content(
        ctx: &egui::Context,
        status: &UiStatus,
        show_debug: bool,
        indicator_clock: &mut Clock,
    ) {
        egui::Window::new("freqwave")
            .default_pos([10.0, 10.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    Self::mode_indicator(ui, status.mode, indicator_clock);
                    match status.mode {
                        SourceMode::Idle => ui.label("idle"),
                        SourceMode::Microphone => ui.label("listening"),
                        SourceMode::File => {
                            ui.label(format!("Playing: {}", status.file_name.unwrap_or("?")))
                        }
                    };
                });

                ui.separator();
                ui.label("V: microphone  |  drop/F: file  |  Esc: stop");
                ui.label("Space: freeze  |  R: reset  |  D: band debug");
                if status.clock_paused {
                    ui.label("animation frozen");
                }
            });

        if show_debug {
            Self::band_debug(ctx, status);
        }
    }

    /// Pulsing red circle while recording, green play triangle while a
    /// file plays, gray square when idle. The pulse clock pauses while
    /// idle, preserving its phase.
    fn mode_indicator(ui: &mut egui::Ui, mode: SourceMode, clock: &mut Clock) {
        match mode {
            SourceMode::Idle => clock.pause(),
            _ => clock.resume(),
        }
        clock.forward();

        let (rect, _) = ui.allocate_exact_size(egui::vec2(18.0, 18.0), egui::Sense::hover());
        let center = rect.center();
        let painter = ui.painter();

        match mode {
            SourceMode::Microphone => {
                let radius = 5.0 + (clock.value * 5.0).sin();
                painter.circle_filled(center, radius, egui::Color32::RED);
            }
            SourceMode::File => {
                let size = 6.0;
                painter.add(egui::Shape::convex_polygon(
                    vec![
                        egui::pos2(center.x - size / 2.0, center.y - size),
                        egui::pos2(center.x - size / 2.0, center.y + size),
                        egui::pos2(center.x + size, center.y),
                    ],
                    egui::Color32::GREEN,
                    egui::Stroke::NONE,
                ));
            }
            SourceMode::Idle => {
                let square = egui::Rect::from_center_size(center, egui::vec2(10.0, 10.0));
                painter.rect_filled(square, 0.0, egui::Color32::GRAY);
            }
        }
    }

    /// Numeric band ranges and current per-band maxima, high band first.
    fn band_debug(ctx: &egui::Context, status: &UiStatus) {
        egui::Window::new("Band debug")
            .default_pos([10.0, 160.0])
            .resizable(false)
            .show(ctx, |ui| {
                let sample_rate = status.sample_rate.unwrap_or(44_100);

                egui::Grid::new("band_ranges").striped(true).show(ui, |ui| {
                    ui.label("band");
                    ui.label("range");
                    ui.label("peak");
                    ui.end_row();

                    for (index, band) in BANDS.iter().enumerate().rev() {
                        let lo = bin_frequency_hz(band.range.0, sample_rate);
                        let hi = bin_frequency_hz(band.range.1, sample_rate);
                        ui.label(band.name);
                        ui.label(format!("{:.0} Hz - {:.0} Hz", lo, hi));
                        match status.band_peaks {
                            Some(peaks) => ui.label(format!("{}", peaks[index])),
                            None => ui.label("-"),
                        };
                        ui.end_row();
                    }
                });
            });
    }
}
