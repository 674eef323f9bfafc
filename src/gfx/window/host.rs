//! 窗口宿主
//!
//! 集成 winit、egui 和 wgpu：`wait_frame` 泵取窗口事件并开始一个 egui 帧，
//! 把上一帧记录的命令树绘制进去；`finish_frame` 结束 egui 帧并呈现。

use std::time::Duration;

use egui_wgpu::Renderer as EguiRenderer;
use egui_winit::State as EguiState;
use tracing::{debug, info};
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};

use crate::core::config::WindowConfig;
use crate::core::error::{Result, VizError};
use crate::gfx::host::{FrameHost, FramePacer};
use crate::gfx::window::context::SurfaceContext;
use crate::gui::{Backend, EguiBackend};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.08,
    b: 0.1,
    a: 1.0,
};

/// 窗口宿主（egui + wgpu）
pub struct WindowHost {
    event_loop: EventLoop<()>,
    surface: SurfaceContext,

    // egui 核心组件
    context: egui::Context,
    state: EguiState,
    renderer: EguiRenderer,

    backend: EguiBackend,
    pacer: FramePacer,
    closing: bool,
}

impl WindowHost {
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let event_loop = EventLoop::new()
            .map_err(|e| VizError::Initialization(format!("Failed to create event loop: {}", e)))?;
        let surface = SurfaceContext::new(&event_loop, config)?;

        let context = egui::Context::default();
        let state = EguiState::new(
            context.clone(),
            egui::ViewportId::ROOT,
            surface.window(),
            Some(surface.window().scale_factor() as f32),
            None,
        );
        let renderer = EguiRenderer::new(&surface.device, surface.surface_config.format, None, 1);

        // 有垂直同步时由 Fifo 呈现控制节奏
        let pacer = if config.vsync {
            FramePacer::new(Duration::ZERO)
        } else {
            FramePacer::from_millis(config.min_frame_interval_ms)
        };

        Ok(Self {
            event_loop,
            surface,
            context,
            state,
            renderer,
            backend: EguiBackend::new(),
            pacer,
            closing: false,
        })
    }

    /// 处理积压的窗口事件，返回是否请求关闭
    fn pump(&mut self) -> bool {
        let Self {
            event_loop,
            surface,
            state,
            ..
        } = self;
        let window = surface.window();
        let mut close = false;
        let mut resized = None;

        let status = event_loop.pump_events(Some(Duration::ZERO), |event, _| {
            if let Event::WindowEvent { event, .. } = event {
                let _ = state.on_window_event(window, &event);
                match event {
                    WindowEvent::CloseRequested => close = true,
                    WindowEvent::Resized(size) => resized = Some(size),
                    _ => {}
                }
            }
        });
        if let PumpStatus::Exit(code) = status {
            debug!(code, "Event loop exited");
            close = true;
        }
        if let Some(size) = resized {
            debug!(width = size.width, height = size.height, "Window resized");
            surface.reconfigure_surface(size.width, size.height);
        }
        close
    }
}

impl FrameHost for WindowHost {
    fn wait_frame(&mut self) -> bool {
        if self.closing {
            return false;
        }
        self.pacer.wait();
        if self.pump() {
            info!("Close requested, shutting down...");
            self.closing = true;
            return false;
        }

        let raw_input = self.state.take_egui_input(self.surface.window());
        self.context.begin_frame(raw_input);
        self.backend.paint(&self.context);
        true
    }

    fn backend(&mut self) -> &mut dyn Backend {
        &mut self.backend
    }

    fn finish_frame(&mut self) -> Result<()> {
        let full_output = self.context.end_frame();
        self.state
            .handle_platform_output(self.surface.window(), full_output.platform_output);
        let paint_jobs = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let frame = match self.surface.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.surface.window().inner_size();
                self.surface.reconfigure_surface(size.width, size.height);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(e) => return Err(VizError::Runtime(format!("Failed to acquire frame: {}", e))),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let device = &self.surface.device;
        let queue = &self.surface.queue;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("GUI Encoder"),
        });
        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.surface.surface_config.width, self.surface.surface_config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        let callbacks = self
            .renderer
            .update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GUI Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }

        queue.submit(callbacks.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }

    fn host_name(&self) -> &str {
        "window"
    }
}

impl std::fmt::Debug for WindowHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowHost")
            .field("size", &[self.surface.surface_config.width, self.surface.surface_config.height])
            .field("closing", &self.closing)
            .finish()
    }
}

