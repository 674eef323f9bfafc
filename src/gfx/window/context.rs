//! wgpu 设备与窗口表面管理
//!
//! 负责：
//! - 创建 wgpu 实例和窗口
//! - 创建窗口表面并选择适配器
//! - 创建逻辑设备和命令队列
//! - 配置交换链（垂直同步时使用 Fifo 呈现，帧节奏由呈现阻塞决定）

use std::sync::Arc;

use tracing::{debug, info};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use crate::core::config::WindowConfig;
use crate::core::error::{Result, VizError};

/// 窗口、表面和设备
pub struct SurfaceContext {
    pub instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
}

impl SurfaceContext {
    pub fn new(event_loop: &EventLoop<()>, config: &WindowConfig) -> Result<Self> {
        info!("Initializing wgpu surface");

        debug!("Creating wgpu instance");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: Default::default(),
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        debug!("Creating window");
        let window = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .build(event_loop)
            .map_err(|e| VizError::Initialization(format!("Failed to create window: {}", e)))?;
        let window = Arc::new(window);

        debug!("Creating surface");
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| VizError::Initialization(format!("Failed to create surface: {}", e)))?;

        debug!("Requesting adapter");
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| VizError::Initialization("Failed to find suitable adapter".to_string()))?;

        info!("Selected adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("autoviz device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
            },
            None,
        ))
        .map_err(|e| VizError::Initialization(format!("Failed to create device: {}", e)))?;

        let caps = surface.get_capabilities(&adapter);
        // egui 输出线性颜色，优先非 sRGB 格式
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| VizError::Initialization("Surface reports no formats".to_string()))?;
        debug!("Surface format: {:?}", format);

        let present_mode = if config.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        info!("wgpu surface initialized");

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            surface_config,
            window,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// 重新配置表面（窗口大小改变或表面丢失时）
    pub fn reconfigure_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }
}
