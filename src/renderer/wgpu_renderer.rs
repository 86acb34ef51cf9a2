use crate::core::{ConvertedFrame, PlayerConfig, PlayerError, Result};
use crate::renderer::{Display, RenderSurface};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    tex_coords: [f32; 2],
}

const VERTICES: &[Vertex] = &[
    Vertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] }, // 左下
    Vertex { position: [1.0, -1.0], tex_coords: [1.0, 1.0] },  // 右下
    Vertex { position: [1.0, 1.0], tex_coords: [1.0, 0.0] },   // 右上
    Vertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] }, // 左下
    Vertex { position: [1.0, 1.0], tex_coords: [1.0, 0.0] },   // 右上
    Vertex { position: [-1.0, 1.0], tex_coords: [0.0, 0.0] },  // 左上
];

/// 垂直同步开启时固定用 Fifo，关闭时优先 Immediate，其次 Mailbox
pub fn select_present_mode(vsync: bool, supported: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|mode| supported.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

/// 按比例缩小到不超过 max_w x max_h（不放大），每边至少 1
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width.max(1), height.max(1));
    }
    let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// wgpu 显示子系统
///
/// 整个进程只有一个 winit 事件循环，窗口关闭后事件循环仍保留，
/// 供下一次播放复用。事件通过 pump 的方式在播放循环中非阻塞处理。
pub struct WgpuDisplay {
    event_loop: Option<EventLoop<()>>,
    instance: Option<wgpu::Instance>,
    vsync: bool,
    close_requested: bool,
    redraw_requested: bool,
}

impl WgpuDisplay {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            event_loop: None,
            instance: None,
            vsync: config.vsync,
            close_requested: false,
            redraw_requested: false,
        }
    }

    fn pump(&mut self, timeout: Duration) {
        let Some(event_loop) = self.event_loop.as_mut() else {
            return;
        };
        let close_requested = &mut self.close_requested;
        let redraw_requested = &mut self.redraw_requested;

        let status = event_loop.pump_events(Some(timeout), |event, _target| {
            if let Event::WindowEvent { event, .. } = event {
                match event {
                    WindowEvent::CloseRequested => {
                        info!("收到窗口关闭请求");
                        *close_requested = true;
                    }
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                logical_key: Key::Named(NamedKey::Escape),
                                state: ElementState::Pressed,
                                ..
                            },
                        ..
                    } => {
                        info!("按下 Esc，关闭窗口");
                        *close_requested = true;
                    }
                    WindowEvent::Resized(_) | WindowEvent::RedrawRequested => {
                        *redraw_requested = true;
                    }
                    _ => {}
                }
            }
        });

        if let PumpStatus::Exit(code) = status {
            debug!("事件循环退出: {}", code);
            self.close_requested = true;
        }
    }

    /// 阻塞等待事件至多 timeout，返回是否请求关闭（图片查看用）
    pub fn wait_close_requested(&mut self, timeout: Duration) -> bool {
        self.pump(timeout);
        self.close_requested
    }

    /// 窗口是否需要重绘（尺寸变化或系统请求），读取后清除
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// 创建图片窗口，尺寸已由调用方限制
    pub fn create_picture_surface(
        &mut self,
        width: u32,
        height: u32,
        title: &str,
    ) -> Result<PictureSurface> {
        let gpu = self.open_window(width, height, title)?;
        PictureSurface::new(gpu, width, height)
    }

    fn open_window(&mut self, width: u32, height: u32, title: &str) -> Result<GpuWindow> {
        let (Some(event_loop), Some(instance)) = (self.event_loop.as_ref(), self.instance.as_ref())
        else {
            return Err(PlayerError::Initialization("显示子系统未初始化".into()));
        };
        self.close_requested = false;
        self.redraw_requested = false;
        GpuWindow::new(event_loop, instance, width, height, title, self.vsync)
    }
}

impl Display for WgpuDisplay {
    type Surface = WgpuSurface;

    fn initialize(&mut self) -> Result<()> {
        if self.event_loop.is_none() {
            let event_loop = EventLoop::new()
                .map_err(|e| PlayerError::Initialization(format!("创建事件循环失败: {}", e)))?;
            self.event_loop = Some(event_loop);
        }
        if self.instance.is_none() {
            self.instance = Some(wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            }));
            info!("✅ 显示子系统初始化成功");
        }
        Ok(())
    }

    fn create_surface(&mut self, width: u32, height: u32, title: &str) -> Result<WgpuSurface> {
        let gpu = self.open_window(width, height, title)?;
        WgpuSurface::new(gpu, width, height)
    }

    fn poll_close_requested(&mut self) -> bool {
        self.pump(Duration::ZERO);
        self.close_requested
    }

    fn shutdown(&mut self) {
        if self.instance.take().is_some() {
            debug!("显示子系统已关闭");
        }
        self.close_requested = false;
        self.redraw_requested = false;
    }
}

/// 窗口 + wgpu 设备，视频和图片表面共用
struct GpuWindow {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    vertex_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    window: Arc<Window>,
}

impl GpuWindow {
    fn new(
        event_loop: &EventLoop<()>,
        instance: &wgpu::Instance,
        width: u32,
        height: u32,
        title: &str,
        vsync: bool,
    ) -> Result<Self> {
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .build(event_loop)
            .map_err(|e| PlayerError::Surface(format!("创建窗口失败: {}", e)))?;
        let window = Arc::new(window);

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| PlayerError::Surface(format!("创建 Surface 失败: {}", e)))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| PlayerError::Surface("未找到合适的 GPU 适配器".into()))?;

        debug!("GPU 适配器: {:?}", adapter.get_info());

        let max_dimension = adapter.limits().max_texture_dimension_2d;
        if width > max_dimension || height > max_dimension {
            return Err(PlayerError::Surface(format!(
                "尺寸 {}x{} 超出纹理上限 {}",
                width, height, max_dimension
            )));
        }

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Video Renderer Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            },
            None,
        ))
        .map_err(|e| PlayerError::Surface(format!("请求设备失败: {}", e)))?;

        let surface_caps = surface.get_capabilities(&adapter);
        // 着色器输出的就是已编码的颜色值，不需要再做 sRGB 转换
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| PlayerError::Surface("Surface 与适配器不兼容".into()))?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: select_present_mode(vsync, &surface_caps.present_modes),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        info!(
            "✓ 窗口已创建: {}x{}, 格式: {:?}, 呈现模式: {:?}",
            width, height, config.format, config.present_mode
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            vertex_buffer,
            sampler,
            window,
        })
    }

    fn create_texture(&self, label: &str, width: u32, height: u32, format: wgpu::TextureFormat) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn write_texture(&self, texture: &wgpu::Texture, data: &[u8], bytes_per_row: u32, width: u32, height: u32) {
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// 创建渲染管线：前 texture_count 个绑定为纹理，随后是采样器，
    /// `with_uniform` 时再追加一个片元着色器 uniform
    fn create_pipeline(
        &self,
        label: &str,
        source: &str,
        texture_count: u32,
        with_uniform: bool,
    ) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = (0..texture_count)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture_count,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        if with_uniform {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture_count + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &entries,
        });

        let render_pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        (pipeline, bind_group_layout)
    }

    fn create_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        textures: &[&wgpu::Texture],
        uniform: Option<&wgpu::Buffer>,
    ) -> wgpu::BindGroup {
        let views: Vec<wgpu::TextureView> = textures
            .iter()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();

        let mut entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: views.len() as u32,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        if let Some(buffer) = uniform {
            entries.push(wgpu::BindGroupEntry {
                binding: views.len() as u32 + 1,
                resource: buffer.as_entire_binding(),
            });
        }

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout,
            entries: &entries,
        })
    }

    /// 窗口尺寸变化后重新配置 Surface，最小化时（0 尺寸）跳过
    fn reconfigure(&mut self) {
        let size = self.window.inner_size();
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
        }
        self.surface.configure(&self.device, &self.config);
    }

    fn draw(&mut self, pipeline: &wgpu::RenderPipeline, bind_group: &wgpu::BindGroup) -> Result<()> {
        let size = self.window.inner_size();
        if size.width > 0
            && size.height > 0
            && (size.width != self.config.width || size.height != self.config.height)
        {
            self.reconfigure();
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface 已失效，重新配置");
                self.reconfigure();
                self.surface
                    .get_current_texture()
                    .map_err(|e| PlayerError::Surface(format!("获取 Surface 纹理失败: {}", e)))?
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("获取 Surface 纹理超时，跳过本帧");
                return Ok(());
            }
            Err(e) => return Err(PlayerError::Surface(format!("获取 Surface 纹理失败: {}", e))),
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..VERTICES.len() as u32, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// 视频表面：三张 R8 流式纹理（Y/U/V），着色器内完成 YUV → RGB
pub struct WgpuSurface {
    textures: [wgpu::Texture; 3],
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    _color_matrix: wgpu::Buffer,
    width: u32,
    height: u32,
    gpu: GpuWindow,
}

impl WgpuSurface {
    fn new(gpu: GpuWindow, width: u32, height: u32) -> Result<Self> {
        let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));
        let textures = [
            gpu.create_texture("Y Plane", width, height, wgpu::TextureFormat::R8Unorm),
            gpu.create_texture("U Plane", cw, ch, wgpu::TextureFormat::R8Unorm),
            gpu.create_texture("V Plane", cw, ch, wgpu::TextureFormat::R8Unorm),
        ];
        let coefficients = super::shader::color_matrix_for_height(height);
        debug!("YUV 矩阵系数 {:?}（{} 行）", coefficients, height);
        let color_matrix = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Color Matrix"),
            contents: bytemuck::cast_slice(&coefficients),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let (pipeline, layout) =
            gpu.create_pipeline("YUV Pipeline", super::shader::YUV_TO_RGB_SHADER, 3, true);
        let bind_group = gpu.create_bind_group(
            &layout,
            &[&textures[0], &textures[1], &textures[2]],
            Some(&color_matrix),
        );

        Ok(Self {
            textures,
            bind_group,
            pipeline,
            _color_matrix: color_matrix,
            width,
            height,
            gpu,
        })
    }
}

impl RenderSurface for WgpuSurface {
    fn upload(&mut self, frame: &ConvertedFrame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(PlayerError::Surface(format!(
                "帧尺寸 {}x{} 与纹理 {}x{} 不一致",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        for (texture, plane) in self.textures.iter().zip(frame.planes()) {
            self.gpu.write_texture(
                texture,
                plane.data(),
                plane.stride() as u32,
                plane.width() as u32,
                plane.height() as u32,
            );
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.gpu.draw(&self.pipeline, &self.bind_group)
    }
}

impl Drop for WgpuSurface {
    fn drop(&mut self) {
        debug!("销毁视频表面 {}x{}", self.width, self.height);
    }
}

/// 图片表面：一张 RGBA 纹理
pub struct PictureSurface {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    width: u32,
    height: u32,
    gpu: GpuWindow,
}

impl PictureSurface {
    fn new(gpu: GpuWindow, width: u32, height: u32) -> Result<Self> {
        let texture = gpu.create_texture("Picture Texture", width, height, wgpu::TextureFormat::Rgba8Unorm);
        let (pipeline, layout) = gpu.create_pipeline("RGBA Pipeline", super::shader::RGBA_SHADER, 1, false);
        let bind_group = gpu.create_bind_group(&layout, &[&texture], None);

        Ok(Self {
            texture,
            bind_group,
            pipeline,
            width,
            height,
            gpu,
        })
    }

    pub fn upload(&mut self, image: &image::RgbaImage) -> Result<()> {
        if image.dimensions() != (self.width, self.height) {
            return Err(PlayerError::Surface(format!(
                "图片尺寸 {:?} 与纹理 {}x{} 不一致",
                image.dimensions(),
                self.width,
                self.height
            )));
        }
        self.gpu
            .write_texture(&self.texture, image.as_raw(), 4 * self.width, self.width, self.height);
        Ok(())
    }

    pub fn present(&mut self) -> Result<()> {
        self.gpu.draw(&self.pipeline, &self.bind_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn vsync_always_uses_fifo() {
        let modes = [wgpu::PresentMode::Immediate, wgpu::PresentMode::Fifo];
        assert_eq!(select_present_mode(true, &modes), wgpu::PresentMode::Fifo);
    }

    #[rstest]
    #[case(&[wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate], wgpu::PresentMode::Immediate)]
    #[case(&[wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox], wgpu::PresentMode::Mailbox)]
    #[case(&[wgpu::PresentMode::Fifo], wgpu::PresentMode::Fifo)]
    fn no_vsync_prefers_unthrottled_modes(
        #[case] supported: &[wgpu::PresentMode],
        #[case] expected: wgpu::PresentMode,
    ) {
        assert_eq!(select_present_mode(false, supported), expected);
    }

    #[rstest]
    #[case((640, 480), (640, 480))]
    #[case((2560, 1600), (1280, 800))]
    #[case((4000, 1000), (1280, 320))]
    #[case((1000, 4000), (200, 800))]
    fn fit_keeps_aspect_ratio(#[case] size: (u32, u32), #[case] expected: (u32, u32)) {
        assert_eq!(fit_within(size.0, size.1, 1280, 800), expected);
    }

    #[test]
    fn fit_never_collapses_to_zero() {
        assert_eq!(fit_within(100_000, 1, 1280, 800), (1280, 1));
    }

    #[test]
    fn quad_covers_clip_space() {
        assert_eq!(VERTICES.len(), 6);
        for v in VERTICES {
            assert!(v.position.iter().all(|c| c.abs() == 1.0));
            assert!(v.tex_coords.iter().all(|c| *c == 0.0 || *c == 1.0));
        }
    }
}
