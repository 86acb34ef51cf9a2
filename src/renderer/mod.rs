// 渲染模块

pub mod shader;
pub mod wgpu_renderer;
pub mod picture;

pub use wgpu_renderer::{PictureSurface, WgpuDisplay, WgpuSurface};

use crate::core::{ConvertedFrame, Result};

/// 显示子系统：创建窗口表面并收集窗口事件
pub trait Display {
    type Surface: RenderSurface;

    fn initialize(&mut self) -> Result<()>;

    /// 创建指定尺寸的表面（窗口 + 流式纹理）
    fn create_surface(&mut self, width: u32, height: u32, title: &str) -> Result<Self::Surface>;

    /// 处理挂起的窗口事件，返回是否收到关闭请求
    fn poll_close_requested(&mut self) -> bool;

    fn shutdown(&mut self);
}

/// 渲染表面：每帧先 upload 再 present
pub trait RenderSurface {
    fn upload(&mut self, frame: &ConvertedFrame) -> Result<()>;

    fn present(&mut self) -> Result<()>;
}
