//! zplayer：轻量级本地视频/图片播放器
//!
//! 解码管线：Demuxer → VideoDecoder → Yuv420Converter → WgpuSurface，
//! 由 `player::PlaybackLoop` 单线程驱动。

pub mod app;
pub mod core;
pub mod player;
pub mod renderer;
