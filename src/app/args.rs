use crate::core::{PlayerConfig, DEFAULT_TARGET_FPS};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// 轻量级本地视频/图片播放器
#[derive(Parser, Debug)]
#[command(name = "zplayer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 目标帧率（固定间隔节奏）
    #[arg(long, global = true, default_value_t = DEFAULT_TARGET_FPS,
          value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// 关闭垂直同步
    #[arg(long, global = true)]
    pub no_vsync: bool,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 播放视频
    Video(OpenArgs),
    /// 查看图片
    Picture(OpenArgs),
    /// 列出容器中的流
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// 文件路径，省略时弹出文件选择对话框
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// 媒体文件路径
    pub path: PathBuf,

    /// 以 JSON 格式输出
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn config(&self) -> PlayerConfig {
        PlayerConfig {
            target_fps: self.fps,
            vsync: !self.no_vsync,
        }
    }
}
