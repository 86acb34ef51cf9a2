use anyhow::Result;
use clap::Parser;
use log::info;
use std::process::ExitCode;
use zplayer::app::{self, Cli};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        // 过滤掉 wgpu_hal 和 wgpu_core 的警告日志，减少日志噪音
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .filter_module("wgpu_core", log::LevelFilter::Error)
        .filter_module("naga", log::LevelFilter::Error)
        .init();

    info!("🎬 zplayer 启动");

    app::run(cli)
}
