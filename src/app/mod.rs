// 启动器：选择文件 → 交给播放管线或图片查看器

pub mod args;

pub use args::{Cli, Command};

use crate::core::{
    has_extension, FixedRatePacer, MediaKind, PlaybackOutcome, PlaybackRequest, PlayerConfig,
    StreamDescriptor, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
use crate::player::{DemuxerSource, FfmpegBackend, MediaBackend, PlaybackLoop};
use crate::renderer::{picture, WgpuDisplay};
use log::{info, warn};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// 用户要打开的内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Video,
    Picture,
}

impl SelectionKind {
    fn label(self) -> &'static str {
        match self {
            SelectionKind::Video => "视频文件",
            SelectionKind::Picture => "图片文件",
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            SelectionKind::Video => VIDEO_EXTENSIONS,
            SelectionKind::Picture => IMAGE_EXTENSIONS,
        }
    }
}

/// 一次选择：路径 + 类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub path: PathBuf,
    pub kind: SelectionKind,
}

/// 启动控制器
///
/// 持有显示子系统（整个进程只有一个事件循环），每次选择提交后
/// 同步运行对应的播放器，返回结束方式。
pub struct Launcher {
    config: PlayerConfig,
    display: WgpuDisplay,
}

impl Launcher {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            display: WgpuDisplay::new(&config),
            config,
        }
    }

    pub fn on_selection_committed(&mut self, selection: Selection) -> anyhow::Result<PlaybackOutcome> {
        if !has_extension(&selection.path, selection.kind.extensions()) {
            warn!(
                "文件扩展名与{}不符，仍尝试打开: {}",
                selection.kind.label(),
                selection.path.display()
            );
        }

        match selection.kind {
            SelectionKind::Video => {
                let pacer = FixedRatePacer::new(self.config.frame_interval());
                let mut player = PlaybackLoop::new(FfmpegBackend::new(), &mut self.display, pacer);
                let summary = player.run(&PlaybackRequest::new(selection.path))?;
                Ok(summary.outcome)
            }
            SelectionKind::Picture => {
                picture::show_picture(&mut self.display, &selection.path)?;
                Ok(PlaybackOutcome::Completed)
            }
        }
    }
}

/// 弹出文件选择对话框，取消时返回 None
pub fn prompt_for_path(kind: SelectionKind) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title(format!("打开{}", kind.label()))
        .add_filter(kind.label(), kind.extensions())
        .pick_file()
}

/// 进程退出码：0 播放完成，2 被中断
pub fn exit_status(outcome: PlaybackOutcome) -> u8 {
    match outcome {
        PlaybackOutcome::Completed => 0,
        PlaybackOutcome::Interrupted => 2,
    }
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    path: String,
    streams: &'a [StreamDescriptor],
}

/// 读取容器的流信息，返回文本或 JSON
pub fn probe(path: &Path, json: bool) -> anyhow::Result<String> {
    let mut backend = FfmpegBackend::new();
    backend.initialize()?;
    let streams = backend.open_source(path)?.probe_streams()?;

    if json {
        let report = ProbeReport {
            path: path.display().to_string(),
            streams: &streams,
        };
        return Ok(serde_json::to_string_pretty(&report)?);
    }
    Ok(format_streams(path, &streams))
}

pub fn format_streams(path: &Path, streams: &[StreamDescriptor]) -> String {
    let mut out = format!("{} ({} 个流)\n", path.display(), streams.len());
    for stream in streams {
        let _ = write!(out, "  #{} {:?} {}", stream.index, stream.kind, stream.codec);
        if stream.kind == MediaKind::Video {
            let _ = write!(out, " {}x{} {:?}", stream.width, stream.height, stream.pixel_format);
            if let Some(fps) = stream.frame_rate {
                let _ = write!(out, " {:.2} fps", fps);
            }
        }
        out.push('\n');
    }
    out
}

/// 执行命令行请求
pub fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = cli.config();
    match cli.command {
        Command::Probe(args) => {
            print!("{}", probe(&args.path, args.json)?);
            if args.json {
                println!();
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Video(args) => launch(config, args.path, SelectionKind::Video),
        Command::Picture(args) => launch(config, args.path, SelectionKind::Picture),
    }
}

fn launch(config: PlayerConfig, path: Option<PathBuf>, kind: SelectionKind) -> anyhow::Result<ExitCode> {
    let Some(path) = path.or_else(|| prompt_for_path(kind)) else {
        info!("未选择文件，退出");
        return Ok(ExitCode::SUCCESS);
    };

    let mut launcher = Launcher::new(config);
    let outcome = launcher.on_selection_committed(Selection { path, kind })?;
    Ok(ExitCode::from(exit_status(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PixelFormat;

    #[test]
    fn interrupted_exit_is_distinct() {
        assert_eq!(exit_status(PlaybackOutcome::Completed), 0);
        assert_eq!(exit_status(PlaybackOutcome::Interrupted), 2);
    }

    #[test]
    fn selection_kinds_filter_their_extensions() {
        assert!(SelectionKind::Video.extensions().contains(&"mkv"));
        assert!(SelectionKind::Picture.extensions().contains(&"png"));
        assert!(!SelectionKind::Picture.extensions().contains(&"mp4"));
    }

    #[test]
    fn stream_table_lists_video_geometry() {
        let streams = vec![
            StreamDescriptor {
                index: 0,
                kind: MediaKind::Video,
                codec: "h264".into(),
                width: 1920,
                height: 1080,
                pixel_format: PixelFormat::YUV420P,
                frame_rate: Some(29.97),
            },
            StreamDescriptor {
                index: 1,
                kind: MediaKind::Audio,
                codec: "aac".into(),
                width: 0,
                height: 0,
                pixel_format: PixelFormat::Unknown,
                frame_rate: None,
            },
        ];

        let text = format_streams(Path::new("clip.mp4"), &streams);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "clip.mp4 (2 个流)");
        assert_eq!(lines[1], "  #0 Video h264 1920x1080 YUV420P 29.97 fps");
        assert_eq!(lines[2], "  #1 Audio aac");
    }

    #[test]
    fn stream_table_of_missing_file_fails() {
        assert!(probe(Path::new("/nonexistent/clip.mp4"), false).is_err());
    }
}
