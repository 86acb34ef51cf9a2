use crate::core::{PlayerError, Result, StreamDescriptor};
use crate::player::converter::Yuv420Converter;
use crate::player::decoder::VideoDecoder;
use crate::player::demuxer::Demuxer;
use crate::player::demuxer_source::MediaBackend;
use log::info;
use std::path::Path;

/// 基于 FFmpeg 的媒体后端
#[derive(Debug, Default)]
pub struct FfmpegBackend {
    initialized: bool,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaBackend for FfmpegBackend {
    type Source = Demuxer;
    type Decoder = VideoDecoder;
    type Converter = Yuv420Converter;

    fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        ffmpeg_next::init()
            .map_err(|e| PlayerError::Initialization(format!("FFmpeg 初始化失败: {}", e)))?;
        info!("✅ FFmpeg 初始化成功");
        self.initialized = true;
        Ok(())
    }

    fn open_source(&mut self, path: &Path) -> Result<Demuxer> {
        Demuxer::open(path)
    }

    fn open_decoder(&mut self, source: &Demuxer, stream: &StreamDescriptor) -> Result<VideoDecoder> {
        let parameters = source
            .stream_parameters(stream.index)
            .ok_or_else(|| PlayerError::Probe(format!("流 #{} 不存在", stream.index)))?;
        VideoDecoder::open(parameters, stream)
    }

    fn create_converter(&mut self, stream: &StreamDescriptor) -> Result<Yuv420Converter> {
        Yuv420Converter::new(stream)
    }
}
