use crate::core::{MediaKind, PixelFormat, PlayerError, Result, StreamDescriptor};
use crate::player::demuxer_source::DemuxerSource;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::ffi;
use ffmpeg_next::util::error::EAGAIN;
use ffmpeg_next::{codec, format, media};
use log::{debug, info};
use std::ffi::CString;
use std::path::Path;
use std::ptr;

/// 解封装器 - 持有媒体文件的唯一句柄
pub struct Demuxer {
    input_ctx: format::context::Input,
    source_path: String,
}

impl Demuxer {
    /// 打开媒体文件
    pub fn open(path: &Path) -> Result<Self> {
        let source_path = path.display().to_string();
        info!("正在打开文件: {}", source_path);

        let input_ctx = open_input(path, &source_path)?;

        debug!(
            "容器: {}, 流数量: {}",
            input_ctx.format().name(),
            input_ctx.nb_streams()
        );

        Ok(Self {
            input_ctx,
            source_path,
        })
    }

    /// 获取指定流的编解码参数
    pub fn stream_parameters(&self, index: usize) -> Option<codec::Parameters> {
        self.input_ctx.stream(index).map(|s| s.parameters())
    }
}

/// 打开容器并读取流信息
///
/// 与 `format::input` 相同的两步，但分别报错：容器头读不出来是 Open，
/// 流信息读不出来是 Probe。
fn open_input(path: &Path, source_path: &str) -> Result<format::context::Input> {
    let c_path = path
        .to_str()
        .and_then(|p| CString::new(p).ok())
        .ok_or_else(|| PlayerError::Open {
            path: source_path.to_string(),
            reason: "路径包含无效字符".into(),
        })?;

    unsafe {
        let mut ctx: *mut ffi::AVFormatContext = ptr::null_mut();
        let ret = ffi::avformat_open_input(&mut ctx, c_path.as_ptr(), ptr::null_mut(), ptr::null_mut());
        if ret < 0 {
            return Err(open_error(source_path, ffmpeg::Error::from(ret)));
        }

        let ret = ffi::avformat_find_stream_info(ctx, ptr::null_mut());
        if ret < 0 {
            ffi::avformat_close_input(&mut ctx);
            return Err(stream_info_error(source_path, ffmpeg::Error::from(ret)));
        }

        Ok(format::context::Input::wrap(ctx))
    }
}

fn open_error(source_path: &str, error: ffmpeg::Error) -> PlayerError {
    PlayerError::Open {
        path: source_path.to_string(),
        reason: error.to_string(),
    }
}

fn stream_info_error(source_path: &str, error: ffmpeg::Error) -> PlayerError {
    PlayerError::Probe(format!("{} 无法读取流信息: {}", source_path, error))
}

impl DemuxerSource for Demuxer {
    type Packet = ffmpeg::Packet;

    fn probe_streams(&self) -> Result<Vec<StreamDescriptor>> {
        self.input_ctx
            .streams()
            .map(|stream| describe_stream(&stream))
            .collect()
    }

    fn read_packet(&mut self) -> Result<Option<ffmpeg::Packet>> {
        let mut packet = ffmpeg::Packet::empty();
        loop {
            match packet.read(&mut self.input_ctx) {
                Ok(()) => return Ok(Some(packet)),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => continue,
                Err(e) => return Err(PlayerError::Read(format!("{}: {}", self.source_path, e))),
            }
        }
    }

    fn description(&self) -> String {
        format!("FFmpeg Demuxer: {}", self.source_path)
    }
}

impl Drop for Demuxer {
    fn drop(&mut self) {
        debug!("关闭媒体源: {}", self.source_path);
    }
}

fn describe_stream(stream: &format::stream::Stream) -> Result<StreamDescriptor> {
    let index = stream.index();
    let parameters = stream.parameters();
    let kind = MediaKind::from(parameters.medium());
    let codec = parameters.id().name().to_string();

    let (width, height, pixel_format) = if kind == MediaKind::Video {
        // 只把参数复制进未打开的上下文，不查找解码器
        let context = codec::context::Context::from_parameters(parameters)
            .map_err(|e| PlayerError::Probe(format!("流 #{} 参数无效: {}", index, e)))?;
        let raw = unsafe { &*context.as_ptr() };
        (
            raw.width.max(0) as u32,
            raw.height.max(0) as u32,
            PixelFormat::from(format::Pixel::from(raw.pix_fmt)),
        )
    } else {
        (0, 0, PixelFormat::Unknown)
    };

    let rate = stream.avg_frame_rate();
    let frame_rate = (rate.numerator() > 0 && rate.denominator() > 0)
        .then(|| rate.numerator() as f64 / rate.denominator() as f64);

    Ok(StreamDescriptor {
        index,
        kind,
        codec,
        width,
        height,
        pixel_format,
        frame_rate,
    })
}

impl From<media::Type> for MediaKind {
    fn from(medium: media::Type) -> Self {
        match medium {
            media::Type::Video => MediaKind::Video,
            media::Type::Audio => MediaKind::Audio,
            media::Type::Subtitle => MediaKind::Subtitle,
            media::Type::Data => MediaKind::Data,
            media::Type::Attachment => MediaKind::Attachment,
            media::Type::Unknown => MediaKind::Unknown,
        }
    }
}

impl From<format::Pixel> for PixelFormat {
    fn from(pixel: format::Pixel) -> Self {
        match pixel {
            format::Pixel::YUV420P => PixelFormat::YUV420P,
            format::Pixel::YUVJ420P => PixelFormat::YUVJ420P,
            format::Pixel::YUV422P => PixelFormat::YUV422P,
            format::Pixel::YUV444P => PixelFormat::YUV444P,
            format::Pixel::NV12 => PixelFormat::NV12,
            format::Pixel::RGB24 => PixelFormat::RGB,
            format::Pixel::RGBA => PixelFormat::RGBA,
            format::Pixel::None => PixelFormat::Unknown,
            _ => PixelFormat::Other,
        }
    }
}
