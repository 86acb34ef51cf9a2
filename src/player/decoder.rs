use crate::core::{PlayerError, Result, StreamDescriptor};
use crate::player::demuxer_source::{DecodeStatus, FrameDecoder};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::error::EAGAIN;
use ffmpeg_next::{codec, util};
use log::{debug, info};

/// 视频解码器（软件解码）
///
/// 解码帧缓冲只分配一次，每次 `drain` 都会覆盖它。
pub struct VideoDecoder {
    decoder: codec::decoder::Video,
    frame: util::frame::Video,
    codec_name: String,
    input_finished: bool,
}

impl VideoDecoder {
    /// 从流参数创建解码器
    pub fn open(parameters: codec::Parameters, stream: &StreamDescriptor) -> Result<Self> {
        let codec_id = parameters.id();
        if ffmpeg::decoder::find(codec_id).is_none() {
            return Err(PlayerError::UnsupportedCodec(stream.codec.clone()));
        }

        let context = codec::context::Context::from_parameters(parameters).map_err(|e| {
            PlayerError::Context(format!("无法复制编解码参数 ({}): {}", stream.codec, e))
        })?;
        let decoder = context.decoder().video().map_err(|e| match e {
            ffmpeg::Error::DecoderNotFound => PlayerError::UnsupportedCodec(stream.codec.clone()),
            other => PlayerError::Context(format!("无法打开解码器 ({}): {}", stream.codec, other)),
        })?;

        info!(
            "创建视频解码器: {} {}x{}, 格式: {:?}",
            stream.codec,
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        Ok(Self {
            decoder,
            frame: util::frame::Video::empty(),
            codec_name: stream.codec.clone(),
            input_finished: false,
        })
    }
}

impl FrameDecoder for VideoDecoder {
    type Packet = ffmpeg::Packet;
    type Frame = util::frame::Video;

    fn submit(&mut self, packet: &ffmpeg::Packet) -> Result<()> {
        self.decoder.send_packet(packet).map_err(|e| {
            PlayerError::Decode(format!(
                "提交数据包失败 ({}, pts={:?}): {}",
                self.codec_name,
                packet.pts(),
                e
            ))
        })
    }

    fn finish(&mut self) -> Result<()> {
        if self.input_finished {
            return Ok(());
        }
        self.input_finished = true;
        debug!("视频解码器输入结束，开始冲刷缓冲帧");
        self.decoder
            .send_eof()
            .map_err(|e| PlayerError::Decode(format!("冲刷解码器失败: {}", e)))
    }

    fn drain(&mut self) -> Result<DecodeStatus> {
        match self.decoder.receive_frame(&mut self.frame) {
            Ok(()) => Ok(DecodeStatus::FrameReady),
            Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => Ok(DecodeStatus::NeedsInput),
            Err(ffmpeg::Error::Eof) => Ok(DecodeStatus::Finished),
            Err(e) => Err(PlayerError::Decode(format!("{}: {}", self.codec_name, e))),
        }
    }

    fn frame(&self) -> &util::frame::Video {
        &self.frame
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        debug!("释放解码上下文: {}", self.codec_name);
    }
}
