use crate::core::{ConvertedFrame, Result, StreamDescriptor};
use ffmpeg_next as ffmpeg;
use std::path::Path;

/// 可识别所属流的数据包
pub trait StreamPacket {
    fn stream_index(&self) -> usize;
}

impl StreamPacket for ffmpeg::Packet {
    fn stream_index(&self) -> usize {
        self.stream()
    }
}

/// Demuxer 数据源抽象接口
///
/// 读包是只进的：到达末尾后不能重新开始，需要重新打开。
pub trait DemuxerSource {
    type Packet: StreamPacket;

    /// 读取容器内所有流的描述
    fn probe_streams(&self) -> Result<Vec<StreamDescriptor>>;

    /// 读取下一个数据包
    ///
    /// 返回：
    /// - Ok(Some(packet)): 成功读取一个包
    /// - Ok(None): 到达文件末尾
    /// - Err(e): 读取错误
    fn read_packet(&mut self) -> Result<Option<Self::Packet>>;

    /// 获取描述信息（用于调试）
    fn description(&self) -> String;
}

/// 一次 drain 调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// 有一帧可用，通过 `frame()` 读取
    FrameReady,
    /// 需要提交下一个数据包（不是错误）
    NeedsInput,
    /// 输入已结束且缓冲帧已全部取出
    Finished,
}

/// 解码器：提交数据包 → 取出零到多帧
pub trait FrameDecoder {
    type Packet;
    type Frame;

    fn submit(&mut self, packet: &Self::Packet) -> Result<()>;

    /// 通知解码器输入结束，之后 drain 会吐出缓冲帧直到 Finished
    fn finish(&mut self) -> Result<()>;

    fn drain(&mut self) -> Result<DecodeStatus>;

    /// 最近一次 FrameReady 对应的帧，下一次 drain 会覆盖它
    fn frame(&self) -> &Self::Frame;
}

/// 像素格式转换：原生格式 → 平面 YUV 4:2:0
pub trait FrameConverter {
    type Frame;

    fn convert(&mut self, frame: &Self::Frame, out: &mut ConvertedFrame) -> Result<()>;
}

/// 媒体后端：负责创建各处理阶段
pub trait MediaBackend {
    type Source: DemuxerSource;
    type Decoder: FrameDecoder<Packet = <Self::Source as DemuxerSource>::Packet>;
    type Converter: FrameConverter<Frame = <Self::Decoder as FrameDecoder>::Frame>;

    fn initialize(&mut self) -> Result<()>;

    fn open_source(&mut self, path: &Path) -> Result<Self::Source>;

    fn open_decoder(
        &mut self,
        source: &Self::Source,
        stream: &StreamDescriptor,
    ) -> Result<Self::Decoder>;

    fn create_converter(&mut self, stream: &StreamDescriptor) -> Result<Self::Converter>;

    /// 释放子系统级资源
    fn shutdown(&mut self) {}
}
