// 播放器核心模块

pub mod backend;
pub mod converter;
pub mod decoder;
pub mod demuxer;
pub mod demuxer_source;
pub mod playback;

pub use backend::FfmpegBackend;
pub use converter::Yuv420Converter;
pub use decoder::VideoDecoder;
pub use demuxer::Demuxer;
pub use demuxer_source::{
    DecodeStatus, DemuxerSource, FrameConverter, FrameDecoder, MediaBackend, StreamPacket,
};
pub use playback::{PlaybackLoop, StopHandle};
