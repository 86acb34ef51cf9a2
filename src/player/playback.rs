use crate::core::{
    select_video_stream, ConvertedFrame, Pacer, PlaybackOutcome, PlaybackRequest, PlaybackState,
    PlaybackSummary, PlayerError, Result,
};
use crate::player::demuxer_source::{
    DecodeStatus, DemuxerSource, FrameConverter, FrameDecoder, MediaBackend, StreamPacket,
};
use crate::renderer::{Display, RenderSurface};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 停止播放的句柄，可以跨线程克隆
///
/// 播放循环每呈现一帧检查一次，每次运行结束后自动复位。
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// 一次播放持有的全部资源
///
/// 字段按释放顺序排列，`teardown` 逐个释放，`Drop` 兜底。
struct Session<M: MediaBackend, S: RenderSurface> {
    surface: Option<S>,
    converted: Option<ConvertedFrame>,
    converter: Option<M::Converter>,
    decoder: Option<M::Decoder>,
    source: Option<M::Source>,
}

impl<M: MediaBackend, S: RenderSurface> Session<M, S> {
    fn new() -> Self {
        Self {
            surface: None,
            converted: None,
            converter: None,
            decoder: None,
            source: None,
        }
    }

    /// 按获取的逆序释放，返回实际释放的资源（已释放的不会重复释放）
    fn teardown(&mut self) -> Vec<&'static str> {
        let mut released = Vec::new();
        if self.surface.take().is_some() {
            released.push("显示表面");
        }
        if self.converted.take().is_some() {
            released.push("帧缓冲");
        }
        if self.converter.take().is_some() {
            released.push("像素转换器");
        }
        if self.decoder.take().is_some() {
            released.push("解码上下文");
        }
        if self.source.take().is_some() {
            released.push("媒体源");
        }
        if !released.is_empty() {
            debug!("🧹 已释放: {}", released.join(" → "));
        }
        released
    }
}

impl<M: MediaBackend, S: RenderSurface> Drop for Session<M, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// 播放过程中借用的各处理阶段
struct Stages<'s, M: MediaBackend, S> {
    source: &'s mut M::Source,
    decoder: &'s mut M::Decoder,
    converter: &'s mut M::Converter,
    converted: &'s mut ConvertedFrame,
    surface: &'s mut S,
}

/// 一轮 drain 的结果
enum Drained {
    NeedsInput,
    Finished,
    Interrupted,
}

/// 播放循环：读包 → 解码 → 转换 → 上传/呈现 → 节奏控制 → 检查取消
///
/// 单线程顺序执行。无论正常结束、被中断还是出错，都会按获取的逆序
/// 释放资源：显示表面 → 帧缓冲 → 解码上下文 → 媒体源 → 子系统。
pub struct PlaybackLoop<'d, M: MediaBackend, V: Display, P: Pacer> {
    media: M,
    display: &'d mut V,
    pacer: P,
    stop: StopHandle,
    state: PlaybackState,
}

impl<'d, M: MediaBackend, V: Display, P: Pacer> PlaybackLoop<'d, M, V, P> {
    pub fn new(media: M, display: &'d mut V, pacer: P) -> Self {
        Self {
            media,
            display,
            pacer,
            stop: StopHandle::new(),
            state: PlaybackState::Idle,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// 播放一个文件直到结束、被取消或出错
    pub fn run(&mut self, request: &PlaybackRequest) -> Result<PlaybackSummary> {
        info!("▶️ 开始播放: {}", request.path.display());
        self.state = PlaybackState::Opening;

        let result = self.execute(request);
        self.stop.reset();

        match &result {
            Ok(summary) => {
                self.state = match summary.outcome {
                    PlaybackOutcome::Completed => PlaybackState::Finished,
                    PlaybackOutcome::Interrupted => PlaybackState::Interrupted,
                };
                info!(
                    "⏹️ 播放结束 ({:?}): 呈现 {} 帧, 视频包 {}, 丢弃 {}",
                    summary.outcome,
                    summary.frames_presented,
                    summary.packets_read,
                    summary.packets_skipped
                );
            }
            Err(e) => {
                self.state = PlaybackState::Failed;
                error!("❌ 播放失败: {}", e);
            }
        }
        result
    }

    fn execute(&mut self, request: &PlaybackRequest) -> Result<PlaybackSummary> {
        self.media.initialize()?;
        if let Err(e) = self.display.initialize() {
            self.media.shutdown();
            return Err(e);
        }

        let mut session = Session::<M, V::Surface>::new();
        let result = self.drive(request, &mut session);
        session.teardown();

        self.display.shutdown();
        self.media.shutdown();
        result
    }

    fn drive(
        &mut self,
        request: &PlaybackRequest,
        session: &mut Session<M, V::Surface>,
    ) -> Result<PlaybackSummary> {
        let source = session.source.insert(self.media.open_source(&request.path)?);
        info!("📂 已打开: {}", source.description());

        let streams = source.probe_streams()?;
        let stream = select_video_stream(&streams).cloned().ok_or_else(|| {
            PlayerError::StreamNotFound(format!("{} (共 {} 个流)", request.title(), streams.len()))
        })?;
        info!(
            "🎬 选择视频流 #{}: {} {}x{}",
            stream.index, stream.codec, stream.width, stream.height
        );

        let decoder = session
            .decoder
            .insert(self.media.open_decoder(source, &stream)?);
        let converter = session
            .converter
            .insert(self.media.create_converter(&stream)?);
        let converted = session
            .converted
            .insert(ConvertedFrame::allocate(stream.width, stream.height)?);
        let surface = session.surface.insert(self.display.create_surface(
            stream.width,
            stream.height,
            &request.title(),
        )?);

        self.state = PlaybackState::Playing;
        let mut stages = Stages::<M, V::Surface> {
            source,
            decoder,
            converter,
            converted,
            surface,
        };

        let mut summary = PlaybackSummary {
            outcome: PlaybackOutcome::Completed,
            frames_presented: 0,
            packets_read: 0,
            packets_skipped: 0,
        };
        let mut input_finished = false;

        loop {
            if !input_finished {
                match stages.source.read_packet()? {
                    Some(packet) => {
                        if packet.stream_index() != stream.index {
                            summary.packets_skipped += 1;
                            continue;
                        }
                        summary.packets_read += 1;
                        stages.decoder.submit(&packet)?;
                    }
                    None => {
                        debug!("数据包读取完毕，冲刷解码器");
                        stages.decoder.finish()?;
                        input_finished = true;
                    }
                }
            }

            match self.drain(&mut stages, &mut summary)? {
                Drained::NeedsInput if !input_finished => {}
                Drained::NeedsInput | Drained::Finished => return Ok(summary),
                Drained::Interrupted => {
                    summary.outcome = PlaybackOutcome::Interrupted;
                    return Ok(summary);
                }
            }
        }
    }

    /// 取出解码器当前能给出的所有帧并逐帧呈现
    fn drain(
        &mut self,
        stages: &mut Stages<'_, M, V::Surface>,
        summary: &mut PlaybackSummary,
    ) -> Result<Drained> {
        loop {
            match stages.decoder.drain()? {
                DecodeStatus::NeedsInput => return Ok(Drained::NeedsInput),
                DecodeStatus::Finished => return Ok(Drained::Finished),
                DecodeStatus::FrameReady => {
                    stages
                        .converter
                        .convert(stages.decoder.frame(), stages.converted)?;
                    stages.surface.upload(stages.converted)?;
                    stages.surface.present()?;
                    summary.frames_presented += 1;
                    if summary.frames_presented % 300 == 0 {
                        debug!("已呈现 {} 帧", summary.frames_presented);
                    }

                    self.pacer.pace();
                    if self.cancellation_requested() {
                        info!("⏸️ 收到取消请求，停止播放");
                        return Ok(Drained::Interrupted);
                    }
                }
            }
        }
    }

    fn cancellation_requested(&mut self) -> bool {
        // 两个来源都要检查，窗口事件需要每帧 pump
        let closed = self.display.poll_close_requested();
        let stopped = self.stop.is_stop_requested();
        closed || stopped
    }
}
