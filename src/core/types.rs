use crate::core::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 转换缓冲区的行对齐（字节）
pub const PLANE_ALIGN: usize = 32;

/// 默认目标帧率
pub const DEFAULT_TARGET_FPS: u32 = 30;

/// 流的媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    Unknown,
}

/// 像素格式（解码器原生格式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    YUV420P,
    YUVJ420P,
    YUV422P,
    YUV444P,
    NV12,
    RGB,
    RGBA,
    Other,
    Unknown,
}

/// 容器内单个流的描述（探测后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub index: usize,
    pub kind: MediaKind,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// 容器声明的平均帧率，仅用于展示
    pub frame_rate: Option<f64>,
}

impl StreamDescriptor {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

/// 选择第一个视频流（不做分辨率/编码优选）
pub fn select_video_stream(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    streams.iter().find(|s| s.is_video())
}

/// 播放请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub path: PathBuf,
}

impl PlaybackRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 窗口标题即文件路径
    pub fn title(&self) -> String {
        self.path.display().to_string()
    }
}

/// 播放结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackOutcome {
    /// 播放到流末尾
    Completed,
    /// 用户关闭窗口或请求停止
    Interrupted,
}

/// 一次播放的结果统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSummary {
    pub outcome: PlaybackOutcome,
    pub frames_presented: u64,
    /// 所选视频流的数据包数
    pub packets_read: u64,
    /// 其他流被丢弃的数据包数
    pub packets_skipped: u64,
}

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Opening,
    Playing,
    Finished,
    Interrupted,
    Failed,
}

/// 运行时配置（来自命令行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub target_fps: u32,
    pub vsync: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            vsync: true,
        }
    }
}

impl PlayerConfig {
    /// 固定帧间隔：1000 / fps 毫秒（整数除法）
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.target_fps.max(1)))
    }
}

/// 单个图像平面
#[derive(Debug, Clone)]
pub struct Plane {
    data: Vec<u8>,
    width: usize,
    height: usize,
    stride: usize,
}

impl Plane {
    fn allocate(width: usize, height: usize) -> Result<Self> {
        let stride = align_up(width, PLANE_ALIGN);
        let len = stride * height;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| PlayerError::Allocation(format!("平面缓冲 {}x{}: {}", width, height, e)))?;
        data.resize(len, 0);
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// 按行复制源数据（源行距可以与本平面不同）
    pub fn copy_rows(&mut self, src: &[u8], src_stride: usize) {
        let row_len = self.width.min(src_stride);
        for y in 0..self.height {
            let src_offset = y * src_stride;
            if src_offset + row_len > src.len() {
                break;
            }
            let dst_offset = y * self.stride;
            self.data[dst_offset..dst_offset + row_len]
                .copy_from_slice(&src[src_offset..src_offset + row_len]);
        }
    }
}

/// 平面 YUV 4:2:0 帧
///
/// 缓冲区在播放开始时分配一次，之后每帧复用；行距在分配时确定。
#[derive(Debug, Clone)]
pub struct ConvertedFrame {
    width: u32,
    height: u32,
    planes: [Plane; 3],
}

impl ConvertedFrame {
    pub fn allocate(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PlayerError::Allocation(format!(
                "无效的帧尺寸 {}x{}",
                width, height
            )));
        }

        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));

        Ok(Self {
            width,
            height,
            planes: [
                Plane::allocate(w, h)?,
                Plane::allocate(cw, ch)?,
                Plane::allocate(cw, ch)?,
            ],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn planes(&self) -> &[Plane; 3] {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut [Plane; 3] {
        &mut self.planes
    }

    pub fn y(&self) -> &Plane {
        &self.planes[0]
    }

    pub fn u(&self) -> &Plane {
        &self.planes[1]
    }

    pub fn v(&self) -> &Plane {
        &self.planes[2]
    }
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// 常见视频扩展名（文件对话框过滤用）
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv", "ts", "m4v"];

/// 常见图片扩展名
pub const IMAGE_EXTENSIONS: &[&str] = &["bmp", "png", "jpg", "jpeg", "gif", "webp", "tiff"];

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stream(index: usize, kind: MediaKind) -> StreamDescriptor {
        StreamDescriptor {
            index,
            kind,
            codec: "h264".into(),
            width: 320,
            height: 240,
            pixel_format: PixelFormat::YUV420P,
            frame_rate: Some(30.0),
        }
    }

    #[rstest]
    #[case(320, 240, 320, 160)]
    #[case(321, 241, 352, 192)]
    #[case(1920, 1080, 1920, 960)]
    #[case(1, 1, 32, 32)]
    fn strides_are_aligned(
        #[case] width: u32,
        #[case] height: u32,
        #[case] luma_stride: usize,
        #[case] chroma_stride: usize,
    ) {
        let frame = ConvertedFrame::allocate(width, height).unwrap();
        assert_eq!(frame.y().stride(), luma_stride);
        assert_eq!(frame.u().stride(), chroma_stride);
        assert_eq!(frame.v().stride(), chroma_stride);
        assert_eq!(frame.y().stride() % PLANE_ALIGN, 0);
    }

    #[test]
    fn chroma_planes_round_up_odd_sizes() {
        let frame = ConvertedFrame::allocate(5, 3).unwrap();
        assert_eq!((frame.y().width(), frame.y().height()), (5, 3));
        assert_eq!((frame.u().width(), frame.u().height()), (3, 2));
        assert_eq!((frame.v().width(), frame.v().height()), (3, 2));
    }

    #[test]
    fn zero_size_is_an_allocation_error() {
        let err = ConvertedFrame::allocate(0, 240).unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::Allocation);
    }

    #[test]
    fn copy_rows_repacks_to_own_stride() {
        let mut frame = ConvertedFrame::allocate(4, 2).unwrap();
        // 源行距 6，每行末尾两个字节为填充
        let src = [1, 2, 3, 4, 99, 99, 5, 6, 7, 8, 99, 99];
        frame.planes_mut()[0].copy_rows(&src, 6);
        assert_eq!(frame.y().row(0), &[1, 2, 3, 4]);
        assert_eq!(frame.y().row(1), &[5, 6, 7, 8]);
    }

    #[test]
    fn copy_rows_stops_at_short_source() {
        let mut frame = ConvertedFrame::allocate(4, 2).unwrap();
        frame.planes_mut()[0].copy_rows(&[9, 9, 9, 9], 4);
        assert_eq!(frame.y().row(0), &[9, 9, 9, 9]);
        assert_eq!(frame.y().row(1), &[0, 0, 0, 0]);
    }

    #[test]
    fn first_video_stream_is_selected() {
        let streams = vec![
            stream(0, MediaKind::Audio),
            stream(1, MediaKind::Video),
            stream(2, MediaKind::Video),
        ];
        assert_eq!(select_video_stream(&streams).map(|s| s.index), Some(1));
    }

    #[test]
    fn audio_only_has_no_selection() {
        let streams = vec![stream(0, MediaKind::Audio)];
        assert!(select_video_stream(&streams).is_none());
    }

    #[rstest]
    #[case(30, 33)]
    #[case(60, 16)]
    #[case(24, 41)]
    #[case(0, 1000)]
    fn frame_interval_uses_integer_division(#[case] fps: u32, #[case] millis: u64) {
        let config = PlayerConfig {
            target_fps: fps,
            ..Default::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(millis));
    }

    #[test]
    fn request_title_is_path() {
        let request = PlaybackRequest::new("/videos/clip.mp4");
        assert_eq!(request.title(), "/videos/clip.mp4");
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_extension(Path::new("a/B.MKV"), VIDEO_EXTENSIONS));
        assert!(!has_extension(Path::new("a/b.txt"), VIDEO_EXTENSIONS));
        assert!(!has_extension(Path::new("a/noext"), IMAGE_EXTENSIONS));
    }
}
