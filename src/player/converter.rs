use crate::core::{ConvertedFrame, PlayerError, Result, StreamDescriptor};
use crate::player::demuxer_source::FrameConverter;
use ffmpeg_next::ffi;
use ffmpeg_next::{software, util};
use log::{debug, warn};
use std::os::raw::c_int;
use std::ptr;

type SourceGeometry = (util::format::Pixel, u32, u32);

/// 像素格式转换器：任意原生格式 → YUV420P（双线性）
///
/// 输出尺寸固定为所选视频流的尺寸，直接写入 `ConvertedFrame` 的平面。
/// scaler 在收到第一帧时按帧的实际格式创建；若中途帧格式或尺寸变化则重建。
pub struct Yuv420Converter {
    scaler: Option<software::scaling::Context>,
    source: Option<SourceGeometry>,
    width: u32,
    height: u32,
}

impl Yuv420Converter {
    pub fn new(stream: &StreamDescriptor) -> Result<Self> {
        if stream.width == 0 || stream.height == 0 {
            return Err(PlayerError::Allocation(format!(
                "视频流 #{} 尺寸未知",
                stream.index
            )));
        }

        Ok(Self {
            scaler: None,
            source: None,
            width: stream.width,
            height: stream.height,
        })
    }

    fn prepare(&mut self, geometry: SourceGeometry) -> Result<&mut software::scaling::Context> {
        if self.source != Some(geometry) {
            if let Some(previous) = self.source {
                warn!("解码帧格式变化: {:?} → {:?}，重建 scaler", previous, geometry);
            }

            let (format, width, height) = geometry;
            let scaler = software::scaling::Context::get(
                format,
                width,
                height,
                util::format::Pixel::YUV420P,
                self.width,
                self.height,
                software::scaling::Flags::BILINEAR,
            )
            .map_err(|e| PlayerError::Allocation(format!("无法创建像素转换上下文: {}", e)))?;

            debug!(
                "像素转换: {:?} {}x{} → YUV420P {}x{}",
                format, width, height, self.width, self.height
            );
            self.scaler = Some(scaler);
            self.source = Some(geometry);
        }

        self.scaler
            .as_mut()
            .ok_or_else(|| PlayerError::Allocation("像素转换上下文未初始化".into()))
    }
}

impl FrameConverter for Yuv420Converter {
    type Frame = util::frame::Video;

    fn convert(&mut self, frame: &util::frame::Video, out: &mut ConvertedFrame) -> Result<()> {
        if (out.width(), out.height()) != (self.width, self.height) {
            return Err(PlayerError::Allocation(format!(
                "帧缓冲 {}x{} 与输出 {}x{} 不一致",
                out.width(),
                out.height(),
                self.width,
                self.height
            )));
        }

        let source_height = frame.height();
        let scaler = self.prepare((frame.format(), frame.width(), source_height))?;

        let [y, u, v] = out.planes_mut();
        let dst_stride: [c_int; 4] = [y.stride() as c_int, u.stride() as c_int, v.stride() as c_int, 0];
        let dst: [*mut u8; 4] = [
            y.data_mut().as_mut_ptr(),
            u.data_mut().as_mut_ptr(),
            v.data_mut().as_mut_ptr(),
            ptr::null_mut(),
        ];

        // 直接缩放进平面缓冲，行距在分配时已按 32 字节对齐
        let written = unsafe {
            let src = &*frame.as_ptr();
            ffi::sws_scale(
                scaler.as_mut_ptr(),
                src.data.as_ptr() as *const *const u8,
                src.linesize.as_ptr(),
                0,
                source_height as c_int,
                dst.as_ptr(),
                dst_stride.as_ptr(),
            )
        };

        if written < 0 {
            return Err(PlayerError::Decode(format!(
                "像素格式转换失败: {}",
                ffmpeg_next::Error::from(written)
            )));
        }
        Ok(())
    }
}

impl Drop for Yuv420Converter {
    fn drop(&mut self) {
        debug!("释放像素转换器 {}x{}", self.width, self.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, MediaKind, PixelFormat};
    use util::format::Pixel;

    fn stream(width: u32, height: u32) -> StreamDescriptor {
        StreamDescriptor {
            index: 0,
            kind: MediaKind::Video,
            codec: "rawvideo".into(),
            width,
            height,
            pixel_format: PixelFormat::RGB,
            frame_rate: None,
        }
    }

    /// 纯色 RGB24 帧
    fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> util::frame::Video {
        let mut frame = util::frame::Video::new(Pixel::RGB24, width, height);
        let stride = frame.stride(0);
        let data = frame.data_mut(0);
        for row in 0..height as usize {
            for col in 0..width as usize {
                let offset = row * stride + col * 3;
                data[offset..offset + 3].copy_from_slice(&rgb);
            }
        }
        frame
    }

    fn assert_plane_near(frame: &ConvertedFrame, index: usize, expected: u8) {
        let plane = &frame.planes()[index];
        for y in 0..plane.height() {
            for &value in plane.row(y) {
                assert!(
                    (i16::from(value) - i16::from(expected)).abs() <= 2,
                    "平面 {} 第 {} 行: {} != {}",
                    index,
                    y,
                    value,
                    expected
                );
            }
        }
    }

    #[test]
    fn white_and_black_map_to_limited_range() {
        let mut converter = Yuv420Converter::new(&stream(16, 16)).unwrap();
        let mut out = ConvertedFrame::allocate(16, 16).unwrap();

        converter.convert(&solid_rgb(16, 16, [255, 255, 255]), &mut out).unwrap();
        assert_plane_near(&out, 0, 235);
        assert_plane_near(&out, 1, 128);
        assert_plane_near(&out, 2, 128);

        converter.convert(&solid_rgb(16, 16, [0, 0, 0]), &mut out).unwrap();
        assert_plane_near(&out, 0, 16);
        assert_plane_near(&out, 1, 128);
        assert_plane_near(&out, 2, 128);
    }

    #[test]
    fn pure_red_lifts_v_plane() {
        let mut converter = Yuv420Converter::new(&stream(16, 16)).unwrap();
        let mut out = ConvertedFrame::allocate(16, 16).unwrap();

        converter.convert(&solid_rgb(16, 16, [255, 0, 0]), &mut out).unwrap();
        assert!(out.v().row(0)[0] > 200);
        assert!(out.u().row(0)[0] < 128);
    }

    #[test]
    fn geometry_change_rebuilds_scaler_at_stream_size() {
        let mut converter = Yuv420Converter::new(&stream(32, 24)).unwrap();
        let mut out = ConvertedFrame::allocate(32, 24).unwrap();

        converter.convert(&solid_rgb(32, 24, [0, 0, 0]), &mut out).unwrap();
        assert_eq!(converter.source, Some((Pixel::RGB24, 32, 24)));

        // 解码帧变成 64x48，输出仍然是流的尺寸
        converter.convert(&solid_rgb(64, 48, [255, 255, 255]), &mut out).unwrap();
        assert_eq!(converter.source, Some((Pixel::RGB24, 64, 48)));
        assert_eq!((out.width(), out.height()), (32, 24));
        assert_plane_near(&out, 0, 235);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let mut converter = Yuv420Converter::new(&stream(32, 24)).unwrap();
        let mut out = ConvertedFrame::allocate(16, 16).unwrap();

        let err = converter.convert(&solid_rgb(32, 24, [0, 0, 0]), &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
    }

    #[test]
    fn unknown_stream_size_is_an_allocation_error() {
        assert_eq!(
            Yuv420Converter::new(&stream(0, 240)).err().map(|e| e.kind()),
            Some(ErrorKind::Allocation)
        );
    }
}
