use crate::core::{PlayerError, Result};
use crate::renderer::wgpu_renderer::fit_within;
use crate::renderer::{Display, WgpuDisplay};
use image::imageops::FilterType;
use image::RgbaImage;
use log::{debug, info};
use std::path::Path;
use std::time::Duration;

/// 图片窗口的最大尺寸
pub const MAX_PICTURE_WINDOW: (u32, u32) = (1280, 800);

/// 两次事件检查之间的等待时间
const PICTURE_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// 加载图片并缩放到窗口尺寸
pub fn load_picture(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .map_err(|e| PlayerError::Image {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?
        .to_rgba8();

    let (width, height) = image.dimensions();
    let (max_w, max_h) = MAX_PICTURE_WINDOW;
    let (fit_w, fit_h) = fit_within(width, height, max_w, max_h);
    if (fit_w, fit_h) == (width, height) {
        return Ok(image);
    }

    debug!("图片 {}x{} 缩放到 {}x{}", width, height, fit_w, fit_h);
    Ok(image::imageops::resize(&image, fit_w, fit_h, FilterType::Triangle))
}

/// 显示一张图片，直到窗口关闭
pub fn show_picture(display: &mut WgpuDisplay, path: &Path) -> Result<()> {
    let image = load_picture(path)?;
    info!("🖼️ 显示图片: {} ({}x{})", path.display(), image.width(), image.height());

    display.initialize()?;
    let result = view(display, &image, &path.display().to_string());
    display.shutdown();
    result
}

fn view(display: &mut WgpuDisplay, image: &RgbaImage, title: &str) -> Result<()> {
    let mut surface = display.create_picture_surface(image.width(), image.height(), title)?;
    surface.upload(image)?;
    surface.present()?;

    while !display.wait_close_requested(PICTURE_POLL_INTERVAL) {
        if display.take_redraw_request() {
            surface.present()?;
        }
    }

    info!("图片窗口已关闭");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use image::Rgba;

    #[test]
    fn missing_picture_is_an_image_error() {
        let err = load_picture(Path::new("/nonexistent/picture.png")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Image);
        assert!(err.to_string().contains("picture.png"));
    }

    #[test]
    fn small_picture_keeps_its_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        RgbaImage::from_pixel(64, 48, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let image = load_picture(&path).unwrap();
        assert_eq!(image.dimensions(), (64, 48));
        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn large_picture_is_scaled_to_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("large.png");
        RgbaImage::new(2560, 400).save(&path).unwrap();

        let image = load_picture(&path).unwrap();
        assert_eq!(image.dimensions(), (1280, 200));
    }

    #[test]
    fn garbage_file_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        assert_eq!(load_picture(&path).unwrap_err().kind(), ErrorKind::Image);
    }
}
