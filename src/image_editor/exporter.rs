//! # 导出模块
//!
//! ## 设计思路
//!
//! 把当前可见的裁剪区域栅格化为固定尺寸的位图，再编码为 JPEG Data URL。
//! 绘制面 `CanvasSurface` 是一次导出独占的短生命周期值：创建、绘制、编码后即丢弃，
//! 不存在模块级共享画布。
//!
//! ## 实现思路
//!
//! 1. 由裁剪框与变换计算源图上的裁剪矩形（原始像素坐标，可为小数）
//! 2. 创建输出尺寸的绘制面（0 尺寸直接报错，而不是静默返回）
//! 3. 裁剪矩形恰好对齐像素且与输出同尺寸时直接拷贝，否则用 `fast_image_resize`
//!    带裁剪重采样，失败时回退 `image` 的裁剪 + `resize_exact`
//! 4. 以黑底合成透明像素（与浏览器画布导出 JPEG 一致），按配置质量编码
//!
//! 导出尺寸恒等于遮罩的 `output_width × output_height`。

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use std::time::Instant;

use super::loader;
use super::source::{ExportedImage, SourceImage};
use super::transform::{CropFrame, ImageTransform};
use super::{EditorConfig, ImageError};

/// 判断坐标是否“对齐像素”的容差。
const PIXEL_ALIGN_EPSILON: f64 = 1e-6;

/// 源图上的裁剪矩形（原始像素坐标）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    /// 收敛到源图范围内，吸收浮点误差导致的越界。
    fn fit_within(self, source_width: u32, source_height: u32) -> Self {
        let max_w = source_width as f64;
        let max_h = source_height as f64;
        let width = self.width.min(max_w);
        let height = self.height.min(max_h);

        Self {
            x: self.x.clamp(0.0, max_w - width),
            y: self.y.clamp(0.0, max_h - height),
            width,
            height,
        }
    }

    fn pixel_aligned(&self) -> Option<(u32, u32, u32, u32)> {
        let aligned = |v: f64| (v - v.round()).abs() < PIXEL_ALIGN_EPSILON;
        if aligned(self.x) && aligned(self.y) && aligned(self.width) && aligned(self.height) {
            Some((
                self.x.round() as u32,
                self.y.round() as u32,
                self.width.round() as u32,
                self.height.round() as u32,
            ))
        } else {
            None
        }
    }
}

/// 计算当前变换下遮罩对应的源图裁剪矩形。
///
/// ```text
/// crop_x = (rendered_w − mask_w) / 2 − position.x
/// crop_y = (rendered_h − mask_h) / 2 − position.y
/// scale  = natural_w / rendered_w        // == 1 / zoom
/// region = [crop_x, crop_y, mask_w, mask_h] × scale
/// ```
pub fn crop_region(frame: &CropFrame, transform: &ImageTransform) -> CropRegion {
    let (rendered_w, rendered_h) = frame.rendered_size(transform.zoom());
    let position = transform.position();

    let crop_x = (rendered_w - frame.mask.width) / 2.0 - position.x;
    let crop_y = (rendered_h - frame.mask.height) / 2.0 - position.y;
    let scale = frame.natural.width as f64 / rendered_w;

    CropRegion {
        x: crop_x * scale,
        y: crop_y * scale,
        width: frame.mask.width * scale,
        height: frame.mask.height * scale,
    }
}

/// 一次导出独占的绘制面。
#[derive(Debug)]
pub struct CanvasSurface {
    pixels: RgbaImage,
}

impl CanvasSurface {
    /// 创建指定尺寸的透明绘制面。
    pub fn new(width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Encode(format!(
                "无法创建绘制面：尺寸 {}x{} 非法",
                width, height
            )));
        }

        Ok(Self {
            pixels: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// 将源图的 `region` 区域绘制并铺满整个绘制面。
    pub fn draw_region(
        &mut self,
        source: &DynamicImage,
        region: CropRegion,
        filter: FilterType,
    ) -> Result<(), ImageError> {
        let (src_width, src_height) = source.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(ImageError::Encode("源图尺寸为 0".to_string()));
        }

        let region = region.fit_within(src_width, src_height);
        if !(region.width > 0.0 && region.height > 0.0) {
            return Err(ImageError::Encode(format!(
                "裁剪区域非法：{:.2}x{:.2}",
                region.width, region.height
            )));
        }

        let (dst_width, dst_height) = (self.width(), self.height());

        if let Some((x, y, w, h)) = region.pixel_aligned() {
            if w == dst_width && h == dst_height {
                log::debug!("crop region is pixel aligned, copying {}x{} directly", w, h);
                self.pixels = source.crop_imm(x, y, w, h).to_rgba8();
                return Ok(());
            }
        }

        match Self::resample_with_fast_image_resize(source, region, dst_width, dst_height, filter) {
            Ok(pixels) => self.pixels = pixels,
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 重采样失败，回退 image::resize_exact：{}",
                    err
                );
                let x = region.x.floor() as u32;
                let y = region.y.floor() as u32;
                let w = (region.width.round() as u32).clamp(1, src_width - x.min(src_width - 1));
                let h = (region.height.round() as u32).clamp(1, src_height - y.min(src_height - 1));
                self.pixels = source
                    .crop_imm(x, y, w, h)
                    .resize_exact(dst_width, dst_height, filter)
                    .to_rgba8();
            }
        }

        Ok(())
    }

    /// 以黑底合成透明像素后编码为 JPEG，绘制面随之释放。
    pub fn encode_jpeg(self, quality: u8) -> Result<Vec<u8>, ImageError> {
        let (width, height) = (self.width(), self.height());
        let flattened = RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = self.pixels.get_pixel(x, y).0;
            let over_black = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
            image::Rgb([over_black(r), over_black(g), over_black(b)])
        });

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
            .encode_image(&flattened)
            .map_err(|e| ImageError::Encode(format!("JPEG 编码失败：{}", e)))?;

        Ok(bytes)
    }

    /// 取出像素（测试与调试用）。
    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    fn resample_with_fast_image_resize(
        source: &DynamicImage,
        region: CropRegion,
        target_width: u32,
        target_height: u32,
        filter: FilterType,
    ) -> Result<RgbaImage, ImageError> {
        let src = source.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ImageError::Encode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)))
            .crop(region.x, region.y, region.width, region.height);

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::Encode(format!("fast_image_resize 执行失败：{}", e)))?;

        RgbaImage::from_raw(target_width, target_height, dst_image.into_vec())
            .ok_or_else(|| ImageError::Encode("fast_image_resize 输出缓冲长度异常".to_string()))
    }
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

/// 导出当前裁剪结果。
///
/// 返回的 `ExportedImage` 尺寸恒为遮罩导出尺寸，`data_url` 即交给保存回调的字符串。
pub fn export_crop(
    source: &SourceImage,
    frame: &CropFrame,
    transform: &ImageTransform,
    config: &EditorConfig,
) -> Result<ExportedImage, ImageError> {
    if source.natural_size() != frame.natural {
        return Err(ImageError::InvalidState(format!(
            "裁剪框与源图尺寸不一致：{}x{} vs {}x{}",
            frame.natural.width,
            frame.natural.height,
            source.natural_width(),
            source.natural_height()
        )));
    }

    let start = Instant::now();
    let region = crop_region(frame, transform);

    let mut surface = CanvasSurface::new(frame.mask.output_width, frame.mask.output_height)?;
    surface.draw_region(source.pixels(), region, config.resize_filter)?;
    let draw_ms = start.elapsed().as_millis();

    let (width, height) = (surface.width(), surface.height());
    let bytes = surface.encode_jpeg(config.jpeg_quality)?;
    let data_url = loader::encode_data_url("image/jpeg", &bytes);

    log::info!(
        "🖼️ 导出完成 - 遮罩: {} 裁剪: [{:.1}, {:.1}, {:.1}, {:.1}] 输出: {}x{} 体积: {} 字节 绘制: {}ms 总耗时: {}ms",
        frame.mask.kind.as_str(),
        region.x,
        region.y,
        region.width,
        region.height,
        width,
        height,
        bytes.len(),
        draw_ms,
        start.elapsed().as_millis()
    );

    Ok(ExportedImage {
        width,
        height,
        bytes,
        data_url,
    })
}
