//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 在“尽可能早”的阶段执行输入校验，目标是尽快失败、且失败时不留下任何中间状态：
//! 选择文件被拒绝时，编辑器里已有的图片保持原样。
//!
//! ## 实现思路
//!
//! - 类型：声明的 MIME 必须在白名单内（jpeg / png / webp），
//!   文件签名（magic bytes）也必须识别为白名单内的图片类型，防止改扩展名绕过。
//! - 体积：超过 `max_file_size`（默认 10MB）直接拒绝。
//! - 编码：通过校验的字节编码为 Data URL，作为会话内的源图表示。
//! - 解码：先读图片头拿到宽高做像素/内存限制，再完整解码；
//!   解码放在 `spawn_blocking` 中执行，调用方以 `await` 等待完成。
//! - 方向：按 EXIF Orientation 旋转/翻转后再计算原始尺寸，与浏览器 `<img>` 的显示一致。
//! - 解码失败统一映射为 `ImageError::Decode`，不会出现“一直加载中”的悬挂状态。

use base64::{Engine as _, engine::general_purpose};
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use super::source::{RawImageData, SelectedFile, SourceImage};
use super::{EditorConfig, ImageError, ImageSize};

/// Data URL 头部：`data:image/<subtype>;base64,`
static DATA_URL_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(image/[A-Za-z0-9.+-]+);base64,").expect("data url header pattern is valid")
});

/// 校验用户选择的文件（同步，发生在任何状态变更之前）。
pub(crate) fn validate_selection(
    file: SelectedFile,
    config: &EditorConfig,
) -> Result<RawImageData, ImageError> {
    if !config.accepts_mime_type(&file.mime_type) {
        return Err(ImageError::InvalidFormat(format!(
            "请上传 JPG、PNG 或 WEBP 图片（当前类型：{}）",
            if file.mime_type.is_empty() { "未知" } else { file.mime_type.as_str() }
        )));
    }

    if file.size() > config.max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            file.size() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let mime_type = validate_image_signature(&file.bytes, config)?;

    Ok(RawImageData {
        bytes: file.bytes,
        mime_type,
    })
}

/// 加载入口：校验 → 编码 Data URL → 异步解码。
///
/// 任一步失败都直接返回错误，调用方不需要做任何回滚。
pub async fn load_source(file: SelectedFile, config: &EditorConfig) -> Result<SourceImage, ImageError> {
    let start = Instant::now();
    log::info!(
        "📁 开始加载图片 - 文件: {} 声明类型: {} 大小: {} 字节",
        file.name,
        file.mime_type,
        file.size()
    );

    let name = file.name.clone();
    let raw = validate_selection(file, config)?;
    let data_url = encode_data_url(raw.mime_type, &raw.bytes);
    let mime_type = raw.mime_type;

    let decode_config = config.clone();
    let pixels = tokio::task::spawn_blocking(move || decode_pixels(&raw.bytes, &decode_config))
        .await
        .map_err(|e| ImageError::Decode(format!("解码任务异常退出：{}", e)))??;

    let (width, height) = pixels.dimensions();
    log::info!(
        "✅ 图片加载完成 - 文件: {} 类型: {} 尺寸: {}x{} 耗时: {}ms",
        name,
        mime_type,
        width,
        height,
        start.elapsed().as_millis()
    );

    Ok(SourceImage {
        natural: ImageSize::new(width, height),
        data_url,
        mime_type: mime_type.to_string(),
        pixels,
    })
}

/// 从本地路径读取文件，类型按文件签名识别，识别失败时按扩展名推断。
///
/// 体积先按 metadata 判断，超限时不读入内容。
pub async fn read_selected_file(path: &Path, config: &EditorConfig) -> Result<SelectedFile, ImageError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| ImageError::FileSystem(format!("无法读取文件信息：{}（{}）", path.display(), e)))?;

    if metadata.len() > config.max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ImageError::FileSystem(format!("无法读取图片文件：{}", e)))?;

    let mime_type = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .or_else(|| ImageFormat::from_path(path).ok().map(|f| f.to_mime_type()))
        .unwrap_or_default();

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SelectedFile::new(name, mime_type, bytes))
}

/// 将前端传来的 Data URL 还原为 `SelectedFile`。
pub fn selected_file_from_data_url(
    name: &str,
    data_url: &str,
    config: &EditorConfig,
) -> Result<SelectedFile, ImageError> {
    let (mime_type, bytes) = parse_data_url(data_url, config.max_file_size)?;
    Ok(SelectedFile::new(name, mime_type, bytes))
}

/// 编码为 `data:<mime>;base64,<payload>`。
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// 解析图片 Data URL，返回 `(mime, bytes)`。
///
/// 解码前先按 base64 长度估算体积上限，超限直接拒绝。
pub fn parse_data_url(data: &str, max_size: u64) -> Result<(String, Vec<u8>), ImageError> {
    let normalized = data.trim();

    let captures = DATA_URL_HEADER
        .captures(normalized)
        .ok_or_else(|| ImageError::InvalidFormat("不是有效的图片 Data URL".to_string()))?;
    let header_len = captures.get(0).map(|m| m.end()).unwrap_or_default();
    let mime_type = captures
        .get(1)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();

    let payload = &normalized[header_len..];
    let estimated_len = estimate_base64_decoded_upper_bound_len(payload)?;
    if estimated_len > max_size {
        return Err(ImageError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))?;

    Ok((mime_type, bytes))
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}

/// 通过文件签名（magic bytes）校验输入是白名单内的图片，返回识别出的 MIME。
fn validate_image_signature(bytes: &[u8], config: &EditorConfig) -> Result<&'static str, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::InvalidFormat("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| ImageError::InvalidFormat("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(ImageError::InvalidFormat(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    if !config.accepts_mime_type(kind.mime_type()) {
        return Err(ImageError::InvalidFormat(format!(
            "请上传 JPG、PNG 或 WEBP 图片（文件实际类型：{}）",
            kind.mime_type()
        )));
    }

    Ok(kind.mime_type())
}

/// 解码为像素数据（阻塞，运行在 `spawn_blocking` 中）。
///
/// 返回的像素已按 EXIF 方向校正，宽高即用户看到的宽高。
pub(crate) fn decode_pixels(bytes: &[u8], config: &EditorConfig) -> Result<DynamicImage, ImageError> {
    let mut decoder = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?
        .into_decoder()
        .map_err(|e| ImageError::Decode(format!("无法读取图片头：{}", e)))?;

    // 旋转只交换宽高，像素总量不变，可以在完整解码前先做限制
    let (header_width, header_height) = decoder.dimensions();
    validate_pixel_limits(config, header_width, header_height)?;

    let orientation = decoder.orientation().unwrap_or_else(|e| {
        log::warn!("⚠️ 读取 EXIF 方向失败，按原始方向处理：{}", e);
        Orientation::NoTransforms
    });

    let mut decoded = DynamicImage::from_decoder(decoder)
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;
    if orientation != Orientation::NoTransforms {
        log::debug!("applying exif orientation {:?}", orientation);
        decoded.apply_orientation(orientation);
    }

    let (width, height) = decoded.dimensions();
    validate_pixel_limits(config, width, height)?;

    Ok(decoded)
}

/// 校验宽高非零、像素数量与预计解码内存不超过配置上限。
fn validate_pixel_limits(config: &EditorConfig, width: u32, height: u32) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::Decode("图片尺寸为 0".to_string()));
    }

    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    let estimated = pixels
        .checked_mul(4)
        .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > config.max_decoded_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Luma, Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([200_u8, 40, 40]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode test png failed");
        bytes
    }

    #[test]
    fn rejects_unsupported_declared_type() {
        let config = EditorConfig::default();
        let file = SelectedFile::new("a.gif", "image/gif", png_bytes(4, 4));

        let result = validate_selection(file, &config);
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_oversized_file_before_signature_check() {
        let config = EditorConfig::default();
        let file = SelectedFile::new("big.png", "image/png", vec![0_u8; 10 * 1024 * 1024 + 1]);

        let result = validate_selection(file, &config);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn accepts_file_exactly_at_limit_when_signature_matches() {
        let mut config = EditorConfig::default();
        let bytes = png_bytes(4, 4);
        config.max_file_size = bytes.len() as u64;

        let file = SelectedFile::new("ok.png", "image/png", bytes);
        let raw = validate_selection(file, &config).expect("file at the limit should pass");
        assert_eq!(raw.mime_type, "image/png");
    }

    #[test]
    fn rejects_renamed_non_image_payload() {
        let config = EditorConfig::default();
        let file = SelectedFile::new("fake.png", "image/png", b"<html>nope</html>".to_vec());

        let result = validate_selection(file, &config);
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn data_url_roundtrip_preserves_bytes_and_mime() {
        let bytes = png_bytes(2, 3);
        let url = encode_data_url("image/png", &bytes);

        assert!(url.starts_with("data:image/png;base64,"));
        let (mime, decoded) = parse_data_url(&url, u64::MAX).expect("parse should succeed");
        assert_eq!(mime, "image/png");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn parse_data_url_rejects_large_payload_before_decode() {
        let huge = format!("data:image/png;base64,{}", "A".repeat(1024 * 1024));
        let result = parse_data_url(&huge, 32);

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn parse_data_url_rejects_non_image_header() {
        let result = parse_data_url("data:text/plain;base64,SGVsbG8=", u64::MAX);
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn decode_rejects_truncated_image() {
        let config = EditorConfig::default();
        let mut bytes = png_bytes(16, 16);
        bytes.truncate(40);

        let result = decode_pixels(&bytes, &config);
        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn decode_enforces_pixel_limit() {
        let mut config = EditorConfig::default();
        config.max_decoded_pixels = 10;

        let result = decode_pixels(&png_bytes(4, 4), &config);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[tokio::test]
    async fn load_source_reports_natural_size_and_data_url() {
        let config = EditorConfig::default();
        let file = SelectedFile::new("photo.png", "image/png", png_bytes(800, 600));

        let source = load_source(file, &config).await.expect("load should succeed");

        assert_eq!(source.natural_size(), ImageSize::new(800, 600));
        assert_eq!(source.mime_type(), "image/png");
        assert!(source.data_url().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn load_source_surfaces_decode_failure() {
        let config = EditorConfig::default();
        let mut bytes = png_bytes(16, 16);
        bytes.truncate(60);
        let file = SelectedFile::new("broken.png", "image/png", bytes);

        let result = load_source(file, &config).await;
        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    /// 上半部红、下半部蓝的 800x600 JPEG，附带 EXIF Orientation = 6（顺时针 90°）。
    fn jpeg_with_orientation_6() -> Vec<u8> {
        let img = RgbImage::from_fn(800, 600, |_, y| {
            if y < 300 { Rgb([220, 20, 20]) } else { Rgb([20, 20, 220]) }
        });

        // 大端 TIFF 头 + 单条 IFD 记录：Orientation(0x0112) SHORT = 6
        let exif = vec![
            0x4d, 0x4d, 0x00, 0x2a, 0x00, 0x00, 0x00, 0x08,
            0x00, 0x01,
            0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x06, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
        encoder.set_exif_metadata(exif).expect("jpeg encoder accepts exif");
        encoder
            .write_image(img.as_raw(), 800, 600, ExtendedColorType::Rgb8)
            .expect("encode test jpeg failed");
        bytes
    }

    #[tokio::test]
    async fn load_source_applies_exif_orientation() {
        let config = EditorConfig::default();
        let file = SelectedFile::new("portrait.jpg", "image/jpeg", jpeg_with_orientation_6());

        let source = load_source(file, &config).await.expect("load should succeed");
        assert_eq!(source.natural_size(), ImageSize::new(600, 800));

        // 顺时针旋转后，原来的上半部（红）落在右侧
        let pixels = source.pixels().to_rgb8();
        let right = pixels.get_pixel(580, 400).0;
        let left = pixels.get_pixel(20, 400).0;
        assert!(right[0] > 150 && right[2] < 100, "right side should be red: {:?}", right);
        assert!(left[2] > 150 && left[0] < 100, "left side should be blue: {:?}", left);
    }

    #[tokio::test]
    async fn load_source_accepts_48_megapixel_photo_under_size_limit() {
        let config = EditorConfig::default();
        let img = ImageBuffer::from_pixel(8000, 6000, Luma([128_u8]));
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode test png failed");
        assert!((bytes.len() as u64) < config.max_file_size);

        let file = SelectedFile::new("phone.png", "image/png", bytes);
        let source = load_source(file, &config).await.expect("48MP photo should load");
        assert_eq!(source.natural_size(), ImageSize::new(8000, 6000));
    }

    #[tokio::test]
    async fn data_url_selection_loads_like_a_picked_file() {
        let config = EditorConfig::default();
        let url = encode_data_url("image/png", &png_bytes(320, 200));

        let file = selected_file_from_data_url("avatar", &url, &config).expect("data url should parse");
        assert_eq!(file.mime_type, "image/png");

        let source = load_source(file, &config).await.expect("load should succeed");
        assert_eq!(source.natural_size(), ImageSize::new(320, 200));
        assert_eq!(source.data_url(), url);
    }

    #[test]
    fn data_url_selection_rejects_oversized_payload() {
        let mut config = EditorConfig::default();
        config.max_file_size = 16;
        let url = encode_data_url("image/png", &png_bytes(32, 32));

        let result = selected_file_from_data_url("avatar", &url, &config);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }
}
