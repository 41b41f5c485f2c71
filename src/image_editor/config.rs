//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `EditorConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中导出档位（quality / balanced / speed）作为高层语义，映射到底层的
//! 重采样滤镜与 JPEG 质量组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供与线上头像/封面编辑器一致的参数（240px 头像遮罩、4:1 封面、
//!   400×400 / 1584×396 导出尺寸、10MB 上限）。
//! - `ExportProfile` 负责档位字符串解析与反向输出。
//! - `apply_export_profile` 将档位转换为具体参数。
//! - `infer_export_profile` 用于从当前配置反推档位（给前端展示状态）。

use image::imageops::FilterType;

use super::ImageError;

/// 编辑器配置。
///
/// 字段覆盖了文件校验、解码限制、遮罩几何、缩放滑杆与导出五个方面。
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// 允许上传的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 允许的 MIME 类型。
    pub accepted_mime_types: Vec<String>,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 头像遮罩边长（显示像素）。
    pub profile_mask_size: f64,
    /// 封面遮罩宽高比（宽 / 高）。
    pub cover_aspect_ratio: f64,
    /// 未测得容器宽度时封面遮罩使用的默认宽度。
    pub default_container_width: f64,
    /// 头像导出宽度。
    pub profile_output_width: u32,
    /// 头像导出高度。
    pub profile_output_height: u32,
    /// 封面导出宽度。
    pub cover_output_width: u32,
    /// 封面导出高度。
    pub cover_output_height: u32,
    /// 最大缩放 = 最小缩放 × 该系数。
    pub zoom_range_factor: f64,
    /// 缩放滑杆步长。
    pub zoom_step: f64,
    /// JPEG 编码质量（1~100）。
    pub jpeg_quality: u8,
    /// 导出重采样滤镜。
    pub resize_filter: FilterType,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            accepted_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            // 只拦截解压炸弹：10MB 以内的 48~108MP 手机原图必须能正常打开
            max_decoded_pixels: 120_000_000,
            max_decoded_bytes: 120_000_000 * 4,
            profile_mask_size: 240.0,
            cover_aspect_ratio: 4.0,
            default_container_width: 600.0,
            profile_output_width: 400,
            profile_output_height: 400,
            cover_output_width: 1584,
            cover_output_height: 396,
            zoom_range_factor: 3.0,
            zoom_step: 0.01,
            jpeg_quality: 90,
            resize_filter: FilterType::Triangle,
        }
    }
}

impl EditorConfig {
    /// MIME 类型是否在白名单内（忽略大小写与参数部分）。
    pub fn accepts_mime_type(&self, mime_type: &str) -> bool {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        self.accepted_mime_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(&essence))
    }

    /// 基于当前参数反推导出档位。
    ///
    /// 滤镜与档位一一对应，优先按滤镜判断；这样单独覆盖 JPEG 质量后档位不会跳变。
    /// 滤镜不属于任何档位时再按质量区间推断。
    pub(crate) fn infer_export_profile(&self) -> ExportProfile {
        match self.resize_filter {
            FilterType::CatmullRom => return ExportProfile::Quality,
            FilterType::Triangle => return ExportProfile::Balanced,
            FilterType::Nearest => return ExportProfile::Speed,
            _ => {}
        }

        if self.jpeg_quality >= 95 {
            ExportProfile::Quality
        } else if self.jpeg_quality <= 80 {
            ExportProfile::Speed
        } else {
            ExportProfile::Balanced
        }
    }

    /// 应用指定导出档位到实际参数。
    pub(crate) fn apply_export_profile(&mut self, profile: ExportProfile) {
        match profile {
            ExportProfile::Quality => {
                self.jpeg_quality = 95;
                self.resize_filter = FilterType::CatmullRom;
            }
            ExportProfile::Balanced => {
                self.jpeg_quality = 90;
                self.resize_filter = FilterType::Triangle;
            }
            ExportProfile::Speed => {
                self.jpeg_quality = 80;
                self.resize_filter = FilterType::Nearest;
            }
        }
    }
}

/// 导出档位（面向产品/用户语义）。
///
/// - `Quality`：尽量保真
/// - `Balanced`：质量与体积平衡（与浏览器 `toDataURL('image/jpeg', 0.9)` 一致）
/// - `Speed`：优先导出速度与体积
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportProfile {
    Quality,
    Balanced,
    Speed,
}

impl ExportProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use profile_image_editor::image_editor::ExportProfile;
    ///
    /// let p = ExportProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), profile_image_editor::image_editor::ImageError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ImageError::InvalidFormat(format!(
                "未知导出档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    /// 将档位输出为稳定字符串，供前端展示与持久化。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}
