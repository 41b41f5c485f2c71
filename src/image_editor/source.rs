//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“编辑流水线中间结果”解耦：
//! - `SelectedFile` 表示用户选择的原始文件（文件名 + 声明的 MIME + 字节）
//! - `RawImageData` 表示已通过校验但未解码的字节
//! - `SourceImage` 表示本次编辑会话中已解码的源图（只活在会话内，从不持久化）
//! - `MaskSpec` 表示遮罩几何（头像正方形 / 封面 4:1 长条）与导出尺寸
//! - `ExportedImage` 表示导出结果，调用方只关心其中的 Data URL

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::{EditorConfig, ImageError};

/// 遮罩类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskKind {
    /// 头像：固定正方形遮罩（前端渲染为圆形，外接正方形参与计算）。
    Profile,
    /// 封面：宽度跟随容器，高度为宽度 / 宽高比。
    Cover,
}

impl MaskKind {
    /// 从外部字符串解析遮罩类型。
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(kind: &str) -> Result<Self, ImageError> {
        match kind.trim().to_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "cover" => Ok(Self::Cover),
            other => Err(ImageError::InvalidFormat(format!(
                "未知遮罩类型：{}（可选：profile / cover）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Cover => "cover",
        }
    }
}

/// 图像像素尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 遮罩几何与导出尺寸。
///
/// `width` / `height` 为显示像素，`output_*` 为导出位图像素。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskSpec {
    pub kind: MaskKind,
    pub width: f64,
    pub height: f64,
    pub output_width: u32,
    pub output_height: u32,
}

impl MaskSpec {
    /// 根据遮罩类型与容器宽度构造遮罩。
    ///
    /// 封面遮罩宽度取容器宽度；容器宽度缺失或非法（非有限数、≤0）时
    /// 回退到 `default_container_width`。头像遮罩与容器无关。
    pub fn for_kind(kind: MaskKind, container_width: Option<f64>, config: &EditorConfig) -> Self {
        match kind {
            MaskKind::Profile => Self {
                kind,
                width: config.profile_mask_size,
                height: config.profile_mask_size,
                output_width: config.profile_output_width,
                output_height: config.profile_output_height,
            },
            MaskKind::Cover => {
                let width = container_width
                    .filter(|w| w.is_finite() && *w > 0.0)
                    .unwrap_or(config.default_container_width);
                Self {
                    kind,
                    width,
                    height: width / config.cover_aspect_ratio,
                    output_width: config.cover_output_width,
                    output_height: config.cover_output_height,
                }
            }
        }
    }

    /// 封面只允许纵向拖动。
    pub fn locks_horizontal_pan(&self) -> bool {
        self.kind == MaskKind::Cover
    }
}

/// 用户选择的文件。
///
/// `mime_type` 为浏览器 / 调用方声明的类型，加载阶段还会用文件签名二次确认。
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// 文件体积（字节）。
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// 校验阶段输出：原始字节与识别出的类型。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 经签名确认的 MIME 类型。
    pub(crate) mime_type: &'static str,
}

/// 本次编辑会话中的源图。
///
/// 关闭编辑器或重新选择文件时整体丢弃。
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub(crate) natural: ImageSize,
    pub(crate) data_url: String,
    pub(crate) mime_type: String,
    pub(crate) pixels: DynamicImage,
}

impl SourceImage {
    pub fn natural_width(&self) -> u32 {
        self.natural.width
    }

    pub fn natural_height(&self) -> u32 {
        self.natural.height
    }

    pub fn natural_size(&self) -> ImageSize {
        self.natural
    }

    /// 源文件的 Data URL（`data:image/...;base64,...`）。
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// 已解码像素，导出阶段作为绘制来源。
    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }
}

/// 导出结果。
///
/// 尺寸恒等于遮罩的 `output_width × output_height`。
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub width: u32,
    pub height: u32,
    /// JPEG 字节。
    pub bytes: Vec<u8>,
    /// `data:image/jpeg;base64,...`，即交给保存回调的字符串。
    pub data_url: String,
}
