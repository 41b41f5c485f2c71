//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载编辑器链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 解码失败落到 `Decode`，画布创建或编码失败落到 `Encode`，调用方一定能拿到明确结果，
//! 不会出现无限加载或静默返回。

/// 图片编辑统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("导出错误：{0}")]
    Encode(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("状态错误：{0}")]
    InvalidState(String),

    #[error("导出进行中，请稍候")]
    Busy,
}

impl ImageError {
    /// 稳定错误码，供前端做分支处理。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "E_INVALID_FORMAT",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::Decode(_) => "E_DECODE",
            Self::Encode(_) => "E_ENCODE",
            Self::FileSystem(_) => "E_FILE_SYSTEM",
            Self::InvalidState(_) => "E_INVALID_STATE",
            Self::Busy => "E_BUSY",
        }
    }

    /// 出错所在阶段（load / decode / edit / export）。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) | Self::ResourceLimit(_) | Self::FileSystem(_) => "load",
            Self::Decode(_) => "decode",
            Self::InvalidState(_) => "edit",
            Self::Encode(_) | Self::Busy => "export",
        }
    }

    /// 是否属于“选择文件即被拒绝”的输入类错误。
    ///
    /// 这类错误发生时编辑器状态保持不变，用户重新选择文件即可。
    pub fn is_input_rejection(&self) -> bool {
        matches!(self, Self::InvalidFormat(_) | Self::ResourceLimit(_))
    }
}
