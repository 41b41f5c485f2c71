//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageEditor` 持有全局配置，负责导出档位切换、设置项应用，并为每次打开的编辑器
//! 创建 `EditorSession`。
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<EditorConfig>>` 支持运行时动态切档。
//! - 每个会话在打开时拿到一份“配置快照”，编辑途中切档不会影响正在进行的编辑。

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::session::EditorSession;
use super::{EditorConfig, ExportProfile, ImageError, MaskKind};

/// 可持久化的编辑器设置（前端设置页 / 设置文件）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub export_profile: String,
    pub max_file_size_mb: u64,
    pub default_container_width: f64,
    pub zoom_range_factor: f64,
    pub zoom_step: f64,
    /// 覆盖档位自带的 JPEG 质量。
    pub jpeg_quality: Option<u8>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        let config = EditorConfig::default();
        Self {
            export_profile: config.infer_export_profile().as_str().to_string(),
            max_file_size_mb: config.max_file_size / (1024 * 1024),
            default_container_width: config.default_container_width,
            zoom_range_factor: config.zoom_range_factor,
            zoom_step: config.zoom_step,
            jpeg_quality: None,
        }
    }
}

/// 图片编辑器。
#[derive(Debug, Clone)]
pub struct ImageEditor {
    config: Arc<RwLock<EditorConfig>>,
}

impl Default for ImageEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl ImageEditor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// 获取配置快照。
    pub fn config_snapshot(&self) -> Result<EditorConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 打开编辑器。
    ///
    /// # 示例
    /// ```rust
    /// use profile_image_editor::image_editor::{ImageEditor, MaskKind};
    ///
    /// let editor = ImageEditor::default();
    /// let session = editor.open_session(MaskKind::Profile, None, |data_url| {
    ///     println!("saved {} bytes", data_url.len());
    /// })?;
    /// assert!(!session.has_image());
    /// # Ok::<(), profile_image_editor::image_editor::ImageError>(())
    /// ```
    pub fn open_session<F>(
        &self,
        kind: MaskKind,
        current_image: Option<String>,
        on_save: F,
    ) -> Result<EditorSession, ImageError>
    where
        F: FnMut(String) + Send + 'static,
    {
        let config = self.config_snapshot()?;
        Ok(EditorSession::open(kind, current_image, config, on_save))
    }

    /// 设置导出档位。
    pub fn set_export_profile(&self, profile: ExportProfile) -> Result<(), ImageError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_export_profile(profile);

        log::info!(
            "⚙️ 已切换导出档位：{:?}（jpeg_quality={}, filter={:?}）",
            profile,
            config.jpeg_quality,
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_export_profile(&self) -> Result<ExportProfile, ImageError> {
        let config = self
            .config
            .read()
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_export_profile())
    }

    /// 应用设置项。任一字段越界时整体拒绝，配置保持不变。
    pub fn apply_settings(&self, settings: &EditorSettings) -> Result<(), ImageError> {
        let profile = ExportProfile::from_str(&settings.export_profile)?;

        if !(1..=50).contains(&settings.max_file_size_mb) {
            return Err(ImageError::InvalidFormat("max_file_size_mb 必须在 1~50 之间".to_string()));
        }
        if !(200.0..=4000.0).contains(&settings.default_container_width) {
            return Err(ImageError::InvalidFormat(
                "default_container_width 必须在 200~4000 像素之间".to_string(),
            ));
        }
        if !(1.0..=10.0).contains(&settings.zoom_range_factor) {
            return Err(ImageError::InvalidFormat("zoom_range_factor 必须在 1~10 之间".to_string()));
        }
        if !(0.001..=0.5).contains(&settings.zoom_step) {
            return Err(ImageError::InvalidFormat("zoom_step 必须在 0.001~0.5 之间".to_string()));
        }
        if let Some(quality) = settings.jpeg_quality {
            if !(1..=100).contains(&quality) {
                return Err(ImageError::InvalidFormat("jpeg_quality 必须在 1~100 之间".to_string()));
            }
        }

        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;

        config.apply_export_profile(profile);
        config.max_file_size = settings.max_file_size_mb * 1024 * 1024;
        config.default_container_width = settings.default_container_width;
        config.zoom_range_factor = settings.zoom_range_factor;
        config.zoom_step = settings.zoom_step;
        if let Some(quality) = settings.jpeg_quality {
            config.jpeg_quality = quality;
        }

        log::info!(
            "⚙️ 已应用编辑器设置：profile={} max_file_size={}MB zoom_range_factor={} zoom_step={}",
            profile.as_str(),
            settings.max_file_size_mb,
            settings.zoom_range_factor,
            settings.zoom_step
        );

        Ok(())
    }

    /// 当前配置对应的设置项。
    pub fn current_settings(&self) -> Result<EditorSettings, ImageError> {
        let config = self.config_snapshot()?;
        let profile = config.infer_export_profile();
        let mut probe = config.clone();
        probe.apply_export_profile(profile);

        Ok(EditorSettings {
            export_profile: profile.as_str().to_string(),
            max_file_size_mb: config.max_file_size / (1024 * 1024),
            default_container_width: config.default_container_width,
            zoom_range_factor: config.zoom_range_factor,
            zoom_step: config.zoom_step,
            jpeg_quality: (probe.jpeg_quality != config.jpeg_quality).then_some(config.jpeg_quality),
        })
    }
}
