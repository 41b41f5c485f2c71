use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::image_editor::{EditorSettings, ImageEditor};

/// 读取设置文件；文件不存在时返回 `None`。
pub fn load_settings(path: &Path) -> Result<Option<EditorSettings>, AppError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let parsed = serde_json::from_str::<EditorSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;

    Ok(Some(parsed))
}

/// 应用并保存设置。校验失败时不会写文件。
pub fn save_settings(editor: &ImageEditor, path: &Path, settings: &EditorSettings) -> Result<(), AppError> {
    editor.apply_settings(settings)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}

/// 启动时加载设置文件并应用到编辑器，返回是否找到了设置文件。
pub fn apply_settings_file(editor: &ImageEditor, path: &Path) -> Result<bool, AppError> {
    match load_settings(path)? {
        Some(settings) => {
            editor.apply_settings(&settings)?;
            log::info!("⚙️ 已加载设置文件：{}", path.display());
            Ok(true)
        }
        None => {
            log::info!("设置文件不存在，使用默认配置：{}", path.display());
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_editor::ExportProfile;
    use std::path::PathBuf;

    fn temp_settings_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("profile-image-editor-{}-{}", name, std::process::id()))
            .join("settings.json")
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = temp_settings_path("missing");
        assert!(load_settings(&path).expect("load should succeed").is_none());
        assert!(!apply_settings_file(&ImageEditor::default(), &path).expect("apply should succeed"));
    }

    #[test]
    fn save_then_load_applies_to_fresh_editor() {
        let path = temp_settings_path("roundtrip");
        let editor = ImageEditor::default();
        let settings = EditorSettings {
            export_profile: "speed".to_string(),
            zoom_step: 0.05,
            ..EditorSettings::default()
        };

        save_settings(&editor, &path, &settings).expect("save should succeed");
        assert_eq!(load_settings(&path).expect("load").as_ref(), Some(&settings));

        let fresh = ImageEditor::default();
        assert!(apply_settings_file(&fresh, &path).expect("apply should succeed"));
        assert_eq!(fresh.get_export_profile().expect("profile"), ExportProfile::Speed);
        assert_eq!(fresh.config_snapshot().expect("config").zoom_step, 0.05);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn invalid_settings_are_not_written() {
        let path = temp_settings_path("invalid");
        let settings = EditorSettings {
            export_profile: "ultra".to_string(),
            ..EditorSettings::default()
        };

        let result = save_settings(&ImageEditor::default(), &path, &settings);
        assert!(matches!(result, Err(AppError::Image(_))));
        assert!(!path.exists());
    }

    #[test]
    fn malformed_json_is_a_settings_error() {
        let path = temp_settings_path("malformed");
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).expect("create temp dir");
        }
        fs::write(&path, "{ not json").expect("write temp file");

        assert!(matches!(load_settings(&path), Err(AppError::Settings(_))));

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}
