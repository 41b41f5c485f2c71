//! # 编辑会话模块
//!
//! ## 设计思路
//!
//! `EditorSession` 对应一次打开的头像/封面编辑器，持有本次编辑的全部临时状态：
//! 源图、裁剪框、视口变换、拖动状态机、网格开关与导出忙碌标志。
//! 会话只通过保存回调向外交付结果：
//!
//! - 保存成功：回调收到 JPEG Data URL
//! - 移除现有图片：回调收到空字符串
//! - 取消 / 关闭：不触发回调
//!
//! ## 实现思路
//!
//! - 所有变换更新都走 `ImageTransform` 的纯函数，会话只负责替换当前值。
//! - 选择新文件失败时不改动任何状态；成功时整体替换旧的编辑内容。
//! - 导出忙碌标志使用 `Arc<AtomicBool>`，配合 `ExportGuard`（RAII）自动复位，
//!   前端可持有标志副本用于禁用“保存”按钮。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::controller::{self, DragController, PointerAdapter, ZoomSlider};
use super::exporter;
use super::loader;
use super::source::{ExportedImage, SelectedFile, SourceImage};
use super::transform::{CropFrame, ImageTransform};
use super::{EditorConfig, ImageError, MaskKind, MaskSpec};

/// 保存回调：接收导出的 Data URL，或移除时的空字符串。
pub type SaveCallback = Box<dyn FnMut(String) + Send>;

/// 正在编辑的图片。
struct ActiveEdit {
    source: SourceImage,
    frame: CropFrame,
    transform: ImageTransform,
}

/// 导出忙碌标志的 RAII 守卫。
///
/// 构造时抢占标志（已被占用则返回 `ImageError::Busy`），`Drop` 时自动释放，
/// 导出中途出错也不会把标志遗留为忙碌。
struct ExportGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExportGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ImageError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ImageError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// 一次打开的图片编辑器。
pub struct EditorSession {
    kind: MaskKind,
    current_image: Option<String>,
    config: EditorConfig,
    container_width: Option<f64>,
    active: Option<ActiveEdit>,
    drag: DragController,
    show_grid: bool,
    busy: Arc<AtomicBool>,
    on_save: SaveCallback,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("kind", &self.kind)
            .field("has_current_image", &self.current_image.is_some())
            .field("container_width", &self.container_width)
            .field("transform", &self.transform())
            .field("dragging", &self.drag.is_dragging())
            .field("show_grid", &self.show_grid)
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl EditorSession {
    /// 打开编辑器：尚未选择图片，网格默认开启。
    ///
    /// `current_image` 只用于决定是否提供“移除”操作，不会载入编辑器；
    /// 它必须是编辑器交付过的图片 Data URL，否则视为没有现有图片。
    pub fn open<F>(kind: MaskKind, current_image: Option<String>, config: EditorConfig, on_save: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let current_image = current_image
            .filter(|image| !image.trim().is_empty())
            .filter(|image| match loader::parse_data_url(image, config.max_file_size) {
                Ok(_) => true,
                Err(err) => {
                    log::warn!("⚠️ 忽略无效的现有图片：{}", err);
                    false
                }
            });
        log::debug!(
            "editor opened: kind={} current_image={}",
            kind.as_str(),
            current_image.is_some()
        );

        Self {
            kind,
            current_image,
            config,
            container_width: None,
            active: None,
            drag: DragController::new(),
            show_grid: true,
            busy: Arc::new(AtomicBool::new(false)),
            on_save: Box::new(on_save),
        }
    }

    pub fn kind(&self) -> MaskKind {
        self.kind
    }

    /// 当前遮罩（封面跟随容器宽度）。
    pub fn mask(&self) -> MaskSpec {
        MaskSpec::for_kind(self.kind, self.container_width, &self.config)
    }

    pub fn has_image(&self) -> bool {
        self.active.is_some()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.active.as_ref().map(|edit| &edit.source)
    }

    pub fn frame(&self) -> Option<CropFrame> {
        self.active.as_ref().map(|edit| edit.frame)
    }

    pub fn transform(&self) -> Option<ImageTransform> {
        self.active.as_ref().map(|edit| edit.transform)
    }

    /// 缩放滑杆参数；未选择图片时为 `None`。
    pub fn zoom_slider(&self) -> Option<ZoomSlider> {
        self.transform()
            .map(|t| ZoomSlider::for_transform(&t, self.config.zoom_step))
    }

    /// 图像层预览用的 CSS transform。
    pub fn css_transform(&self) -> Option<String> {
        self.transform().map(|t| t.css_transform())
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.show_grid = !self.show_grid;
        self.show_grid
    }

    pub fn can_remove(&self) -> bool {
        self.current_image.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// 忙碌标志副本，供界面层观察。
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    /// 标题：编辑中为 “Edit Photo”，否则按遮罩类型提示添加。
    pub fn title(&self) -> &'static str {
        match (self.has_image(), self.kind) {
            (true, _) => "Edit Photo",
            (false, MaskKind::Profile) => "Add Profile Photo",
            (false, MaskKind::Cover) => "Add Cover Photo",
        }
    }

    /// 选择文件：校验、加载、解码并以最小缩放居中。
    ///
    /// 失败时保持原有编辑内容不变。
    pub async fn select_file(&mut self, file: SelectedFile) -> Result<(), ImageError> {
        let source = loader::load_source(file, &self.config).await?;

        self.drag.end();
        self.active = Some(self.fit(source));
        if let Some(t) = self.transform() {
            log::info!(
                "🔍 初始视口 - 遮罩: {} 最小缩放: {:.4} 最大缩放: {:.4}",
                self.kind.as_str(),
                t.min_zoom(),
                t.max_zoom()
            );
        }
        Ok(())
    }

    /// 更新容器宽度。遮罩因此变化时重新适配（最小缩放、居中）。
    pub fn set_container_width(&mut self, width: f64) {
        let previous = self.mask();
        self.container_width = Some(width);
        let mask = self.mask();

        if mask == previous {
            return;
        }

        if let Some(edit) = self.active.take() {
            log::debug!(
                "mask changed {}x{} -> {}x{}, refitting",
                previous.width,
                previous.height,
                mask.width,
                mask.height
            );
            self.drag.end();
            self.active = Some(self.fit(edit.source));
        }
    }

    /// 指针按下 / 触摸开始。
    pub fn pointer_down<A: PointerAdapter + ?Sized>(&mut self, input: &A) -> bool {
        match &self.active {
            Some(edit) => self.drag.begin(input, &edit.transform),
            None => false,
        }
    }

    /// 指针移动 / 触摸移动，返回位置是否更新。
    pub fn pointer_move<A: PointerAdapter + ?Sized>(&mut self, input: &A) -> bool {
        let Some(edit) = self.active.as_mut() else {
            return false;
        };

        match self.drag.update(input, edit.transform, &edit.frame) {
            Some(next) => {
                edit.transform = next;
                true
            }
            None => false,
        }
    }

    /// 指针抬起 / 触摸结束。
    pub fn pointer_up(&mut self) {
        self.drag.end();
    }

    /// 指针离开工作区，与抬起等价。
    pub fn pointer_leave(&mut self) {
        self.drag.end();
    }

    /// 滑杆输入。
    pub fn set_zoom(&mut self, value: f64) -> Option<ImageTransform> {
        let step = self.config.zoom_step;
        let edit = self.active.as_mut()?;
        edit.transform = controller::apply_slider_zoom(edit.transform, value, step, &edit.frame);
        log::debug!(
            "zoom -> {:.4} position=({:.2}, {:.2})",
            edit.transform.zoom(),
            edit.transform.position().x,
            edit.transform.position().y
        );
        Some(edit.transform)
    }

    pub fn zoom_in_step(&mut self) -> Option<ImageTransform> {
        self.nudge_zoom(1)
    }

    pub fn zoom_out_step(&mut self) -> Option<ImageTransform> {
        self.nudge_zoom(-1)
    }

    fn nudge_zoom(&mut self, steps: i32) -> Option<ImageTransform> {
        let slider = self.zoom_slider()?;
        let current = self.transform()?.zoom();
        self.set_zoom(slider.nudge(current, steps))
    }

    /// 恢复到初始适配状态。
    pub fn reset(&mut self) -> Option<ImageTransform> {
        let factor = self.config.zoom_range_factor;
        self.drag.end();
        let edit = self.active.as_mut()?;
        edit.transform = ImageTransform::fit(&edit.frame, factor);
        Some(edit.transform)
    }

    /// 编辑器内的“取消”：丢弃当前图片，回到选择文件界面，不触发回调。
    pub fn discard_image(&mut self) {
        self.drag.end();
        if self.active.take().is_some() {
            log::debug!("edit discarded");
        }
    }

    /// 导出当前裁剪并交给保存回调。
    pub fn save(&mut self) -> Result<ExportedImage, ImageError> {
        let _guard = ExportGuard::acquire(&self.busy)?;

        let edit = self
            .active
            .as_ref()
            .ok_or_else(|| ImageError::InvalidState("尚未选择图片".to_string()))?;

        let exported = exporter::export_crop(&edit.source, &edit.frame, &edit.transform, &self.config)?;
        (self.on_save)(exported.data_url.clone());

        Ok(exported)
    }

    /// 移除现有图片：回调收到空字符串。
    pub fn remove(&mut self) -> Result<(), ImageError> {
        if !self.can_remove() {
            return Err(ImageError::InvalidState("当前没有可移除的图片".to_string()));
        }

        (self.on_save)(String::new());
        self.current_image = None;
        Ok(())
    }

    /// 关闭编辑器，丢弃全部临时状态，不触发回调。
    pub fn close(self) {
        log::debug!("editor closed: kind={}", self.kind.as_str());
    }

    fn fit(&self, source: SourceImage) -> ActiveEdit {
        let frame = CropFrame::new(source.natural_size(), self.mask());
        let transform = ImageTransform::fit(&frame, self.config.zoom_range_factor);
        ActiveEdit {
            source,
            frame,
            transform,
        }
    }
}
