//! # 视口变换模块
//!
//! ## 设计思路
//!
//! 缩放、偏移、最小缩放三者合并为一个不可变值 `ImageTransform`，
//! 只能通过 `with_zoom` / `with_pan` / `clamped` 产生新值，
//! 每个入口都会经过平移约束，因此“图像完整覆盖遮罩”的不变式在函数边界上成立，
//! 而不是散落在各个事件处理函数里。
//!
//! ## 坐标约定
//!
//! - `position` 为图像中心相对遮罩中心的偏移（显示像素），向右/向下为正。
//! - 渲染尺寸 = 原始尺寸 × `zoom`。
//! - 最小缩放采用 cover 语义（类似 CSS `background-size: cover`）。

use serde::Serialize;

use super::clamp::{self, PanLimits};
use super::{ImageSize, MaskSpec};

/// 覆盖判定的容差（显示像素），吸收浮点误差。
const COVER_EPSILON: f64 = 1e-6;

/// 平移偏移（显示像素）。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PanOffset {
    pub x: f64,
    pub y: f64,
}

impl PanOffset {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 裁剪框：一次编辑中固定不变的几何（源图尺寸 + 遮罩）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropFrame {
    pub natural: ImageSize,
    pub mask: MaskSpec,
}

impl CropFrame {
    pub fn new(natural: ImageSize, mask: MaskSpec) -> Self {
        Self { natural, mask }
    }

    /// 指定缩放下的渲染尺寸。
    pub fn rendered_size(&self, zoom: f64) -> (f64, f64) {
        (
            self.natural.width as f64 * zoom,
            self.natural.height as f64 * zoom,
        )
    }
}

/// 计算覆盖遮罩所需的最小缩放：`max(mask_w / W, mask_h / H)`。
///
/// 源图或遮罩尺寸非法时回退为 1.0。
pub fn min_cover_zoom(natural: ImageSize, mask: &MaskSpec) -> f64 {
    let mask_valid = mask.width.is_finite() && mask.width > 0.0 && mask.height.is_finite() && mask.height > 0.0;
    if natural.is_empty() || !mask_valid {
        log::warn!(
            "Invalid crop geometry (image {}x{}, mask {}x{}). Falling back to zoom 1.0.",
            natural.width,
            natural.height,
            mask.width,
            mask.height
        );
        return 1.0;
    }

    let scale_w = mask.width / natural.width as f64;
    let scale_h = mask.height / natural.height as f64;
    scale_w.max(scale_h)
}

/// 单次编辑会话的视口变换。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageTransform {
    zoom: f64,
    position: PanOffset,
    min_zoom: f64,
    max_zoom: f64,
}

impl ImageTransform {
    /// 新图载入或遮罩变化时的初始状态：最小缩放、居中。
    ///
    /// 缩放区间为 `[min_zoom, min_zoom × zoom_range_factor]`，系数非法时视为 1。
    pub fn fit(frame: &CropFrame, zoom_range_factor: f64) -> Self {
        let min_zoom = min_cover_zoom(frame.natural, &frame.mask);
        let factor = if zoom_range_factor.is_finite() && zoom_range_factor >= 1.0 {
            zoom_range_factor
        } else {
            1.0
        };

        Self {
            zoom: min_zoom,
            position: PanOffset::ZERO,
            min_zoom,
            max_zoom: min_zoom * factor,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn position(&self) -> PanOffset {
        self.position
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// 缩放滑杆区间 `(min, max)`。
    pub fn zoom_range(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    /// 设置缩放（收敛到区间内）并重新约束偏移。
    ///
    /// 非有限输入被忽略，保持当前缩放。
    pub fn with_zoom(self, zoom: f64, frame: &CropFrame) -> Self {
        let zoom = if zoom.is_finite() {
            zoom.clamp(self.min_zoom, self.max_zoom)
        } else {
            self.zoom
        };

        Self { zoom, ..self }.clamped(frame)
    }

    /// 以原始目标偏移更新位置，结果经过约束。
    pub fn with_pan(self, raw: PanOffset, frame: &CropFrame) -> Self {
        Self {
            position: raw,
            ..self
        }
        .clamped(frame)
    }

    /// 按当前缩放重新约束偏移。
    pub fn clamped(self, frame: &CropFrame) -> Self {
        Self {
            position: clamp::clamp_position(self.position, self.zoom, frame),
            ..self
        }
    }

    /// 当前缩放下的平移范围。
    pub fn pan_limits(&self, frame: &CropFrame) -> PanLimits {
        clamp::pan_limits(frame, self.zoom)
    }

    /// 渲染矩形 `(left, top, right, bottom)`，以遮罩中心为原点。
    pub fn rendered_rect(&self, frame: &CropFrame) -> (f64, f64, f64, f64) {
        let (w, h) = frame.rendered_size(self.zoom);
        (
            self.position.x - w / 2.0,
            self.position.y - h / 2.0,
            self.position.x + w / 2.0,
            self.position.y + h / 2.0,
        )
    }

    /// 渲染矩形是否完整包含遮罩矩形。
    pub fn covers_mask(&self, frame: &CropFrame) -> bool {
        let (left, top, right, bottom) = self.rendered_rect(frame);
        let half_w = frame.mask.width / 2.0;
        let half_h = frame.mask.height / 2.0;

        left <= -half_w + COVER_EPSILON
            && top <= -half_h + COVER_EPSILON
            && right >= half_w - COVER_EPSILON
            && bottom >= half_h - COVER_EPSILON
    }

    /// 前端图像层使用的 CSS transform。
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.position.x, self.position.y, self.zoom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_editor::{EditorConfig, MaskKind};

    fn frame(kind: MaskKind, width: u32, height: u32, container: Option<f64>) -> CropFrame {
        let config = EditorConfig::default();
        CropFrame::new(
            ImageSize::new(width, height),
            MaskSpec::for_kind(kind, container, &config),
        )
    }

    #[test]
    fn fit_uses_cover_zoom_and_centers() {
        let frame = frame(MaskKind::Profile, 800, 600, None);
        let t = ImageTransform::fit(&frame, 3.0);

        assert!((t.min_zoom() - 0.4).abs() < 1e-12);
        assert_eq!(t.zoom(), t.min_zoom());
        assert_eq!(t.position(), PanOffset::ZERO);
        assert!((t.max_zoom() - 1.2).abs() < 1e-12);
        assert!(t.covers_mask(&frame));
    }

    #[test]
    fn with_zoom_clamps_into_range() {
        let frame = frame(MaskKind::Profile, 800, 600, None);
        let t = ImageTransform::fit(&frame, 3.0);

        assert_eq!(t.with_zoom(0.01, &frame).zoom(), t.min_zoom());
        assert_eq!(t.with_zoom(99.0, &frame).zoom(), t.max_zoom());
        assert_eq!(t.with_zoom(f64::NAN, &frame).zoom(), t.zoom());
    }

    #[test]
    fn zooming_out_reclamps_position() {
        let frame = frame(MaskKind::Profile, 800, 600, None);
        let t = ImageTransform::fit(&frame, 3.0)
            .with_zoom(1.2, &frame)
            .with_pan(PanOffset::new(300.0, 200.0), &frame);

        // 1.2 → 960×720：x 余量 360，y 余量 240
        assert!((t.position().x - 300.0).abs() < 1e-9);
        assert!((t.position().y - 200.0).abs() < 1e-9);

        let t = t.with_zoom(0.4, &frame);
        assert!((t.position().x - 40.0).abs() < 1e-9);
        assert_eq!(t.position().y, 0.0);
        assert!(t.covers_mask(&frame));
    }

    #[test]
    fn degenerate_geometry_falls_back_to_unit_zoom() {
        let frame = frame(MaskKind::Profile, 0, 600, None);
        assert_eq!(min_cover_zoom(frame.natural, &frame.mask), 1.0);
    }

    #[test]
    fn css_transform_reflects_state() {
        let frame = frame(MaskKind::Profile, 240, 240, None);
        let t = ImageTransform::fit(&frame, 3.0);

        assert_eq!(t.css_transform(), "translate(0px, 0px) scale(1)");
    }
}
