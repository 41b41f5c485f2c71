//! # 拖动 / 缩放控制器
//!
//! ## 设计思路
//!
//! 鼠标与触摸事件先经过各自的薄适配器（`MouseInput` / `TouchInput`），
//! 统一成 `PointerSample`，再交给同一个状态机处理，避免在事件处理里做运行时类型判断。
//!
//! ```text
//!   Idle ──pointer down / touch start──▶ Dragging
//!    ▲                                     │ pointer move：target = pointer − drag_start → 约束
//!    └──── pointer up / leave / touch end ─┘
//! ```
//!
//! 缩放滑杆输入按步长对齐后直接写入缩放，随后立即重新约束偏移。
//! 所有操作同步执行，不涉及异步与 IO。

use super::transform::{CropFrame, ImageTransform, PanOffset};

/// 归一化后的指针采样（客户区坐标）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
}

/// 输入事件适配器：把具体事件转换为 `PointerSample`。
///
/// 返回 `None` 表示该事件不携带坐标（例如触摸结束时已无触点）。
pub trait PointerAdapter {
    fn sample(&self) -> Option<PointerSample>;
}

/// 鼠标事件。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseInput {
    pub client_x: f64,
    pub client_y: f64,
}

impl PointerAdapter for MouseInput {
    fn sample(&self) -> Option<PointerSample> {
        Some(PointerSample {
            x: self.client_x,
            y: self.client_y,
        })
    }
}

/// 单个触点。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub client_x: f64,
    pub client_y: f64,
}

/// 触摸事件，只读取第一个触点。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TouchInput {
    pub touches: Vec<TouchPoint>,
}

impl PointerAdapter for TouchInput {
    fn sample(&self) -> Option<PointerSample> {
        self.touches.first().map(|touch| PointerSample {
            x: touch.client_x,
            y: touch.client_y,
        })
    }
}

impl PointerAdapter for PointerSample {
    fn sample(&self) -> Option<PointerSample> {
        Some(*self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    /// 记录按下时指针相对当前偏移的差值。
    Dragging { drag_start: PanOffset },
}

/// 拖动状态机。
#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

impl DragController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// 进入拖动。已在拖动中或事件无坐标时忽略，返回是否真正开始。
    pub fn begin<A: PointerAdapter + ?Sized>(&mut self, input: &A, transform: &ImageTransform) -> bool {
        if self.is_dragging() {
            log::debug!("drag already active, ignoring pointer down");
            return false;
        }

        let Some(sample) = input.sample() else {
            return false;
        };

        let position = transform.position();
        self.state = DragState::Dragging {
            drag_start: PanOffset::new(sample.x - position.x, sample.y - position.y),
        };
        true
    }

    /// 拖动中的指针移动：计算原始目标偏移并经约束后返回新变换。
    ///
    /// 未在拖动或事件无坐标时返回 `None`，调用方保持原状态。
    pub fn update<A: PointerAdapter + ?Sized>(
        &self,
        input: &A,
        transform: ImageTransform,
        frame: &CropFrame,
    ) -> Option<ImageTransform> {
        let DragState::Dragging { drag_start } = self.state else {
            return None;
        };
        let sample = input.sample()?;

        let raw = PanOffset::new(sample.x - drag_start.x, sample.y - drag_start.y);
        Some(transform.with_pan(raw, frame))
    }

    /// 结束拖动（pointer up / leave / touch end）。
    pub fn end(&mut self) {
        self.state = DragState::Idle;
    }
}

/// 缩放滑杆：`[min, max]` 区间、固定步长。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomSlider {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ZoomSlider {
    pub fn for_transform(transform: &ImageTransform, step: f64) -> Self {
        let (min, max) = transform.zoom_range();
        Self { min, max, step }
    }

    /// 按步长从 `min` 起对齐，并收敛到区间内（与原生 range 输入一致）。
    pub fn snap(&self, raw: f64) -> f64 {
        if !raw.is_finite() {
            return self.min;
        }

        let value = if self.step.is_finite() && self.step > 0.0 {
            let steps = ((raw - self.min) / self.step).round();
            self.min + steps * self.step
        } else {
            raw
        };

        value.clamp(self.min, self.max)
    }

    /// 向上/向下移动一个步长。
    pub fn nudge(&self, current: f64, steps: i32) -> f64 {
        self.snap(current + self.step * steps as f64)
    }
}

/// 滑杆输入：对齐步长 → 写入缩放 → 重新约束偏移。
pub fn apply_slider_zoom(
    transform: ImageTransform,
    raw_value: f64,
    step: f64,
    frame: &CropFrame,
) -> ImageTransform {
    let slider = ZoomSlider::for_transform(&transform, step);
    transform.with_zoom(slider.snap(raw_value), frame)
}
