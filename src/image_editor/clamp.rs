//! 平移约束模块
//!
//! 给定当前缩放，计算合法的平移范围，保证缩放后的图像始终完整覆盖遮罩。
//!
//! # 设计思路
//!
//! - 纯函数：输入为偏移、缩放与裁剪框，输出唯一结果，便于测试。
//! - 先算“半余量”（渲染尺寸减遮罩尺寸再除以 2），再把偏移收敛到 `[-余量, +余量]`。
//! - 封面遮罩额外锁定横向偏移为 0。
//! - 这是唯一允许写入 `position` 的入口，拖动与缩放都必须经过这里。

use super::transform::{CropFrame, PanOffset};

/// 合法平移范围（半余量），两个分量恒 ≥ 0。
///
/// 合法区间为 `x ∈ [-x, x]`、`y ∈ [-y, y]`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanLimits {
    pub x: f64,
    pub y: f64,
}

/// 计算指定缩放下的平移范围。
///
/// 当缩放低于覆盖所需（余量为负）或输入非法时，对应轴余量取 0，
/// 图像被固定在遮罩中心。
pub fn pan_limits(frame: &CropFrame, zoom: f64) -> PanLimits {
    let rendered_w = frame.natural.width as f64 * zoom;
    let rendered_h = frame.natural.height as f64 * zoom;

    PanLimits {
        x: half_slack(rendered_w, frame.mask.width),
        y: half_slack(rendered_h, frame.mask.height),
    }
}

/// 将原始偏移收敛到合法范围。
///
/// # 后置条件
/// - `|result.x| <= limits.x`，`|result.y| <= limits.y`
/// - 封面遮罩：`result.x == 0`
/// - 幂等：对结果再次收敛得到相同值
pub fn clamp_position(raw: PanOffset, zoom: f64, frame: &CropFrame) -> PanOffset {
    let limits = pan_limits(frame, zoom);

    let x = if frame.mask.locks_horizontal_pan() {
        0.0
    } else {
        clamp_axis(raw.x, limits.x)
    };
    let y = clamp_axis(raw.y, limits.y);

    PanOffset { x, y }
}

fn half_slack(rendered: f64, mask: f64) -> f64 {
    let slack = (rendered - mask) / 2.0;
    if slack.is_finite() && slack > 0.0 {
        slack
    } else {
        0.0
    }
}

fn clamp_axis(value: f64, limit: f64) -> f64 {
    // NaN 无法比较，按居中处理
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-limit, limit)
}
