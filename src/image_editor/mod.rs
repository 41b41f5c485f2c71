//! # 头像 / 封面图片编辑模块（image_editor）
//!
//! ## 设计思路
//!
//! 该模块将“选择文件 → 校验解码 → 视口变换 → 拖拽缩放 → 约束夹紧 → 裁剪导出”
//! 按职责拆分为多个子模块，保证几何计算都是可单测的纯函数。
//!
//! - `session`：一次打开的编辑器（对外状态机入口）
//! - `handler`：持有全局配置、切换导出档位、创建会话
//! - `loader`：文件 / Data URL 加载与安全校验、解码
//! - `transform`：最小覆盖缩放与不可变的 `ImageTransform`
//! - `clamp`：平移边界计算与夹紧
//! - `controller`：鼠标 / 触摸适配器、拖拽状态机、缩放滑块
//! - `exporter`：裁剪区域换算、`CanvasSurface` 绘制与 JPEG 编码
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 实现思路
//!
//! 所有位置写入都经过 `clamp::clamp_position`，因此“渲染后的图片始终完整覆盖遮罩”
//! 这一约束只在一处实现。导出时的画布由单次导出独占，生命周期结束即释放。
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 调用方（前端桥接 / CLI）
//!    ↓
//! handler.rs（配置快照、打开会话）
//!    ↓
//! session.rs（编辑器状态 + 忙碌标记）
//!    ├─ loader.rs（类型/体积/文件头校验 + 异步解码）
//!    ├─ controller.rs（指针采样 → 拖拽 / 滑块）
//!    │     └─ transform.rs → clamp.rs（每次变更后重新夹紧）
//!    └─ exporter.rs（裁剪区域 → CanvasSurface → JPEG Data URL）
//!    ↓
//! 保存回调收到 Data URL（移除时为空字符串）
//! ```
//!
//! ## 分层职责建议
//!
//! - 遮罩尺寸、输出分辨率、质量档位优先改 `config.rs`
//! - 交互流程（何时重置、何时触发回调）优先改 `session.rs`
//! - 几何公式只改 `transform.rs` / `clamp.rs` / `exporter.rs::crop_region`

mod clamp;
mod config;
mod controller;
mod error;
mod exporter;
mod handler;
mod loader;
mod session;
mod source;
mod transform;

pub use clamp::{PanLimits, clamp_position, pan_limits};
pub use config::{EditorConfig, ExportProfile};
pub use controller::{
    DragController,
    MouseInput,
    PointerAdapter,
    PointerSample,
    TouchInput,
    TouchPoint,
    ZoomSlider,
    apply_slider_zoom,
};
pub use error::ImageError;
pub use exporter::{CanvasSurface, CropRegion, crop_region, export_crop};
pub use handler::{EditorSettings, ImageEditor};
pub use loader::{
    encode_data_url,
    load_source,
    parse_data_url,
    read_selected_file,
    selected_file_from_data_url,
};
pub use session::{EditorSession, SaveCallback};
pub use source::{ExportedImage, ImageSize, MaskKind, MaskSpec, SelectedFile, SourceImage};
pub use transform::{CropFrame, ImageTransform, PanOffset, min_cover_zoom};
