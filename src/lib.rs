//! # 头像 / 封面图片编辑器 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           调用方（前端桥接 / profile-image-editor CLI）   │
//! │                                                          │
//! │  选择文件 ── 拖拽 / 触摸 ── 缩放滑块 ── 保存 / 移除       │
//! │       │  (Result<T, AppError>，错误可序列化)             │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ image_editor                                          │
//! │  │   ├─ loader        校验·Data URL·解码                  │
//! │  │   ├─ transform     最小覆盖缩放 + 不可变变换           │
//! │  │   ├─ clamp         平移边界夹紧                        │
//! │  │   ├─ controller    拖拽状态机 + 滑块                   │
//! │  │   ├─ exporter      CanvasSurface 裁剪导出 JPEG         │
//! │  │   └─ session       一次编辑的完整生命周期              │
//! │  │                                                       │
//! │  └─ settings          编辑器设置 JSON 读写               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，所有对外入口的返回类型 |
//! | [`image_editor`] | 图片加载、视口变换、拖拽缩放、约束夹紧与裁剪导出 |
//! | [`settings`] | 编辑器设置文件的读取、校验与保存 |

pub mod error;
pub mod image_editor;
pub mod settings;
