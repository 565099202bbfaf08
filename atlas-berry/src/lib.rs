#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 体数据切片图集核心库. 把三维体数据 (CT 扫描或标注) 按切片平铺进一张二维纹理,
//! 并在其上提供任意视图的切片读写与可撤销的体素标注.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 图集只按横断面 (Transverse) 切片平铺. 矢状面与冠状面切片在图集中并不连续,
//!   读写时会被拆分成每个横断面切片上的一列或一行.
//! 2. 非法输入总是在任何纹理操作之前被拒绝, 因此不会造成部分写入.
//!   纹理本身出错 ([`AtlasError::Rendering`]) 对当前帧是致命的.
//! 3. 历史命令构造后不可修改. 撤销/重做只会重放命令中保存的数据.
//!
//! # 开发计划
//!
//! ### 图集布局 ✅
//!
//! 网格为 `ceil(sqrt(D))` 列, `ceil(D / 列数)` 行. 横断面切片 `z`
//! 位于第 `z % 列数` 列, 第 `z / 列数` 行.
//!
//! 实现位于 `atlas-berry/src/atlas/layout.rs`.
//!
//! ### 纹理后端 ✅
//!
//! 1. CPU 纹理, 用于测试和无 GPU 环境. 可以模拟上下文丢失. ✅
//! 2. wgpu 纹理, 由 `gpu` feature 打开. ✅
//!
//! 实现位于 `atlas-berry/src/atlas/texture.rs` 和 `atlas-berry/src/atlas/gpu.rs`.
//!
//! ### 切片读写与缓存 ✅
//!
//! 原生切片回读整个瓦片, 非原生切片对每个原生切片回读一列或一行像素再拼接.
//! 结果按切片缓存, 任何写入都会使缓存失效.
//!
//! 实现位于 `atlas-berry/src/atlas/{reader, writer, adapter}.rs`.
//!
//! ### 体素标注与笔画 ✅
//!
//! 一次笔画 (从第一次标注到 `finish_stroke`) 产生一条切片命令.
//! 提供圆形、直线、笔刷和区域生长四种平面工具.
//!
//! 实现位于 `atlas-berry/src/editor/{annotator, tools, merge}.rs`.
//!
//! ### 撤销/重做 ✅
//!
//! 带游标的线性历史, 超出最大深度时丢弃最旧的命令.
//! 命令快照可以压缩存储 (需要 `serde` feature).
//!
//! 实现位于 `atlas-berry/src/editor/{command, history}.rs`.
//!
//! ### 文档与图层 ✅
//!
//! 每个文档拥有独立的图层注册表、历史和重绘通知.
//!
//! 实现位于 `atlas-berry/src/editor/{document, layer}.rs`.
//!
//! ### 加载与导出 ✅
//!
//! 1. 从 NIfTI 文件加载扫描 (经 CT 窗口映射为 8-bit) 或标注. ✅
//! 2. 把切片导出为 PNG. ✅
//!
//! 实现位于 `atlas-berry/src/data/{loader, save, window}.rs`.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 二维索引, 按 `(宽, 高)` 排列.
pub type Idx2d = (usize, usize);

/// 切片平面内的像素坐标 `(u, v)`. `u` 为列, `v` 为行.
///
/// 各视图下 `u`/`v` 对应的体数据坐标轴见 [`ViewType`].
pub type PlanePos = (usize, usize);

pub mod atlas;
pub mod config;
pub mod consts;
pub mod data;
pub mod editor;
mod error;
pub mod math;
pub mod prelude;

pub use atlas::{
    AtlasLayout, AtlasTexture, CpuAllocator, CpuTexture, SliceAtlas, TextureAllocator,
};
pub use config::EditorConfig;
pub use data::{
    CtWindow, ImgWriteRaw, ImgWriteVis, SliceImage, ViewType, VolumeData, VolumeShape,
};
pub use editor::{AnnotationVoxel, Annotator, Command, Document, History, LayerId};
pub use error::{AtlasError, AtlasResult};

#[cfg(feature = "gpu")]
pub use atlas::{GpuContext, GpuTexture};
