//! 切片图集: 布局计算、纹理后端、切片读写与适配器.

mod adapter;
mod layout;
mod reader;
mod texture;
mod writer;

#[cfg(feature = "gpu")]
mod gpu;

pub use adapter::SliceAtlas;
pub use layout::{compute_atlas_grid, AtlasLayout, TileSpan};
pub use reader::SliceReader;
pub use texture::{AtlasTexture, CpuAllocator, CpuTexture, Rect, TextureAllocator};
pub use writer::{SliceSource, SliceWriter, TilePatch};

#[cfg(feature = "gpu")]
pub use gpu::{GpuContext, GpuTexture};
