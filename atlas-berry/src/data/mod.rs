//! 体数据基础结构: 视图类型、形状、体数据本身, 以及加载与导出.

pub mod loader;
mod save;
mod view_type;
mod volume;
mod window;

pub use save::{ImgWriteRaw, ImgWriteVis, SliceImage};
pub use view_type::ViewType;
pub use volume::{VolumeData, VolumeShape};
pub use window::CtWindow;
