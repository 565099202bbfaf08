//! 标注编辑: 图层、标注器、可撤销的命令历史与重绘通知.
//!
//! 一个 [`Document`] 拥有若干 [`ImageLayer`], 一条 [`History`] 和一个
//! [`RenderNotifier`]. 所有修改都经由 [`VolumeImage`] 落到图集上,
//! 撤销/重做则经由 [`LayerHost`] 找回目标图层.

mod annotator;
mod command;
mod document;
mod history;
mod image;
mod layer;
mod merge;
mod render;
mod tools;

pub use annotator::{AnnotationVoxel, Annotator};
pub use command::{Command, CommandKind, CommandSnapshot, CommandTarget};
pub use document::Document;
pub use history::History;
pub use self::image::VolumeImage;
pub use layer::{ImageLayer, LayerHost, LayerId, LayerRegistry};
pub use merge::{Erase, Max, MergeFn, Min, Replace};
pub use render::RenderNotifier;
pub use tools::{PlanePoint, PlaneTool};
