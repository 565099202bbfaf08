//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, PlanePos};

pub use crate::atlas::{
    AtlasLayout, AtlasTexture, CpuAllocator, CpuTexture, SliceAtlas, TextureAllocator,
};
pub use crate::config::EditorConfig;
pub use crate::data::{CtWindow, ImgWriteVis, ViewType, VolumeData, VolumeShape};
pub use crate::editor::{
    AnnotationVoxel, Annotator, Command, CommandSnapshot, Document, Erase, LayerId, Max, MergeFn,
    Min, PlaneTool, Replace, VolumeImage,
};
pub use crate::error::{AtlasError, AtlasResult};
pub use crate::math::{Vector2, Vector3};

pub use crate::consts::gray::{ANNOTATION_BACKGROUND, ANNOTATION_FOREGROUND};

#[cfg(feature = "gpu")]
pub use crate::atlas::{GpuContext, GpuTexture};
