//! 体素标注器: 把体素写入批量应用到图像上, 并把一次笔画打包成一条历史命令.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace};

use super::{Command, LayerId, MergeFn, RenderNotifier, Replace, VolumeImage};
use crate::data::ViewType;
use crate::error::AtlasResult;
use crate::math::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单个体素写入. 坐标可能越界 (指针拖出画布), 越界写入会被静默丢弃.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnnotationVoxel {
    /// X 坐标.
    pub x: i64,
    /// Y 坐标.
    pub y: i64,
    /// Z 坐标.
    pub z: i64,
    /// 编辑值. 写入体素的每一个通道.
    pub value: u8,
}

impl AnnotationVoxel {
    /// 直接初始化.
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64, value: u8) -> Self {
        Self { x, y, z, value }
    }

    /// 坐标.
    #[inline]
    pub fn position(&self) -> Vector3<i64> {
        Vector3::new([self.x, self.y, self.z])
    }
}

/// 进行中的笔画.
#[derive(Debug)]
struct Stroke {
    view: ViewType,
    slice: usize,
    /// 笔画开始前的切片. 不记录历史时为 `None`.
    old: Option<Arc<[u8]>>,
}

/// 体素标注器. 状态机为 `空闲 -> 笔画进行中 -> 空闲`.
///
/// 笔画开始时 (第一次有效的 [`Annotator::annotate`]) 记录第一个体素所在切片
/// (沿标注器的视图类型) 的旧数据; [`Annotator::finish_stroke`] 记录新数据并产出一条命令.
///
/// # 注意
///
/// 一次笔画只记录一个切片的新旧数据. 若一次笔画跨越了多个切片,
/// 其它切片上的修改不会进入历史.
#[derive(Debug)]
pub struct Annotator<M: MergeFn = Replace> {
    layer_id: LayerId,
    view_type: ViewType,
    merge: M,
    undoable: bool,
    stroke: Option<Stroke>,
    render: RenderNotifier,
}

impl Annotator<Replace> {
    /// 创建记录历史的标注器, 使用 [`Replace`] 合并策略.
    #[inline]
    pub fn new(layer_id: LayerId, render: RenderNotifier) -> Self {
        Self::with_merge(layer_id, render, Replace, true)
    }

    /// 创建永不记录历史的标注器, 用于程序化的修改.
    #[inline]
    pub fn new_non_undoable(layer_id: LayerId, render: RenderNotifier) -> Self {
        Self::with_merge(layer_id, render, Replace, false)
    }
}

impl<M: MergeFn> Annotator<M> {
    /// 指定合并策略和是否记录历史. 初始视图为原生视图.
    pub fn with_merge(
        layer_id: LayerId,
        render: RenderNotifier,
        merge: M,
        undoable: bool,
    ) -> Self {
        Self {
            layer_id,
            view_type: ViewType::NATIVE,
            merge,
            undoable,
            stroke: None,
            render,
        }
    }

    /// 目标图层.
    #[inline]
    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    /// 用于确定笔画切片的视图.
    #[inline]
    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    /// 修改视图. 对进行中的笔画无效, 从下一次笔画开始生效.
    #[inline]
    pub fn set_view_type(&mut self, view: ViewType) {
        self.view_type = view;
    }

    /// 是否记录历史?
    #[inline]
    pub fn is_undoable(&self) -> bool {
        self.undoable
    }

    /// 是否有进行中的笔画?
    #[inline]
    pub fn is_stroke_active(&self) -> bool {
        self.stroke.is_some()
    }

    /// 放弃进行中的笔画而不产出命令. 已写入的体素保持不变.
    #[inline]
    pub fn abort_stroke(&mut self) {
        self.stroke = None;
    }

    /// 将 `voxels` 按数组顺序写入 `image`, 返回实际写入 (未被丢弃) 的体素个数.
    ///
    /// 每个体素的每个通道都写入 `merge(旧值, value)`. 同一原生切片上的写入被合并为
    /// 一次切片读写. 全部越界时什么也不做.
    pub fn annotate(
        &mut self,
        image: &mut dyn VolumeImage,
        voxels: &[AnnotationVoxel],
    ) -> AtlasResult<usize> {
        let shape = image.shape();
        let count = shape.voxel_count();
        let valid: Vec<(Vector3<usize>, u8)> = voxels
            .iter()
            .filter_map(|v| v.position().to_index(&count).map(|p| (p, v.value)))
            .collect();
        let Some((first, _)) = valid.first() else {
            trace!("丢弃 {} 个越界体素", voxels.len());
            return Ok(0);
        };

        if self.stroke.is_none() {
            let view = self.view_type;
            let (slice, _) = view.plane_position(first);
            let old = if self.undoable {
                Some(image.get_slice(slice, view)?)
            } else {
                None
            };
            debug!("笔画开始: 切片 {slice} ({view:?})");
            self.stroke = Some(Stroke { view, slice, old });
        }

        let mut batches: BTreeMap<usize, Vec<(usize, usize, u8)>> = BTreeMap::new();
        for &(p, value) in valid.iter() {
            batches.entry(p.z()).or_default().push((p.x(), p.y(), value));
        }

        let (w, _) = shape.slice_shape(ViewType::NATIVE);
        let c = shape.components();
        for (z, batch) in batches {
            let mut buf = image.get_slice(z, ViewType::NATIVE)?.to_vec();
            for (x, y, value) in batch {
                let i = (y * w + x) * c;
                for p in buf[i..i + c].iter_mut() {
                    *p = self.merge.merge(*p, value);
                }
            }
            image.set_slice(z, ViewType::NATIVE, &buf)?;
        }
        self.render.lazy_render();
        Ok(valid.len())
    }

    /// 结束笔画. 记录历史时返回一条切片命令, 否则 (或没有进行中的笔画) 返回 `None`.
    pub fn finish_stroke(
        &mut self,
        image: &mut dyn VolumeImage,
    ) -> AtlasResult<Option<Command>> {
        let new = match &self.stroke {
            None => return Ok(None),
            Some(s) if s.old.is_some() => Some(image.get_slice(s.slice, s.view)?),
            Some(_) => None,
        };
        let Some(stroke) = self.stroke.take() else {
            return Ok(None);
        };
        debug!("笔画结束: 切片 {} ({:?})", stroke.slice, stroke.view);
        match (stroke.old, new) {
            (Some(old), Some(new)) => {
                Command::slice(self.layer_id, stroke.view, stroke.slice, old, new).map(Some)
            }
            _ => Ok(None),
        }
    }
}
