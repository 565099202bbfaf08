//! 三种正交视图.
//!
//! 每种视图都由一条 "正交轴" (选择切片的轴) 和两条 "平面轴" (张成切片平面的轴) 组成.
//! 平面内坐标记作 `(u, v)`: `u` 沿第一条平面轴向右增长, `v` 沿第二条平面轴向下增长.
//! 切片缓冲区按行优先存储, 即 `(u, v)` 处像素的下标为 `(v * width + u) * components`.

use crate::math::{Axis, Vector3};
use crate::PlanePos;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 正交视图类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ViewType {
    /// 横断面, 沿 Z 轴选择切片, 平面为 X × Y. 这也是图集的存储 (原生) 方向.
    Transverse,

    /// 矢状面, 沿 X 轴选择切片, 平面为 Y × Z.
    Sagittal,

    /// 冠状面, 沿 Y 轴选择切片, 平面为 X × Z.
    Coronal,
}

impl ViewType {
    /// 原生视图. 只有该视图下的切片与图集瓦片一一对应.
    pub const NATIVE: ViewType = ViewType::Transverse;

    /// 全部视图.
    pub const ALL: [ViewType; 3] = [ViewType::Transverse, ViewType::Sagittal, ViewType::Coronal];

    /// 选择切片的轴.
    #[inline]
    pub const fn orthogonal_axis(self) -> Axis {
        match self {
            ViewType::Transverse => Axis::Z,
            ViewType::Sagittal => Axis::X,
            ViewType::Coronal => Axis::Y,
        }
    }

    /// 张成切片平面的两条轴, 依次对应平面坐标 `u` 与 `v`.
    #[inline]
    pub const fn plane_axes(self) -> [Axis; 2] {
        match self {
            ViewType::Transverse => [Axis::X, Axis::Y],
            ViewType::Sagittal => [Axis::Y, Axis::Z],
            ViewType::Coronal => [Axis::X, Axis::Z],
        }
    }

    /// 是否是原生视图?
    #[inline]
    pub const fn is_native(self) -> bool {
        matches!(self, ViewType::Transverse)
    }

    /// 第 `slice` 个切片上平面坐标 `(u, v)` 对应的体素坐标.
    #[inline]
    pub fn voxel_at(self, slice: usize, (u, v): PlanePos) -> Vector3<usize> {
        let mut out = Vector3::new([0; 3]);
        let [ua, va] = self.plane_axes();
        out[self.orthogonal_axis()] = slice;
        out[ua] = u;
        out[va] = v;
        out
    }

    /// `voxel_at` 的逆运算: 获取体素所在的切片编号和平面坐标.
    #[inline]
    pub fn plane_position(self, voxel: &Vector3<usize>) -> (usize, PlanePos) {
        let [ua, va] = self.plane_axes();
        (voxel[self.orthogonal_axis()], (voxel[ua], voxel[va]))
    }
}
