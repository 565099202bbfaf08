//! 体数据形状与拥有所有权的体数据.

use super::ViewType;
use crate::consts::MAX_VOXEL_COMPONENTS;
use crate::error::{AtlasError, AtlasResult};
use crate::math::Vector3;
use crate::Idx2d;

/// 体数据的形状: 三个轴上的体素个数, 以及每个体素的通道数.
///
/// 形状一旦创建便不可变.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VolumeShape {
    voxel_count: Vector3<usize>,
    components: usize,
}

impl VolumeShape {
    /// 构建形状.
    ///
    /// 每个轴上的体素个数都必须为正数, 通道数必须位于 `1..=4`, 且总字节数
    /// 不能溢出 `usize`, 否则返回 `Err`.
    pub fn new(voxel_count: impl Into<Vector3<usize>>, components: usize) -> AtlasResult<Self> {
        let voxel_count = voxel_count.into();
        if !voxel_count.is_positive() {
            return Err(AtlasError::validation(format!(
                "体素个数必须为正数, 但得到 {:?}",
                voxel_count.as_array()
            )));
        }
        if !(1..=MAX_VOXEL_COMPONENTS).contains(&components) {
            return Err(AtlasError::validation(format!(
                "通道数必须位于 1..={MAX_VOXEL_COMPONENTS}, 但得到 {components}"
            )));
        }
        let byte_len = voxel_count
            .0
            .iter()
            .try_fold(components, |acc, &n| acc.checked_mul(n));
        if byte_len.is_none() {
            return Err(AtlasError::validation(format!(
                "体数据 {:?} x {components} 通道的字节数超出可寻址范围",
                voxel_count.as_array()
            )));
        }
        Ok(Self {
            voxel_count,
            components,
        })
    }

    /// 三个轴上的体素个数 `(X, Y, Z)`.
    #[inline]
    pub fn voxel_count(&self) -> Vector3<usize> {
        self.voxel_count
    }

    /// 每个体素的通道数.
    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    /// 是否是三维体数据? 仅有一个横断面的数据被视为二维图像.
    #[inline]
    pub fn is_3d(&self) -> bool {
        self.voxel_count.z() > 1
    }

    /// 默认视图.
    #[inline]
    pub fn default_view_type(&self) -> ViewType {
        ViewType::NATIVE
    }

    /// `view` 视图下切片的 `(宽, 高)`.
    #[inline]
    pub fn slice_shape(&self, view: ViewType) -> Idx2d {
        let [u, v] = view.plane_axes();
        (self.voxel_count[u], self.voxel_count[v])
    }

    /// `view` 视图下单个切片缓冲区的字节数.
    #[inline]
    pub fn slice_len(&self, view: ViewType) -> usize {
        let (w, h) = self.slice_shape(view);
        w * h * self.components
    }

    /// `view` 视图下的切片个数.
    #[inline]
    pub fn slice_count(&self, view: ViewType) -> usize {
        self.voxel_count[view.orthogonal_axis()]
    }

    /// 整个体数据的字节数.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.voxel_count.product() * self.components
    }

    /// 检查体素坐标是否合法 (未越界).
    #[inline]
    pub fn contains(&self, voxel: &Vector3<usize>) -> bool {
        voxel.0.iter().zip(self.voxel_count.0.iter()).all(|(v, c)| v < c)
    }

    /// 检查切片编号是否合法. 越界时返回 [`AtlasError::IndexOutOfRange`].
    #[inline]
    pub fn check_slice(&self, slice: usize, view: ViewType) -> AtlasResult<()> {
        let len = self.slice_count(view);
        if slice < len {
            Ok(())
        } else {
            Err(AtlasError::IndexOutOfRange { slice, view, len })
        }
    }

    /// 检查体素坐标是否合法. 某个轴越界时, 以该轴为正交轴的视图报告
    /// [`AtlasError::IndexOutOfRange`].
    pub fn check_voxel(&self, voxel: &Vector3<usize>) -> AtlasResult<()> {
        for view in ViewType::ALL {
            self.check_slice(voxel[view.orthogonal_axis()], view)?;
        }
        Ok(())
    }

    /// 体素在 `z, y, x, component` 顺序存储中第一个通道的下标.
    #[inline]
    pub(crate) fn voxel_offset(&self, voxel: &Vector3<usize>) -> usize {
        let [x, y, z] = voxel.0;
        let [w, h, _] = self.voxel_count.0;
        ((z * h + y) * w + x) * self.components
    }
}

/// 拥有所有权的体数据, 按照 `z, y, x, component` 的顺序存储.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeData {
    shape: VolumeShape,
    data: Vec<u8>,
}

impl VolumeData {
    /// 直接初始化. `data` 长度与 `shape` 不符时返回 `Err`.
    pub fn new(shape: VolumeShape, data: Vec<u8>) -> AtlasResult<Self> {
        if data.len() != shape.byte_len() {
            return Err(AtlasError::validation(format!(
                "体数据长度应为 {}, 但得到 {}",
                shape.byte_len(),
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// 创建全零体数据.
    #[inline]
    pub fn zeros(shape: VolumeShape) -> Self {
        Self {
            shape,
            data: vec![0; shape.byte_len()],
        }
    }

    /// 形状.
    #[inline]
    pub fn shape(&self) -> VolumeShape {
        self.shape
    }

    /// 底层数据.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 底层可变数据.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// 获取体素的全部通道. 越界时返回 `None`.
    pub fn voxel(&self, voxel: &Vector3<usize>) -> Option<&[u8]> {
        if !self.shape.contains(voxel) {
            return None;
        }
        let start = self.shape.voxel_offset(voxel);
        Some(&self.data[start..start + self.shape.components()])
    }

    /// 获取第 `z` 个原生 (横断面) 切片. 越界时 panic.
    #[inline]
    pub fn native_slice(&self, z: usize) -> &[u8] {
        let len = self.shape.slice_len(ViewType::NATIVE);
        &self.data[z * len..(z + 1) * len]
    }
}

#[cfg(test)]
mod tests {
    use super::{VolumeData, VolumeShape};
    use crate::data::ViewType;
    use crate::error::AtlasError;
    use crate::math::Vector3;

    #[test]
    fn test_shape_invalid_input() {
        assert!(VolumeShape::new((0, 1, 1), 1).is_err());
        assert!(VolumeShape::new((1, 1, 1), 0).is_err());
        assert!(VolumeShape::new((1, 1, 1), 5).is_err());
        assert!(VolumeShape::new((1, 1, 1), 4).is_ok());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_shape_byte_len_overflow() {
        assert!(matches!(
            VolumeShape::new((1 << 63, 1, 4), 1),
            Err(AtlasError::Validation(_))
        ));
        assert!(matches!(
            VolumeShape::new((1 << 62, 1, 1), 4),
            Err(AtlasError::Validation(_))
        ));
        let s = VolumeShape::new((1 << 62, 1, 3), 1).unwrap();
        assert_eq!(s.byte_len(), 3 << 62);
    }

    #[test]
    fn test_slice_shapes() {
        let s = VolumeShape::new((4, 5, 6), 2).unwrap();
        assert_eq!(s.slice_shape(ViewType::Transverse), (4, 5));
        assert_eq!(s.slice_shape(ViewType::Sagittal), (5, 6));
        assert_eq!(s.slice_shape(ViewType::Coronal), (4, 6));
        assert_eq!(s.slice_len(ViewType::Coronal), 4 * 6 * 2);
        assert_eq!(s.slice_count(ViewType::Sagittal), 4);
        assert!(s.is_3d());
        assert!(!VolumeShape::new((4, 5, 1), 1).unwrap().is_3d());
    }

    #[test]
    fn test_check_slice() {
        let s = VolumeShape::new((4, 5, 6), 1).unwrap();
        assert!(s.check_slice(5, ViewType::Transverse).is_ok());
        assert!(matches!(
            s.check_slice(6, ViewType::Transverse),
            Err(AtlasError::IndexOutOfRange { slice: 6, len: 6, .. })
        ));
        assert!(s.check_slice(4, ViewType::Sagittal).is_err());

        assert!(s.check_voxel(&Vector3::new([3, 4, 5])).is_ok());
        assert!(matches!(
            s.check_voxel(&Vector3::new([0, 5, 0])),
            Err(AtlasError::IndexOutOfRange {
                view: ViewType::Coronal,
                ..
            })
        ));
    }

    #[test]
    fn test_volume_voxel() {
        let shape = VolumeShape::new((2, 2, 2), 1).unwrap();
        let v = VolumeData::new(shape, (0..8).collect()).unwrap();
        assert_eq!(v.voxel(&Vector3::new([1, 0, 1])), Some(&[5u8][..]));
        assert_eq!(v.voxel(&Vector3::new([2, 0, 0])), None);
        assert_eq!(v.native_slice(1), &[4, 5, 6, 7]);
        assert!(VolumeData::new(shape, vec![0; 7]).is_err());
    }
}
