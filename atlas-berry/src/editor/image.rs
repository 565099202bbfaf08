//! 图层图像的体数据访问接口.

use std::sync::Arc;

use crate::atlas::{AtlasTexture, SliceAtlas};
use crate::data::{ViewType, VolumeData, VolumeShape};
use crate::error::AtlasResult;
use crate::math::Vector3;

/// 图层图像. 标注器与历史命令只通过这些方法读写体数据.
pub trait VolumeImage {
    /// 体数据形状.
    fn shape(&self) -> VolumeShape;

    /// 三个轴上的体素个数.
    #[inline]
    fn voxel_count(&self) -> Vector3<usize> {
        self.shape().voxel_count()
    }

    /// 读取切片.
    fn get_slice(&mut self, slice: usize, view: ViewType) -> AtlasResult<Arc<[u8]>>;

    /// 写入切片.
    fn set_slice(&mut self, slice: usize, view: ViewType, data: &[u8]) -> AtlasResult<()>;

    /// 回读整张图集.
    fn get_atlas(&self) -> AtlasResult<Vec<u8>>;

    /// 整体替换图集.
    fn set_atlas(&mut self, data: &[u8]) -> AtlasResult<()>;

    /// 以 `z, y, x, component` 顺序回读整个体数据.
    fn get_image_data(&self) -> AtlasResult<VolumeData>;

    /// 以体数据整体替换图像.
    fn set_image_data(&mut self, volume: &VolumeData) -> AtlasResult<()>;
}

impl<T: AtlasTexture> VolumeImage for SliceAtlas<T> {
    #[inline]
    fn shape(&self) -> VolumeShape {
        SliceAtlas::shape(self)
    }

    #[inline]
    fn get_slice(&mut self, slice: usize, view: ViewType) -> AtlasResult<Arc<[u8]>> {
        self.read_slice(slice, view)
    }

    #[inline]
    fn set_slice(&mut self, slice: usize, view: ViewType, data: &[u8]) -> AtlasResult<()> {
        self.write_slice(slice, view, data)
    }

    #[inline]
    fn get_atlas(&self) -> AtlasResult<Vec<u8>> {
        SliceAtlas::get_atlas(self)
    }

    #[inline]
    fn set_atlas(&mut self, data: &[u8]) -> AtlasResult<()> {
        SliceAtlas::set_atlas(self, data)
    }

    #[inline]
    fn get_image_data(&self) -> AtlasResult<VolumeData> {
        SliceAtlas::get_image_data(self)
    }

    #[inline]
    fn set_image_data(&mut self, volume: &VolumeData) -> AtlasResult<()> {
        SliceAtlas::set_image_data(self, volume)
    }
}
