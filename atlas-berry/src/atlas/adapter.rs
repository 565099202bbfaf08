//! 切片图集适配器: 图集纹理的唯一读写入口.

use std::sync::Arc;

use log::debug;

use super::{
    AtlasLayout, AtlasTexture, Rect, SliceReader, SliceSource, SliceWriter, TextureAllocator,
    TilePatch,
};
use crate::config::EditorConfig;
use crate::data::{ViewType, VolumeData, VolumeShape};
use crate::error::{AtlasError, AtlasResult};
use crate::math::Vector3;

/// 组合 [`SliceReader`] 与 [`SliceWriter`], 并独占图集纹理.
///
/// 任何写入之后都会清空整个切片缓存: 一次写入可能影响任意多个已缓存的非原生切片.
#[derive(Debug)]
pub struct SliceAtlas<T: AtlasTexture> {
    layout: AtlasLayout,
    texture: T,
    reader: SliceReader,
    writer: SliceWriter,
}

impl<T: AtlasTexture> SliceAtlas<T> {
    /// 用一张已有纹理构建适配器. 纹理尺寸或通道数与 `shape` 的图集布局不符时返回 `Err`.
    pub fn new(texture: T, shape: VolumeShape, config: &EditorConfig) -> AtlasResult<Self> {
        let layout = AtlasLayout::new(shape, config.max_atlas_size())?;
        if texture.size() != layout.atlas_size() || texture.components() != shape.components() {
            return Err(AtlasError::validation(format!(
                "纹理为 {:?} x {} 通道, 但图集需要 {:?} x {} 通道",
                texture.size().as_array(),
                texture.components(),
                layout.atlas_size().as_array(),
                shape.components()
            )));
        }
        Ok(Self {
            layout,
            texture,
            reader: SliceReader::new(layout),
            writer: SliceWriter::new(layout),
        })
    }

    /// 向 `allocator` 申请一张全零纹理并构建适配器.
    pub fn allocate<A>(
        allocator: &A,
        shape: VolumeShape,
        config: &EditorConfig,
    ) -> AtlasResult<Self>
    where
        A: TextureAllocator<Texture = T>,
    {
        let layout = AtlasLayout::new(shape, config.max_atlas_size())?;
        let texture = allocator.allocate(layout.atlas_size(), shape.components())?;
        Self::new(texture, shape, config)
    }

    /// 申请纹理并写入 `volume`.
    pub fn from_volume<A>(
        allocator: &A,
        volume: &VolumeData,
        config: &EditorConfig,
    ) -> AtlasResult<Self>
    where
        A: TextureAllocator<Texture = T>,
    {
        let mut atlas = Self::allocate(allocator, volume.shape(), config)?;
        atlas.set_image_data(volume)?;
        Ok(atlas)
    }

    /// 体数据形状.
    #[inline]
    pub fn shape(&self) -> VolumeShape {
        self.layout.shape()
    }

    /// 图集布局.
    #[inline]
    pub fn layout(&self) -> &AtlasLayout {
        &self.layout
    }

    /// 图集纹理 (只读).
    #[inline]
    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// 在 `f` 中直接操作图集纹理, 返回后清空切片缓存.
    pub fn with_texture_mut<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let r = f(&mut self.texture);
        self.invalidate_cache();
        r
    }

    /// 读取切片. 见 [`SliceReader::read_slice`].
    #[inline]
    pub fn read_slice(&mut self, slice: usize, view: ViewType) -> AtlasResult<Arc<[u8]>> {
        self.reader.read_slice(&self.texture, slice, view)
    }

    /// 写入完整切片缓冲区, 随后清空切片缓存.
    pub fn write_slice(&mut self, slice: usize, view: ViewType, data: &[u8]) -> AtlasResult<()> {
        self.write_source(slice, view, SliceSource::Buffer(data))
    }

    /// 写入按原生切片拆好的截面数据, 随后清空切片缓存.
    pub fn write_slice_tiles(
        &mut self,
        slice: usize,
        view: ViewType,
        tiles: &[TilePatch],
    ) -> AtlasResult<()> {
        self.write_source(slice, view, SliceSource::Tiles(tiles))
    }

    fn write_source(
        &mut self,
        slice: usize,
        view: ViewType,
        source: SliceSource<'_>,
    ) -> AtlasResult<()> {
        let result = self
            .writer
            .write_slice(&mut self.texture, slice, view, source);
        // 即使写入中途失败, 纹理也可能已被部分修改.
        self.invalidate_cache();
        result
    }

    /// 清空切片缓存.
    #[inline]
    pub fn invalidate_cache(&mut self) {
        self.reader.invalidate_cache();
    }

    /// 回读整张图集.
    #[inline]
    pub fn get_atlas(&self) -> AtlasResult<Vec<u8>> {
        self.texture.read_all()
    }

    /// 整体替换图集内容. `data` 长度与图集不符时返回 `Err`, 纹理保持不变.
    pub fn set_atlas(&mut self, data: &[u8]) -> AtlasResult<()> {
        if data.len() != self.layout.atlas_len() {
            return Err(AtlasError::validation(format!(
                "图集长度应为 {}, 但得到 {}",
                self.layout.atlas_len(),
                data.len()
            )));
        }
        debug!("替换整张图集 ({} 字节)", data.len());
        let result = self.texture.write_all(data);
        self.invalidate_cache();
        result
    }

    /// 以 `z, y, x, component` 顺序回读整个体数据.
    pub fn get_image_data(&self) -> AtlasResult<VolumeData> {
        self.layout.unpack(&self.get_atlas()?)
    }

    /// 以体数据整体替换图集内容. 形状不符时返回 `Err`.
    pub fn set_image_data(&mut self, volume: &VolumeData) -> AtlasResult<()> {
        if volume.shape() != self.shape() {
            return Err(AtlasError::validation(format!(
                "体数据形状 {:?} 与图集形状 {:?} 不符",
                volume.shape(),
                self.shape()
            )));
        }
        let atlas = self.layout.pack(volume.data())?;
        self.set_atlas(&atlas)
    }

    /// 回读单个体素的全部通道. 越界时返回 [`AtlasError::IndexOutOfRange`].
    pub fn get_voxel(&self, voxel: &Vector3<usize>) -> AtlasResult<Vec<u8>> {
        self.shape().check_voxel(voxel)?;
        self.texture.read_rect(self.voxel_rect(voxel))
    }

    /// 覆写单个体素的全部通道, 随后清空切片缓存.
    pub fn set_voxel(&mut self, voxel: &Vector3<usize>, value: &[u8]) -> AtlasResult<()> {
        let shape = self.shape();
        shape.check_voxel(voxel)?;
        if value.len() != shape.components() {
            return Err(AtlasError::validation(format!(
                "体素需要 {} 个通道, 但得到 {}",
                shape.components(),
                value.len()
            )));
        }
        let result = self.texture.write_rect(self.voxel_rect(voxel), value);
        self.invalidate_cache();
        result
    }

    #[inline]
    fn voxel_rect(&self, voxel: &Vector3<usize>) -> Rect {
        let p = self.layout.atlas_pixel(voxel);
        Rect::new(p.x(), p.y(), 1, 1)
    }
}
