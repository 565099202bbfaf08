//! 图集布局计算.
//!
//! 图集是一张二维纹理, 按 `(columns, rows)` 网格平铺体数据的全部原生 (横断面) 切片.
//! 第 `z` 个原生切片位于瓦片 `(z % columns, z / columns)`. 网格末尾多余的瓦片永远不会被读取.
//!
//! 非原生视图的切片散布在多个瓦片中: 矢状面切片的第 `v` 行是第 `v` 个瓦片中的一列像素,
//! 冠状面切片的第 `v` 行是第 `v` 个瓦片中的一行像素.

use super::Rect;
use crate::data::{ViewType, VolumeData, VolumeShape};
use crate::error::{AtlasError, AtlasResult};
use crate::math::{Vector2, Vector3};

/// 计算容纳 `depth` 个原生切片的图集网格 `(columns, rows)`.
///
/// 规则为 `columns = ceil(sqrt(depth))`, `rows = ceil(depth / columns)`, 因此总有
/// `columns >= rows` 且 `columns * rows >= depth`. `depth == 0` 时返回 `Err`.
pub fn compute_atlas_grid(depth: usize) -> AtlasResult<Vector2<usize>> {
    if depth == 0 {
        return Err(AtlasError::validation("图集深度必须为正数"));
    }
    // 浮点开方可能有 1 的误差, 下面两步将其修正为精确的整数上取整.
    // 平方溢出 `usize` 时必然大于 `depth`.
    let square_below = |n: usize| n.checked_mul(n).is_some_and(|sq| sq < depth);
    let mut columns = (depth as f64).sqrt().ceil() as usize;
    while square_below(columns) {
        columns += 1;
    }
    while columns > 1 && !square_below(columns - 1) {
        columns -= 1;
    }
    let rows = depth.div_ceil(columns);
    debug_assert!(columns >= rows);
    debug_assert!(columns.checked_mul(rows).map_or(true, |n| n >= depth));
    Ok(Vector2::new([columns, rows]))
}

/// 一段连续切片数据在图集中的落点: 它属于第几个原生切片, 以及对应的像素矩形.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TileSpan {
    /// 原生切片编号.
    pub native_slice: usize,

    /// 图集中的像素矩形.
    pub rect: Rect,
}

/// 体数据形状与其图集网格、图集尺寸的组合. 任何时候都可以只由体数据形状重新推出.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AtlasLayout {
    shape: VolumeShape,
    grid: Vector2<usize>,
    atlas_size: Vector2<usize>,
}

impl AtlasLayout {
    /// 为 `shape` 计算布局. 图集任一边超过 `max_atlas_size` 像素时返回 `Err`.
    pub fn new(shape: VolumeShape, max_atlas_size: usize) -> AtlasResult<Self> {
        let count = shape.voxel_count();
        let grid = compute_atlas_grid(count.z())?;
        let overflow = || {
            AtlasError::validation(format!(
                "体数据 {:?} 的图集尺寸超出可寻址范围",
                count.as_array()
            ))
        };
        let width = grid.x().checked_mul(count.x()).ok_or_else(overflow)?;
        let height = grid.y().checked_mul(count.y()).ok_or_else(overflow)?;
        width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(shape.components()))
            .ok_or_else(overflow)?;
        let atlas_size = Vector2::new([width, height]);
        if atlas_size.x() > max_atlas_size || atlas_size.y() > max_atlas_size {
            return Err(AtlasError::validation(format!(
                "图集尺寸 {}x{} 超过上限 {max_atlas_size}",
                atlas_size.x(),
                atlas_size.y()
            )));
        }
        Ok(Self {
            shape,
            grid,
            atlas_size,
        })
    }

    /// 体数据形状.
    #[inline]
    pub fn shape(&self) -> VolumeShape {
        self.shape
    }

    /// 图集网格 `(columns, rows)`.
    #[inline]
    pub fn grid(&self) -> Vector2<usize> {
        self.grid
    }

    /// 图集像素尺寸 `(宽, 高)`.
    #[inline]
    pub fn atlas_size(&self) -> Vector2<usize> {
        self.atlas_size
    }

    /// 图集缓冲区的字节数.
    #[inline]
    pub fn atlas_len(&self) -> usize {
        self.atlas_size.product() * self.shape.components()
    }

    /// 第 `z` 个原生切片所在的瓦片 `(column, row)`.
    #[inline]
    pub fn tile_index(&self, z: usize) -> Vector2<usize> {
        Vector2::new([z % self.grid.x(), z / self.grid.x()])
    }

    /// 第 `z` 个原生切片所在瓦片左上角的像素坐标.
    #[inline]
    pub fn tile_origin(&self, z: usize) -> Vector2<usize> {
        let tile = self.tile_index(z);
        let count = self.shape.voxel_count();
        Vector2::new([tile.x() * count.x(), tile.y() * count.y()])
    }

    /// 第 `z` 个原生切片所在瓦片的像素矩形.
    #[inline]
    pub fn tile_rect(&self, z: usize) -> Rect {
        let o = self.tile_origin(z);
        let count = self.shape.voxel_count();
        Rect::new(o.x(), o.y(), count.x(), count.y())
    }

    /// 体素在图集中的像素坐标.
    #[inline]
    pub fn atlas_pixel(&self, voxel: &Vector3<usize>) -> Vector2<usize> {
        let o = self.tile_origin(voxel.z());
        Vector2::new([o.x() + voxel.x(), o.y() + voxel.y()])
    }

    /// 切片 `(slice, view)` 在图集中的全部落点, 按切片缓冲区中的先后顺序排列.
    ///
    /// 原生视图只有一个落点 (整个瓦片). 非原生视图的第 `v` 行对应第 `v`
    /// 个原生切片中宽 (矢状面) 或高 (冠状面) 为 1 像素的矩形.
    /// 每个落点的字节数恰为 `rect.area() * components`, 所有落点的字节数之和等于
    /// `shape.slice_len(view)`.
    ///
    /// 调用方须保证 `slice` 合法.
    pub fn slice_spans(&self, slice: usize, view: ViewType) -> Vec<TileSpan> {
        debug_assert!(self.shape.check_slice(slice, view).is_ok());
        let count = self.shape.voxel_count();
        match view {
            ViewType::Transverse => vec![TileSpan {
                native_slice: slice,
                rect: self.tile_rect(slice),
            }],
            ViewType::Sagittal => (0..count.z())
                .map(|z| {
                    let o = self.tile_origin(z);
                    TileSpan {
                        native_slice: z,
                        rect: Rect::new(o.x() + slice, o.y(), 1, count.y()),
                    }
                })
                .collect(),
            ViewType::Coronal => (0..count.z())
                .map(|z| {
                    let o = self.tile_origin(z);
                    TileSpan {
                        native_slice: z,
                        rect: Rect::new(o.x(), o.y() + slice, count.x(), 1),
                    }
                })
                .collect(),
        }
    }

    /// 将体数据打包成图集缓冲区 (行优先, 多余瓦片填零).
    pub fn pack(&self, volume: &[u8]) -> AtlasResult<Vec<u8>> {
        if volume.len() != self.shape.byte_len() {
            return Err(AtlasError::validation(format!(
                "体数据长度应为 {}, 但得到 {}",
                self.shape.byte_len(),
                volume.len()
            )));
        }
        let mut atlas = vec![0u8; self.atlas_len()];
        let row_len = self.atlas_size.x() * self.shape.components();

        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                use rayon::prelude::*;
                atlas
                    .par_chunks_mut(row_len)
                    .enumerate()
                    .for_each(|(ay, row)| self.pack_row(volume, ay, row));
            } else {
                atlas
                    .chunks_mut(row_len)
                    .enumerate()
                    .for_each(|(ay, row)| self.pack_row(volume, ay, row));
            }
        }
        Ok(atlas)
    }

    /// 将图集缓冲区拆回体数据.
    pub fn unpack(&self, atlas: &[u8]) -> AtlasResult<VolumeData> {
        if atlas.len() != self.atlas_len() {
            return Err(AtlasError::validation(format!(
                "图集长度应为 {}, 但得到 {}",
                self.atlas_len(),
                atlas.len()
            )));
        }
        let mut volume = VolumeData::zeros(self.shape);
        let row_len = self.shape.voxel_count().x() * self.shape.components();

        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                use rayon::prelude::*;
                volume
                    .data_mut()
                    .par_chunks_mut(row_len)
                    .enumerate()
                    .for_each(|(i, row)| self.unpack_row(atlas, i, row));
            } else {
                volume
                    .data_mut()
                    .chunks_mut(row_len)
                    .enumerate()
                    .for_each(|(i, row)| self.unpack_row(atlas, i, row));
            }
        }
        Ok(volume)
    }

    /// 填充图集的第 `ay` 行像素.
    fn pack_row(&self, volume: &[u8], ay: usize, row: &mut [u8]) {
        let count = self.shape.voxel_count();
        let c = self.shape.components();
        let (tile_row, y) = (ay / count.y(), ay % count.y());
        let vol_row_len = count.x() * c;
        for column in 0..self.grid.x() {
            let z = tile_row * self.grid.x() + column;
            if z >= count.z() {
                break;
            }
            let src = (z * count.y() + y) * vol_row_len;
            let dst = column * vol_row_len;
            row[dst..dst + vol_row_len].copy_from_slice(&volume[src..src + vol_row_len]);
        }
    }

    /// 填充体数据的第 `i` 行体素 (`i = z * Y + y`).
    fn unpack_row(&self, atlas: &[u8], i: usize, row: &mut [u8]) {
        let count = self.shape.voxel_count();
        let c = self.shape.components();
        let (z, y) = (i / count.y(), i % count.y());
        let o = self.tile_origin(z);
        let src = ((o.y() + y) * self.atlas_size.x() + o.x()) * c;
        row.copy_from_slice(&atlas[src..src + row.len()]);
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_atlas_grid, AtlasLayout};
    use crate::atlas::Rect;
    use crate::data::{ViewType, VolumeShape};
    use crate::error::AtlasError;
    use crate::math::{Vector2, Vector3};

    #[test]
    fn test_grid_invalid_input() {
        assert!(compute_atlas_grid(0).is_err());
    }

    #[test]
    fn test_grid_rule() {
        let expect = [
            (1, (1, 1)),
            (2, (2, 1)),
            (3, (2, 2)),
            (4, (2, 2)),
            (5, (3, 2)),
            (9, (3, 3)),
            (10, (4, 3)),
            (17, (5, 4)),
            (256, (16, 16)),
            (257, (17, 16)),
        ];
        for (d, (c, r)) in expect {
            assert_eq!(compute_atlas_grid(d).unwrap(), Vector2::new([c, r]), "depth {d}");
        }
    }

    #[test]
    fn test_grid_deterministic_and_sufficient() {
        for d in 1..2000 {
            let g = compute_atlas_grid(d).unwrap();
            assert_eq!(g, compute_atlas_grid(d).unwrap());
            assert!(g.x() >= 1 && g.y() >= 1);
            assert!(g.product() >= d);
            assert!(g.x() >= g.y());
            // 更小的列数放不下.
            assert!((g.x() - 1) * (g.x() - 1) < d);
        }
    }

    #[test]
    fn test_tile_placement_4x4x4() {
        let shape = VolumeShape::new((4, 4, 4), 1).unwrap();
        let layout = AtlasLayout::new(shape, 1024).unwrap();
        assert_eq!(layout.grid(), Vector2::new([2, 2]));
        assert_eq!(layout.atlas_size(), Vector2::new([8, 8]));
        assert_eq!(layout.tile_index(2), Vector2::new([0, 1]));
        assert_eq!(layout.tile_rect(2), Rect::new(0, 4, 4, 4));
        assert_eq!(layout.tile_rect(3), Rect::new(4, 4, 4, 4));
        assert_eq!(
            layout.atlas_pixel(&Vector3::new([1, 2, 3])),
            Vector2::new([5, 6])
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_grid_huge_depth() {
        let g = compute_atlas_grid(usize::MAX).unwrap();
        assert_eq!(g, Vector2::new([1 << 32, 1 << 32]));
        let g = compute_atlas_grid(usize::MAX / 2).unwrap();
        assert!(g.x() >= g.y());
        assert!(g.x() as u128 * g.y() as u128 >= (usize::MAX / 2) as u128);
        assert!(((g.x() - 1) as u128).pow(2) < (usize::MAX / 2) as u128);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_atlas_size_overflow() {
        assert!(VolumeShape::new((1 << 63, 1, 4), 1).is_err());
        // 体数据本身可寻址, 但平铺后图集字节数溢出.
        let shape = VolumeShape::new((1 << 62, 1, 3), 1).unwrap();
        assert!(matches!(
            AtlasLayout::new(shape, usize::MAX),
            Err(AtlasError::Validation(_))
        ));
        assert!(matches!(
            AtlasLayout::new(shape, 8192),
            Err(AtlasError::Validation(_))
        ));
    }

    #[test]
    fn test_atlas_too_large() {
        let shape = VolumeShape::new((100, 100, 4), 1).unwrap();
        assert!(AtlasLayout::new(shape, 199).is_err());
        assert!(AtlasLayout::new(shape, 200).is_ok());
    }

    #[test]
    fn test_slice_spans_cover_slice() {
        let shape = VolumeShape::new((3, 4, 5), 2).unwrap();
        let layout = AtlasLayout::new(shape, 1024).unwrap();
        for view in ViewType::ALL {
            for n in 0..shape.slice_count(view) {
                let spans = layout.slice_spans(n, view);
                let bytes: usize = spans.iter().map(|s| s.rect.area() * 2).sum();
                assert_eq!(bytes, shape.slice_len(view));
                for s in spans.iter() {
                    // 每个落点都在其原生切片的瓦片之内.
                    assert!(layout.tile_rect(s.native_slice).contains_rect(&s.rect));
                }
            }
        }
        let sag = layout.slice_spans(2, ViewType::Sagittal);
        assert_eq!(sag.len(), 5);
        assert_eq!(sag[4].rect, Rect::new(3 + 2, 4, 1, 4));
        let cor = layout.slice_spans(1, ViewType::Coronal);
        assert_eq!(cor[3].rect, Rect::new(0, 4 + 1, 3, 1));
    }

    #[test]
    fn test_pack_unpack() {
        let shape = VolumeShape::new((3, 2, 5), 1).unwrap();
        let layout = AtlasLayout::new(shape, 1024).unwrap();
        let data: Vec<u8> = (0..30).collect();
        let atlas = layout.pack(&data).unwrap();
        assert_eq!(atlas.len(), 9 * 4);
        // 第 4 个切片位于 (1, 1), 其第 1 行从像素 (3, 3) 开始.
        assert_eq!(atlas[3 * 9 + 3], (4 * 6 + 3) as u8);
        // 多余瓦片 (2, 1) 为零.
        assert_eq!(atlas[2 * 9 + 6], 0);
        assert_eq!(layout.unpack(&atlas).unwrap().into_raw(), data);
        assert!(layout.pack(&data[1..]).is_err());
    }
}
