//! 切片写入.
//!
//! 非原生视图的切片跨越多个瓦片, 写入会被拆成每个原生切片一次的矩形写入,
//! 每次只触及该瓦片中属于这一切片的 1 像素宽 (或高) 的截面.

use std::collections::HashMap;

use log::trace;

use super::{AtlasLayout, AtlasTexture, TileSpan};
use crate::data::ViewType;
use crate::error::{AtlasError, AtlasResult};

/// 针对单个原生切片的预先准备好的写入数据.
///
/// `data` 是该原生切片中, 目标切片截面矩形的行优先像素.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TilePatch {
    /// 原生切片编号.
    pub native_slice: usize,

    /// 截面像素.
    pub data: Vec<u8>,
}

/// 切片写入的数据来源.
#[derive(Copy, Clone, Debug)]
pub enum SliceSource<'a> {
    /// 完整的切片缓冲区, 按该视图的平面坐标行优先排列.
    Buffer(&'a [u8]),

    /// 按原生切片拆好的截面数据. 必须恰好覆盖目标切片涉及的每个原生切片一次.
    Tiles(&'a [TilePatch]),
}

/// 将切片写回图集纹理.
#[derive(Debug, Clone)]
pub struct SliceWriter {
    layout: AtlasLayout,
}

impl SliceWriter {
    /// 直接初始化.
    #[inline]
    pub fn new(layout: AtlasLayout) -> Self {
        Self { layout }
    }

    /// 将 `source` 写入切片 `(slice, view)`.
    ///
    /// 所有输入校验 (切片编号、缓冲区长度、瓦片覆盖) 都在第一次纹理写入之前完成,
    /// 校验失败时纹理保持不变. 纹理写入本身失败时返回 [`AtlasError::Rendering`].
    pub fn write_slice<T: AtlasTexture + ?Sized>(
        &self,
        texture: &mut T,
        slice: usize,
        view: ViewType,
        source: SliceSource<'_>,
    ) -> AtlasResult<()> {
        let plan = self.plan(slice, view, source)?;
        trace!("写入切片 {slice} ({view:?}), 共 {} 次", plan.len());
        for (span, data) in plan {
            texture.write_rect(span.rect, data)?;
        }
        Ok(())
    }

    /// 校验输入并把数据分配到每个落点.
    fn plan<'a>(
        &self,
        slice: usize,
        view: ViewType,
        source: SliceSource<'a>,
    ) -> AtlasResult<Vec<(TileSpan, &'a [u8])>> {
        let shape = self.layout.shape();
        shape.check_slice(slice, view)?;
        let c = shape.components();
        let spans = self.layout.slice_spans(slice, view);

        match source {
            SliceSource::Buffer(data) => {
                let expected = shape.slice_len(view);
                if data.len() != expected {
                    return Err(AtlasError::validation(format!(
                        "切片 {slice} ({view:?}) 需要 {expected} 字节, 但得到 {}",
                        data.len()
                    )));
                }
                let mut offset = 0;
                let plan = spans
                    .into_iter()
                    .map(|span| {
                        let len = span.rect.area() * c;
                        let part = &data[offset..offset + len];
                        offset += len;
                        (span, part)
                    })
                    .collect();
                debug_assert_eq!(offset, expected);
                Ok(plan)
            }
            SliceSource::Tiles(patches) => {
                let mut by_slice: HashMap<usize, &'a TilePatch> =
                    HashMap::with_capacity(patches.len());
                for p in patches {
                    if by_slice.insert(p.native_slice, p).is_some() {
                        return Err(AtlasError::validation(format!(
                            "原生切片 {} 出现了多次",
                            p.native_slice
                        )));
                    }
                }
                if by_slice.len() != spans.len() {
                    return Err(AtlasError::validation(format!(
                        "切片 {slice} ({view:?}) 涉及 {} 个瓦片, 但提供了 {} 个",
                        spans.len(),
                        by_slice.len()
                    )));
                }
                spans
                    .into_iter()
                    .map(|span| {
                        let patch =
                            by_slice.get(&span.native_slice).copied().ok_or_else(|| {
                                AtlasError::validation(format!(
                                    "缺少原生切片 {} 的数据",
                                    span.native_slice
                                ))
                            })?;
                        let expected = span.rect.area() * c;
                        if patch.data.len() != expected {
                            return Err(AtlasError::validation(format!(
                                "原生切片 {} 需要 {expected} 字节, 但得到 {}",
                                span.native_slice,
                                patch.data.len()
                            )));
                        }
                        Ok((span, patch.data.as_slice()))
                    })
                    .collect()
            }
        }
    }

    /// 把完整切片缓冲区拆成逐原生切片的截面数据, 即 [`SliceSource::Tiles`] 的输入格式.
    pub fn split_into_tiles(
        &self,
        slice: usize,
        view: ViewType,
        data: &[u8],
    ) -> AtlasResult<Vec<TilePatch>> {
        Ok(self
            .plan(slice, view, SliceSource::Buffer(data))?
            .into_iter()
            .map(|(span, part)| TilePatch {
                native_slice: span.native_slice,
                data: part.to_vec(),
            })
            .collect())
    }

    /// 布局.
    #[inline]
    pub fn layout(&self) -> &AtlasLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::{SliceSource, SliceWriter, TilePatch};
    use crate::atlas::{AtlasLayout, AtlasTexture, CpuTexture, SliceReader};
    use crate::data::{ViewType, VolumeShape};
    use crate::error::AtlasError;
    use itertools::iproduct;

    fn fixture(x: usize, y: usize, z: usize, c: usize) -> (AtlasLayout, CpuTexture) {
        let shape = VolumeShape::new((x, y, z), c).unwrap();
        let layout = AtlasLayout::new(shape, 4096).unwrap();
        let tex = CpuTexture::new(layout.atlas_size(), c);
        (layout, tex)
    }

    /// 每个切片都写入不同的非零图案.
    fn pattern(len: usize, seed: usize) -> Vec<u8> {
        (0..len).map(|i| ((i * 7 + seed * 13) % 251 + 1) as u8).collect()
    }

    #[test]
    fn test_native_write_tile_4x4x4() {
        let (layout, mut tex) = fixture(4, 4, 4, 1);
        let w = SliceWriter::new(layout);
        let data = pattern(16, 2);
        w.write_slice(&mut tex, 2, ViewType::Transverse, SliceSource::Buffer(&data))
            .unwrap();
        // 切片 2 位于瓦片 (0, 1), 即像素矩形 (0, 4, 4, 4).
        assert_eq!(tex.read_rect(layout.tile_rect(2)).unwrap(), data);
        let atlas = tex.read_all().unwrap();
        assert_eq!(atlas[4 * 8..4 * 8 + 4], data[..4]);
        assert_eq!(atlas.iter().filter(|&&p| p != 0).count(), 16);

        let mut r = SliceReader::new(layout);
        assert_eq!(&*r.read_slice(&tex, 2, ViewType::Transverse).unwrap(), &data[..]);
    }

    #[test]
    fn test_read_after_write_all_views() {
        let (layout, mut tex) = fixture(3, 4, 5, 2);
        let shape = layout.shape();
        let w = SliceWriter::new(layout);
        for view in ViewType::ALL {
            for n in 0..shape.slice_count(view) {
                let data = pattern(shape.slice_len(view), n);
                w.write_slice(&mut tex, n, view, SliceSource::Buffer(&data))
                    .unwrap();
                let mut r = SliceReader::new(layout);
                assert_eq!(&*r.read_slice(&tex, n, view).unwrap(), &data[..]);
            }
        }
    }

    #[test]
    fn test_write_isolation() {
        let (layout, mut tex) = fixture(3, 4, 5, 1);
        let shape = layout.shape();
        let w = SliceWriter::new(layout);
        let mut r = SliceReader::new(layout);

        // 矢状面 x = 1 只影响 x = 1 的体素; 其它矢状面切片不变.
        let before: Vec<_> = (0..3)
            .map(|x| r.read_slice(&tex, x, ViewType::Sagittal).unwrap())
            .collect();
        let data = pattern(shape.slice_len(ViewType::Sagittal), 9);
        w.write_slice(&mut tex, 1, ViewType::Sagittal, SliceSource::Buffer(&data))
            .unwrap();
        r.invalidate_cache();
        for x in [0, 2] {
            assert_eq!(r.read_slice(&tex, x, ViewType::Sagittal).unwrap(), before[x]);
        }

        // 每个横断面只在 x = 1 那一列发生变化.
        for (z, y, x) in iproduct!(0..5, 0..4, 0..3) {
            let s = r.read_slice(&tex, z, ViewType::Transverse).unwrap();
            let expected = if x == 1 { data[z * 4 + y] } else { 0 };
            assert_eq!(s[y * 3 + x], expected, "({x}, {y}, {z})");
        }
    }

    #[test]
    fn test_tiles_source_matches_buffer() {
        let (layout, mut a) = fixture(3, 4, 5, 1);
        let mut b = a.clone();
        let w = SliceWriter::new(layout);
        let data = pattern(3 * 5, 4);
        let tiles = w.split_into_tiles(2, ViewType::Coronal, &data).unwrap();
        assert_eq!(tiles.len(), 5);

        w.write_slice(&mut a, 2, ViewType::Coronal, SliceSource::Buffer(&data))
            .unwrap();
        w.write_slice(&mut b, 2, ViewType::Coronal, SliceSource::Tiles(&tiles))
            .unwrap();
        assert_eq!(a.read_all().unwrap(), b.read_all().unwrap());
    }

    #[test]
    fn test_invalid_input_writes_nothing() {
        let (layout, mut tex) = fixture(3, 4, 5, 1);
        let w = SliceWriter::new(layout);

        let short = vec![1; 11];
        assert!(matches!(
            w.write_slice(&mut tex, 0, ViewType::Transverse, SliceSource::Buffer(&short)),
            Err(AtlasError::Validation(_))
        ));
        assert!(matches!(
            w.write_slice(&mut tex, 3, ViewType::Sagittal, SliceSource::Buffer(&[1; 20])),
            Err(AtlasError::IndexOutOfRange { .. })
        ));

        let mut tiles = w.split_into_tiles(0, ViewType::Sagittal, &[1; 20]).unwrap();
        tiles[4].native_slice = 0;
        assert!(w
            .write_slice(&mut tex, 0, ViewType::Sagittal, SliceSource::Tiles(&tiles))
            .is_err());
        tiles.pop();
        assert!(w
            .write_slice(&mut tex, 0, ViewType::Sagittal, SliceSource::Tiles(&tiles))
            .is_err());
        let bad = vec![TilePatch {
            native_slice: 1,
            data: vec![1; 11],
        }];
        assert!(w
            .write_slice(&mut tex, 1, ViewType::Transverse, SliceSource::Tiles(&bad))
            .is_err());

        assert_eq!(tex.write_count(), 0);
    }
}
