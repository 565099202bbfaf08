//! 切片回读与缓存.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use super::{AtlasLayout, AtlasTexture};
use crate::data::ViewType;
use crate::error::AtlasResult;

/// 从图集纹理回读任意视图的切片, 并按 `(切片编号, 视图)` 缓存结果.
///
/// 读取器无法自行察觉纹理被修改, 写入方必须在每次写入后调用
/// [`SliceReader::invalidate_cache`].
#[derive(Debug)]
pub struct SliceReader {
    layout: AtlasLayout,
    cache: HashMap<(usize, ViewType), Arc<[u8]>>,
}

impl SliceReader {
    /// 直接初始化.
    #[inline]
    pub fn new(layout: AtlasLayout) -> Self {
        Self {
            layout,
            cache: HashMap::new(),
        }
    }

    /// 读取切片 `(slice, view)`. 返回缓冲区长度为 `width * height * components`,
    /// 按该视图的平面坐标行优先排列.
    ///
    /// 原生视图回读一次 (整个瓦片); 非原生视图对每个原生切片各回读一次,
    /// 再拼接成完整切片. 缓存命中时不访问纹理.
    ///
    /// `slice` 越界时返回 [`crate::AtlasError::IndexOutOfRange`].
    /// 回读失败时缓存保持不变, 不会留下不完整的缓存项.
    pub fn read_slice<T: AtlasTexture + ?Sized>(
        &mut self,
        texture: &T,
        slice: usize,
        view: ViewType,
    ) -> AtlasResult<Arc<[u8]>> {
        let shape = self.layout.shape();
        shape.check_slice(slice, view)?;
        if let Some(hit) = self.cache.get(&(slice, view)) {
            return Ok(Arc::clone(hit));
        }

        let spans = self.layout.slice_spans(slice, view);
        trace!("回读切片 {slice} ({view:?}), 共 {} 次", spans.len());
        let mut buf = Vec::with_capacity(shape.slice_len(view));
        for span in spans.iter() {
            buf.extend(texture.read_rect(span.rect)?);
        }
        debug_assert_eq!(buf.len(), shape.slice_len(view));

        let buf: Arc<[u8]> = buf.into();
        self.cache.insert((slice, view), Arc::clone(&buf));
        Ok(buf)
    }

    /// 清空全部缓存.
    #[inline]
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }

    /// 切片 `(slice, view)` 是否已被缓存?
    #[inline]
    pub fn is_cached(&self, slice: usize, view: ViewType) -> bool {
        self.cache.contains_key(&(slice, view))
    }

    /// 缓存项个数.
    #[inline]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// 布局.
    #[inline]
    pub fn layout(&self) -> &AtlasLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::SliceReader;
    use crate::atlas::{AtlasLayout, AtlasTexture, CpuTexture};
    use crate::data::{ViewType, VolumeShape};
    use crate::error::AtlasError;

    /// 3x2x5 单通道体数据, 体素值为其在 `z, y, x` 顺序中的下标.
    fn fixture() -> (AtlasLayout, CpuTexture) {
        let shape = VolumeShape::new((3, 2, 5), 1).unwrap();
        let layout = AtlasLayout::new(shape, 1024).unwrap();
        let mut tex = CpuTexture::new(layout.atlas_size(), 1);
        let data: Vec<u8> = (0..30).collect();
        tex.write_all(&layout.pack(&data).unwrap()).unwrap();
        (layout, tex)
    }

    #[test]
    fn test_read_native() {
        let (layout, tex) = fixture();
        let mut r = SliceReader::new(layout);
        let s = r.read_slice(&tex, 4, ViewType::Transverse).unwrap();
        assert_eq!(&*s, &[24, 25, 26, 27, 28, 29]);
        assert_eq!(tex.readback_count(), 1);
    }

    #[test]
    fn test_read_non_native() {
        let (layout, tex) = fixture();
        let mut r = SliceReader::new(layout);
        // 矢状面 x = 1: (u, v) = (y, z) -> 6z + 3y + 1.
        let sag = r.read_slice(&tex, 1, ViewType::Sagittal).unwrap();
        assert_eq!(&*sag, &[1, 4, 7, 10, 13, 16, 19, 22, 25, 28]);
        assert_eq!(tex.readback_count(), 5);
        // 冠状面 y = 1: (u, v) = (x, z) -> 6z + 3 + x.
        let cor = r.read_slice(&tex, 1, ViewType::Coronal).unwrap();
        assert_eq!(&cor[..6], &[3, 4, 5, 9, 10, 11]);
        assert_eq!(cor.len(), 15);
    }

    #[test]
    fn test_cache_hit_skips_texture() {
        let (layout, tex) = fixture();
        let mut r = SliceReader::new(layout);
        let a = r.read_slice(&tex, 0, ViewType::Coronal).unwrap();
        let n = tex.readback_count();
        let b = r.read_slice(&tex, 0, ViewType::Coronal).unwrap();
        assert_eq!(a, b);
        assert_eq!(tex.readback_count(), n);
        assert!(r.is_cached(0, ViewType::Coronal));

        r.invalidate_cache();
        assert_eq!(r.cached_len(), 0);
        r.read_slice(&tex, 0, ViewType::Coronal).unwrap();
        assert!(tex.readback_count() > n);
    }

    #[test]
    fn test_read_out_of_range() {
        let (layout, tex) = fixture();
        let mut r = SliceReader::new(layout);
        assert!(matches!(
            r.read_slice(&tex, 3, ViewType::Sagittal),
            Err(AtlasError::IndexOutOfRange { slice: 3, len: 3, .. })
        ));
        assert!(r.read_slice(&tex, 5, ViewType::Transverse).is_err());
        assert_eq!(tex.readback_count(), 0);
    }

    #[test]
    fn test_failed_readback_leaves_cache_untouched() {
        let (layout, mut tex) = fixture();
        let mut r = SliceReader::new(layout);
        r.read_slice(&tex, 0, ViewType::Transverse).unwrap();
        tex.lose_context();
        assert!(matches!(
            r.read_slice(&tex, 1, ViewType::Sagittal),
            Err(AtlasError::Rendering(_))
        ));
        assert_eq!(r.cached_len(), 1);
        assert!(!r.is_cached(1, ViewType::Sagittal));
        // 旧缓存项仍然可用, 不访问纹理.
        assert!(r.read_slice(&tex, 0, ViewType::Transverse).is_ok());
    }
}
