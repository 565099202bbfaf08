//! 图集纹理后端抽象.
//!
//! 切片读写逻辑只通过 [`AtlasTexture`] 访问纹理, 不依赖任何具体的图形 API.
//! [`CpuTexture`] 是以 `ndarray` 实现的参考后端; 启用 `gpu` feature 后还可以使用
//! `wgpu` 后端.

use std::cell::Cell;

use log::{trace, warn};
use ndarray::{s, Array3, ArrayView3};

use crate::error::{AtlasError, AtlasResult};
use crate::math::Vector2;

/// 纹理上的像素矩形.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Rect {
    /// 左上角横坐标.
    pub x: usize,
    /// 左上角纵坐标.
    pub y: usize,
    /// 宽.
    pub width: usize,
    /// 高.
    pub height: usize,
}

impl Rect {
    /// 直接初始化.
    #[inline]
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 覆盖整张 `size` 纹理的矩形.
    #[inline]
    pub fn full(size: Vector2<usize>) -> Self {
        Self::new(0, 0, size.x(), size.y())
    }

    /// 像素个数.
    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// `other` 是否完全位于 `self` 之内?
    #[inline]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    /// 检查矩形非空且位于 `size` 纹理之内.
    pub(crate) fn check_within(&self, size: Vector2<usize>) -> AtlasResult<()> {
        if self.area() == 0 || !Rect::full(size).contains_rect(self) {
            return Err(AtlasError::validation(format!(
                "矩形 {self:?} 超出 {}x{} 纹理",
                size.x(),
                size.y()
            )));
        }
        Ok(())
    }
}

/// 一张存放图集的二维纹理. 像素为 `components` 个 `u8` 通道, 行优先.
///
/// 所有操作都是同步的: `read_rect` 返回时数据已经回读到 CPU.
/// 纹理操作失败 (如上下文丢失) 时返回 [`AtlasError::Rendering`].
pub trait AtlasTexture {
    /// 纹理像素尺寸 `(宽, 高)`.
    fn size(&self) -> Vector2<usize>;

    /// 每个像素的通道数.
    fn components(&self) -> usize;

    /// 将 `rect` 内的像素回读为行优先缓冲区.
    fn read_rect(&self, rect: Rect) -> AtlasResult<Vec<u8>>;

    /// 用行优先缓冲区 `data` 覆写 `rect` 内的像素.
    fn write_rect(&mut self, rect: Rect, data: &[u8]) -> AtlasResult<()>;

    /// 回读整张纹理.
    #[inline]
    fn read_all(&self) -> AtlasResult<Vec<u8>> {
        self.read_rect(Rect::full(self.size()))
    }

    /// 覆写整张纹理.
    #[inline]
    fn write_all(&mut self, data: &[u8]) -> AtlasResult<()> {
        self.write_rect(Rect::full(self.size()), data)
    }
}

/// 纹理分配器. 文档为每个新图层向它申请一张图集纹理.
pub trait TextureAllocator {
    /// 分配得到的纹理类型.
    type Texture: AtlasTexture;

    /// 分配一张全零纹理.
    fn allocate(&self, size: Vector2<usize>, components: usize) -> AtlasResult<Self::Texture>;
}

/// 检查写入缓冲区的长度.
#[inline]
pub(crate) fn check_rect_data(rect: &Rect, components: usize, data: &[u8]) -> AtlasResult<()> {
    let expected = rect.area() * components;
    if data.len() != expected {
        return Err(AtlasError::validation(format!(
            "矩形 {rect:?} 需要 {expected} 字节, 但得到 {}",
            data.len()
        )));
    }
    Ok(())
}

/// 存放在内存中的图集纹理, 数据按 `(高, 宽, 通道)` 组织.
///
/// 可以模拟上下文丢失, 并统计回读与写入次数, 便于验证缓存行为.
#[derive(Debug, Clone)]
pub struct CpuTexture {
    data: Array3<u8>,
    lost: bool,
    readbacks: Cell<usize>,
    writes: usize,
}

impl CpuTexture {
    /// 创建全零纹理.
    pub fn new(size: Vector2<usize>, components: usize) -> Self {
        Self {
            data: Array3::zeros((size.y(), size.x(), components)),
            lost: false,
            readbacks: Cell::new(0),
            writes: 0,
        }
    }

    /// 模拟上下文丢失. 之后所有读写操作都会失败.
    pub fn lose_context(&mut self) {
        warn!("图集纹理上下文丢失");
        self.lost = true;
    }

    /// 恢复上下文. 纹理内容保持不变.
    pub fn restore_context(&mut self) {
        self.lost = false;
    }

    /// 迄今为止的回读次数.
    #[inline]
    pub fn readback_count(&self) -> usize {
        self.readbacks.get()
    }

    /// 迄今为止的写入次数.
    #[inline]
    pub fn write_count(&self) -> usize {
        self.writes
    }

    #[inline]
    fn check_context(&self) -> AtlasResult<()> {
        if self.lost {
            Err(AtlasError::Rendering("纹理上下文已丢失".into()))
        } else {
            Ok(())
        }
    }
}

impl AtlasTexture for CpuTexture {
    #[inline]
    fn size(&self) -> Vector2<usize> {
        let (h, w, _) = self.data.dim();
        Vector2::new([w, h])
    }

    #[inline]
    fn components(&self) -> usize {
        self.data.dim().2
    }

    fn read_rect(&self, rect: Rect) -> AtlasResult<Vec<u8>> {
        self.check_context()?;
        rect.check_within(self.size())?;
        self.readbacks.set(self.readbacks.get() + 1);
        trace!("cpu readback {rect:?}");
        let view = self.data.slice(s![
            rect.y..rect.y + rect.height,
            rect.x..rect.x + rect.width,
            ..
        ]);
        Ok(view.iter().copied().collect())
    }

    fn write_rect(&mut self, rect: Rect, data: &[u8]) -> AtlasResult<()> {
        self.check_context()?;
        rect.check_within(self.size())?;
        let c = self.components();
        check_rect_data(&rect, c, data)?;
        let src = ArrayView3::from_shape((rect.height, rect.width, c), data)
            .map_err(|e| AtlasError::validation(e.to_string()))?;
        self.writes += 1;
        trace!("cpu write {rect:?}");
        self.data
            .slice_mut(s![
                rect.y..rect.y + rect.height,
                rect.x..rect.x + rect.width,
                ..
            ])
            .assign(&src);
        Ok(())
    }
}

/// [`CpuTexture`] 的分配器.
#[derive(Copy, Clone, Debug, Default)]
pub struct CpuAllocator;

impl TextureAllocator for CpuAllocator {
    type Texture = CpuTexture;

    #[inline]
    fn allocate(&self, size: Vector2<usize>, components: usize) -> AtlasResult<CpuTexture> {
        Ok(CpuTexture::new(size, components))
    }
}

#[cfg(test)]
mod tests {
    use super::{AtlasTexture, CpuTexture, Rect};
    use crate::error::AtlasError;
    use crate::math::Vector2;

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(2, 2, 4, 4);
        assert!(r.contains_rect(&Rect::new(2, 2, 4, 4)));
        assert!(r.contains_rect(&Rect::new(5, 5, 1, 1)));
        assert!(!r.contains_rect(&Rect::new(5, 5, 2, 1)));
        assert!(!r.contains_rect(&Rect::new(1, 2, 1, 1)));
    }

    #[test]
    fn test_cpu_texture_rect_io() {
        let mut t = CpuTexture::new(Vector2::new([4, 3]), 2);
        assert_eq!(t.size(), Vector2::new([4, 3]));
        let patch: Vec<u8> = (1..=8).collect();
        t.write_rect(Rect::new(1, 1, 2, 2), &patch).unwrap();
        assert_eq!(t.read_rect(Rect::new(1, 1, 2, 2)).unwrap(), patch);
        // 第 1 行: 像素 0 未写入, 像素 1, 2 为 patch 前半.
        assert_eq!(
            t.read_rect(Rect::new(0, 1, 4, 1)).unwrap(),
            vec![0, 0, 1, 2, 3, 4, 0, 0]
        );
        assert_eq!(t.readback_count(), 2);
        assert_eq!(t.write_count(), 1);
    }

    #[test]
    fn test_cpu_texture_invalid_input() {
        let mut t = CpuTexture::new(Vector2::new([4, 3]), 1);
        assert!(t.read_rect(Rect::new(3, 0, 2, 1)).is_err());
        assert!(t.read_rect(Rect::new(0, 0, 0, 1)).is_err());
        assert!(t.write_rect(Rect::new(0, 0, 2, 2), &[0; 3]).is_err());
        assert_eq!(t.write_count(), 0);
    }

    #[test]
    fn test_cpu_texture_context_loss() {
        let mut t = CpuTexture::new(Vector2::new([2, 2]), 1);
        t.lose_context();
        assert!(matches!(t.read_all(), Err(AtlasError::Rendering(_))));
        assert!(matches!(t.write_all(&[1; 4]), Err(AtlasError::Rendering(_))));
        t.restore_context();
        assert_eq!(t.read_all().unwrap(), vec![0; 4]);
    }
}
