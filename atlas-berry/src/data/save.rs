//! 切片的持久化存储.

use std::path::Path;

use image::{GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

use crate::error::{AtlasError, AtlasResult};
use crate::Idx2d;

/// 借用的切片缓冲区, 附带解释它所需的形状信息.
#[derive(Copy, Clone, Debug)]
pub struct SliceImage<'a> {
    /// `(宽, 高)`.
    shape: Idx2d,
    components: usize,
    data: &'a [u8],
}

impl<'a> SliceImage<'a> {
    /// 包装一个行优先存储的切片缓冲区. 长度与形状不符时返回 `Err`.
    pub fn new(shape: Idx2d, components: usize, data: &'a [u8]) -> AtlasResult<Self> {
        let (w, h) = shape;
        if w * h * components != data.len() || !(1..=4).contains(&components) {
            return Err(AtlasError::validation(format!(
                "切片形状 {w}x{h}x{components} 与缓冲区长度 {} 不符",
                data.len()
            )));
        }
        Ok(Self {
            shape,
            components,
            data,
        })
    }
}

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> AtlasResult<()>;
}

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 对于单通道标注, 所有被标注的体素都会被映射为白色, 背景为黑色.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> AtlasResult<()>;
}

/// 使像素更有利于单通道可视化.
#[inline]
pub(crate) fn pretty(label: u8) -> u8 {
    use crate::consts::gray::*;
    if is_annotated(label) {
        WHITE
    } else {
        BLACK
    }
}

impl ImgWriteRaw for SliceImage<'_> {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> AtlasResult<()> {
        let (w, h) = (self.shape.0 as u32, self.shape.1 as u32);
        let buf = self.data.to_vec();
        // 长度已在构造时校验, 以下 `from_raw` 不会失败.
        let err = || AtlasError::validation("切片缓冲区长度不符");
        match self.components {
            1 => GrayImage::from_raw(w, h, buf).ok_or_else(err)?.save(path)?,
            2 => GrayAlphaImage::from_raw(w, h, buf).ok_or_else(err)?.save(path)?,
            3 => RgbImage::from_raw(w, h, buf).ok_or_else(err)?.save(path)?,
            _ => RgbaImage::from_raw(w, h, buf).ok_or_else(err)?.save(path)?,
        }
        Ok(())
    }
}

impl ImgWriteVis for SliceImage<'_> {
    /// 只使用第一个通道.
    fn save<P: AsRef<Path>>(&self, path: P) -> AtlasResult<()> {
        let (w, h) = self.shape;
        let mut buf = GrayImage::new(w as u32, h as u32);
        for (i, px) in self.data.chunks_exact(self.components).enumerate() {
            buf.put_pixel((i % w) as u32, (i / w) as u32, image::Luma([pretty(px[0])]));
        }
        buf.save(path)?;
        Ok(())
    }
}
