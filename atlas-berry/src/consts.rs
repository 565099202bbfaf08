//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 标注中, 背景 (未标注) 的体素值.
    pub const ANNOTATION_BACKGROUND: u8 = 0;

    /// 标注中, 前景 (已标注) 的体素值.
    pub const ANNOTATION_FOREGROUND: u8 = 255;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道暗灰色.
    pub const DARK_GRAY: u8 = 0b_0100_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道亮灰色.
    pub const LIGHT_GRAY: u8 = 0b_1100_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 体素是否已被标注?
    #[inline]
    pub const fn is_annotated(p: u8) -> bool {
        p != ANNOTATION_BACKGROUND
    }
}

/// 默认的撤销/重做历史最大深度.
///
/// 每条命令都持有完整的切片或图集拷贝, 因此该值直接决定了历史占用的内存上界.
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

/// 默认的图集纹理单边最大像素数. 与 `wgpu::Limits::default()`
/// 的 `max_texture_dimension_2d` 保持一致.
pub const DEFAULT_MAX_ATLAS_SIZE: usize = 8192;

/// 每个体素最多的通道数 (RGBA).
pub const MAX_VOXEL_COMPONENTS: usize = 4;
