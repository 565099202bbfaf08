//! 运行时错误.

use crate::data::ViewType;
use thiserror::Error;

/// 图集存储与标注编辑的运行时错误.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// 输入格式不合法 (缓冲区长度不符, 非法尺寸等).
    ///
    /// 该错误总是在任何纹理操作之前被检测出来, 因此不会造成部分写入.
    #[error("非法输入: {0}")]
    Validation(String),

    /// 切片编号超出给定视图的切片个数.
    #[error("切片 {slice} 越界: {view:?} 视图仅有 {len} 个切片")]
    IndexOutOfRange {
        /// 请求的切片编号.
        slice: usize,
        /// 请求的视图类型.
        view: ViewType,
        /// 该视图下的切片个数.
        len: usize,
    },

    /// 纹理操作失败 (上下文丢失, 分配失败等). 对当前帧是致命的.
    #[error("渲染错误: {0}")]
    Rendering(String),

    /// 试图修改一个已经构造好的历史命令.
    #[error("历史命令构造后不可修改")]
    HistoryImmutability,

    /// 底层文件读写错误.
    #[error("I/O 错误: {0}")]
    Io(String),
}

impl AtlasError {
    /// 便捷构造 [`AtlasError::Validation`].
    #[inline]
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 是否是致命的渲染错误? 调用方应当停止继续向纹理发出操作.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Rendering(_))
    }
}

impl From<nifti::NiftiError> for AtlasError {
    fn from(value: nifti::NiftiError) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<image::ImageError> for AtlasError {
    fn from(value: image::ImageError) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<std::io::Error> for AtlasError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// 图集 / 编辑操作的运行时结果.
pub type AtlasResult<T> = Result<T, AtlasError>;
