//! 重绘通知.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 合并式的重绘请求标志.
///
/// 编辑方调用 [`RenderNotifier::lazy_render`], 渲染器每帧调用一次
/// [`RenderNotifier::take_pending`]. 两次轮询之间的多次请求只计一次.
/// 克隆得到的句柄共享同一个标志.
#[derive(Debug, Clone, Default)]
pub struct RenderNotifier {
    pending: Arc<AtomicBool>,
}

impl RenderNotifier {
    /// 创建一个没有待处理请求的标志.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求在下一帧之前重绘.
    #[inline]
    pub fn lazy_render(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// 是否有待处理的重绘请求? 不清除标志.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// 取出并清除重绘请求. 返回自上次调用以来是否有过请求.
    #[inline]
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::RenderNotifier;

    #[test]
    fn test_coalescing() {
        let r = RenderNotifier::new();
        assert!(!r.take_pending());
        let handle = r.clone();
        handle.lazy_render();
        handle.lazy_render();
        r.lazy_render();
        assert!(r.is_pending());
        assert!(r.take_pending());
        assert!(!handle.take_pending());
    }
}
