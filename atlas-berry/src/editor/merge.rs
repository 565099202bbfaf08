//! 体素合并策略.

use crate::consts::gray::ANNOTATION_BACKGROUND;

/// 把新的编辑值与体素原值合并成最终写入值.
///
/// 任何 `Fn(old, new) -> u8` 闭包都是合并策略.
pub trait MergeFn {
    /// 合并. `old` 为体素原值, `new` 为编辑值.
    fn merge(&self, old: u8, new: u8) -> u8;
}

impl<F: Fn(u8, u8) -> u8> MergeFn for F {
    #[inline]
    fn merge(&self, old: u8, new: u8) -> u8 {
        self(old, new)
    }
}

/// 新值无条件覆盖旧值. 默认策略.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Replace;

impl MergeFn for Replace {
    #[inline]
    fn merge(&self, _old: u8, new: u8) -> u8 {
        new
    }
}

/// 取较大值. 重叠的笔刷路径不会互相削弱.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Max;

impl MergeFn for Max {
    #[inline]
    fn merge(&self, old: u8, new: u8) -> u8 {
        old.max(new)
    }
}

/// 取较小值.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Min;

impl MergeFn for Min {
    #[inline]
    fn merge(&self, old: u8, new: u8) -> u8 {
        old.min(new)
    }
}

/// 橡皮擦: 编辑值非零的体素被清为背景, 否则保持原值.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Erase;

impl MergeFn for Erase {
    #[inline]
    fn merge(&self, old: u8, new: u8) -> u8 {
        if new == ANNOTATION_BACKGROUND {
            old
        } else {
            ANNOTATION_BACKGROUND
        }
    }
}
