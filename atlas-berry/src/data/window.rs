//! 加载扫描时使用的 CT 灰度窗.

use crate::error::{AtlasError, AtlasResult};

/// CT 窗: 把 `[level - width / 2, level + width / 2]` 内的 HU 值线性映射到 `0..=255`,
/// 窗外的值饱和到两端.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CtWindow {
    level: f32,
    width: f32,
}

impl Default for CtWindow {
    /// 肝脏软组织窗, 窗位 60, 窗宽 200.
    #[inline]
    fn default() -> Self {
        Self {
            level: 60.0,
            width: 200.0,
        }
    }
}

impl CtWindow {
    /// 构建 CT 窗. 窗宽必须为正, 两者都必须是有限值.
    pub fn new(level: f32, width: f32) -> AtlasResult<Self> {
        if !level.is_finite() || !width.is_finite() || width <= 0.0 {
            return Err(AtlasError::validation(format!(
                "非法 CT 窗: 窗位 {level}, 窗宽 {width}"
            )));
        }
        Ok(Self { level, width })
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// HU 值对应的灰度. NaN 映射为 0.
    #[inline]
    pub fn to_gray(&self, hu: f32) -> u8 {
        let t = (hu - self.level) / self.width + 0.5;
        // `as` 对 NaN 取 0, 对越界值饱和.
        (t.clamp(0.0, 1.0) * 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::CtWindow;

    #[test]
    fn test_window_rejects_bad_params() {
        assert!(CtWindow::new(0.0, 0.0).is_err());
        assert!(CtWindow::new(f32::NAN, 10.0).is_err());
        assert!(CtWindow::new(40.0, f32::INFINITY).is_err());
    }

    #[test]
    fn test_window_to_gray() {
        let w = CtWindow::new(80.0, 40.0).unwrap();
        assert_eq!(w.to_gray(60.0), 0);
        assert_eq!(w.to_gray(-3000.0), 0);
        assert_eq!(w.to_gray(80.0), 127);
        assert_eq!(w.to_gray(100.0), 255);
        assert_eq!(w.to_gray(f32::INFINITY), 255);
        assert_eq!(w.to_gray(f32::NAN), 0);
        assert_eq!(CtWindow::default().to_gray(160.0), 255);
    }
}
