//! 编辑器核心配置.

use crate::consts::{DEFAULT_HISTORY_DEPTH, DEFAULT_MAX_ATLAS_SIZE};
use crate::error::{AtlasError, AtlasResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 编辑器核心配置.
///
/// 该配置是只读的. 若要修改参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct EditorConfig {
    history_depth: usize,
    max_atlas_size: usize,
}

impl Default for EditorConfig {
    #[inline]
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            max_atlas_size: DEFAULT_MAX_ATLAS_SIZE,
        }
    }
}

impl EditorConfig {
    /// 构建配置.
    ///
    /// `history_depth` 和 `max_atlas_size` 都必须为正数, 否则返回 `Err`.
    pub fn new(history_depth: usize, max_atlas_size: usize) -> AtlasResult<Self> {
        if history_depth == 0 {
            return Err(AtlasError::validation("历史深度必须为正数"));
        }
        if max_atlas_size == 0 {
            return Err(AtlasError::validation("图集尺寸上限必须为正数"));
        }
        Ok(Self {
            history_depth,
            max_atlas_size,
        })
    }

    /// 撤销/重做历史最多保存的命令条数.
    #[inline]
    pub fn history_depth(&self) -> usize {
        self.history_depth
    }

    /// 图集纹理单边最大像素数.
    #[inline]
    pub fn max_atlas_size(&self) -> usize {
        self.max_atlas_size
    }
}

#[cfg(test)]
mod tests {
    use super::EditorConfig;
    use crate::consts::{DEFAULT_HISTORY_DEPTH, DEFAULT_MAX_ATLAS_SIZE};

    #[test]
    fn test_config_invalid_input() {
        assert!(EditorConfig::new(0, 10).is_err());
        assert!(EditorConfig::new(10, 0).is_err());
        assert!(EditorConfig::new(1, 1).is_ok());
    }

    #[test]
    fn test_config_default() {
        let c = EditorConfig::default();
        assert_eq!(c.history_depth(), DEFAULT_HISTORY_DEPTH);
        assert_eq!(c.max_atlas_size(), DEFAULT_MAX_ATLAS_SIZE);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_bincode() {
        let c = EditorConfig::new(5, 2048).unwrap();
        let bytes = bincode::serialize(&c).unwrap();
        let back: EditorConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(c, back);
    }
}
