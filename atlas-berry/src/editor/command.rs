//! 撤销/重做命令与其快照格式.
//!
//! 命令构造后不可修改, 并持有自己的数据拷贝, 因此之后对图层的修改不会影响历史.

use std::sync::Arc;

use super::{LayerHost, LayerId};
use crate::data::{ViewType, VolumeData};
use crate::error::{AtlasError, AtlasResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 命令作用的数据范围.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandTarget {
    /// 单个切片.
    Slice {
        /// 视图.
        view: ViewType,
        /// 切片编号.
        slice: usize,
    },

    /// 整张图集 (图集缓冲区布局).
    Atlas,

    /// 整个体数据 (`z, y, x, component` 顺序).
    Image,
}

impl CommandTarget {
    /// 快照中的 `kind` 标签.
    #[inline]
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandTarget::Slice { .. } => CommandKind::Slice,
            CommandTarget::Atlas => CommandKind::Atlas,
            CommandTarget::Image => CommandKind::Image,
        }
    }
}

/// 快照的 `kind` 标签. 闭合集合.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CommandKind {
    /// 单切片命令.
    Slice,
    /// 整图集命令.
    Atlas,
    /// 整体数据命令.
    Image,
}

/// 一条不可变的撤销/重做命令: 目标图层、数据范围, 以及修改前后的完整数据.
#[derive(Clone, Debug)]
pub struct Command {
    layer_id: LayerId,
    target: CommandTarget,
    old: Arc<[u8]>,
    new: Arc<[u8]>,
}

impl Command {
    fn new(
        layer_id: LayerId,
        target: CommandTarget,
        old: Arc<[u8]>,
        new: Arc<[u8]>,
    ) -> AtlasResult<Self> {
        if old.len() != new.len() {
            return Err(AtlasError::validation(format!(
                "新旧数据长度不一致: {} != {}",
                old.len(),
                new.len()
            )));
        }
        Ok(Self {
            layer_id,
            target,
            old,
            new,
        })
    }

    /// 单切片命令.
    #[inline]
    pub fn slice(
        layer_id: LayerId,
        view: ViewType,
        slice: usize,
        old: impl Into<Arc<[u8]>>,
        new: impl Into<Arc<[u8]>>,
    ) -> AtlasResult<Self> {
        Self::new(
            layer_id,
            CommandTarget::Slice { view, slice },
            old.into(),
            new.into(),
        )
    }

    /// 整图集命令.
    #[inline]
    pub fn atlas(
        layer_id: LayerId,
        old: impl Into<Arc<[u8]>>,
        new: impl Into<Arc<[u8]>>,
    ) -> AtlasResult<Self> {
        Self::new(layer_id, CommandTarget::Atlas, old.into(), new.into())
    }

    /// 整体数据命令.
    #[inline]
    pub fn image(
        layer_id: LayerId,
        old: impl Into<Arc<[u8]>>,
        new: impl Into<Arc<[u8]>>,
    ) -> AtlasResult<Self> {
        Self::new(layer_id, CommandTarget::Image, old.into(), new.into())
    }

    /// 目标图层.
    #[inline]
    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    /// 数据范围.
    #[inline]
    pub fn target(&self) -> CommandTarget {
        self.target
    }

    /// 修改前的数据.
    #[inline]
    pub fn old_data(&self) -> &[u8] {
        &self.old
    }

    /// 修改后的数据.
    #[inline]
    pub fn new_data(&self) -> &[u8] {
        &self.new
    }

    /// 命令持有的字节数.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.old.len() + self.new.len()
    }

    /// 撤销: 激活目标图层并写回修改前的数据.
    #[inline]
    pub fn undo(&self, host: &mut dyn LayerHost) -> AtlasResult<()> {
        self.apply(host, &self.old)
    }

    /// 重做: 激活目标图层并写回修改后的数据.
    #[inline]
    pub fn redo(&self, host: &mut dyn LayerHost) -> AtlasResult<()> {
        self.apply(host, &self.new)
    }

    fn apply(&self, host: &mut dyn LayerHost, data: &[u8]) -> AtlasResult<()> {
        let missing = || AtlasError::validation(format!("图层 {} 不存在", self.layer_id));
        if !host.set_active_layer(self.layer_id) {
            return Err(missing());
        }
        let image = host.image_mut(self.layer_id).ok_or_else(missing)?;
        match self.target {
            CommandTarget::Slice { view, slice } => image.set_slice(slice, view, data),
            CommandTarget::Atlas => image.set_atlas(data),
            CommandTarget::Image => {
                let volume = VolumeData::new(image.shape(), data.to_vec())?;
                image.set_image_data(&volume)
            }
        }
    }

    /// 试图用快照覆写命令. 命令构造后不可修改, 因此总是返回
    /// [`AtlasError::HistoryImmutability`].
    #[inline]
    pub fn apply_snapshot(&mut self, _snapshot: &CommandSnapshot) -> AtlasResult<()> {
        Err(AtlasError::HistoryImmutability)
    }

    /// 复制出快照.
    #[inline]
    pub fn snapshot(&self) -> CommandSnapshot {
        CommandSnapshot::from(self)
    }
}

/// 命令的序列化形式. 与 [`Command`] 互不共享缓冲区.
///
/// 序列化后字段名为 `kind`, `layerId`, `viewType`, `slice`, `oldSliceData`,
/// `newSliceData`. 仅单切片命令带有 `viewType` 与 `slice`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CommandSnapshot {
    /// 命令类型.
    pub kind: CommandKind,
    /// 目标图层.
    pub layer_id: LayerId,
    /// 视图.
    pub view_type: Option<ViewType>,
    /// 切片编号.
    pub slice: Option<usize>,
    /// 修改前的数据.
    pub old_slice_data: Vec<u8>,
    /// 修改后的数据.
    pub new_slice_data: Vec<u8>,
}

impl From<&Command> for CommandSnapshot {
    fn from(cmd: &Command) -> Self {
        let (view_type, slice) = match cmd.target {
            CommandTarget::Slice { view, slice } => (Some(view), Some(slice)),
            _ => (None, None),
        };
        Self {
            kind: cmd.target.kind(),
            layer_id: cmd.layer_id,
            view_type,
            slice,
            old_slice_data: cmd.old.to_vec(),
            new_slice_data: cmd.new.to_vec(),
        }
    }
}

impl TryFrom<CommandSnapshot> for Command {
    type Error = AtlasError;

    fn try_from(s: CommandSnapshot) -> AtlasResult<Self> {
        let target = match (s.kind, s.view_type, s.slice) {
            (CommandKind::Slice, Some(view), Some(slice)) => CommandTarget::Slice { view, slice },
            (CommandKind::Slice, _, _) => {
                return Err(AtlasError::validation("单切片快照缺少 viewType 或 slice"));
            }
            (CommandKind::Atlas, None, None) => CommandTarget::Atlas,
            (CommandKind::Image, None, None) => CommandTarget::Image,
            (kind, _, _) => {
                return Err(AtlasError::validation(format!(
                    "{kind:?} 快照不应带有 viewType 或 slice"
                )));
            }
        };
        Command::new(
            s.layer_id,
            target,
            s.old_slice_data.into(),
            s.new_slice_data.into(),
        )
    }
}

#[cfg(feature = "serde")]
impl CommandSnapshot {
    /// 以 `bincode` 编码并用 zlib 压缩.
    pub fn to_bytes(&self) -> AtlasResult<Vec<u8>> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let raw = bincode::serialize(self).map_err(|e| AtlasError::Io(e.to_string()))?;
        let mut e = ZlibEncoder::new(Vec::with_capacity(raw.len() / 4), Compression::best());
        e.write_all(&raw)?;
        Ok(e.finish()?)
    }

    /// [`CommandSnapshot::to_bytes`] 的逆运算.
    pub fn from_bytes(bytes: &[u8]) -> AtlasResult<Self> {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        let mut raw = Vec::with_capacity(bytes.len() * 4);
        ZlibDecoder::new(bytes).read_to_end(&mut raw)?;
        bincode::deserialize(&raw).map_err(|e| AtlasError::Io(e.to_string()))
    }
}
