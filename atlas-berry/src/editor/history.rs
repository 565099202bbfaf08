//! 线性撤销/重做历史.

use std::collections::VecDeque;

use log::{debug, warn};

use super::{Command, LayerHost};
use crate::config::EditorConfig;
use crate::error::AtlasResult;

/// 带游标的线性命令栈.
///
/// 游标之前的命令处于已执行状态, 游标之后的命令可以重做.
/// 在游标不位于栈顶时加入新命令, 会丢弃所有可重做的命令.
#[derive(Debug, Clone)]
pub struct History {
    commands: VecDeque<Command>,
    cursor: usize,
    max_depth: usize,
}

impl History {
    /// 创建空历史, 最多保存 `max_depth` 条命令. `max_depth` 为零时按一条处理.
    #[inline]
    pub fn new(max_depth: usize) -> Self {
        Self {
            commands: VecDeque::new(),
            cursor: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// 按配置创建.
    #[inline]
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.history_depth())
    }

    /// 丢弃可重做的命令, 加入 `command`, 并将游标移到它之后.
    /// 超出最大深度时丢弃最旧的命令.
    pub fn add_command(&mut self, command: Command) {
        self.commands.truncate(self.cursor);
        self.commands.push_back(command);
        self.cursor += 1;
        while self.commands.len() > self.max_depth {
            warn!("历史超出 {} 条, 丢弃最旧的命令", self.max_depth);
            self.commands.pop_front();
            self.cursor -= 1;
        }
    }

    /// 撤销游标前的一条命令. 没有可撤销的命令时返回 `Ok(false)`.
    /// 命令执行失败时游标不动.
    pub fn undo(&mut self, host: &mut dyn LayerHost) -> AtlasResult<bool> {
        if self.cursor == 0 {
            return Ok(false);
        }
        let cmd = &self.commands[self.cursor - 1];
        cmd.undo(host)?;
        debug!("撤销 {:?} ({})", cmd.target(), cmd.layer_id());
        self.cursor -= 1;
        Ok(true)
    }

    /// 重做游标后的一条命令. 没有可重做的命令时返回 `Ok(false)`.
    /// 命令执行失败时游标不动.
    pub fn redo(&mut self, host: &mut dyn LayerHost) -> AtlasResult<bool> {
        let Some(cmd) = self.commands.get(self.cursor) else {
            return Ok(false);
        };
        cmd.redo(host)?;
        debug!("重做 {:?} ({})", cmd.target(), cmd.layer_id());
        self.cursor += 1;
        Ok(true)
    }

    /// 是否有可撤销的命令?
    #[inline]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// 是否有可重做的命令?
    #[inline]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    /// 游标位置, 即已执行的命令条数.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 保存的命令条数.
    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// 是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 最大深度.
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 按加入顺序迭代保存的命令, 包括可重做的命令.
    #[inline]
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// 最近一条已执行的命令.
    #[inline]
    pub fn last_applied(&self) -> Option<&Command> {
        self.cursor.checked_sub(1).and_then(|i| self.commands.get(i))
    }

    /// 全部命令占用的字节数.
    pub fn byte_len(&self) -> usize {
        self.commands.iter().map(Command::byte_len).sum()
    }

    /// 清空历史.
    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = 0;
    }
}
