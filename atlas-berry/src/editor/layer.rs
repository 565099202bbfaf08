//! 图层与图层注册表.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use super::VolumeImage;
use crate::atlas::{AtlasTexture, SliceAtlas};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 图层编号. 由 [`LayerRegistry`] 分配, 在一个文档内唯一且不会复用.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 命令在撤销/重做时通过它找到目标图层.
pub trait LayerHost {
    /// 获取图层的图像. 图层不存在时返回 `None`.
    fn image_mut(&mut self, id: LayerId) -> Option<&mut dyn VolumeImage>;

    /// 设置活动图层. 图层不存在时返回 `false`.
    fn set_active_layer(&mut self, id: LayerId) -> bool;
}

/// 图像图层. 独占其体数据图集.
#[derive(Debug)]
pub struct ImageLayer<T: AtlasTexture> {
    id: LayerId,
    name: String,
    image: SliceAtlas<T>,
}

impl<T: AtlasTexture> ImageLayer<T> {
    /// 图层编号.
    #[inline]
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// 图层名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 图层图像.
    #[inline]
    pub fn image(&self) -> &SliceAtlas<T> {
        &self.image
    }

    /// 图层图像 (可写).
    #[inline]
    pub fn image_mut(&mut self) -> &mut SliceAtlas<T> {
        &mut self.image
    }
}

/// 图层注册表: 显式的编号分配器与活动图层.
#[derive(Debug)]
pub struct LayerRegistry<T: AtlasTexture> {
    layers: BTreeMap<LayerId, ImageLayer<T>>,
    next_id: u32,
    active: Option<LayerId>,
}

impl<T: AtlasTexture> Default for LayerRegistry<T> {
    fn default() -> Self {
        Self {
            layers: BTreeMap::new(),
            next_id: 0,
            active: None,
        }
    }
}

impl<T: AtlasTexture> LayerRegistry<T> {
    /// 创建空注册表.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个图层并返回其编号. 第一个图层自动成为活动图层.
    pub fn insert(&mut self, name: impl Into<String>, image: SliceAtlas<T>) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        let name = name.into();
        debug!("新增图层 {id} \"{name}\"");
        self.layers.insert(id, ImageLayer { id, name, image });
        self.active.get_or_insert(id);
        id
    }

    /// 移除图层. 被移除的图层若是活动图层, 则活动图层清空.
    pub fn remove(&mut self, id: LayerId) -> Option<ImageLayer<T>> {
        let layer = self.layers.remove(&id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        debug!("移除图层 {id}");
        Some(layer)
    }

    /// 获取图层.
    #[inline]
    pub fn get(&self, id: LayerId) -> Option<&ImageLayer<T>> {
        self.layers.get(&id)
    }

    /// 获取可变图层.
    #[inline]
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut ImageLayer<T>> {
        self.layers.get_mut(&id)
    }

    /// 活动图层编号.
    #[inline]
    pub fn active(&self) -> Option<LayerId> {
        self.active
    }

    /// 图层个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// 是否没有图层?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 按编号顺序迭代所有图层.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ImageLayer<T>> {
        self.layers.values()
    }
}

impl<T: AtlasTexture> LayerHost for LayerRegistry<T> {
    fn image_mut(&mut self, id: LayerId) -> Option<&mut dyn VolumeImage> {
        self.layers
            .get_mut(&id)
            .map(|l| &mut l.image as &mut dyn VolumeImage)
    }

    fn set_active_layer(&mut self, id: LayerId) -> bool {
        if self.layers.contains_key(&id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }
}
