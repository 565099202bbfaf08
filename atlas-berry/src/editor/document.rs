//! 文档: 图层、历史与重绘通知的拥有者.

use log::debug;

use super::{
    AnnotationVoxel, Annotator, Command, History, ImageLayer, LayerHost, LayerId, LayerRegistry,
    MergeFn, RenderNotifier,
};
use crate::atlas::{SliceAtlas, TextureAllocator};
use crate::config::EditorConfig;
use crate::data::{ViewType, VolumeData, VolumeShape};
use crate::error::{AtlasError, AtlasResult};

/// 标注文档. 每个文档拥有独立的图层与历史, 不同文档之间互不影响.
pub struct Document<A: TextureAllocator> {
    config: EditorConfig,
    allocator: A,
    layers: LayerRegistry<A::Texture>,
    history: History,
    render: RenderNotifier,
}

impl<A: TextureAllocator> Document<A> {
    /// 创建空文档. 图层纹理均向 `allocator` 申请.
    pub fn new(allocator: A, config: EditorConfig) -> Self {
        Self {
            config,
            allocator,
            layers: LayerRegistry::new(),
            history: History::from_config(&config),
            render: RenderNotifier::new(),
        }
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// 重绘通知. 渲染器每帧对其调用一次 [`RenderNotifier::take_pending`].
    #[inline]
    pub fn render_notifier(&self) -> &RenderNotifier {
        &self.render
    }

    /// 历史.
    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// 图层注册表.
    #[inline]
    pub fn layers(&self) -> &LayerRegistry<A::Texture> {
        &self.layers
    }

    /// 以 `volume` 为内容新增图层.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        volume: &VolumeData,
    ) -> AtlasResult<LayerId> {
        let image = SliceAtlas::from_volume(&self.allocator, volume, &self.config)?;
        let id = self.layers.insert(name, image);
        self.render.lazy_render();
        Ok(id)
    }

    /// 新增全零图层, 一般用作标注.
    pub fn add_empty_layer(
        &mut self,
        name: impl Into<String>,
        shape: VolumeShape,
    ) -> AtlasResult<LayerId> {
        let image = SliceAtlas::allocate(&self.allocator, shape, &self.config)?;
        let id = self.layers.insert(name, image);
        self.render.lazy_render();
        Ok(id)
    }

    /// 移除图层. 历史中指向该图层的命令在撤销/重做时会返回 `Err`.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<ImageLayer<A::Texture>> {
        let layer = self.layers.remove(id)?;
        self.render.lazy_render();
        Some(layer)
    }

    /// 获取图层.
    #[inline]
    pub fn get_layer(&self, id: LayerId) -> Option<&ImageLayer<A::Texture>> {
        self.layers.get(id)
    }

    /// 获取可变图层.
    #[inline]
    pub fn get_layer_mut(&mut self, id: LayerId) -> Option<&mut ImageLayer<A::Texture>> {
        self.layers.get_mut(id)
    }

    /// 设置活动图层. 图层不存在时返回 `false`.
    #[inline]
    pub fn set_active_layer(&mut self, id: LayerId) -> bool {
        self.layers.set_active_layer(id)
    }

    /// 活动图层.
    #[inline]
    pub fn active_layer(&self) -> Option<LayerId> {
        self.layers.active()
    }

    /// 为图层 `id` 创建一个共享本文档重绘通知的标注器.
    /// 笔画按 `view` 视图确定要记录的切片, 应与绘制所用工具的视图一致.
    pub fn annotator(&self, id: LayerId, view: ViewType) -> AtlasResult<Annotator> {
        self.layers.get(id).ok_or_else(|| missing_layer(id))?;
        let mut annotator = Annotator::new(id, self.render.clone());
        annotator.set_view_type(view);
        Ok(annotator)
    }

    /// 用 `annotator` 把 `voxels` 写入其目标图层.
    pub fn annotate<M: MergeFn>(
        &mut self,
        annotator: &mut Annotator<M>,
        voxels: &[AnnotationVoxel],
    ) -> AtlasResult<usize> {
        let id = annotator.layer_id();
        let image = self.layers.image_mut(id).ok_or_else(|| missing_layer(id))?;
        annotator.annotate(image, voxels)
    }

    /// 结束 `annotator` 的笔画, 并把产出的命令加入历史. 返回是否加入了命令.
    pub fn finish_stroke<M: MergeFn>(
        &mut self,
        annotator: &mut Annotator<M>,
    ) -> AtlasResult<bool> {
        let id = annotator.layer_id();
        let image = self.layers.image_mut(id).ok_or_else(|| missing_layer(id))?;
        match annotator.finish_stroke(image)? {
            Some(cmd) => {
                self.history.add_command(cmd);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 整体替换图层 `id` 的图集, 并记录一条图集命令.
    pub fn replace_atlas(&mut self, id: LayerId, data: &[u8]) -> AtlasResult<()> {
        let image = self.layers.image_mut(id).ok_or_else(|| missing_layer(id))?;
        let old = image.get_atlas()?;
        image.set_atlas(data)?;
        debug!("图层 {id} 图集已替换");
        self.history.add_command(Command::atlas(id, old, data.to_vec())?);
        self.render.lazy_render();
        Ok(())
    }

    /// 整体替换图层 `id` 的体数据, 并记录一条整体数据命令.
    pub fn replace_image_data(&mut self, id: LayerId, volume: &VolumeData) -> AtlasResult<()> {
        let image = self.layers.image_mut(id).ok_or_else(|| missing_layer(id))?;
        let old = image.get_image_data()?;
        image.set_image_data(volume)?;
        debug!("图层 {id} 体数据已替换");
        self.history
            .add_command(Command::image(id, old.into_raw(), volume.data().to_vec())?);
        self.render.lazy_render();
        Ok(())
    }

    /// 直接加入一条命令. 调用方须保证命令的修改已经生效.
    #[inline]
    pub fn add_command(&mut self, command: Command) {
        self.history.add_command(command);
    }

    /// 撤销. 没有可撤销的命令时返回 `Ok(false)`.
    pub fn undo(&mut self) -> AtlasResult<bool> {
        let done = self.history.undo(&mut self.layers)?;
        if done {
            self.render.lazy_render();
        }
        Ok(done)
    }

    /// 重做. 没有可重做的命令时返回 `Ok(false)`.
    pub fn redo(&mut self) -> AtlasResult<bool> {
        let done = self.history.redo(&mut self.layers)?;
        if done {
            self.render.lazy_render();
        }
        Ok(done)
    }

    /// 是否有可撤销的命令?
    #[inline]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// 是否有可重做的命令?
    #[inline]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

#[inline]
fn missing_layer(id: LayerId) -> AtlasError {
    AtlasError::validation(format!("图层 {id} 不存在"))
}

#[cfg(test)]
mod tests {
    use super::Document;
    use crate::atlas::CpuAllocator;
    use crate::config::EditorConfig;
    use crate::data::{ViewType, VolumeData, VolumeShape};
    use crate::editor::{
        AnnotationVoxel, Annotator, CommandTarget, LayerId, Max, PlaneTool, RenderNotifier,
    };
    use crate::math::Vector3;

    fn document() -> (Document<CpuAllocator>, LayerId) {
        let mut doc = Document::new(CpuAllocator, EditorConfig::default());
        let shape = VolumeShape::new((4, 4, 4), 1).unwrap();
        let id = doc.add_empty_layer("label", shape).unwrap();
        (doc, id)
    }

    fn atlas(doc: &Document<CpuAllocator>, id: LayerId) -> Vec<u8> {
        doc.get_layer(id).unwrap().image().get_atlas().unwrap()
    }

    #[test]
    fn test_brush_scenario_with_undo() {
        let (mut doc, id) = document();
        doc.render_notifier().take_pending();
        let mut a = doc.annotator(id, ViewType::Transverse).unwrap();
        let tool = PlaneTool::new(ViewType::Transverse, 2);
        let voxels = tool.brush_stroke(&[(1, 1), (2, 1)], 0, 255);
        assert_eq!(doc.annotate(&mut a, &voxels).unwrap(), 2);
        assert!(doc.render_notifier().take_pending());
        assert!(doc.finish_stroke(&mut a).unwrap());
        assert_eq!(doc.history().len(), 1);

        let image = doc.get_layer(id).unwrap().image();
        assert_eq!(image.get_voxel(&Vector3::new([1, 1, 2])).unwrap(), vec![255]);
        assert_eq!(image.get_voxel(&Vector3::new([2, 1, 2])).unwrap(), vec![255]);

        assert!(doc.undo().unwrap());
        assert!(doc.render_notifier().take_pending());
        assert!(atlas(&doc, id).iter().all(|&p| p == 0));
        assert!(doc.redo().unwrap());
        assert_eq!(atlas(&doc, id).iter().filter(|&&p| p == 255).count(), 2);
    }

    #[test]
    fn test_annotator_records_tool_view() {
        let (mut doc, id) = document();
        let mut a = doc.annotator(id, ViewType::Coronal).unwrap();
        assert_eq!(a.view_type(), ViewType::Coronal);
        let tool = PlaneTool::new(ViewType::Coronal, 3);
        doc.annotate(&mut a, &tool.line((0, 0), (3, 3), 5)).unwrap();
        assert!(doc.finish_stroke(&mut a).unwrap());

        let cmd = doc.history().last_applied().unwrap();
        assert_eq!(
            cmd.target(),
            CommandTarget::Slice {
                view: ViewType::Coronal,
                slice: 3
            }
        );
        assert_eq!(cmd.new_data().iter().filter(|&&p| p == 5).count(), 4);
    }

    #[test]
    fn test_stroke_is_one_command() {
        let (mut doc, id) = document();
        let mut a = Annotator::with_merge(id, doc.render_notifier().clone(), Max, true);
        for x in 0..4 {
            doc.annotate(&mut a, &[AnnotationVoxel::new(x, 0, 1, 10 * x as u8)])
                .unwrap();
        }
        // 越界体素不会开始新的笔画, 也不会出错.
        doc.annotate(&mut a, &[AnnotationVoxel::new(-1, 0, 0, 1)])
            .unwrap();
        assert!(doc.finish_stroke(&mut a).unwrap());
        assert!(!doc.finish_stroke(&mut a).unwrap());
        assert_eq!(doc.history().len(), 1);
        assert!(doc.undo().unwrap());
        assert!(!doc.undo().unwrap());
        assert!(atlas(&doc, id).iter().all(|&p| p == 0));
    }

    #[test]
    fn test_undo_activates_layer() {
        let (mut doc, a) = document();
        let shape = VolumeShape::new((2, 2, 2), 1).unwrap();
        let volume = VolumeData::new(shape, (1..=8).collect()).unwrap();
        let b = doc.add_layer("scan", &volume).unwrap();
        assert_eq!(doc.active_layer(), Some(a));

        doc.replace_image_data(b, &VolumeData::zeros(shape)).unwrap();
        assert!(doc.set_active_layer(a));
        assert!(doc.undo().unwrap());
        assert_eq!(doc.active_layer(), Some(b));
        let image = doc.get_layer(b).unwrap().image();
        assert_eq!(image.get_image_data().unwrap(), volume);
    }

    #[test]
    fn test_replace_atlas() {
        let (mut doc, id) = document();
        let len = atlas(&doc, id).len();
        assert!(doc.replace_atlas(id, &vec![1; len - 1]).is_err());
        assert!(doc.history().is_empty());
        doc.replace_atlas(id, &vec![1; len]).unwrap();
        assert!(doc.can_undo());
        doc.undo().unwrap();
        assert!(atlas(&doc, id).iter().all(|&p| p == 0));
        assert!(doc.can_redo());
    }

    #[test]
    fn test_missing_layer() {
        let (mut doc, id) = document();
        assert!(doc.remove_layer(id).is_some());
        assert!(doc.annotator(id, ViewType::Coronal).is_err());
        let mut a = Annotator::new(id, RenderNotifier::new());
        assert!(doc.annotate(&mut a, &[AnnotationVoxel::new(0, 0, 0, 1)]).is_err());
    }

    #[test]
    fn test_documents_are_isolated() {
        let (mut d1, id1) = document();
        let (d2, id2) = document();
        assert_eq!(id1, id2);
        let mut a = d1.annotator(id1, ViewType::Transverse).unwrap();
        d1.annotate(&mut a, &[AnnotationVoxel::new(0, 0, 0, 9)])
            .unwrap();
        d1.finish_stroke(&mut a).unwrap();
        assert!(d1.can_undo() && !d2.can_undo());
        assert!(atlas(&d2, id2).iter().all(|&p| p == 0));
    }
}
