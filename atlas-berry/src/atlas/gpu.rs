//! `wgpu` 图集纹理后端.
//!
//! 所有操作都阻塞到 GPU 完成为止: 写入经由 `Queue::write_texture` 上传,
//! 回读先复制到按 `COPY_BYTES_PER_ROW_ALIGNMENT` 对齐的暂存缓冲区, 映射后再去掉行填充.

use std::sync::mpsc;
use std::sync::Arc;

use log::{debug, trace};
use wgpu::{AdapterInfo, Device, Queue};

use super::texture::check_rect_data;
use super::{AtlasTexture, Rect, TextureAllocator};
use crate::error::{AtlasError, AtlasResult};
use crate::math::Vector2;

/// GPU 设备与队列. 创建一次, 由所有图层的纹理共享.
#[derive(Debug, Clone)]
pub struct GpuContext {
    info: AdapterInfo,
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl GpuContext {
    /// 请求适配器与设备. 没有可用适配器时返回 [`AtlasError::Rendering`].
    pub fn new() -> AtlasResult<Self> {
        pollster::block_on(Self::new_async())
    }

    /// [`GpuContext::new`] 的异步版本.
    pub async fn new_async() -> AtlasResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| AtlasError::Rendering("找不到可用的 GPU 适配器".into()))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("atlas-berry"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| AtlasError::Rendering(e.to_string()))?;
        let info = adapter.get_info();
        debug!("GPU 设备: {} ({:?})", info.name, info.backend);
        Ok(Self {
            info,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// 适配器信息.
    #[inline]
    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.info
    }

    /// 单边最大纹理尺寸.
    #[inline]
    pub fn max_texture_size(&self) -> usize {
        self.device.limits().max_texture_dimension_2d as usize
    }

    /// 在 Validation 错误作用域内执行 `f`, 并把捕获的错误转为 [`AtlasError::Rendering`].
    fn scoped<R>(&self, f: impl FnOnce() -> R) -> AtlasResult<R> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let r = f();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(e) => Err(AtlasError::Rendering(e.to_string())),
            None => Ok(r),
        }
    }
}

/// 通道数对应的纹理格式. 没有 24 位格式, 因此三通道被拒绝.
fn texture_format(components: usize) -> AtlasResult<wgpu::TextureFormat> {
    match components {
        1 => Ok(wgpu::TextureFormat::R8Unorm),
        2 => Ok(wgpu::TextureFormat::Rg8Unorm),
        4 => Ok(wgpu::TextureFormat::Rgba8Unorm),
        c => Err(AtlasError::validation(format!(
            "GPU 图集不支持 {c} 通道体数据"
        ))),
    }
}

impl TextureAllocator for GpuContext {
    type Texture = GpuTexture;

    fn allocate(&self, size: Vector2<usize>, components: usize) -> AtlasResult<GpuTexture> {
        let format = texture_format(components)?;
        let max = self.max_texture_size();
        if size.x() == 0 || size.y() == 0 || size.x() > max || size.y() > max {
            return Err(AtlasError::validation(format!(
                "纹理尺寸 {}x{} 超出设备上限 {max}",
                size.x(),
                size.y()
            )));
        }
        let texture = self.scoped(|| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("atlas-berry atlas"),
                size: wgpu::Extent3d {
                    width: size.x() as u32,
                    height: size.y() as u32,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })?;
        // wgpu 新建纹理的内容为零.
        Ok(GpuTexture {
            ctx: self.clone(),
            texture,
            size,
            components,
        })
    }
}

/// 存放在 GPU 上的图集纹理.
#[derive(Debug)]
pub struct GpuTexture {
    ctx: GpuContext,
    texture: wgpu::Texture,
    size: Vector2<usize>,
    components: usize,
}

impl GpuTexture {
    /// 底层 `wgpu` 纹理, 供渲染器绑定.
    #[inline]
    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[inline]
    fn copy_target(&self, rect: &Rect) -> wgpu::ImageCopyTexture<'_> {
        wgpu::ImageCopyTexture {
            texture: &self.texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: rect.x as u32,
                y: rect.y as u32,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        }
    }
}

#[inline]
fn extent(rect: &Rect) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: rect.width as u32,
        height: rect.height as u32,
        depth_or_array_layers: 1,
    }
}

impl AtlasTexture for GpuTexture {
    #[inline]
    fn size(&self) -> Vector2<usize> {
        self.size
    }

    #[inline]
    fn components(&self) -> usize {
        self.components
    }

    fn read_rect(&self, rect: Rect) -> AtlasResult<Vec<u8>> {
        rect.check_within(self.size)?;
        trace!("gpu readback {rect:?}");
        let row_bytes = (rect.width * self.components) as u32;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = row_bytes.div_ceil(align) * align;
        let device = &self.ctx.device;

        let staging = self.ctx.scoped(|| {
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("atlas-berry readback"),
                size: padded_row_bytes as u64 * rect.height as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("atlas-berry readback"),
            });
            encoder.copy_texture_to_buffer(
                self.copy_target(&rect),
                wgpu::ImageCopyBuffer {
                    buffer: &staging,
                    layout: wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_row_bytes),
                        rows_per_image: Some(rect.height as u32),
                    },
                },
                extent(&rect),
            );
            self.ctx.queue.submit(Some(encoder.finish()));
            staging
        })?;

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| AtlasError::Rendering(e.to_string()))?
            .map_err(|e| AtlasError::Rendering(e.to_string()))?;

        let mut out = Vec::with_capacity(rect.area() * self.components);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded_row_bytes as usize) {
                out.extend_from_slice(&row[..row_bytes as usize]);
            }
        }
        staging.unmap();
        Ok(out)
    }

    fn write_rect(&mut self, rect: Rect, data: &[u8]) -> AtlasResult<()> {
        rect.check_within(self.size)?;
        check_rect_data(&rect, self.components, data)?;
        trace!("gpu write {rect:?}");
        self.ctx.scoped(|| {
            self.ctx.queue.write_texture(
                self.copy_target(&rect),
                data,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some((rect.width * self.components) as u32),
                    rows_per_image: Some(rect.height as u32),
                },
                extent(&rect),
            );
            self.ctx.queue.submit(None);
        })?;
        let _ = self.ctx.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}
