//! 从 nii 文件加载体数据.
//!
//! nifti 按 `[W, H, z]` 组织数据, 加载后统一转换成本 crate 的 `z, y, x` 存储顺序.

use std::path::Path;

use log::debug;
use ndarray::{ArrayD, Axis as NdAxis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use super::{CtWindow, VolumeData, VolumeShape};
use crate::error::{AtlasError, AtlasResult};

/// 打开 nii 文件格式的标注. 标签值按原样以 `u8` 保存, 单通道.
pub fn open_label<P: AsRef<Path>>(path: P) -> AtlasResult<VolumeData> {
    let obj = ReaderOptions::new().read_file(path.as_ref())?;
    let data = obj.into_volume().into_ndarray::<u8>()?;
    debug!("加载标注 {:?}, 形状 {:?}", path.as_ref(), data.shape());
    into_volume_data(data)
}

/// 打开 nii 文件格式的 CT 扫描, 并用 `window` 将 HU 值映射为灰度值. 单通道.
pub fn open_scan<P: AsRef<Path>>(path: P, window: CtWindow) -> AtlasResult<VolumeData> {
    let obj = ReaderOptions::new().read_file(path.as_ref())?;
    let hu = obj.into_volume().into_ndarray::<f32>()?;
    debug!(
        "加载扫描 {:?}, 形状 {:?}, 窗位 {}, 窗宽 {}",
        path.as_ref(),
        hu.shape(),
        window.level(),
        window.width()
    );
    into_volume_data(hu.mapv(|ct| window.to_gray(ct)))
}

/// 将 `[W, H, z, 1, ...]` 组织的数组转换成 `VolumeData`.
/// 二维数组被视为只有一个切片的体数据.
fn into_volume_data(mut data: ArrayD<u8>) -> AtlasResult<VolumeData> {
    // 去掉尾部长度为 1 的多余维度 (如 t = 1).
    while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(NdAxis(last), 0);
    }
    let data = match data.ndim() {
        2 => data.insert_axis(NdAxis(2)),
        3 => data,
        n => {
            return Err(AtlasError::validation(format!(
                "仅支持 2D/3D 体数据, 但得到 {n} 维"
            )))
        }
    };
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|e| AtlasError::validation(e.to_string()))?;

    let (w, h, z) = data.dim();
    let shape = VolumeShape::new((w, h, z), 1)?;

    // [W, H, z] -> [z, H, W], 再按逻辑顺序展开.
    let raw = data.permuted_axes([2, 1, 0]).iter().copied().collect();
    VolumeData::new(shape, raw)
}
