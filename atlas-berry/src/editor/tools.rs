//! 绘制工具的光栅化: 把一次平面手势转换为一串候选体素写入.
//!
//! 所有工具都工作在某个视图的某个切片内, 以有符号平面坐标 `(u, v)` 计算,
//! 再经视图类型提升为体素坐标. 光栅化结果可能越出体数据边界, 由标注器负责丢弃.

use std::collections::{HashSet, VecDeque};

use itertools::iproduct;

use super::AnnotationVoxel;
use crate::data::ViewType;
use crate::error::{AtlasError, AtlasResult};
use crate::{Idx2d, PlanePos};

/// 有符号平面坐标 `(u, v)`. 手势可能拖出画布, 因此允许负数.
pub type PlanePoint = (i64, i64);

/// 绑定到某个视图中某个切片的绘制工具.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PlaneTool {
    view: ViewType,
    slice: usize,
}

impl PlaneTool {
    /// 直接初始化.
    #[inline]
    pub fn new(view: ViewType, slice: usize) -> Self {
        Self { view, slice }
    }

    /// 视图.
    #[inline]
    pub fn view(&self) -> ViewType {
        self.view
    }

    /// 切片编号.
    #[inline]
    pub fn slice(&self) -> usize {
        self.slice
    }

    /// 把平面坐标提升为体素.
    pub fn lift(&self, (u, v): PlanePoint, value: u8) -> AnnotationVoxel {
        let mut p = [0i64; 3];
        let [ua, va] = self.view.plane_axes();
        p[self.view.orthogonal_axis().index()] = self.slice as i64;
        p[ua.index()] = u;
        p[va.index()] = v;
        AnnotationVoxel::new(p[0], p[1], p[2], value)
    }

    /// 以 `center` 为圆心, `radius` 为半径的实心圆盘, 按行优先顺序输出.
    pub fn circle(&self, center: PlanePoint, radius: u32, value: u8) -> Vec<AnnotationVoxel> {
        disk(center, radius)
            .map(|p| self.lift(p, value))
            .collect()
    }

    /// 从 `from` 到 `to` 的 Bresenham 直线, 两端点都包含在内.
    pub fn line(&self, from: PlanePoint, to: PlanePoint, value: u8) -> Vec<AnnotationVoxel> {
        bresenham(from, to)
            .into_iter()
            .map(|p| self.lift(p, value))
            .collect()
    }

    /// 笔刷轨迹: 相邻采样点之间以直线连接, 路径上每个点盖一个圆盘.
    /// 重复覆盖的体素只保留第一次出现.
    pub fn brush_stroke(
        &self,
        points: &[PlanePoint],
        radius: u32,
        value: u8,
    ) -> Vec<AnnotationVoxel> {
        let path: Vec<PlanePoint> = match points {
            [] => return Vec::new(),
            [p] => vec![*p],
            _ => {
                let mut path = vec![points[0]];
                for w in points.windows(2) {
                    path.extend(bresenham(w[0], w[1]).into_iter().skip(1));
                }
                path
            }
        };
        let mut seen = HashSet::new();
        path.into_iter()
            .flat_map(|c| disk(c, radius))
            .filter(|p| seen.insert(*p))
            .map(|p| self.lift(p, value))
            .collect()
    }

    /// 区域生长: 从 `seed` 出发, 按 4-相邻规则收集所有与种子像素第一个通道之差
    /// 不超过 `tolerance` 的像素.
    ///
    /// `slice_data` 是该切片的缓冲区, 尺寸为 `shape = (宽, 高)`.
    /// 种子越界时返回空结果; 缓冲区长度不符时返回 `Err`.
    pub fn region_grow(
        &self,
        slice_data: &[u8],
        shape: Idx2d,
        components: usize,
        seed: PlanePos,
        tolerance: u8,
        value: u8,
    ) -> AtlasResult<Vec<AnnotationVoxel>> {
        let (w, h) = shape;
        if components == 0 || slice_data.len() != w * h * components {
            return Err(AtlasError::validation(format!(
                "切片缓冲区长度应为 {}, 但得到 {}",
                w * h * components,
                slice_data.len()
            )));
        }
        let (su, sv) = seed;
        if su >= w || sv >= h {
            return Ok(Vec::new());
        }
        let pixel = |(u, v): PlanePos| slice_data[(v * w + u) * components];
        let target = pixel(seed);
        let pred = |p: PlanePos| pixel(p).abs_diff(target) <= tolerance;

        let mut ans = Vec::new();
        let mut set = HashSet::with_capacity(16);
        let mut bfs_q = VecDeque::with_capacity(4);
        bfs_q.push_back(seed);
        while let Some(cur) = bfs_q.pop_front() {
            if !set.insert(cur) {
                continue;
            }
            ans.push(self.lift((cur.0 as i64, cur.1 as i64), value));

            let (u, v) = cur;
            let neighbors = [
                (u.wrapping_sub(1), v),
                (u + 1, v),
                (u, v.wrapping_sub(1)),
                (u, v + 1),
            ];
            bfs_q.extend(
                neighbors
                    .into_iter()
                    .filter(|&(nu, nv)| nu < w && nv < h)
                    .filter(|n| !set.contains(n) && pred(*n)),
            );
        }
        Ok(ans)
    }
}

/// 实心圆盘内的所有点, 行优先.
fn disk((cu, cv): PlanePoint, radius: u32) -> impl Iterator<Item = PlanePoint> {
    let r = radius as i64;
    iproduct!(-r..=r, -r..=r)
        .filter(move |(dv, du)| du * du + dv * dv <= r * r)
        .map(move |(dv, du)| (cu + du, cv + dv))
}

/// 整数 Bresenham 直线.
fn bresenham((mut u0, mut v0): PlanePoint, (u1, v1): PlanePoint) -> Vec<PlanePoint> {
    let du = (u1 - u0).abs();
    let dv = -(v1 - v0).abs();
    let su = if u0 < u1 { 1 } else { -1 };
    let sv = if v0 < v1 { 1 } else { -1 };
    let mut err = du + dv;
    let mut out = Vec::with_capacity(du.max(-dv) as usize + 1);
    loop {
        out.push((u0, v0));
        if u0 == u1 && v0 == v1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dv {
            err += dv;
            u0 += su;
        }
        if e2 <= du {
            err += du;
            v0 += sv;
        }
    }
    out
}
