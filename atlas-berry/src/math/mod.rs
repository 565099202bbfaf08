//! 定长数值元组, 用于体素坐标、体素个数和图集网格尺寸.

use std::ops::{Index, IndexMut};

/// 体数据的三个坐标轴.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Axis {
    /// 宽方向.
    X,

    /// 高方向.
    Y,

    /// 切片堆叠方向.
    Z,
}

impl Axis {
    /// 按 `X, Y, Z` 顺序排列的全部坐标轴.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// 坐标轴在三元组中的下标.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// `N` 维定长数值元组.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Vector<T, const N: usize>(pub [T; N]);

/// 二维元组.
pub type Vector2<T> = Vector<T, 2>;

/// 三维元组.
pub type Vector3<T> = Vector<T, 3>;

impl<T, const N: usize> Vector<T, N> {
    /// 直接初始化.
    #[inline]
    pub const fn new(data: [T; N]) -> Self {
        Self(data)
    }

    /// 获取底层数组.
    #[inline]
    pub fn as_array(&self) -> &[T; N] {
        &self.0
    }

    /// 对每个分量实施 `f`, 得到新的元组.
    #[inline]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Vector<U, N> {
        Vector(self.0.map(f))
    }
}

impl<const N: usize> Vector<usize, N> {
    /// 所有分量之积. 对体素个数而言即体素总数.
    #[inline]
    pub fn product(&self) -> usize {
        self.0.iter().product()
    }

    /// 所有分量是否都为正数?
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.iter().all(|&v| v > 0)
    }
}

impl<T: Copy> Vector<T, 2> {
    /// 第一个分量.
    #[inline]
    pub fn x(&self) -> T {
        self.0[0]
    }

    /// 第二个分量.
    #[inline]
    pub fn y(&self) -> T {
        self.0[1]
    }
}

impl<T: Copy> Vector<T, 3> {
    /// X 分量.
    #[inline]
    pub fn x(&self) -> T {
        self.0[0]
    }

    /// Y 分量.
    #[inline]
    pub fn y(&self) -> T {
        self.0[1]
    }

    /// Z 分量.
    #[inline]
    pub fn z(&self) -> T {
        self.0[2]
    }
}

impl Vector<i64, 3> {
    /// 若该坐标落在 `[0, count)` 范围内 (逐轴判断), 则转换为无符号索引,
    /// 否则返回 `None`.
    pub fn to_index(&self, count: &Vector3<usize>) -> Option<Vector3<usize>> {
        let mut out = [0usize; 3];
        for axis in Axis::ALL {
            let v = usize::try_from(self[axis]).ok()?;
            if v >= count[axis] {
                return None;
            }
            out[axis.index()] = v;
        }
        Some(Vector(out))
    }
}

impl<T, const N: usize> Index<usize> for Vector<T, N> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<T, const N: usize> IndexMut<usize> for Vector<T, N> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<T> Index<Axis> for Vector<T, 3> {
    type Output = T;

    #[inline]
    fn index(&self, index: Axis) -> &Self::Output {
        &self.0[index.index()]
    }
}

impl<T> IndexMut<Axis> for Vector<T, 3> {
    #[inline]
    fn index_mut(&mut self, index: Axis) -> &mut Self::Output {
        &mut self.0[index.index()]
    }
}

impl<T, const N: usize> From<[T; N]> for Vector<T, N> {
    #[inline]
    fn from(value: [T; N]) -> Self {
        Self(value)
    }
}

impl<T> From<(T, T)> for Vector<T, 2> {
    #[inline]
    fn from((a, b): (T, T)) -> Self {
        Self([a, b])
    }
}

impl<T> From<(T, T, T)> for Vector<T, 3> {
    #[inline]
    fn from((a, b, c): (T, T, T)) -> Self {
        Self([a, b, c])
    }
}

#[cfg(test)]
mod tests {
    use super::{Axis, Vector2, Vector3};

    #[test]
    fn test_axis_access() {
        let mut v = Vector3::new([4usize, 5, 6]);
        assert_eq!(v[Axis::X], 4);
        assert_eq!(v[Axis::Y], 5);
        assert_eq!(v[Axis::Z], 6);
        v[Axis::Y] = 7;
        assert_eq!((v.x(), v.y(), v.z()), (4, 7, 6));
        assert_eq!(v.product(), 4 * 7 * 6);

        let g = Vector2::from((2usize, 3usize));
        assert_eq!(g.product(), 6);
        assert!(g.is_positive());
        assert!(!Vector2::new([0usize, 3]).is_positive());
    }

    #[test]
    fn test_to_index() {
        let count = Vector3::new([4usize, 4, 4]);
        assert_eq!(
            Vector3::new([1i64, 2, 3]).to_index(&count),
            Some(Vector3::new([1, 2, 3]))
        );
        assert_eq!(Vector3::new([-1i64, 0, 0]).to_index(&count), None);
        assert_eq!(Vector3::new([0i64, 4, 0]).to_index(&count), None);
    }
}
