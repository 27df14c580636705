use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};

pub type Mat4x4 = Mat<f32, 4, 4>;

/// Column-vector convention: points transform as `M * v`.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat<T, const M: usize, const N: usize>([[T; N]; M]);

impl<T: Default + Copy, const M: usize, const N: usize> Default for Mat<T, M, N> {
    fn default() -> Self {
        Mat([[T::default(); N]; M])
    }
}

impl<T: Copy, const M: usize, const N: usize> Mat<T, M, N> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Mat<U, M, N> {
        Mat(self.0.map(|row| row.map(&mut f)))
    }

    #[inline(always)]
    pub fn zip_with<U: Copy, R: Copy + Default>(
        self,
        rhs: Mat<U, M, N>,
        mut f: impl FnMut(T, U) -> R,
    ) -> Mat<R, M, N> {
        let mut out = Mat([[R::default(); N]; M]);
        for i in 0..M {
            for j in 0..N {
                out.0[i][j] = f(self.0[i][j], rhs.0[i][j]);
            }
        }
        out
    }

    pub fn transpose(self) -> Mat<T, N, M> {
        use std::array::from_fn;
        Mat::from(from_fn(|j| from_fn(|i| self[(i, j)])))
    }
}

impl<T: Num, const M: usize, const N: usize> Mat<T, M, N> {
    #[inline(always)]
    pub fn zero() -> Self {
        Mat([[T::zero(); N]; M])
    }

    #[inline(always)]
    pub fn one() -> Self {
        Mat([[T::one(); N]; M])
    }

    #[inline(always)]
    pub fn repeat(el: T) -> Self {
        Mat([[el; N]; M])
    }

    #[inline(always)]
    pub fn element_mul(self, rhs: Self) -> Self {
        self.zip_with(rhs, |lhs, rhs| lhs * rhs)
    }

    pub fn min(self, rhs: Self) -> Self {
        self.zip_with(rhs, |lhs, rhs| Num::min(lhs, rhs))
    }

    pub fn max(self, rhs: Self) -> Self {
        self.zip_with(rhs, |lhs, rhs| Num::max(lhs, rhs))
    }
}

impl<T: Num, const N: usize> Mat<T, N, N> {
    pub fn identity() -> Self {
        let mut ret = Self::zero();
        for i in 0..N {
            ret[(i, i)] = T::one();
        }
        ret
    }
}

impl<const M: usize, const N: usize> Mat<f32, M, N> {
    pub fn to_i32(self) -> Mat<i32, M, N> {
        self.map(|el| el as i32)
    }

    pub fn to_u8(self) -> Mat<u8, M, N> {
        self.map(|el| el as u8)
    }
}

impl<const M: usize, const N: usize> Mat<i32, M, N> {
    pub fn to_f32(self) -> Mat<f32, M, N> {
        self.map(|el| el as f32)
    }
}

impl<T: Float> Mat<T, 4, 4> {
    #[rustfmt::skip]
    pub fn rotation_x(theta: T) -> Self {
        let o = T::one();
        let z = T::zero();
        let cos = theta.cos();
        let sin = theta.sin();
        Mat([[   o,   z,   z,   z],
             [   z, cos,-sin,   z],
             [   z, sin, cos,   z],
             [   z,   z,   z,   o]])
    }

    #[rustfmt::skip]
    pub fn rotation_y(theta: T) -> Self {
        let o = T::one();
        let z = T::zero();
        let cos = theta.cos();
        let sin = theta.sin();
        Mat([[ cos,   z, sin,   z],
             [   z,   o,   z,   z],
             [-sin,   z, cos,   z],
             [   z,   z,   z,   o]])
    }

    #[rustfmt::skip]
    pub fn rotation_z(theta: T) -> Self {
        let o = T::one();
        let z = T::zero();
        let cos = theta.cos();
        let sin = theta.sin();
        Mat([[ cos,-sin,   z,   z],
             [ sin, cos,   z,   z],
             [   z,   z,   o,   z],
             [   z,   z,   z,   o]])
    }

    pub fn rotate(self, euler_angles: Vec<T, 3>) -> Self {
        euler_angles.to_rotation() * self
    }
}

impl Mat<f32, 4, 4> {
    /// Left-handed perspective projection. `fov` is the horizontal field of
    /// view in degrees; clip `w` carries eye-space z and depth maps to
    /// `[0, 1]` between `near` and `far`.
    #[rustfmt::skip]
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let sx = 1.0 / (fov.to_radians() * 0.5).tan();
        let sy = sx * aspect;
        let sz = far / (far - near);
        let tz = -near * sz;
        Mat([[ sx, 0.0, 0.0, 0.0],
             [0.0,  sy, 0.0, 0.0],
             [0.0, 0.0,  sz,  tz],
             [0.0, 0.0, 1.0, 0.0]])
    }

    pub fn inverse(&self) -> Self {
        let det = self.determinant();
        self.adjugate() * (1.0 / det)
    }

    pub fn determinant(&self) -> f32 {
        let [m00, m01, m02, m03] = self.0[0];
        let [m10, m11, m12, m13] = self.0[1];
        let [m20, m21, m22, m23] = self.0[2];
        let [m30, m31, m32, m33] = self.0[3];

        m00 * (m11 * (m22 * m33 - m32 * m23) - m12 * (m21 * m33 - m31 * m23)
            + m13 * (m21 * m32 - m31 * m22))
            - m01 * (m10 * (m22 * m33 - m32 * m23) - m12 * (m20 * m33 - m30 * m23)
                + m13 * (m20 * m32 - m30 * m22))
            + m02 * (m10 * (m21 * m33 - m31 * m23) - m11 * (m20 * m33 - m30 * m23)
                + m13 * (m20 * m31 - m30 * m21))
            - m03 * (m10 * (m21 * m32 - m31 * m22) - m11 * (m20 * m32 - m30 * m22)
                + m12 * (m20 * m31 - m30 * m21))
    }

    // source: https://docs.rs/ultraviolet/0.9.1/src/ultraviolet/mat.rs.html#1385-1443
    pub fn adjugate(&self) -> Self {
        let [m00, m01, m02, m03] = self.0[0];
        let [m10, m11, m12, m13] = self.0[1];
        let [m20, m21, m22, m23] = self.0[2];
        let [m30, m31, m32, m33] = self.0[3];

        let coef00 = (m22 * m33) - (m32 * m23);
        let coef02 = (m12 * m33) - (m32 * m13);
        let coef03 = (m12 * m23) - (m22 * m13);

        let coef04 = (m21 * m33) - (m31 * m23);
        let coef06 = (m11 * m33) - (m31 * m13);
        let coef07 = (m11 * m23) - (m21 * m13);

        let coef08 = (m21 * m32) - (m31 * m22);
        let coef10 = (m11 * m32) - (m31 * m12);
        let coef11 = (m11 * m22) - (m21 * m12);

        let coef12 = (m20 * m33) - (m30 * m23);
        let coef14 = (m10 * m33) - (m30 * m13);
        let coef15 = (m10 * m23) - (m20 * m13);

        let coef16 = (m20 * m32) - (m30 * m22);
        let coef18 = (m10 * m32) - (m30 * m12);
        let coef19 = (m10 * m22) - (m20 * m12);

        let coef20 = (m20 * m31) - (m30 * m21);
        let coef22 = (m10 * m31) - (m30 * m11);
        let coef23 = (m10 * m21) - (m20 * m11);

        let fac0 = Vec::from([coef00, coef00, coef02, coef03]);
        let fac1 = Vec::from([coef04, coef04, coef06, coef07]);
        let fac2 = Vec::from([coef08, coef08, coef10, coef11]);
        let fac3 = Vec::from([coef12, coef12, coef14, coef15]);
        let fac4 = Vec::from([coef16, coef16, coef18, coef19]);
        let fac5 = Vec::from([coef20, coef20, coef22, coef23]);

        let vec0 = Vec::from([m10, m00, m00, m00]);
        let vec1 = Vec::from([m11, m01, m01, m01]);
        let vec2 = Vec::from([m12, m02, m02, m02]);
        let vec3 = Vec::from([m13, m03, m03, m03]);

        let inv0 = vec1.element_mul(fac0) - vec2.element_mul(fac1) + vec3.element_mul(fac2);
        let inv1 = vec0.element_mul(fac0) - vec2.element_mul(fac3) + vec3.element_mul(fac4);
        let inv2 = vec0.element_mul(fac1) - vec1.element_mul(fac3) + vec3.element_mul(fac5);
        let inv3 = vec0.element_mul(fac2) - vec1.element_mul(fac4) + vec2.element_mul(fac5);

        let o = 1.0_f32;
        let sign_a = Vec::from([o, -o, o, -o]);
        let sign_b = Vec::from([-o, o, -o, o]);

        Self::from([
            inv0.element_mul(sign_a).to_array(),
            inv1.element_mul(sign_b).to_array(),
            inv2.element_mul(sign_a).to_array(),
            inv3.element_mul(sign_b).to_array(),
        ])
    }
}

impl<T, const M: usize, const N: usize> From<[[T; N]; M]> for Mat<T, M, N> {
    fn from(value: [[T; N]; M]) -> Self {
        Mat(value)
    }
}

pub type Vec<T, const N: usize> = Mat<T, N, 1>;

pub type Vec2 = Vec<f32, 2>;
pub type Vec3 = Vec<f32, 3>;
pub type Vec4 = Vec<f32, 4>;

pub type Vec2i = Vec<i32, 2>;
pub type Vec3i = Vec<i32, 3>;

impl<T: Copy, const N: usize> Vec<T, N> {
    pub fn to_array(&self) -> [T; N] {
        use std::array::from_fn;
        from_fn(|i| self.0[i][0])
    }
}

impl<T: Num, const N: usize> Vec<T, N> {
    pub fn mag_sq(&self) -> T {
        let mut ret = T::zero();
        for i in 0..N {
            ret += self.0[i][0] * self.0[i][0];
        }
        ret
    }

    pub fn dot(&self, rhs: Self) -> T {
        let mut ret = T::zero();
        for i in 0..N {
            ret += self.0[i][0] * rhs.0[i][0];
        }
        ret
    }
}

impl<T: Float, const N: usize> Vec<T, N> {
    pub fn mag(&self) -> T {
        self.mag_sq().sqrt()
    }

    pub fn normalized(self) -> Self {
        self / self.mag()
    }

    pub fn normalize(&mut self) {
        *self /= self.mag()
    }
}

impl<T: Copy> Vec<T, 3> {
    #[inline(always)]
    pub fn map_3<U: Copy + Default>(self, mut f: impl FnMut(T) -> U) -> Vec<U, 3> {
        Vec::from([f(self.x), f(self.y), f(self.z)])
    }
}

impl<T: Num> Vec<T, 3> {
    pub fn cross(self, rhs: Self) -> Self {
        Self::from([
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        ])
    }

    pub fn to_translation(self) -> Mat<T, 4, 4> {
        let mut ret = Mat::identity();
        ret[(0, 3)] = self.x;
        ret[(1, 3)] = self.y;
        ret[(2, 3)] = self.z;
        ret
    }

    pub fn to_scale(self) -> Mat<T, 4, 4> {
        let mut ret = Mat::zero();
        ret[(0, 0)] = self.x;
        ret[(1, 1)] = self.y;
        ret[(2, 2)] = self.z;
        ret[(3, 3)] = T::one();
        ret
    }

    pub fn to_hom(self) -> Vec<T, 4> {
        [self.x, self.y, self.z, T::one()].into()
    }
}

impl<T: Float> Vec<T, 3> {
    pub fn to_rotation(self) -> Mat<T, 4, 4> {
        Mat::rotation_x(self.x) * Mat::rotation_y(self.y) * Mat::rotation_z(self.z)
    }
}

impl Vec3 {
    pub fn forward() -> Self {
        Vec3::from([0.0, 0.0, 1.0])
    }

    pub fn up() -> Self {
        Vec3::from([0.0, 1.0, 0.0])
    }

    pub fn right() -> Self {
        Vec3::from([1.0, 0.0, 0.0])
    }
}

impl<T: Copy> Vec<T, 4> {
    #[inline(always)]
    pub fn map_4<U: Copy + Default>(self, mut f: impl FnMut(T) -> U) -> Vec<U, 4> {
        Vec::from([f(self.x), f(self.y), f(self.z), f(self.w)])
    }
}

impl<T, const N: usize> From<[T; N]> for Vec<T, N> {
    fn from(value: [T; N]) -> Self {
        Mat(value.map(|el| [el]))
    }
}

impl<T, const M: usize, const N: usize> Index<(usize, usize)> for Mat<T, M, N> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.0[i][j]
    }
}

impl<T, const M: usize, const N: usize> IndexMut<(usize, usize)> for Mat<T, M, N> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.0[i][j]
    }
}

impl<T: Num, const M: usize, const N: usize> Add for Mat<T, M, N> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<T: Num, const M: usize, const N: usize> AddAssign for Mat<T, M, N> {
    fn add_assign(&mut self, rhs: Self) {
        for i in 0..M {
            for j in 0..N {
                self[(i, j)] += rhs[(i, j)];
            }
        }
    }
}

impl<T: Num, const M: usize, const N: usize> Sub for Mat<T, M, N> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl<T: Num, const M: usize, const N: usize> SubAssign for Mat<T, M, N> {
    fn sub_assign(&mut self, rhs: Self) {
        for i in 0..M {
            for j in 0..N {
                self[(i, j)] -= rhs[(i, j)];
            }
        }
    }
}

impl<T: Num, const M: usize, const N: usize> Neg for Mat<T, M, N> {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|el| -el)
    }
}

impl<T: Num, const M: usize, const N: usize> Mul<T> for Mat<T, M, N> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        self.map(|el| el * rhs)
    }
}

impl<T: Num, const M: usize, const N: usize> MulAssign<T> for Mat<T, M, N> {
    fn mul_assign(&mut self, rhs: T) {
        for i in 0..M {
            for j in 0..N {
                self[(i, j)] *= rhs;
            }
        }
    }
}

macro_rules! impl_mul_lhs {
    ($($ty:ty),+) => {
        $(impl<const M: usize, const N: usize> Mul<Mat<$ty, M, N>> for $ty {
            type Output = Mat<$ty, M, N>;

            fn mul(self, rhs: Mat<$ty, M, N>) -> Mat<$ty, M, N> {
                rhs * self
            }
        })+
    };
}

impl_mul_lhs!(f32, f64, i32, i64);

impl<T: Num, const M: usize, const K: usize, const N: usize> Mul<Mat<T, K, N>> for Mat<T, M, K> {
    type Output = Mat<T, M, N>;

    fn mul(self, rhs: Mat<T, K, N>) -> Self::Output {
        let mut ret = Mat::zero();
        for i in 0..M {
            for j in 0..N {
                for k in 0..K {
                    ret[(i, j)] += self[(i, k)] * rhs[(k, j)];
                }
            }
        }
        ret
    }
}

impl<T: Num, const M: usize, const N: usize> Div<T> for Mat<T, M, N> {
    type Output = Self;

    fn div(mut self, rhs: T) -> Self {
        self /= rhs;
        self
    }
}

impl<T: Num, const M: usize, const N: usize> DivAssign<T> for Mat<T, M, N> {
    fn div_assign(&mut self, rhs: T) {
        for i in 0..M {
            for j in 0..N {
                self[(i, j)] /= rhs;
            }
        }
    }
}

mod swizzling {
    use super::Vec;

    use std::ops::{Deref, DerefMut};

    impl<T> Deref for Vec<T, 2> {
        type Target = XY<T>;

        #[inline(always)]
        fn deref(&self) -> &XY<T> {
            unsafe { std::mem::transmute(self) }
        }
    }

    impl<T> DerefMut for Vec<T, 2> {
        #[inline(always)]
        fn deref_mut(&mut self) -> &mut XY<T> {
            unsafe { std::mem::transmute(self) }
        }
    }

    impl<T> Deref for Vec<T, 3> {
        type Target = XYZ<T>;

        #[inline(always)]
        fn deref(&self) -> &XYZ<T> {
            unsafe { std::mem::transmute(self) }
        }
    }

    impl<T> DerefMut for Vec<T, 3> {
        #[inline(always)]
        fn deref_mut(&mut self) -> &mut XYZ<T> {
            unsafe { std::mem::transmute(self) }
        }
    }

    impl<T> Deref for Vec<T, 4> {
        type Target = XYZW<T>;

        #[inline(always)]
        fn deref(&self) -> &XYZW<T> {
            unsafe { std::mem::transmute(self) }
        }
    }

    impl<T> DerefMut for Vec<T, 4> {
        #[inline(always)]
        fn deref_mut(&mut self) -> &mut XYZW<T> {
            unsafe { std::mem::transmute(self) }
        }
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct XY<T> {
        pub x: T,
        pub y: T,
    }

    impl<T: Copy> XY<T> {
        #[inline(always)]
        pub fn xy(&self) -> Vec<T, 2> {
            Vec::from([self.x, self.y])
        }
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct XYZ<T> {
        _xy: XY<T>,
        pub z: T,
    }

    impl<T: Copy> XYZ<T> {
        #[inline(always)]
        pub fn xyz(&self) -> Vec<T, 3> {
            Vec::from([self.x, self.y, self.z])
        }
    }

    impl<T> Deref for XYZ<T> {
        type Target = XY<T>;

        fn deref(&self) -> &XY<T> {
            &self._xy
        }
    }

    impl<T> DerefMut for XYZ<T> {
        fn deref_mut(&mut self) -> &mut XY<T> {
            &mut self._xy
        }
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct XYZW<T> {
        _xyz: XYZ<T>,
        pub w: T,
    }

    impl<T> Deref for XYZW<T> {
        type Target = XYZ<T>;

        #[inline(always)]
        fn deref(&self) -> &XYZ<T> {
            &self._xyz
        }
    }

    impl<T> DerefMut for XYZW<T> {
        #[inline(always)]
        fn deref_mut(&mut self) -> &mut XYZ<T> {
            &mut self._xyz
        }
    }
}

pub trait Num:
    Copy
    + Default
    + Add<Output = Self>
    + AddAssign
    + Sub<Output = Self>
    + SubAssign
    + Mul<Output = Self>
    + MulAssign
    + Div<Output = Self>
    + DivAssign
    + Neg<Output = Self>
{
    fn zero() -> Self;
    fn one() -> Self;
    fn min(self, rhs: Self) -> Self;
    fn max(self, rhs: Self) -> Self;

    fn clamp(self, min: Self, max: Self) -> Self {
        self.max(min).min(max)
    }
}

pub trait Float: Num {
    fn sqrt(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn acos(self) -> Self;
}

macro_rules! impl_num_float {
    ($($ty:ty),+) => {
        $(impl Num for $ty {
            #[inline(always)]
            fn zero() -> $ty { 0.0 }

            #[inline(always)]
            fn one() -> $ty { 1.0 }

            #[inline(always)]
            fn min(self, rhs: Self) -> $ty { self.min(rhs) }

            #[inline(always)]
            fn max(self, rhs: Self) -> $ty { self.max(rhs) }

            #[inline(always)]
            fn clamp(self, min: Self, max: Self) -> $ty { self.clamp(min, max) }
        }

        impl Float for $ty {
            #[inline(always)]
            fn sqrt(self) -> $ty { self.sqrt() }

            #[inline(always)]
            fn sin(self)  -> $ty { self.sin()  }

            #[inline(always)]
            fn cos(self)  -> $ty { self.cos()  }

            #[inline(always)]
            fn acos(self) -> $ty { self.acos() }
        })+
    };
}

impl_num_float!(f32, f64);

macro_rules! impl_num_int {
    ($($ty:ty),+) => {
        $(impl Num for $ty {
            #[inline(always)]
            fn zero() -> $ty { 0 }

            #[inline(always)]
            fn one() -> $ty { 1 }

            #[inline(always)]
            fn min(self, rhs: Self) -> $ty { Ord::min(self, rhs) }

            #[inline(always)]
            fn max(self, rhs: Self) -> $ty { Ord::max(self, rhs) }

            #[inline(always)]
            fn clamp(self, min: Self, max: Self) -> $ty { Ord::clamp(self, min, max) }
        })+
    };
}

impl_num_int!(i32, i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_vector_mul() {
        let m = Vec3::from([1.0, 2.0, 3.0]).to_translation();
        let v = Vec4::from([1.0, 1.0, 1.0, 1.0]);
        let r = m * v;
        assert_eq!(r.to_array(), [2.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn inverse_roundtrip() {
        let m = Vec3::from([1.0, -2.0, 0.5]).to_translation()
            * Mat4x4::rotation_y(0.7)
            * Vec3::from([2.0, 2.0, 2.0]).to_scale();
        let id = m * m.inverse();
        for i in 0..4 {
            for j in 0..4 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((id[(i, j)] - expect).abs() < 1e-5, "entry ({i}, {j}) = {}", id[(i, j)]);
            }
        }
    }

    #[test]
    fn cross_follows_left_handed_basis() {
        let x = Vec3::right();
        let y = Vec3::up();
        assert_eq!(x.cross(y).to_array(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn perspective_carries_eye_z_in_w() {
        let p = Mat4x4::perspective(90.0, 1.0, 0.1, 100.0);
        let v = p * Vec4::from([0.0, 0.0, 5.0, 1.0]);
        assert!((v.w - 5.0).abs() < 1e-6);
    }
}
