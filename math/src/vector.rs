use num_traits::Zero;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub};

/// 2D vector of map-unit floats.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Vec2f(pub [f32; 2]);

impl Vec2f {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Vec2f([x, y])
    }

    #[inline]
    pub fn dot(&self, rhs: &Self) -> f32 {
        self[0] * rhs[0] + self[1] * rhs[1]
    }

    /// Z component of the 3D cross product of the two vectors embedded in
    /// the XY plane.
    #[inline]
    pub fn cross(&self, rhs: &Self) -> f32 {
        self[0] * rhs[1] - self[1] * rhs[0]
    }

    #[inline]
    pub fn squared_norm(&self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        self.squared_norm().sqrt()
    }
}

impl Zero for Vec2f {
    #[inline]
    fn zero() -> Self {
        Vec2f::new(0.0, 0.0)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self[0] == 0.0 && self[1] == 0.0
    }
}

impl Neg for Vec2f {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Vec2f([-self[0], -self[1]])
    }
}

impl Add for Vec2f {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Vec2f([self[0] + rhs[0], self[1] + rhs[1]])
    }
}

impl Sub for Vec2f {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Vec2f([self[0] - rhs[0], self[1] - rhs[1]])
    }
}

impl Mul<f32> for Vec2f {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Vec2f([self[0] * rhs, self[1] * rhs])
    }
}

impl Div<f32> for Vec2f {
    type Output = Self;

    #[inline]
    fn div(self, rhs: f32) -> Self {
        Vec2f([self[0] / rhs, self[1] / rhs])
    }
}

impl Index<usize> for Vec2f {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Vec2f {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.0[index]
    }
}

/// 3D vector of map-unit floats.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Vec3f(pub [f32; 3]);

impl Vec3f {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3f([x, y, z])
    }

    #[inline]
    pub fn dot(&self, rhs: &Self) -> f32 {
        self[0] * rhs[0] + self[1] * rhs[1] + self[2] * rhs[2]
    }

    #[inline]
    pub fn cross(self, rhs: Self) -> Self {
        let (lx, ly, lz) = (self[0], self[1], self[2]);
        let (rx, ry, rz) = (rhs[0], rhs[1], rhs[2]);
        Vec3f::new(ly * rz - lz * ry, lz * rx - lx * rz, lx * ry - ly * rx)
    }

    #[inline]
    pub fn squared_norm(&self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        self.squared_norm().sqrt()
    }

    #[inline]
    pub fn normalized(self) -> Self {
        let norm = self.norm();
        if norm == 0.0 {
            Self::zero()
        } else {
            self / norm
        }
    }

    /// Drops the z component.
    #[inline]
    pub fn to_vec2(self) -> Vec2f {
        Vec2f::new(self[0], self[1])
    }
}

impl Zero for Vec3f {
    #[inline]
    fn zero() -> Self {
        Vec3f::new(0.0, 0.0, 0.0)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self[0] == 0.0 && self[1] == 0.0 && self[2] == 0.0
    }
}

impl Neg for Vec3f {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Vec3f([-self[0], -self[1], -self[2]])
    }
}

impl Add for Vec3f {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Vec3f([self[0] + rhs[0], self[1] + rhs[1], self[2] + rhs[2]])
    }
}

impl AddAssign for Vec3f {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3f {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Vec3f([self[0] - rhs[0], self[1] - rhs[1], self[2] - rhs[2]])
    }
}

impl Mul<f32> for Vec3f {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Vec3f([self[0] * rhs, self[1] * rhs, self[2] * rhs])
    }
}

/// Component-wise product.
impl Mul<Vec3f> for Vec3f {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Vec3f) -> Self {
        Vec3f([self[0] * rhs[0], self[1] * rhs[1], self[2] * rhs[2]])
    }
}

impl Div<f32> for Vec3f {
    type Output = Self;

    #[inline]
    fn div(self, rhs: f32) -> Self {
        Vec3f([self[0] / rhs, self[1] / rhs, self[2] / rhs])
    }
}

impl Index<usize> for Vec3f {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Vec3f {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.0[index]
    }
}
