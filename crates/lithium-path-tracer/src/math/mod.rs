use core::ops::Mul;

pub mod coord_system;
pub use coord_system::*;
pub mod random;

pub fn sqr<T: Mul<Output = T> + Clone + Copy>(x: T) -> T {
    x * x
}

pub fn safe_sqrt(x: f32) -> f32 {
    x.max(0.0).sqrt()
}
