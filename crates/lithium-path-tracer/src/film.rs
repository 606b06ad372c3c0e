use glam::Vec4;

/// Final per pixel radiance, row-major RGBA in linear HDR.
#[derive(Debug, Clone, PartialEq)]
pub struct Film {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::ZERO; width as usize * height as usize],
        }
    }

    /// `None` if `pixels` does not hold exactly `width * height` entries.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Vec4>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Interprets the first `width * height` RGBA `f32` texels of `bytes`.
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        let len = width as usize * height as usize * std::mem::size_of::<Vec4>();
        let pixels = bytemuck::pod_collect_to_vec(bytes.get(..len)?);
        Self::from_pixels(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn into_pixels(self) -> Vec<Vec4> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_are_row_major() {
        let pixels = (0..6).map(|i| Vec4::splat(i as f32)).collect();
        let film = Film::from_pixels(3, 2, pixels).unwrap();
        assert_eq!(film.pixel(2, 0), Vec4::splat(2.0));
        assert_eq!(film.pixel(0, 1), Vec4::splat(3.0));
    }

    #[test]
    fn from_bytes_checks_the_length() {
        let film = Film::new(2, 2);
        assert_eq!(Film::from_bytes(2, 2, film.as_bytes()), Some(film.clone()));
        assert_eq!(Film::from_bytes(2, 3, film.as_bytes()), None);
    }
}
