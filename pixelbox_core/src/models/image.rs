use super::{io::ImageIOError, pixel::Pixel};

pub const CHANNELS: usize = 4;

#[derive(Clone, Debug)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Pixel>, // starting at top left pixel of the image, pos = y * width + x
}

impl Image {

    pub fn new(width: usize, height: usize) -> Self {
        Image {
            width,
            height,
            pixels: vec![Pixel::zero(); width * height],
        }
    }

    /// Builds an image from a packed RGBA buffer (4 bytes per pixel, row-major).
    pub fn from_rgba(width: usize, height: usize, data: &[u8]) -> Result<Self, ImageIOError> {
        let expected = width.checked_mul(height)
            .and_then(|v| v.checked_mul(CHANNELS))
            .ok_or_else(|| ImageIOError::InvalidInput {
                description: format!("image dimensions overflow: {}x{}", width, height),
            })?;

        if data.len() != expected {
            return Err(ImageIOError::InvalidInput {
                description: format!(
                    "expected {} bytes of rgba data for {}x{} image, got {}",
                    expected, width, height, data.len()
                ),
            });
        }

        let pixels = data.chunks_exact(CHANNELS)
            .map(|v| Pixel::from_rgba(v[0], v[1], v[2], v[3]))
            .collect();

        Ok(Image {
            width,
            height,
            pixels,
        })
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.pixels.len() * CHANNELS);

        for pixel in &self.pixels {
            data.push(pixel.red);
            data.push(pixel.green);
            data.push(pixel.blue);
            data.push(pixel.alpha);
        }

        data
    }

    pub fn test_image() -> Self {
        let mut image = Self::new(4, 4);

        let white = Pixel::from_rgb(255, 255, 255);
        let blue = Pixel::from_rgb(3, 155, 229);
        let red = Pixel::from_rgb(221, 47, 47);

        image.fill(white);
        image.set_pixel(1, 1, blue);
        image.set_pixel(2, 1, blue);
        image.set_pixel(1, 2, blue);
        image.set_pixel(2, 2, red);

        image
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, pixel: Pixel) {
        self.pixels[y * self.width + x] = pixel;
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Pixel {
        self.pixels[y * self.width + x]
    }

    pub fn fill(&mut self, color: Pixel) {
        for pixel in self.pixels.iter_mut() {
            *pixel = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_round_trip() {
        let image = Image::test_image();
        let data = image.to_rgba();

        assert_eq!(data.len(), 4 * 4 * 4);

        let restored = Image::from_rgba(4, 4, &data).expect("failed to restore image from rgba");
        assert_eq!(restored.pixels, image.pixels);
        assert_eq!(restored.get_pixel(2, 2), Pixel::from_rgb(221, 47, 47));
    }

    #[test]
    fn test_from_rgba_rejects_wrong_length() {
        let result = Image::from_rgba(2, 2, &[0; 15]);

        match result {
            Err(ImageIOError::InvalidInput { description }) => assert!(description.contains("expected 16 bytes")),
            other => panic!("expected invalid input error, got {:?}", other.map(|v| v.width)),
        }
    }
}
