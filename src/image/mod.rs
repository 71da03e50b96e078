//! Rendered thumbnails and their portable encodings
//!
//! Images returned by the diffusion pipeline are decoded into
//! [`GeneratedImage`]s and re-encoded as PNG (plus base64 / data URIs) for
//! display and download.

pub mod encoder;

pub use encoder::{encode_set, EncodedImage};

use crate::Result;
use image::DynamicImage;

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    image: DynamicImage,
}

impl GeneratedImage {
    /// Decode raw bytes in any format the `image` crate recognizes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            image: image::load_from_memory(bytes)?,
        })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }
}

/// Images from one generation, in the order the pipeline produced them.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    images: Vec<GeneratedImage>,
}

impl ImageSet {
    pub fn new(images: Vec<GeneratedImage>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedImage> {
        self.images.iter()
    }
}

impl IntoIterator for ImageSet {
    type Item = GeneratedImage;
    type IntoIter = std::vec::IntoIter<GeneratedImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    #[test]
    fn test_from_bytes_decodes_png() {
        let img = RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let decoded = GeneratedImage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let err = GeneratedImage::from_bytes(&[0x00, 0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(err, crate::Error::Image(_)));
    }
}
