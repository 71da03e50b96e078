use super::{GeneratedImage, ImageSet};
use crate::{Error, Result};
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

pub const PNG_MIME: &str = "image/png";

/// One image encoded for the page and for download.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    png: Vec<u8>,
    base64: String,
}

impl EncodedImage {
    pub fn encode(image: &GeneratedImage) -> Result<Self> {
        let png = Self::encode_png(image.as_dynamic())?;
        let base64 = base64::engine::general_purpose::STANDARD.encode(&png);
        Ok(Self { png, base64 })
    }

    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", PNG_MIME, self.base64)
    }
}

/// Encode every image of a set on the blocking pool.
pub async fn encode_set(set: &ImageSet) -> Result<Vec<EncodedImage>> {
    let set = set.clone();
    tokio::task::spawn_blocking(move || set.iter().map(EncodedImage::encode).collect())
        .await
        .map_err(|e| Error::Invariant(format!("Image encoding task join error: {}", e)))?
}
