use std::io::Cursor;

use image::RgbaImage;

use crate::{
    parsing::{self, AnimationMetadata},
    utils::TsuyaError,
};

/// Image decoding used for companion assets.
pub trait ImageCodec {
    /// Reads the pixel dimensions without decoding the pixels.
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), TsuyaError>;

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, TsuyaError>;

    /// Frame size of an image with the given metadata. Base sprites and their
    /// companions share this rule.
    fn frame_size(
        &self,
        metadata: Option<&AnimationMetadata>,
        width: u32,
        height: u32,
    ) -> Result<(u32, u32), TsuyaError> {
        parsing::frame_size(metadata, width, height)
    }
}

/// [`ImageCodec`] backed by the `image` crate; the format is sniffed from the bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCodec;

impl ImageCodec for DefaultCodec {
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), TsuyaError> {
        let reader = image::io::Reader::new(Cursor::new(bytes)).with_guessed_format()?;
        Ok(reader.into_dimensions()?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, TsuyaError> {
        Ok(image::load_from_memory(bytes)?.to_rgba8())
    }
}

#[cfg(test)]
pub(crate) fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .expect("encode png");
    bytes
}
