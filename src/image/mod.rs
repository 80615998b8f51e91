//! Image decoding: container sniffing plus the two format decoders.
//!
//! [`Image::from_memory`] looks at the buffer's magic signature and routes
//! to the block-compressed ([`CompressedTexture`]) or Radiance
//! ([`RadianceImage`]) decoder, then normalizes the result into a single
//! [`ImageInfo`] description. No decoding logic lives at this layer.

mod dds;
mod hdr;

pub use dds::{CompressedFormat, CompressedTexture};
pub use hdr::RadianceImage;

use crate::{error::DecodeError, handle::ResourceHandle};

/// Which decoder produced the image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageSourceKind {
    BlockCompressed,
    Radiance,
}

/// Storage type of one decoded channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelType {
    Byte,
    Float,
}

/// Channel layout of the decoded data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
}

/// Internal storage format of the decoded data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageFormat {
    Bc1,
    Bc2,
    Bc3,
    Rgb32Float,
}

impl From<CompressedFormat> for ImageFormat {
    fn from(format: CompressedFormat) -> Self {
        match format {
            CompressedFormat::Bc1 => Self::Bc1,
            CompressedFormat::Bc2 => Self::Bc2,
            CompressedFormat::Bc3 => Self::Bc3,
        }
    }
}

/// Uniform description of a decoded image, independent of its container.
///
/// When `loaded` is set, `width` and `height` are nonzero and
/// `mip_level_count` is in `[1, 32]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageInfo {
    pub loaded: bool,
    pub width: u32,
    pub height: u32,
    pub is_block_compressed: bool,
    pub internal_format: ImageFormat,
    pub pixel_layout: PixelLayout,
    pub channel_type: ChannelType,
    pub channel_count: u32,
    pub mip_level_count: u32,
    pub source_kind: ImageSourceKind,
}

#[derive(Clone, Debug, PartialEq)]
enum DecodedImage {
    BlockCompressed(CompressedTexture),
    Radiance(RadianceImage),
}

/// A decoded image of either supported container, described by one
/// [`ImageInfo`].
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    info: ImageInfo,
    source: DecodedImage,
}

impl Image {
    /// Sniff the buffer's magic signature and decode with the matching
    /// format decoder.
    pub fn from_memory(data: &[u8]) -> Result<Self, DecodeError> {
        if data.starts_with(dds::MAGIC) {
            let texture = CompressedTexture::from_memory(data)?;
            let info = ImageInfo {
                loaded: true,
                width: texture.width(),
                height: texture.height(),
                is_block_compressed: true,
                internal_format: texture.format().into(),
                pixel_layout: PixelLayout::Rgba,
                channel_type: ChannelType::Byte,
                channel_count: 4,
                mip_level_count: texture.mip_level_count(),
                source_kind: ImageSourceKind::BlockCompressed,
            };
            Ok(Self {
                info,
                source: DecodedImage::BlockCompressed(texture),
            })
        } else if data.starts_with(hdr::MAGIC) {
            let image = RadianceImage::from_memory(data)?;
            let info = ImageInfo {
                loaded: true,
                width: image.width(),
                height: image.height(),
                is_block_compressed: false,
                internal_format: ImageFormat::Rgb32Float,
                pixel_layout: PixelLayout::Rgb,
                channel_type: ChannelType::Float,
                channel_count: 3,
                mip_level_count: 1,
                source_kind: ImageSourceKind::Radiance,
            };
            Ok(Self {
                info,
                source: DecodedImage::Radiance(image),
            })
        } else {
            Err(DecodeError::Format("unrecognized image container".into()))
        }
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Byte length of one mip level of the decoded data. Radiance images
    /// always have a single level of f32 RGB samples.
    pub fn level_byte_size(&self, level: u32) -> u32 {
        match &self.source {
            DecodedImage::BlockCompressed(texture) => texture.level_byte_size(level),
            DecodedImage::Radiance(image) => {
                image.width() * image.height() * 3 * size_of::<f32>() as u32
            }
        }
    }

    /// Copy the raw block bytes of `level`. `None` for radiance images or
    /// levels outside the mip chain.
    pub fn level_bytes(&self, level: u32) -> Option<Vec<u8>> {
        match &self.source {
            DecodedImage::BlockCompressed(texture) => {
                texture.level_data(level).ok().map(<[u8]>::to_vec)
            }
            DecodedImage::Radiance(_) => None,
        }
    }

    /// Copy the RGB float samples of the single radiance level. `None` for
    /// block-compressed images.
    pub fn level_floats(&self) -> Option<Vec<f32>> {
        match &self.source {
            DecodedImage::Radiance(image) => Some(image.pixels().to_vec()),
            DecodedImage::BlockCompressed(_) => None,
        }
    }

    pub fn as_block_compressed(&self) -> Option<&CompressedTexture> {
        match &self.source {
            DecodedImage::BlockCompressed(texture) => Some(texture),
            DecodedImage::Radiance(_) => None,
        }
    }

    pub fn as_radiance(&self) -> Option<&RadianceImage> {
        match &self.source {
            DecodedImage::Radiance(image) => Some(image),
            DecodedImage::BlockCompressed(_) => None,
        }
    }
}

/// Decode an image buffer and wrap the result in a loaded resource handle.
pub fn decode_image(data: &[u8]) -> Result<ResourceHandle<Image>, DecodeError> {
    let image = Image::from_memory(data)?;
    let handle = ResourceHandle::new(image);
    handle.set_loaded();
    Ok(handle)
}
