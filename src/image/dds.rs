use byteorder::{ByteOrder, LittleEndian};

use crate::error::DecodeError;

pub(crate) const MAGIC: &[u8] = b"DDS ";

/// Magic plus the fixed header structure; the payload starts right after.
const HEADER_LEN: usize = 128;

const OFFSET_HEIGHT: usize = 12;
const OFFSET_WIDTH: usize = 16;
const OFFSET_LINEAR_SIZE: usize = 20;
const OFFSET_MIP_COUNT: usize = 28;
const OFFSET_FOURCC: usize = 84;

const FOURCC_DXT1: u32 = 0x3154_5844;
const FOURCC_DXT3: u32 = 0x3354_5844;
const FOURCC_DXT5: u32 = 0x3554_5844;

const MAX_MIP_LEVELS: u32 = 32;

/// Supported block-compression variants.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressedFormat {
    /// DXT1: 4-color blocks, no dedicated alpha.
    Bc1,
    /// DXT3: explicit alpha.
    Bc2,
    /// DXT5: interpolated alpha.
    Bc3,
}

impl CompressedFormat {
    fn from_fourcc(fourcc: u32) -> Option<Self> {
        match fourcc {
            FOURCC_DXT1 => Some(Self::Bc1),
            FOURCC_DXT3 => Some(Self::Bc2),
            FOURCC_DXT5 => Some(Self::Bc3),
            _ => None,
        }
    }

    /// Bytes per 4x4 pixel block.
    pub fn block_size(self) -> u32 {
        match self {
            Self::Bc1 => 8,
            Self::Bc2 | Self::Bc3 => 16,
        }
    }
}

/// A decoded block-compressed texture: the validated header fields plus the
/// verbatim payload holding every mip level back to back.
///
/// Per-level byte ranges are never stored; they are recomputed from the
/// block-size formula on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressedTexture {
    width: u32,
    height: u32,
    mip_level_count: u32,
    format: CompressedFormat,
    data: Vec<u8>,
}

impl CompressedTexture {
    pub fn from_memory(data: &[u8]) -> Result<Self, DecodeError> {
        if !data.starts_with(MAGIC) {
            return Err(DecodeError::Format(
                "invalid block-compressed texture signature".into(),
            ));
        }
        if data.len() < HEADER_LEN {
            return Err(DecodeError::UnexpectedEof { offset: data.len() });
        }

        let height = LittleEndian::read_u32(&data[OFFSET_HEIGHT..]);
        let width = LittleEndian::read_u32(&data[OFFSET_WIDTH..]);
        // Linear size of the top level; level sizes are always recomputed.
        let _linear_size = LittleEndian::read_u32(&data[OFFSET_LINEAR_SIZE..]);
        let declared_mips = LittleEndian::read_u32(&data[OFFSET_MIP_COUNT..]);
        let fourcc = LittleEndian::read_u32(&data[OFFSET_FOURCC..]);

        if width == 0 || height == 0 {
            return Err(DecodeError::Dimension("empty image".into()));
        }

        let format = CompressedFormat::from_fourcc(fourcc).ok_or_else(|| {
            DecodeError::Format(format!("unrecognized compression tag {fourcc:#010x}"))
        })?;

        let mut mips = declared_mips.clamp(1, MAX_MIP_LEVELS);
        mips = reconcile_mip_count(width, mips, "width")?;
        mips = reconcile_mip_count(height, mips, "height")?;

        Ok(Self {
            width,
            height,
            mip_level_count: mips,
            format,
            data: data[HEADER_LEN..].to_vec(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    pub fn format(&self) -> CompressedFormat {
        self.format
    }

    /// Byte length of mip `level`, from the dimensions and block size.
    /// Levels past the point where both extents reach 1x1 are zero-sized.
    pub fn level_byte_size(&self, level: u32) -> u32 {
        let factor = 1u32.checked_shl(level).unwrap_or(u32::MAX);
        (self.width / factor + 3) / 4 * ((self.height / factor + 3) / 4) * self.format.block_size()
    }

    /// Borrow the payload bytes of mip `level`.
    pub fn level_data(&self, level: u32) -> Result<&[u8], DecodeError> {
        if level >= self.mip_level_count {
            return Err(DecodeError::Dimension(format!(
                "mip level {level} out of range (texture has {})",
                self.mip_level_count
            )));
        }

        let offset: usize = (0..level).map(|l| self.level_byte_size(l) as usize).sum();
        let len = self.level_byte_size(level) as usize;
        self.data.get(offset..offset + len).ok_or({
            DecodeError::UnexpectedEof {
                offset: HEADER_LEN + offset,
            }
        })
    }
}

/// Resolve a declared mip count against one image extent.
///
/// A declared count that would shrink the extent below 1x1 is only
/// recoverable when the extent is a power of two, in which case the maximum
/// valid chain length for that extent is used instead.
fn reconcile_mip_count(extent: u32, mips: u32, axis: &str) -> Result<u32, DecodeError> {
    if extent >= 1u32 << (mips - 1) {
        return Ok(mips);
    }
    if extent & (extent - 1) != 0 {
        return Err(DecodeError::Dimension(format!(
            "mip count mismatch on non-power-of-two {axis} {extent}"
        )));
    }
    Ok(extent.ilog2() + 1)
}
