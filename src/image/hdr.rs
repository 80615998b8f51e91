use crate::{error::DecodeError, reader::ByteReader};

pub(crate) const MAGIC: &[u8] = b"#?RADIANCE\n";

/// Start of an adaptive-RLE scanline. Old-RLE and flat scanlines begin with
/// anything else and are not supported.
const ADAPTIVE_RLE_MARKER: [u8; 2] = [0x02, 0x02];

/// RGBE exponent bias (128) plus mantissa width (8).
const RGBE_EXPONENT_BIAS: i32 = 136;

/// A decoded Radiance image: exactly one level of tightly packed RGB f32
/// samples, three per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct RadianceImage {
    width: u32,
    height: u32,
    exposure: f32,
    pixels: Vec<f32>,
}

struct Header {
    width: u32,
    height: u32,
    exposure: f32,
}

impl RadianceImage {
    pub fn from_memory(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(data);
        r.expect_magic(MAGIC, "radiance image")?;

        let header = parse_header(&mut r)?;
        if header.width == 0 || header.height == 0 {
            return Err(DecodeError::Dimension("empty image".into()));
        }

        let mut rgbe = vec![0u8; 4 * (header.width * header.height) as usize];
        for y in 0..header.height {
            decode_scanline(&mut r, &mut rgbe, header.width, y)?;
        }

        Ok(Self {
            width: header.width,
            height: header.height,
            exposure: header.exposure,
            pixels: convert_rgbe(&rgbe, header.exposure),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    /// Tightly packed RGB samples, three per pixel, row-major.
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }
}

/// Scan text header lines up to and including the resolution line.
fn parse_header(r: &mut ByteReader) -> Result<Header, DecodeError> {
    let mut exposure = 1.0f32;

    loop {
        match r.peek_u8()? {
            b'\n' => {
                r.read_u8()?;
            }
            b'#' => {
                read_line(r)?;
            }
            b'F' => {
                if !r.eat(b"FORMAT=") {
                    return Err(DecodeError::Format("malformed header line".into()));
                }
                if !r.eat(b"32-bit_rle_rgbe\n") && !r.eat(b"32-bit_rle_xyze\n") {
                    return Err(DecodeError::Format(
                        "unrecognized radiance pixel format".into(),
                    ));
                }
            }
            b'E' => {
                if !r.eat(b"EXPOSURE=") {
                    return Err(DecodeError::Format("malformed header line".into()));
                }
                let text = read_line(r)?;
                exposure = text
                    .trim()
                    .parse()
                    .map_err(|_| DecodeError::Format("malformed EXPOSURE value".into()))?;
            }
            b'-' => {
                // The resolution line ends the header. Only the `-Y <h> +X <w>`
                // shape is accepted; the full resolution-string grammar is not.
                if !r.eat(b"-Y ") {
                    return Err(DecodeError::Format("unsupported resolution line".into()));
                }
                let height = parse_dimension(&read_until(r, |c| c == b'-' || c == b'+')?)?;
                if !r.eat(b"+X ") {
                    return Err(DecodeError::Format("unsupported resolution line".into()));
                }
                let width = parse_dimension(&read_line(r)?)?;

                return Ok(Header {
                    width,
                    height,
                    exposure,
                });
            }
            _ => return Err(DecodeError::Format("unrecognized header line".into())),
        }
    }
}

/// Consume up to and including the next newline, returning the line body.
fn read_line(r: &mut ByteReader) -> Result<String, DecodeError> {
    let text = read_until(r, |c| c == b'\n')?;
    r.read_u8()?;
    Ok(text)
}

/// Consume bytes until `stop` matches, leaving the matching byte unread.
fn read_until(r: &mut ByteReader, stop: impl Fn(u8) -> bool) -> Result<String, DecodeError> {
    let mut text = String::new();
    while !stop(r.peek_u8()?) {
        text.push(r.read_u8()? as char);
    }
    Ok(text)
}

fn parse_dimension(text: &str) -> Result<u32, DecodeError> {
    text.trim()
        .parse()
        .map_err(|_| DecodeError::Format(format!("malformed resolution value '{}'", text.trim())))
}

/// Decode one adaptive-RLE scanline into row `y` of the RGBE buffer.
///
/// The four component planes (R, G, B, shared exponent) are stored one after
/// the other, each run-length encoded independently.
fn decode_scanline(
    r: &mut ByteReader,
    rgbe: &mut [u8],
    width: u32,
    y: u32,
) -> Result<(), DecodeError> {
    if !r.eat(&ADAPTIVE_RLE_MARKER) {
        return Err(DecodeError::UnsupportedEncoding(
            "scanline is not adaptive RLE".into(),
        ));
    }

    let length = r.read_u16_be()? as usize;
    if length != width as usize {
        return Err(DecodeError::Format(format!(
            "scanline length {length} does not match image width {width}"
        )));
    }

    let row = 4 * (width * y) as usize;
    for plane in 0..4 {
        let mut i = 0;
        while i < length {
            let code = r.read_u8()?;
            if code > 128 {
                // Run: high bit set, low bits give the repeat count.
                let count = (code & 127) as usize;
                let value = r.read_u8()?;
                if i + count > length {
                    return Err(DecodeError::Format("RLE run overruns the scanline".into()));
                }
                for _ in 0..count {
                    rgbe[row + 4 * i + plane] = value;
                    i += 1;
                }
            } else {
                // Literal: the next `code` bytes verbatim.
                let count = code as usize;
                if count == 0 || i + count > length {
                    return Err(DecodeError::Format(
                        "RLE literals overrun the scanline".into(),
                    ));
                }
                for &value in r.take(count)? {
                    rgbe[row + 4 * i + plane] = value;
                    i += 1;
                }
            }
        }
    }

    Ok(())
}

/// Convert RGBE quadruples to floating-point RGB. A zero exponent byte means
/// a black pixel regardless of the mantissas.
fn convert_rgbe(rgbe: &[u8], exposure: f32) -> Vec<f32> {
    let mut pixels = vec![0.0f32; rgbe.len() / 4 * 3];
    for (i, quad) in rgbe.chunks_exact(4).enumerate() {
        let exponent = quad[3];
        if exponent != 0 {
            let scale = f32::exp2((exponent as i32 - RGBE_EXPONENT_BIAS) as f32);
            pixels[3 * i] = quad[0] as f32 * scale * exposure;
            pixels[3 * i + 1] = quad[1] as f32 * scale * exposure;
            pixels[3 * i + 2] = quad[2] as f32 * scale * exposure;
        }
    }
    pixels
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Append one scanline holding `pixels` (RGBE quadruples), with every
    /// plane emitted as literal runs.
    pub(crate) fn push_scanline(data: &mut Vec<u8>, pixels: &[[u8; 4]]) {
        data.extend_from_slice(&ADAPTIVE_RLE_MARKER);
        data.extend_from_slice(&(pixels.len() as u16).to_be_bytes());
        for plane in 0..4 {
            // Literal chunks are capped at 128 values.
            for chunk in pixels.chunks(128) {
                data.push(chunk.len() as u8);
                data.extend(chunk.iter().map(|p| p[plane]));
            }
        }
    }

    pub(crate) fn make_hdr(width: usize, height: usize, pixels: &[[u8; 4]]) -> Vec<u8> {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"FORMAT=32-bit_rle_rgbe\n");
        data.extend_from_slice(format!("\n-Y {height} +X {width}\n").as_bytes());
        for row in pixels.chunks(width) {
            push_scanline(&mut data, row);
        }
        data
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn decodes_literal_scanlines() {
        // 2x1, exponents 136 so the scale is exactly 1.0.
        let image = RadianceImage::from_memory(&make_hdr(
            2,
            1,
            &[[10, 20, 30, 136], [40, 50, 60, 136]],
        ))
        .unwrap();

        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 1);
        assert_eq!(
            image.pixels(),
            &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0][..]
        );
    }

    #[test]
    fn rgbe_conversion_applies_shared_exponent() {
        let image = RadianceImage::from_memory(&make_hdr(1, 1, &[[128, 64, 32, 137]])).unwrap();

        // scale = 2^(137 - 136) = 2
        assert_eq!(image.pixels(), &[256.0, 128.0, 64.0][..]);
    }

    #[test]
    fn zero_exponent_is_black() {
        let image = RadianceImage::from_memory(&make_hdr(1, 1, &[[255, 255, 255, 0]])).unwrap();
        assert_eq!(image.pixels(), &[0.0, 0.0, 0.0][..]);
    }

    #[test]
    fn exposure_scales_every_channel() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"FORMAT=32-bit_rle_rgbe\n");
        data.extend_from_slice(b"EXPOSURE=0.5\n");
        data.extend_from_slice(b"-Y 1 +X 1\n");
        push_scanline(&mut data, &[[100, 200, 50, 136]]);

        let image = RadianceImage::from_memory(&data).unwrap();
        assert!(approx(image.exposure(), 0.5));
        assert_eq!(image.pixels(), &[50.0, 100.0, 25.0][..]);
    }

    #[test]
    fn runs_repeat_a_single_byte() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"-Y 1 +X 4\n");
        data.extend_from_slice(&ADAPTIVE_RLE_MARKER);
        data.extend_from_slice(&4u16.to_be_bytes());
        // R/G/B planes: a run of four identical mantissas each.
        for value in [7u8, 8, 9] {
            data.extend_from_slice(&[128 + 4, value]);
        }
        // Exponent plane: literals.
        data.extend_from_slice(&[4, 136, 136, 136, 136]);

        let image = RadianceImage::from_memory(&data).unwrap();
        assert_eq!(image.pixels().len(), 12);
        for pixel in image.pixels().chunks_exact(3) {
            assert_eq!(pixel, &[7.0, 8.0, 9.0]);
        }
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"# made by a renderer\n\n\n");
        data.extend_from_slice(b"FORMAT=32-bit_rle_xyze\n");
        data.extend_from_slice(b"-Y 1 +X 1\n");
        push_scanline(&mut data, &[[1, 2, 3, 136]]);

        assert!(RadianceImage::from_memory(&data).is_ok());
    }

    #[test]
    fn bad_magic_is_a_format_error() {
        assert!(matches!(
            RadianceImage::from_memory(b"#?RGBE\n-Y 1 +X 1\n"),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn unknown_pixel_format_fails() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"FORMAT=32-bit_rle_abcd\n-Y 1 +X 1\n");
        assert!(matches!(
            RadianceImage::from_memory(&data),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn unsupported_resolution_shape_fails() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"+X 1 -Y 1\n");
        assert!(matches!(
            RadianceImage::from_memory(&data),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn zero_dimensions_are_a_dimension_error() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"-Y 0 +X 4\n");
        assert!(matches!(
            RadianceImage::from_memory(&data),
            Err(DecodeError::Dimension(_))
        ));
    }

    #[test]
    fn non_adaptive_scanline_is_unsupported() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"-Y 1 +X 1\n");
        // A flat (uncompressed) scanline starts with the pixel bytes.
        data.extend_from_slice(&[0x01, 0x01, 0x01, 0x88]);
        assert!(matches!(
            RadianceImage::from_memory(&data),
            Err(DecodeError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn scanline_length_must_match_width() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"-Y 1 +X 2\n");
        data.extend_from_slice(&ADAPTIVE_RLE_MARKER);
        data.extend_from_slice(&3u16.to_be_bytes());
        assert!(matches!(
            RadianceImage::from_memory(&data),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn overrunning_rle_run_fails() {
        let mut data = Vec::from(MAGIC);
        data.extend_from_slice(b"-Y 1 +X 2\n");
        data.extend_from_slice(&ADAPTIVE_RLE_MARKER);
        data.extend_from_slice(&2u16.to_be_bytes());
        // A run of five into a plane of two.
        data.extend_from_slice(&[128 + 5, 0xaa]);
        assert!(matches!(
            RadianceImage::from_memory(&data),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn truncated_scanline_data_fails() {
        let mut data = make_hdr(4, 2, &[[1, 2, 3, 136]; 8]);
        data.truncate(data.len() - 6);
        assert!(matches!(
            RadianceImage::from_memory(&data),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }
}
