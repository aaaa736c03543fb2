use std::fmt;

/// Decoded RGBA raster. `pixels.len()` is `width * height * 4` for every
/// skin produced by the legacy decoder; the explicit-dimension payload path
/// trusts the client's declared size instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSkin {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    UnknownLegacyFormat { length: usize },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::UnknownLegacyFormat { length } => {
                write!(f, "unknown legacy raster size: {} bytes", length)
            }
        }
    }
}

/// Recovers the dimensions of a legacy raster from its byte count alone.
/// Older clients send appearance images without width/height fields; the
/// four known fixed sizes disambiguate the shape.
pub fn decode_legacy(pixels: Vec<u8>) -> Result<RawSkin, RasterError> {
    let (width, height) = match pixels.len() {
        8_192 => (64, 32),
        16_384 => (64, 64),
        32_768 => (64, 128),
        65_536 => (128, 128),
        length => return Err(RasterError::UnknownLegacyFormat { length }),
    };
    Ok(RawSkin {
        width,
        height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn decodes_all_known_sizes() {
        for (len, width, height) in [
            (8_192, 64, 32),
            (16_384, 64, 64),
            (32_768, 64, 128),
            (65_536, 128, 128),
        ] {
            let pixels = patterned(len);
            let skin = decode_legacy(pixels.clone()).expect("known size");
            assert_eq!(skin.width, width);
            assert_eq!(skin.height, height);
            assert_eq!(skin.pixels, pixels);
            assert_eq!(skin.pixels.len(), (skin.width * skin.height * 4) as usize);
        }
    }

    #[test]
    fn rejects_unknown_sizes() {
        for len in [0, 1, 8_191, 8_193, 16_383, 40_000, 65_537] {
            match decode_legacy(vec![0; len]) {
                Err(RasterError::UnknownLegacyFormat { length }) => assert_eq!(length, len),
                other => panic!("expected UnknownLegacyFormat, got {:?}", other),
            }
        }
    }
}
