//! Binary codec for full-grid images.
//!
//! Layout:
//!
//! ```text
//! ┌──────────┬────────────┬─────────────┬──────────────────────────┐
//! │ GRDIMG01 │ header len │ JSON header │ width*height f32 LE      │
//! │ 8 bytes  │ u32 LE     │             │                          │
//! └──────────┴────────────┴─────────────┴──────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::image::Image;

use super::Codec;

const MAGIC: &[u8; 8] = b"GRDIMG01";

#[derive(Debug, Serialize, Deserialize)]
struct RasterHeader {
    width: usize,
    height: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
}

/// Raster image codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCodec;

impl RasterCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for RasterCodec {
    type Item = Image;

    fn extension(&self) -> &'static str {
        "img"
    }

    fn serialize(&self, image: &Image, sink: &mut dyn Write, _key_column: &str) -> Result<()> {
        if image.width.checked_mul(image.height) != Some(image.data.len()) {
            return Err(DatasetError::codec(format!(
                "image {}x{} holds {} values",
                image.width,
                image.height,
                image.data.len()
            )));
        }

        let header = serde_json::to_vec(&RasterHeader {
            width: image.width,
            height: image.height,
            timestamp: image.timestamp,
            attributes: image.attributes.clone(),
        })?;
        let header_len = u32::try_from(header.len())
            .map_err(|_| DatasetError::codec("raster header too large"))?;

        sink.write_all(MAGIC)?;
        sink.write_all(&header_len.to_le_bytes())?;
        sink.write_all(&header)?;

        let mut payload = Vec::with_capacity(image.data.len() * 4);
        for value in &image.data {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        sink.write_all(&payload)?;
        Ok(())
    }

    fn deserialize(&self, source: &mut dyn Read) -> Result<Image> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;

        // An empty resource holds no image yet.
        if bytes.is_empty() {
            return Ok(Image::default());
        }

        if bytes.len() < 12 || &bytes[..8] != MAGIC {
            return Err(DatasetError::codec("not a raster image (bad magic)"));
        }
        let header_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let payload_start = 12 + header_len;
        if bytes.len() < payload_start {
            return Err(DatasetError::codec("truncated raster header"));
        }

        let header: RasterHeader = serde_json::from_slice(&bytes[12..payload_start])?;
        let expected = header
            .width
            .checked_mul(header.height)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                DatasetError::codec(format!(
                    "raster dimensions {}x{} overflow",
                    header.width, header.height
                ))
            })?;
        let payload = &bytes[payload_start..];
        if payload.len() != expected {
            return Err(DatasetError::codec(format!(
                "raster payload has {} bytes, expected {}",
                payload.len(),
                expected
            )));
        }

        let data = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let mut image = Image::new(data, header.width, header.height)?;
        image.timestamp = header.timestamp;
        image.attributes = header.attributes;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Image {
        Image::new(vec![1.5, f32::NAN, -3.0, 4.25, 0.0, 7.0], 3, 2)
            .unwrap()
            .with_timestamp(Utc.with_ymd_and_hms(2016, 5, 1, 12, 0, 0).unwrap())
            .with_attribute("units", "K")
    }

    fn encode(image: &Image) -> Vec<u8> {
        let mut out = Vec::new();
        RasterCodec.serialize(image, &mut out, "unused").unwrap();
        out
    }

    #[test]
    fn test_header_and_payload_preserved() {
        let image = sample();
        let decoded = RasterCodec.deserialize(&mut encode(&image).as_slice()).unwrap();

        assert_eq!(decoded.width, 3);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.timestamp, image.timestamp);
        assert_eq!(decoded.attributes.get("units").map(String::as_str), Some("K"));
        assert!(decoded.data[1].is_nan());
        assert_eq!(decoded.get(0, 1), Some(4.25));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut bytes = encode(&sample());
        bytes.pop();
        assert!(matches!(
            RasterCodec.deserialize(&mut bytes.as_slice()),
            Err(DatasetError::Codec(_))
        ));
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        let header = br#"{"width":4611686018427387904,"height":8}"#;
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        bytes.extend_from_slice(header);
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            RasterCodec.deserialize(&mut bytes.as_slice()),
            Err(DatasetError::Codec(_))
        ));

        let image = Image {
            width: usize::MAX,
            height: 2,
            ..Image::default()
        };
        assert!(RasterCodec.serialize(&image, &mut Vec::new(), "unused").is_err());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let bytes = b"NOTANIMAGE\0\0\0\0".to_vec();
        assert!(RasterCodec.deserialize(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn test_empty_resource_is_empty_image() {
        let image = RasterCodec.deserialize(&mut &b""[..]).unwrap();
        assert!(image.is_empty());
    }
}
