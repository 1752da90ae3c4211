//! Reading tag values that may live outside the IFD.
//!
//! Small values sit inline in the entry's value field, larger ones (the
//! TileOffsets/TileByteCounts arrays, the GDAL_NODATA string) are stored
//! elsewhere in the file. Each array is fetched with a single range read.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::FieldType;

/// Reads tag values from a TIFF file, honouring its byte order.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Raw bytes of an entry's value, inline or fetched from its offset.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry.value_byte_size()?;

        if entry.is_inline {
            return Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ));
        }

        let offset = entry.value_offset(self.header.byte_order);
        Ok(self.reader.read_exact_at(offset, size as usize).await?)
    }

    /// A single unsigned integer value, widened to u64.
    pub async fn read_u64(&self, entry: &IfdEntry) -> Result<u64, TiffError> {
        if let Some(value) = entry.inline_u64(self.header.byte_order) {
            return Ok(value);
        }
        if entry.count != 1 {
            return Err(TiffError::InvalidTagValue {
                tag: "scalar",
                message: format!("expected count 1, got {}", entry.count),
            });
        }
        let mut values = self.read_u64_array(entry).await?;
        values.pop().ok_or(TiffError::InvalidTagValue {
            tag: "scalar",
            message: "empty value".to_string(),
        })
    }

    /// An array of unsigned integers (Short, Long or Long8), widened to u64.
    pub async fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry).await?;
        parse_u64_array(&bytes, entry.count as usize, field_type, self.byte_order()).ok_or_else(
            || TiffError::InvalidTagValue {
                tag: "array",
                message: format!("expected Short, Long or Long8, got {:?}", field_type),
            },
        )
    }

    /// A NUL-terminated ASCII value with surrounding whitespace removed.
    pub async fn read_string(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        match entry.field_type {
            Some(FieldType::Ascii) => {}
            Some(other) => {
                return Err(TiffError::InvalidTagValue {
                    tag: "string",
                    message: format!("expected Ascii, got {:?}", other),
                })
            }
            None => return Err(TiffError::UnknownFieldType(entry.field_type_raw)),
        }

        let bytes = self.read_bytes(entry).await?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).trim().to_string())
    }
}

/// Decode `count` integers of `field_type` from `bytes`.
///
/// Returns `None` for non-integer field types. The caller guarantees
/// `bytes` holds `count` values.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Option<Vec<u64>> {
    let width = match field_type {
        FieldType::Short | FieldType::Long | FieldType::Long8 => field_type.size_in_bytes(),
        _ => return None,
    };

    let values = bytes
        .chunks_exact(width)
        .take(count)
        .map(|chunk| match field_type {
            FieldType::Short => byte_order.read_u16(chunk) as u64,
            FieldType::Long => byte_order.read_u32(chunk) as u64,
            _ => byte_order.read_u64(chunk),
        })
        .collect();

    Some(values)
}
