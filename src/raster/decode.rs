//! Storage decoding of TIFF tiles: decompression and predictor reversal.

use std::io::Read;

use crate::format::tiff::{ByteOrder, Compression, Predictor};

/// Decompress one stored tile.
///
/// `expected` is only a capacity hint; the caller checks the final length.
pub fn decompress(
    compression: Compression,
    data: &[u8],
    expected: usize,
) -> Result<Vec<u8>, String> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Lzw => {
            let mut decoder =
                weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
            decoder
                .decode(data)
                .map_err(|e| format!("LZW decode failure: {}", e))
        }
        Compression::Deflate | Compression::AdobeDeflate => {
            let mut decoder = flate2::read::ZlibDecoder::new(data);
            let mut out = Vec::with_capacity(expected);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| format!("Deflate decode failure: {}", e))?;
            Ok(out)
        }
        other => Err(format!("{} tiles cannot be decoded", other.name())),
    }
}

/// Reinterpret decoded bytes as signed 16-bit samples in file byte order.
pub fn samples_from_bytes(bytes: &[u8], byte_order: ByteOrder) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| byte_order.read_i16(pair))
        .collect()
}

/// Undo the TIFF predictor in place. Rows are `width` samples long.
pub fn undo_predictor(samples: &mut [i16], width: usize, predictor: Predictor) {
    if predictor != Predictor::Horizontal || width == 0 {
        return;
    }
    for row in samples.chunks_exact_mut(width) {
        for x in 1..row.len() {
            row[x] = row[x].wrapping_add(row[x - 1]);
        }
    }
}
