use std::io::Read;

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use tracing::debug;

use super::reader::StreamReader;
use crate::error::DecodeError;

/// Number of leading asset bytes stored uncompressed.
pub const PLAIN_HEADER_BYTES: usize = 8;

/// Marker value meaning the 6-bit short length is saturated and the true
/// block length follows as 32 bits.
const EXTENDED_LENGTH_MARKER: u32 = 0x3f;

/// Bytes of the block body consumed by the id and reserved fields.
const BLOCK_FIXED_FIELDS: u32 = 6;

/// Inflate the asset body: the first 8 bytes are stored as-is, the
/// remainder is a single zlib stream.
///
/// An undecompressible tail is fatal; the bytes are never passed through
/// as if they were plain.
pub fn inflate_asset(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if raw.len() < PLAIN_HEADER_BYTES {
        return Err(DecodeError::TooShort(raw.len()));
    }
    let mut decoded = Vec::with_capacity(raw.len() * 2);
    decoded.extend_from_slice(&raw[..PLAIN_HEADER_BYTES]);

    let mut inflater = ZlibDecoder::new(&raw[PLAIN_HEADER_BYTES..]);
    inflater
        .read_to_end(&mut decoded)
        .map_err(DecodeError::Inflate)?;
    Ok(decoded)
}

/// Fixed file header. Parsed only to advance the cursor to the first
/// block; none of the values gate later parsing.
#[derive(Debug)]
pub struct FileHeader {
    pub magic: [u8; 3],
    pub version: u8,
    pub file_length: u32,
    pub frame_rate_decimal: u8,
    pub frame_rate_integer: u8,
    pub frame_count: u16,
}

pub fn parse_header(r: &mut StreamReader<'_>) -> Result<FileHeader, DecodeError> {
    let magic_bytes = r.read_bytes(3)?;
    let magic = [magic_bytes[0], magic_bytes[1], magic_bytes[2]];
    let version = r.read_u8()?;
    let file_length = r.read_u32_le()?;

    // The stage rectangle packs four fields of `rect_bits` bits each after
    // a 5-bit width prefix; only its total byte size matters here.
    let rect_bits = (r.read_u8()? >> 3) as usize;
    let rect_total_bytes = (5 + rect_bits * 4).div_ceil(8);
    r.skip(rect_total_bytes - 1)?;

    let frame_rate_decimal = r.read_u8()?;
    let frame_rate_integer = r.read_u8()?;
    let frame_count = r.read_u16_le()?;

    Ok(FileHeader {
        magic,
        version,
        file_length,
        frame_rate_decimal,
        frame_rate_integer,
        frame_count,
    })
}

/// One tagged record within the decoded stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub tag: u16,
    pub length: u32,
    pub id: u16,
    pub payload: Option<Bytes>,
}

/// Lazy, single-pass, non-restartable iteration over the blocks of a
/// decoded stream. Stops at the zero end-of-stream tag; a decode error is
/// yielded once and ends the iteration.
pub struct BlockIter<'a> {
    reader: StreamReader<'a>,
    done: bool,
}

impl<'a> BlockIter<'a> {
    pub fn new(reader: StreamReader<'a>) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    fn next_block(&mut self) -> Result<Option<Block>, DecodeError> {
        let word = self.reader.read_u16_le()?;
        let mut length = u32::from(word & 0x3f);
        if length == EXTENDED_LENGTH_MARKER {
            length = self.reader.read_u32_le()?;
        }
        let tag = word >> 6;
        if tag == 0 {
            return Ok(None);
        }

        let id = self.reader.read_u16_le()?;
        self.reader.skip(4)?; // reserved
        let payload = if length > BLOCK_FIXED_FIELDS {
            let n = (length - BLOCK_FIXED_FIELDS) as usize;
            Some(Bytes::copy_from_slice(self.reader.read_bytes(n)?))
        } else {
            None
        };

        Ok(Some(Block {
            tag,
            length,
            id,
            payload,
        }))
    }
}

impl Iterator for BlockIter<'_> {
    type Item = Result<Block, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode `raw` and return the payload of the first block matching
/// (`tag`, `id`), or `None` when the stream ends without one.
pub fn extract_block(raw: &[u8], tag: u16, id: u16) -> Result<Option<Bytes>, DecodeError> {
    let decoded = inflate_asset(raw)?;
    let mut reader = StreamReader::new(&decoded);
    parse_header(&mut reader)?;

    for block in BlockIter::new(reader) {
        let block = block?;
        if block.tag == tag && block.id == id {
            debug!(tag, id, len = block.length, "target block found");
            return Ok(block.payload);
        }
    }

    debug!(tag, id, "stream exhausted without target block");
    Ok(None)
}
