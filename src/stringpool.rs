use byteorder::ByteOrder;
use byteorder::LittleEndian;

use crate::chunk::{Chunk, Reader};
use crate::ParseError;

const FLAG_SORTED: u32 = 1 << 0;
const FLAG_UTF8: u32 = 1 << 8;

///An indexed pool of strings shared by the XML and resource-table formats.
///
///All entries are decoded once at construction; lookups afterwards are O(1)
///and borrow from the pool.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: Vec<String>,
    flags: u32,
}

impl StringPool {
    pub(crate) fn from_chunk(chunk: &Chunk) -> Result<Self, ParseError> {
        let mut header = Reader::new(chunk.header());
        let string_count = header.read_u32()? as usize;
        let style_count = header.read_u32()? as usize;
        let flags = header.read_u32()?;
        let strings_start = header.read_u32()? as usize;
        let styles_start = header.read_u32()? as usize;

        // The offset arrays follow the header immediately.
        if string_count.saturating_add(style_count).saturating_mul(4) > chunk.body().len() {
            return Err(ParseError::TruncatedInput);
        }
        let mut offsets = Reader::new(chunk.body());

        let raw = chunk.raw();
        let string_data = raw.get(strings_start..).ok_or(ParseError::TruncatedInput)?;

        let is_utf8 = flags & FLAG_UTF8 != 0;
        let mut strings = Vec::with_capacity(string_count);
        for _ in 0..string_count {
            let offset = offsets.read_u32()? as usize;
            let s = if is_utf8 {
                parse_utf8_string(string_data, offset)?
            } else {
                parse_utf16_string(string_data, offset)?
            };
            strings.push(s);
        }

        // Styled-text spans are walked for accounting only; the styling
        // itself is discarded and get() exposes plain text.
        for _ in 0..style_count {
            let offset = offsets.read_u32()? as usize;
            skip_style_spans(raw, styles_start.saturating_add(offset));
        }

        Ok(Self { strings, flags })
    }

    ///Returns the string at `index`.
    pub fn get(&self, index: usize) -> Result<&str, ParseError> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or(ParseError::StringIndexOutOfRange(index as u32))
    }

    ///Index lookup for the XML chunks, where `0xFFFF_FFFF` means
    ///"no string".
    pub(crate) fn get_optional(&self, index: u32) -> Option<&str> {
        if index == u32::MAX {
            return None;
        }
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn is_utf8(&self) -> bool {
        self.flags & FLAG_UTF8 != 0
    }

    pub fn is_sorted(&self) -> bool {
        self.flags & FLAG_SORTED != 0
    }
}

///Reads a UTF-8 length prefix: one byte, or two when the high bit is set.
fn read_utf8_len(data: &[u8], pos: &mut usize) -> Result<usize, ParseError> {
    let b0 = usize::from(*data.get(*pos).ok_or(ParseError::TruncatedInput)?);
    *pos += 1;
    if b0 & 0x80 == 0 {
        return Ok(b0);
    }
    let b1 = usize::from(*data.get(*pos).ok_or(ParseError::TruncatedInput)?);
    *pos += 1;
    Ok(((b0 & 0x7f) << 8) | b1)
}

fn read_u16_at(data: &[u8], pos: &mut usize) -> Result<u16, ParseError> {
    let buf = data.get(*pos..*pos + 2).ok_or(ParseError::TruncatedInput)?;
    *pos += 2;
    Ok(LittleEndian::read_u16(buf))
}

fn parse_utf8_string(string_data: &[u8], offset: usize) -> Result<String, ParseError> {
    let mut pos = offset;

    // A UTF-8 entry carries both a character count and a byte count; only
    // the byte count drives the decode.
    let _char_count = read_utf8_len(string_data, &mut pos)?;
    let byte_len = read_utf8_len(string_data, &mut pos)?;

    let end = pos
        .checked_add(byte_len)
        .filter(|end| *end <= string_data.len())
        .ok_or(ParseError::TruncatedInput)?;

    String::from_utf8(string_data[pos..end].to_vec()).map_err(ParseError::Utf8StringParseError)
}

fn parse_utf16_string(string_data: &[u8], offset: usize) -> Result<String, ParseError> {
    let mut pos = offset;

    let w0 = usize::from(read_u16_at(string_data, &mut pos)?);
    let len = if w0 & 0x8000 == 0 {
        w0
    } else {
        let w1 = usize::from(read_u16_at(string_data, &mut pos)?);
        ((w0 & 0x7fff) << 16) | w1
    };

    let mut units = Vec::with_capacity(len.min(string_data.len() / 2));
    for _ in 0..len {
        units.push(read_u16_at(string_data, &mut pos)?);
    }

    // Lone surrogates are replaced rather than failing the pool.
    Ok(String::from_utf16_lossy(&units))
}

///Walks one span array (name, first, last triples closed by 0xFFFFFFFF).
///Span data in the wild is occasionally short; that is tolerated.
fn skip_style_spans(raw: &[u8], mut pos: usize) {
    loop {
        let Some(buf) = raw.get(pos..pos + 4) else {
            log::warn!("style span array runs past its chunk");
            return;
        };
        if LittleEndian::read_u32(buf) == u32::MAX {
            return;
        }
        pos += 12;
    }
}
