use byteorder::ByteOrder;
use byteorder::LittleEndian;
use num_enum::TryFromPrimitive;

use crate::ParseError;

///Chunk type constants shared by the XML and resource-table formats.
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive)]
pub(crate) enum ResourceType {
    NullType = 0x0000,
    StringPool = 0x0001,
    Table = 0x0002,
    Xml = 0x0003,
    XmlStartNameSpace = 0x0100,
    XmlEndNameSpace = 0x0101,
    XmlStartElement = 0x0102,
    XmlEndElement = 0x0103,
    XmlCdata = 0x0104,
    XmlLastChunk = 0x017f,
    XmlResourceMap = 0x0180,
    TablePackage = 0x0200,
    TableType = 0x0201,
    TableTypeSpec = 0x0202,
    TableLibrary = 0x0203,
    TableOverlayable = 0x0204,
    TableOverlayablePolicy = 0x0205,
    TableStagedAlias = 0x0206,
}

pub(crate) const CHUNK_HEADER_SIZE: usize = 8;

///A single length-delimited chunk borrowed from the input buffer.
///
///`raw` spans the whole chunk, `header` the bytes between the fixed
///chunk header and `header_size`, `body` everything after `header_size`.
///Sub-chunks are parsed by running a new [ChunkReader] over `body`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Chunk<'a> {
    pub(crate) raw_type: u16,
    pub(crate) header_size: u16,
    pub(crate) size: u32,
    data: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub(crate) fn typ(&self) -> Option<ResourceType> {
        ResourceType::try_from(self.raw_type).ok()
    }

    pub(crate) fn raw(&self) -> &'a [u8] {
        self.data
    }

    pub(crate) fn header(&self) -> &'a [u8] {
        &self.data[CHUNK_HEADER_SIZE..usize::from(self.header_size)]
    }

    pub(crate) fn body(&self) -> &'a [u8] {
        &self.data[usize::from(self.header_size)..]
    }
}

///Walks a byte buffer chunk by chunk, validating every header against the
///remaining input before handing out a byte range.
pub(crate) struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    ///Returns the next chunk, `None` at end of buffer.
    pub(crate) fn next_chunk(&mut self) -> Result<Option<Chunk<'a>>, ParseError> {
        let remaining = self.data.len() - self.pos;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < CHUNK_HEADER_SIZE {
            return Err(ParseError::TruncatedInput);
        }

        let raw_type = LittleEndian::read_u16(&self.data[self.pos..]);
        let header_size = LittleEndian::read_u16(&self.data[self.pos + 2..]);
        let size = LittleEndian::read_u32(&self.data[self.pos + 4..]);

        if usize::from(header_size) < CHUNK_HEADER_SIZE
            || u32::from(header_size) > size
            || size as usize > remaining
        {
            return Err(ParseError::InvalidChunkSize { header_size, size });
        }

        let chunk = Chunk {
            raw_type,
            header_size,
            size,
            data: &self.data[self.pos..self.pos + size as usize],
        };
        self.pos += size as usize;

        Ok(Some(chunk))
    }
}

///Little-endian cursor over a byte slice. Every overrun surfaces as
///[ParseError::TruncatedInput] instead of a panic.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ParseError> {
        let b = *self.data.get(self.pos).ok_or(ParseError::TruncatedInput)?;
        self.pos += 1;
        Ok(b)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ParseError> {
        let buf = self.read_bytes(2)?;
        Ok(LittleEndian::read_u16(buf))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ParseError> {
        let buf = self.read_bytes(4)?;
        Ok(LittleEndian::read_u32(buf))
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let end = self.pos.checked_add(n).ok_or(ParseError::TruncatedInput)?;
        let buf = self
            .data
            .get(self.pos..end)
            .ok_or(ParseError::TruncatedInput)?;
        self.pos = end;
        Ok(buf)
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), ParseError> {
        self.read_bytes(n).map(|_| ())
    }
}
