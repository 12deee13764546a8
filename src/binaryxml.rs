use crate::chunk::{Chunk, ChunkReader, Reader, ResourceType};
use crate::resource_value::ResValue;
use crate::stringpool::StringPool;
use crate::ParseError;

///A compiled XML document split into its raw event stream plus the pool
///and resource map the events index into.
pub(crate) struct BinaryXmlDocument {
    pub(crate) events: Vec<XmlEvent>,
    pub(crate) string_pool: StringPool,
    pub(crate) resource_map: Vec<u32>,
}

impl BinaryXmlDocument {
    pub(crate) fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = ChunkReader::new(data);
        let chunk = reader.next_chunk()?.ok_or(ParseError::TruncatedInput)?;
        if chunk.typ() != Some(ResourceType::Xml) {
            return Err(ParseError::InvalidFile);
        }

        let mut events = Vec::new();
        let mut string_pool = None;
        let mut resource_map = Vec::new();

        let mut inner = ChunkReader::new(chunk.body());
        while let Some(c) = inner.next_chunk()? {
            match c.typ() {
                Some(ResourceType::StringPool) => {
                    string_pool = Some(StringPool::from_chunk(&c)?);
                }
                Some(ResourceType::XmlResourceMap) => {
                    resource_map = parse_resource_map(&c)?;
                }
                Some(ResourceType::XmlStartNameSpace) => {
                    events.push(XmlEvent::StartNameSpace(XmlStartNameSpace::parse(&c)?));
                }
                Some(ResourceType::XmlEndNameSpace) => {
                    events.push(XmlEvent::EndNameSpace(XmlEndNameSpace::parse(&c)?));
                }
                Some(ResourceType::XmlStartElement) => {
                    events.push(XmlEvent::StartElement(XmlStartElement::parse(&c)?));
                }
                Some(ResourceType::XmlEndElement) => {
                    events.push(XmlEvent::EndElement(XmlEndElement::parse(&c)?));
                }
                Some(ResourceType::XmlCdata) => {
                    events.push(XmlEvent::Cdata(XmlCdata::parse(&c)?));
                }
                _ => log::debug!("skipping xml chunk type 0x{:04x}", c.raw_type),
            }
        }

        Ok(Self {
            events,
            string_pool: string_pool.ok_or(ParseError::MissingStringPool)?,
            resource_map,
        })
    }
}

#[derive(Debug)]
pub(crate) enum XmlEvent {
    StartNameSpace(XmlStartNameSpace),
    EndNameSpace(XmlEndNameSpace),
    StartElement(XmlStartElement),
    EndElement(XmlEndElement),
    Cdata(XmlCdata),
}

///The line/comment prefix every XML node chunk carries in its header.
#[derive(Debug)]
pub(crate) struct XmlNodeHeader {
    pub(crate) line_no: u32,
    pub(crate) comment: u32,
}

impl XmlNodeHeader {
    fn parse(chunk: &Chunk) -> Result<Self, ParseError> {
        let mut r = Reader::new(chunk.header());
        let line_no = r.read_u32()?;
        let comment = r.read_u32()?;

        Ok(Self { line_no, comment })
    }
}

///The resource map pairs string-pool indices with attribute resource ids.
fn parse_resource_map(chunk: &Chunk) -> Result<Vec<u32>, ParseError> {
    let mut r = Reader::new(chunk.body());
    let mut ids = Vec::with_capacity(r.remaining() / 4);
    while r.remaining() >= 4 {
        ids.push(r.read_u32()?);
    }

    Ok(ids)
}

#[derive(Debug)]
pub(crate) struct XmlStartNameSpace {
    pub(crate) header: XmlNodeHeader,
    pub(crate) prefix: u32,
    pub(crate) uri: u32,
}

impl XmlStartNameSpace {
    fn parse(chunk: &Chunk) -> Result<Self, ParseError> {
        let header = XmlNodeHeader::parse(chunk)?;
        let mut r = Reader::new(chunk.body());
        let prefix = r.read_u32()?;
        let uri = r.read_u32()?;

        Ok(Self {
            header,
            prefix,
            uri,
        })
    }
}

#[derive(Debug)]
pub(crate) struct XmlEndNameSpace {
    pub(crate) header: XmlNodeHeader,
    pub(crate) prefix: u32,
    pub(crate) uri: u32,
}

impl XmlEndNameSpace {
    fn parse(chunk: &Chunk) -> Result<Self, ParseError> {
        let header = XmlNodeHeader::parse(chunk)?;
        let mut r = Reader::new(chunk.body());
        let prefix = r.read_u32()?;
        let uri = r.read_u32()?;

        Ok(Self {
            header,
            prefix,
            uri,
        })
    }
}

#[derive(Debug)]
pub(crate) struct XmlAttribute {
    pub(crate) ns: u32,
    pub(crate) name: u32,
    pub(crate) typed_value: ResValue,
}

#[derive(Debug)]
pub(crate) struct XmlStartElement {
    pub(crate) header: XmlNodeHeader,
    pub(crate) ns: u32,
    pub(crate) name: u32,
    pub(crate) attributes: Vec<XmlAttribute>,
}

impl XmlStartElement {
    fn parse(chunk: &Chunk) -> Result<Self, ParseError> {
        let header = XmlNodeHeader::parse(chunk)?;
        let body = chunk.body();

        let mut r = Reader::new(body);
        let ns = r.read_u32()?;
        let name = r.read_u32()?;
        let attribute_start = usize::from(r.read_u16()?);
        let attribute_size = usize::from(r.read_u16()?);
        let attribute_count = usize::from(r.read_u16()?);
        let _id_index = r.read_u16()?;
        let _class_index = r.read_u16()?;
        let _style_index = r.read_u16()?;

        if attribute_count > 0 && attribute_size < 20 {
            return Err(ParseError::InvalidFile);
        }

        // Attributes sit at the declared offset and stride rather than
        // packed behind the fixed fields.
        let mut attributes = Vec::with_capacity(attribute_count);
        for i in 0..attribute_count {
            let offset = attribute_start + i * attribute_size;
            let slice = body
                .get(offset..offset + attribute_size)
                .ok_or(ParseError::TruncatedInput)?;

            let mut ar = Reader::new(slice);
            let ns = ar.read_u32()?;
            let name = ar.read_u32()?;
            // The raw string value duplicates typed_value; drop it.
            let _raw_value = ar.read_u32()?;
            let typed_value = ResValue::read(&mut ar)?;

            attributes.push(XmlAttribute {
                ns,
                name,
                typed_value,
            });
        }

        Ok(Self {
            header,
            ns,
            name,
            attributes,
        })
    }
}

#[derive(Debug)]
pub(crate) struct XmlEndElement {
    pub(crate) header: XmlNodeHeader,
    pub(crate) ns: u32,
    pub(crate) name: u32,
}

impl XmlEndElement {
    fn parse(chunk: &Chunk) -> Result<Self, ParseError> {
        let header = XmlNodeHeader::parse(chunk)?;
        let mut r = Reader::new(chunk.body());
        let ns = r.read_u32()?;
        let name = r.read_u32()?;

        Ok(Self { header, ns, name })
    }
}

#[derive(Debug)]
pub(crate) struct XmlCdata {
    pub(crate) header: XmlNodeHeader,
    pub(crate) data: u32,
    pub(crate) typed_data: ResValue,
}

impl XmlCdata {
    fn parse(chunk: &Chunk) -> Result<Self, ParseError> {
        let header = XmlNodeHeader::parse(chunk)?;
        let mut r = Reader::new(chunk.body());
        let data = r.read_u32()?;
        let typed_data = ResValue::read(&mut r)?;

        Ok(Self {
            header,
            data,
            typed_data,
        })
    }
}
