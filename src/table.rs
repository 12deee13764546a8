use indexmap::IndexMap;

use crate::chunk::{Chunk, ChunkReader, Reader, ResourceType};
use crate::config::ResTableConfig;
use crate::resource_value::ResValue;
use crate::stringpool::StringPool;
use crate::ParseError;

const ENTRY_FLAG_COMPLEX: u16 = 0x0001;
const ENTRY_FLAG_COMPACT: u16 = 0x0008;

const TYPE_FLAG_SPARSE: u8 = 0x01;
const TYPE_FLAG_OFFSET16: u8 = 0x02;

const NO_ENTRY: u32 = 0xffff_ffff;
const NO_ENTRY_OFFSET16: u16 = 0xffff;

///The decoded resource table: one global string pool plus one or more
///packages, immutable once built.
#[derive(Debug)]
pub struct ResourceTable {
    string_pool: StringPool,
    packages: IndexMap<u8, Package>,
}

///One package inside a resource table: its name, its own type/key string
///pools, and the type groups holding the per-configuration entry blocks.
#[derive(Debug)]
pub struct Package {
    id: u8,
    name: String,
    type_strings: StringPool,
    key_strings: StringPool,
    types: IndexMap<u8, TypeGroup>,
}

///All blocks of a single type id, plus the spec chunk's per-entry axis
///masks when one was present. The masks are a hint only; resolution always
///runs the explicit configuration match.
#[derive(Debug, Default)]
pub(crate) struct TypeGroup {
    pub(crate) spec: Option<TypeSpec>,
    pub(crate) blocks: Vec<TypeBlock>,
}

#[derive(Debug)]
pub(crate) struct TypeSpec {
    pub(crate) config_masks: Vec<u32>,
}

///One (type, configuration) block: a config record plus a sparse entry
///array. `None` means the entry has no value in this configuration.
#[derive(Debug)]
pub(crate) struct TypeBlock {
    pub(crate) config: ResTableConfig,
    pub(crate) entries: Vec<Option<Entry>>,
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) key: u32,
    pub(crate) value: EntryValue,
}

#[derive(Debug)]
pub(crate) enum EntryValue {
    Simple(ResValue),
    Complex {
        parent: u32,
        map: IndexMap<u32, ResValue>,
    },
}

impl ResourceTable {
    pub(crate) fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = ChunkReader::new(data);
        let chunk = reader.next_chunk()?.ok_or(ParseError::TruncatedInput)?;
        if chunk.typ() != Some(ResourceType::Table) {
            return Err(ParseError::InvalidFile);
        }

        let mut string_pool = None;
        let mut packages: IndexMap<u8, Package> = IndexMap::new();

        let mut inner = ChunkReader::new(chunk.body());
        while let Some(c) = inner.next_chunk()? {
            match c.typ() {
                Some(ResourceType::StringPool) => {
                    if string_pool.is_none() {
                        string_pool = Some(StringPool::from_chunk(&c)?);
                    } else {
                        log::debug!("skipping extra string pool in table");
                    }
                }
                Some(ResourceType::TablePackage) => {
                    // The global pool must precede every package.
                    if string_pool.is_none() {
                        return Err(ParseError::MissingStringPool);
                    }
                    let package = Package::from_chunk(&c)?;
                    if packages.contains_key(&package.id) {
                        return Err(ParseError::DuplicatePackageId(package.id));
                    }
                    packages.insert(package.id, package);
                }
                _ => log::debug!("skipping table chunk type 0x{:04x}", c.raw_type),
            }
        }

        Ok(Self {
            string_pool: string_pool.ok_or(ParseError::MissingStringPool)?,
            packages,
        })
    }

    ///The global string pool every string-typed value resolves through.
    pub fn string_pool(&self) -> &StringPool {
        &self.string_pool
    }

    pub fn package(&self, id: u8) -> Option<&Package> {
        self.packages.get(&id)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }
}

impl Package {
    fn from_chunk(chunk: &Chunk) -> Result<Self, ParseError> {
        let mut r = Reader::new(chunk.header());
        let id = r.read_u32()?;
        let name = decode_package_name(r.read_bytes(256)?);

        let mut type_strings = None;
        let mut key_strings = None;
        let mut types: IndexMap<u8, TypeGroup> = IndexMap::new();

        let mut sub = ChunkReader::new(chunk.body());
        while let Some(c) = sub.next_chunk()? {
            match c.typ() {
                Some(ResourceType::StringPool) => {
                    // The type-name pool comes first, the key-name pool second.
                    if type_strings.is_none() {
                        type_strings = Some(StringPool::from_chunk(&c)?);
                    } else if key_strings.is_none() {
                        key_strings = Some(StringPool::from_chunk(&c)?);
                    } else {
                        log::debug!("skipping extra string pool in package {}", id);
                    }
                }
                Some(ResourceType::TableTypeSpec) => {
                    let (type_id, spec) = parse_type_spec(&c)?;
                    types
                        .entry(type_id)
                        .or_insert_with(TypeGroup::default)
                        .spec = Some(spec);
                }
                Some(ResourceType::TableType) => {
                    let (type_id, block) = parse_type_block(&c)?;
                    types
                        .entry(type_id)
                        .or_insert_with(TypeGroup::default)
                        .blocks
                        .push(block);
                }
                _ => log::debug!(
                    "skipping package chunk type 0x{:04x} in package {}",
                    c.raw_type,
                    id
                ),
            }
        }

        Ok(Self {
            id: id as u8,
            name,
            type_strings: type_strings.ok_or(ParseError::MissingStringPool)?,
            key_strings: key_strings.ok_or(ParseError::MissingStringPool)?,
            types,
        })
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    ///Resolves a 1-based type id to its name, e.g. `"string"` or
    ///`"drawable"`.
    pub fn type_name(&self, type_id: u8) -> Option<&str> {
        let index = usize::from(type_id).checked_sub(1)?;
        self.type_strings.get(index).ok()
    }

    pub(crate) fn key_string(&self, index: u32) -> Result<&str, ParseError> {
        self.key_strings.get(index as usize)
    }

    pub(crate) fn type_group(&self, type_id: u8) -> Option<&TypeGroup> {
        self.types.get(&type_id)
    }
}

///The package name is a fixed 256-byte NUL-terminated UTF-16 field.
fn decode_package_name(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();

    String::from_utf16_lossy(&units)
}

fn parse_type_spec(chunk: &Chunk) -> Result<(u8, TypeSpec), ParseError> {
    let mut r = Reader::new(chunk.header());
    let id = r.read_u8()?;
    let _res0 = r.read_u8()?;
    let _types_count = r.read_u16()?;
    let entry_count = r.read_u32()? as usize;

    if entry_count.saturating_mul(4) > chunk.body().len() {
        return Err(ParseError::TruncatedInput);
    }

    let mut body = Reader::new(chunk.body());
    let mut config_masks = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        config_masks.push(body.read_u32()?);
    }

    Ok((id, TypeSpec { config_masks }))
}

fn parse_type_block(chunk: &Chunk) -> Result<(u8, TypeBlock), ParseError> {
    let mut r = Reader::new(chunk.header());
    let id = r.read_u8()?;
    let flags = r.read_u8()?;
    let _reserved = r.read_u16()?;
    let entry_count = r.read_u32()? as usize;
    let entries_start = r.read_u32()? as usize;
    let config = ResTableConfig::read(&mut r)?;

    let entry_data = chunk
        .raw()
        .get(entries_start..)
        .ok_or(ParseError::TruncatedInput)?;
    let mut offsets = Reader::new(chunk.body());

    let mut entries: Vec<Option<Entry>> = Vec::new();
    if flags & TYPE_FLAG_SPARSE != 0 {
        // Sparse blocks carry (entry id, offset/4) pairs for present
        // entries only; ids may exceed the pair count.
        if entry_count.saturating_mul(4) > chunk.body().len() {
            return Err(ParseError::TruncatedInput);
        }
        for _ in 0..entry_count {
            let index = usize::from(offsets.read_u16()?);
            let offset = usize::from(offsets.read_u16()?) * 4;
            if index >= entries.len() {
                entries.resize_with(index + 1, || None);
            }
            let data = entry_data.get(offset..).ok_or(ParseError::TruncatedInput)?;
            entries[index] = Some(parse_entry(data, index as u32)?);
        }
    } else {
        let offset16 = flags & TYPE_FLAG_OFFSET16 != 0;
        let unit = if offset16 { 2 } else { 4 };
        if entry_count.saturating_mul(unit) > chunk.body().len() {
            return Err(ParseError::TruncatedInput);
        }
        entries.reserve(entry_count);
        for index in 0..entry_count {
            let offset = if offset16 {
                match offsets.read_u16()? {
                    NO_ENTRY_OFFSET16 => NO_ENTRY,
                    v => u32::from(v) * 4,
                }
            } else {
                offsets.read_u32()?
            };
            if offset == NO_ENTRY {
                entries.push(None);
                continue;
            }
            let data = entry_data
                .get(offset as usize..)
                .ok_or(ParseError::TruncatedInput)?;
            entries.push(Some(parse_entry(data, index as u32)?));
        }
    }

    Ok((id, TypeBlock { config, entries }))
}

fn parse_entry(data: &[u8], index: u32) -> Result<Entry, ParseError> {
    let mut r = Reader::new(data);
    let size_or_key = r.read_u16()?;
    let flags = r.read_u16()?;

    if flags & ENTRY_FLAG_COMPACT != 0 {
        if flags & ENTRY_FLAG_COMPLEX != 0 {
            return Err(ParseError::MalformedEntry(index));
        }
        // Compact entries inline the data word; the type byte rides in the
        // upper half of the flags.
        let data_word = r.read_u32()?;
        return Ok(Entry {
            key: u32::from(size_or_key),
            value: EntryValue::Simple(ResValue::from_parts((flags >> 8) as u8, data_word)),
        });
    }

    let size = size_or_key;
    let key = r.read_u32()?;

    if flags & ENTRY_FLAG_COMPLEX != 0 {
        if size != 16 {
            return Err(ParseError::MalformedEntry(index));
        }
        let parent = r.read_u32()?;
        let count = r.read_u32()? as usize;
        if count.saturating_mul(12) > r.remaining() {
            return Err(ParseError::TruncatedInput);
        }
        let mut map = IndexMap::with_capacity(count);
        for _ in 0..count {
            let name = r.read_u32()?;
            let value = ResValue::read(&mut r)?;
            map.insert(name, value);
        }
        Ok(Entry {
            key,
            value: EntryValue::Complex { parent, map },
        })
    } else {
        if size != 8 {
            return Err(ParseError::MalformedEntry(index));
        }
        let value = ResValue::read(&mut r)?;
        if value.size < 8 {
            return Err(ParseError::MalformedEntry(index));
        }
        Ok(Entry {
            key,
            value: EntryValue::Simple(value),
        })
    }
}
