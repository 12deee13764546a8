//!Decoder for the compiled binary formats used by Android.
//!
//!This library parses the two binary formats embedded in an application
//!package: the compiled `AndroidManifest.xml` (AXML) and the compiled
//!resource table (`resources.arsc`). The XML side reconstructs a textual
//!document from the chunk stream; the table side answers resource-id
//!lookups for a requested device configuration, applying Android's
//!configuration best-match rules and following references between
//!resources.
//!
//!The caller hands both entry points a fully buffered, already
//!decompressed byte slice; extracting members from the package archive is
//!out of scope here. Once built, [ResourceTable] and [XmlDocument] are
//!immutable and safe to share across threads for concurrent lookups.
//!
//!```rust,no_run
//!use resdecoder::{parse_table, parse_xml_with_resources, ResourceId, ResTableConfig};
//!# fn main() -> Result<(), Box<dyn std::error::Error>> {
//!let manifest = std::fs::read("AndroidManifest.xml.bin")?;
//!let resources = std::fs::read("resources.arsc")?;
//!
//!let table = parse_table(&resources)?;
//!let xml = parse_xml_with_resources(&manifest, &table)?;
//!println!("{}", xml.to_xml_string());
//!
//!let config = ResTableConfig { density: 480, ..Default::default() };
//!let label = table.resolve(ResourceId::from(0x7f01_0000), &config)?;
//!println!("{}", label);
//!# Ok(())
//!# }
//!```

mod binaryxml;
mod chunk;
mod config;
mod resolver;
mod resource_value;
mod stringpool;
mod table;
#[cfg(test)]
mod testdata;
mod xml;

use thiserror::Error;

use crate::binaryxml::BinaryXmlDocument;

pub use crate::config::{
    best_match, ResTableConfig, DENSITY_ANY, DENSITY_DEFAULT, DENSITY_MEDIUM, DENSITY_NONE,
};
pub use crate::resolver::{Bag, ResourceId, Value, MAX_REFERENCE_DEPTH};
pub use crate::resource_value::{ResValue, ValueType};
pub use crate::stringpool::StringPool;
pub use crate::table::{Package, ResourceTable};
pub use crate::xml::{Cdata, Element, Node, XmlDocument};

///Errors produced while decoding a binary XML document or resource table.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid file")]
    InvalidFile,

    #[error("input truncated")]
    TruncatedInput,

    #[error("invalid chunk size: header {header_size}, total {size}")]
    InvalidChunkSize { header_size: u16, size: u32 },

    #[error("missing StringPool chunk")]
    MissingStringPool,

    #[error("duplicate package id: 0x{0:02x}")]
    DuplicatePackageId(u8),

    #[error("malformed entry at index {0}")]
    MalformedEntry(u32),

    #[error("StringPool missing index: {0}")]
    StringIndexOutOfRange(u32),

    #[error(transparent)]
    Utf8StringParseError(std::string::FromUtf8Error),
}

///Errors produced while resolving a resource id against a table. Each
///failure is scoped to the single lookup; the table stays usable.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid resource id: 0x{0:08x}")]
    InvalidResourceId(u32),

    #[error("package 0x{0:02x} not found")]
    PackageNotFound(u8),

    #[error("type 0x{0:02x} not found")]
    TypeNotFound(u8),

    #[error("no configuration matches for {0}")]
    NoMatchingConfiguration(ResourceId),

    #[error("entry not found for {0}")]
    EntryNotFound(ResourceId),

    #[error("reference cycle while resolving {0}")]
    ReferenceCycle(ResourceId),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

///Parses a compiled binary XML document.
///
///Attribute values that reference resources render as `@0x%08x` literals;
///use [parse_xml_with_resources] to resolve them against a table.
pub fn parse_xml(data: &[u8]) -> Result<XmlDocument, ParseError> {
    let doc = BinaryXmlDocument::parse(data)?;
    XmlDocument::new(doc, None)
}

///Parses a compiled binary XML document, resolving attribute names and
///reference values through `resources`.
pub fn parse_xml_with_resources(
    data: &[u8],
    resources: &ResourceTable,
) -> Result<XmlDocument, ParseError> {
    let doc = BinaryXmlDocument::parse(data)?;
    XmlDocument::new(doc, Some(resources))
}

///Parses a compiled resource table.
pub fn parse_table(data: &[u8]) -> Result<ResourceTable, ParseError> {
    ResourceTable::parse(data)
}
