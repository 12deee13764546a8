use std::fmt;
use std::str::FromStr;

use crate::config::{best_match, ResTableConfig};
use crate::resource_value::{ResValue, ValueType};
use crate::table::{EntryValue, ResourceTable};
use crate::ResolveError;

///Upper bound on reference-to-reference indirection during a single
///resolve. Corrupt or malicious tables can chain or loop references;
///exceeding the bound fails with [ResolveError::ReferenceCycle].
pub const MAX_REFERENCE_DEPTH: usize = 20;

///A packed 32-bit resource identifier: package (8 bits), type (8 bits),
///entry (16 bits). Package and type ids are 1-based; zero in either field
///addresses nothing and is rejected by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u32);

impl ResourceId {
    pub fn from_parts(package: u8, type_id: u8, entry: u16) -> Self {
        Self((u32::from(package) << 24) | (u32::from(type_id) << 16) | u32::from(entry))
    }

    pub fn package(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn type_id(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn entry(self) -> u16 {
        self.0 as u16
    }

    pub fn is_valid(self) -> bool {
        self.package() != 0 && self.type_id() != 0
    }
}

impl From<u32> for ResourceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ResourceId> for u32 {
    fn from(id: ResourceId) -> u32 {
        id.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = ResolveError;

    ///Parses the textual reference form used in decoded manifests, e.g.
    ///`@0x7f010000` (the leading `@` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('@').unwrap_or(s);
        let hex = s
            .strip_prefix("0x")
            .ok_or(ResolveError::InvalidResourceId(0))?;
        let raw = u32::from_str_radix(hex, 16).map_err(|_| ResolveError::InvalidResourceId(0))?;

        let id = ResourceId(raw);
        if !id.is_valid() {
            return Err(ResolveError::InvalidResourceId(raw));
        }
        Ok(id)
    }
}

///A fully resolved resource value. References have already been followed;
///strings have been pulled out of the pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Integer(i32),
    Hex(u32),
    Boolean(bool),
    Float(f32),
    Color(u32),
    Dimension(String),
    Fraction(String),
    Bag(Bag),
    Raw { value_type: u8, data: u32 },
}

///A complex (style/array/plural) entry: its parent resource and the
///rendered member values in table order. Member references are rendered as
///`@0x%08x` literals, not followed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bag {
    pub parent: ResourceId,
    pub entries: Vec<(ResourceId, String)>,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Hex(h) => write!(f, "0x{:x}", h),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Float(v) => write!(f, "{}", v),
            Value::Color(c) => write!(f, "#{:08x}", c),
            Value::Dimension(s) | Value::Fraction(s) => f.write_str(s),
            Value::Bag(bag) => {
                write!(f, "bag(parent={})", bag.parent)?;
                for (name, value) in &bag.entries {
                    write!(f, " {}={}", name, value)?;
                }
                Ok(())
            }
            Value::Raw { value_type, data } => write!(f, "<0x{:02x}>/{}", value_type, data),
        }
    }
}

impl ResourceTable {
    ///Resolves a resource id for the requested configuration.
    ///
    ///Selects the best-matching configuration block for the id's type,
    ///fetches the entry, and follows reference values until a concrete
    ///value is reached. Any failure is scoped to this call; the table
    ///itself stays valid.
    pub fn resolve(
        &self,
        id: ResourceId,
        config: &ResTableConfig,
    ) -> Result<Value, ResolveError> {
        let mut current = id;
        let mut visited: Vec<u32> = Vec::new();

        for _ in 0..MAX_REFERENCE_DEPTH {
            if visited.contains(&current.into()) {
                return Err(ResolveError::ReferenceCycle(id));
            }
            visited.push(current.into());

            if !current.is_valid() {
                return Err(ResolveError::InvalidResourceId(current.into()));
            }

            let package = self
                .package(current.package())
                .ok_or(ResolveError::PackageNotFound(current.package()))?;
            let group = package
                .type_group(current.type_id())
                .ok_or(ResolveError::TypeNotFound(current.type_id()))?;

            let winner = best_match(group.blocks.iter().map(|block| &block.config), config)
                .ok_or(ResolveError::NoMatchingConfiguration(current))?;
            let block = &group.blocks[winner];

            let entry = block
                .entries
                .get(usize::from(current.entry()))
                .and_then(Option::as_ref)
                .ok_or(ResolveError::EntryNotFound(current))?;

            match &entry.value {
                EntryValue::Simple(value) => match value.value_type() {
                    Some(ValueType::Reference) | Some(ValueType::DynamicReference) => {
                        if value.data == 0 {
                            return Ok(Value::Null);
                        }
                        current = ResourceId::from(value.data);
                    }
                    _ => return self.materialize(value),
                },
                EntryValue::Complex { parent, map } => {
                    let mut entries = Vec::with_capacity(map.len());
                    for (name, value) in map {
                        let rendered = value.render(self.string_pool())?;
                        entries.push((ResourceId::from(*name), rendered));
                    }
                    return Ok(Value::Bag(Bag {
                        parent: ResourceId::from(*parent),
                        entries,
                    }));
                }
            }
        }

        Err(ResolveError::ReferenceCycle(id))
    }

    fn materialize(&self, value: &ResValue) -> Result<Value, ResolveError> {
        let resolved = match value.value_type() {
            Some(ValueType::Null) => Value::Null,
            Some(ValueType::String) => {
                Value::String(self.string_pool().get(value.data as usize)?.to_string())
            }
            Some(ValueType::IntDec) => Value::Integer(value.data as i32),
            Some(ValueType::IntHex) => Value::Hex(value.data),
            Some(ValueType::Boolean) => Value::Boolean(value.data != 0),
            Some(ValueType::Float) => Value::Float(f32::from_bits(value.data)),
            Some(ValueType::ColorArgb8)
            | Some(ValueType::ColorRgb8)
            | Some(ValueType::ColorArgb4)
            | Some(ValueType::ColorRgb4) => Value::Color(value.data),
            Some(ValueType::Dimension) | Some(ValueType::Fraction) => {
                let rendered = value.render(self.string_pool())?;
                if value.value_type() == Some(ValueType::Dimension) {
                    Value::Dimension(rendered)
                } else {
                    Value::Fraction(rendered)
                }
            }
            // References are handled by the resolve loop before this point;
            // everything else is preserved raw.
            _ => Value::Raw {
                value_type: value.raw_type(),
                data: value.data,
            },
        };

        Ok(resolved)
    }

    ///Looks up the key name of an entry in any of its configuration
    ///blocks, e.g. an attribute resource id to its attribute name. Used by
    ///the XML decoder for attributes whose name lives behind a resource id.
    pub fn entry_key(&self, id: ResourceId) -> Option<&str> {
        let package = self.package(id.package())?;
        let group = package.type_group(id.type_id())?;

        for block in &group.blocks {
            if let Some(Some(entry)) = block.entries.get(usize::from(id.entry())) {
                return package.key_string(entry.key).ok();
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::*;

    fn default_config() -> ResTableConfig {
        ResTableConfig::default()
    }

    #[test]
    fn resolves_string_entry() {
        let table = ResourceTable::parse(&hello_table()).unwrap();
        let value = table
            .resolve(ResourceId::from(0x7f01_0000), &default_config())
            .unwrap();

        assert_eq!(value, Value::String("HelloApp".to_string()));
        assert_eq!(value.to_string(), "HelloApp");
    }

    #[test]
    fn follows_reference_chain() {
        let entries = [
            Some(simple_entry(0, 0x01, 0x7f01_0001)),
            Some(simple_entry(1, 0x03, 0)),
        ];
        let table = ResourceTable::parse(&hello_table_with_entries(&entries)).unwrap();

        let value = table
            .resolve(ResourceId::from(0x7f01_0000), &default_config())
            .unwrap();
        assert_eq!(value, Value::String("HelloApp".to_string()));
    }

    #[test]
    fn two_cycle_fails_with_reference_cycle() {
        let entries = [
            Some(simple_entry(0, 0x01, 0x7f01_0001)),
            Some(simple_entry(1, 0x01, 0x7f01_0000)),
        ];
        let table = ResourceTable::parse(&hello_table_with_entries(&entries)).unwrap();

        assert!(matches!(
            table.resolve(ResourceId::from(0x7f01_0000), &default_config()),
            Err(ResolveError::ReferenceCycle(id)) if u32::from(id) == 0x7f01_0000
        ));
    }

    #[test]
    fn self_reference_fails_with_reference_cycle() {
        let entries = [Some(simple_entry(0, 0x01, 0x7f01_0000))];
        let table = ResourceTable::parse(&hello_table_with_entries(&entries)).unwrap();

        assert!(matches!(
            table.resolve(ResourceId::from(0x7f01_0000), &default_config()),
            Err(ResolveError::ReferenceCycle(_))
        ));
    }

    #[test]
    fn absent_entry_fails_with_entry_not_found() {
        let entries = [None, Some(simple_entry(1, 0x10, 7))];
        let table = ResourceTable::parse(&hello_table_with_entries(&entries)).unwrap();

        assert!(matches!(
            table.resolve(ResourceId::from(0x7f01_0000), &default_config()),
            Err(ResolveError::EntryNotFound(_))
        ));
        assert!(matches!(
            table.resolve(ResourceId::from(0x7f01_0005), &default_config()),
            Err(ResolveError::EntryNotFound(_))
        ));
    }

    #[test]
    fn zero_package_or_type_is_invalid() {
        let table = ResourceTable::parse(&hello_table()).unwrap();

        assert!(matches!(
            table.resolve(ResourceId::from(0x0001_0000), &default_config()),
            Err(ResolveError::InvalidResourceId(_))
        ));
        assert!(matches!(
            table.resolve(ResourceId::from(0x7f00_0000), &default_config()),
            Err(ResolveError::InvalidResourceId(_))
        ));
    }

    #[test]
    fn unknown_package_and_type_fail() {
        let table = ResourceTable::parse(&hello_table()).unwrap();

        assert!(matches!(
            table.resolve(ResourceId::from(0x2201_0000), &default_config()),
            Err(ResolveError::PackageNotFound(0x22))
        ));
        assert!(matches!(
            table.resolve(ResourceId::from(0x7f05_0000), &default_config()),
            Err(ResolveError::TypeNotFound(0x05))
        ));
    }

    #[test]
    fn excluded_configuration_fails_to_match() {
        let landscape = ResTableConfig {
            orientation: 2,
            ..Default::default()
        };
        let buf = hello_table_with_blocks(&[(
            landscape,
            vec![Some(simple_entry(0, 0x03, 0))],
        )]);
        let table = ResourceTable::parse(&buf).unwrap();

        let portrait = ResTableConfig {
            orientation: 1,
            ..Default::default()
        };
        assert!(matches!(
            table.resolve(ResourceId::from(0x7f01_0000), &portrait),
            Err(ResolveError::NoMatchingConfiguration(_))
        ));
    }

    #[test]
    fn density_selects_rounded_up_block() {
        let block = |density: u16, pool_index: u32| {
            (
                ResTableConfig {
                    density,
                    ..Default::default()
                },
                vec![Some(simple_entry(0, 0x10, pool_index))],
            )
        };
        let buf = hello_table_with_blocks(&[block(120, 120), block(160, 160), block(240, 240)]);
        let table = ResourceTable::parse(&buf).unwrap();

        let requested = ResTableConfig {
            density: 180,
            ..Default::default()
        };
        let value = table
            .resolve(ResourceId::from(0x7f01_0000), &requested)
            .unwrap();
        assert_eq!(value, Value::Integer(240));
    }

    #[test]
    fn error_in_one_resolve_does_not_poison_the_table() {
        let entries = [
            Some(simple_entry(0, 0x03, 0)),
            Some(simple_entry(1, 0x01, 0x7f01_0001)),
        ];
        let table = ResourceTable::parse(&hello_table_with_entries(&entries)).unwrap();

        assert!(table
            .resolve(ResourceId::from(0x7f01_0001), &default_config())
            .is_err());
        // The earlier failure leaves other lookups intact.
        assert_eq!(
            table
                .resolve(ResourceId::from(0x7f01_0000), &default_config())
                .unwrap(),
            Value::String("HelloApp".to_string())
        );
    }

    #[test]
    fn complex_entry_resolves_to_bag() {
        let pairs = [(0x0101_0001u32, 0x10u8, 11u32), (0x0101_0000, 0x12, 1)];
        let buf = hello_table_with_entries(&[Some(complex_entry(0, 0x7f01_0005, &pairs))]);
        let table = ResourceTable::parse(&buf).unwrap();

        let value = table
            .resolve(ResourceId::from(0x7f01_0000), &default_config())
            .unwrap();
        match value {
            Value::Bag(bag) => {
                assert_eq!(u32::from(bag.parent), 0x7f01_0005);
                assert_eq!(bag.entries.len(), 2);
                assert_eq!(bag.entries[0].1, "11");
                assert_eq!(bag.entries[1].1, "true");
            }
            other => panic!("expected bag, got {:?}", other),
        }
    }

    #[test]
    fn resource_id_parses_and_displays() {
        let id: ResourceId = "@0x7f010000".parse().unwrap();
        assert_eq!(id.package(), 0x7f);
        assert_eq!(id.type_id(), 0x01);
        assert_eq!(id.entry(), 0x0000);
        assert_eq!(id.to_string(), "0x7f010000");

        assert!("0x7f010001".parse::<ResourceId>().is_ok());
        assert!("@0x00010000".parse::<ResourceId>().is_err());
        assert!("HelloApp".parse::<ResourceId>().is_err());
    }
}
