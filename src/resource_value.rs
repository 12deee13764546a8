use num_enum::TryFromPrimitive;

use crate::chunk::Reader;
use crate::stringpool::StringPool;
use crate::ParseError;

///Typed data carried by XML attributes and resource-table entries.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive)]
pub enum ValueType {
    Null = 0x00,
    Reference = 0x01,
    Attribute = 0x02,
    String = 0x03,
    Float = 0x04,
    Dimension = 0x05,
    Fraction = 0x06,
    DynamicReference = 0x07,
    DynamicAttribute = 0x08,
    IntDec = 0x10,
    IntHex = 0x11,
    Boolean = 0x12,
    ColorArgb8 = 0x1c,
    ColorRgb8 = 0x1d,
    ColorArgb4 = 0x1e,
    ColorRgb4 = 0x1f,
}

///The fixed 8-byte value record (`size`, reserved byte, type, data word).
///
///Unknown type bytes are preserved rather than failing the parse so newer
///producers stay decodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResValue {
    pub(crate) size: u16,
    res0: u8,
    raw_type: u8,
    pub data: u32,
}

impl ResValue {
    pub(crate) fn read(r: &mut Reader) -> Result<Self, ParseError> {
        let size = r.read_u16()?;
        let res0 = r.read_u8()?;
        let raw_type = r.read_u8()?;
        let data = r.read_u32()?;

        Ok(Self {
            size,
            res0,
            raw_type,
            data,
        })
    }

    ///Builds a value from a compact table entry, where the type byte lives
    ///in the entry flags.
    pub(crate) fn from_parts(raw_type: u8, data: u32) -> Self {
        Self {
            size: 8,
            res0: 0,
            raw_type,
            data,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        ValueType::try_from(self.raw_type).ok()
    }

    pub fn raw_type(&self) -> u8 {
        self.raw_type
    }

    ///Renders the value to its canonical textual form, resolving string
    ///indices through `string_pool`. References render as `@0x%08x`
    ///literals; following them is the resolver's job.
    pub fn render(&self, string_pool: &StringPool) -> Result<String, ParseError> {
        let s = match self.value_type() {
            Some(ValueType::Null) => String::new(),
            Some(ValueType::Reference) | Some(ValueType::DynamicReference) => {
                format!("@0x{:08x}", self.data)
            }
            Some(ValueType::Attribute) | Some(ValueType::DynamicAttribute) => {
                format!("?0x{:08x}", self.data)
            }
            Some(ValueType::String) => string_pool.get(self.data as usize)?.to_string(),
            Some(ValueType::Float) => f32::from_bits(self.data).to_string(),
            Some(ValueType::Dimension) => {
                format!("{}{}", complex_value(self.data), dimension_unit(self.data))
            }
            Some(ValueType::Fraction) => {
                format!("{}{}", complex_value(self.data) * 100.0, fraction_unit(self.data))
            }
            Some(ValueType::IntDec) => (self.data as i32).to_string(),
            Some(ValueType::IntHex) => format!("0x{:x}", self.data),
            Some(ValueType::Boolean) => match self.data {
                0 => "false".to_string(),
                _ => "true".to_string(),
            },
            Some(ValueType::ColorArgb8)
            | Some(ValueType::ColorRgb8)
            | Some(ValueType::ColorArgb4)
            | Some(ValueType::ColorRgb4) => format!("#{:08x}", self.data),
            None => format!("<0x{:02x}>/{}", self.raw_type, self.data),
        };

        Ok(s)
    }
}

///Decodes the fixed-point complex format used by dimensions and fractions:
///a signed 24-bit mantissa scaled by one of four radix positions.
fn complex_value(data: u32) -> f32 {
    const MULTS: [f32; 4] = [
        1.0 / (1 << 8) as f32,
        1.0 / (1 << 15) as f32,
        1.0 / (1 << 23) as f32,
        1.0 / (1u64 << 31) as f32,
    ];
    ((data & 0xffff_ff00) as i32 as f32) * MULTS[((data >> 4) & 0x3) as usize]
}

fn dimension_unit(data: u32) -> &'static str {
    match data & 0xf {
        0 => "px",
        1 => "dip",
        2 => "sp",
        3 => "pt",
        4 => "in",
        5 => "mm",
        _ => "",
    }
}

fn fraction_unit(data: u32) -> &'static str {
    match data & 0xf {
        0 => "%",
        1 => "%p",
        _ => "",
    }
}
