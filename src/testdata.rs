//!Hand-assembled chunk buffers for tests. Layouts follow the published
//!resource-chunk format; every builder computes its sizes from the content
//!so fixtures stay valid as tests grow.

use crate::config::ResTableConfig;

pub(crate) fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

///Assembles a chunk from its type, extra header fields and body.
pub(crate) fn chunk(typ: u16, header_extra: &[u8], body: &[u8]) -> Vec<u8> {
    let header_size = 8 + header_extra.len();
    let size = header_size + body.len();

    let mut out = Vec::with_capacity(size);
    push_u16(&mut out, typ);
    push_u16(&mut out, header_size as u16);
    push_u32(&mut out, size as u32);
    out.extend_from_slice(header_extra);
    out.extend_from_slice(body);
    out
}

pub(crate) fn string_pool_chunk(strings: &[&str], utf8: bool) -> Vec<u8> {
    let mut data = Vec::new();
    let mut offsets = Vec::new();

    for s in strings {
        offsets.push(data.len() as u32);
        if utf8 {
            data.push(s.chars().count() as u8);
            data.push(s.len() as u8);
            data.extend_from_slice(s.as_bytes());
            data.push(0);
        } else {
            let units: Vec<u16> = s.encode_utf16().collect();
            push_u16(&mut data, units.len() as u16);
            for unit in units {
                push_u16(&mut data, unit);
            }
            push_u16(&mut data, 0);
        }
    }
    while data.len() % 4 != 0 {
        data.push(0);
    }

    let strings_start = 28 + 4 * strings.len() as u32;

    let mut header_extra = Vec::new();
    push_u32(&mut header_extra, strings.len() as u32);
    push_u32(&mut header_extra, 0); // style_count
    push_u32(&mut header_extra, if utf8 { 1 << 8 } else { 0 });
    push_u32(&mut header_extra, strings_start);
    push_u32(&mut header_extra, 0); // styles_start

    let mut body = Vec::new();
    for offset in offsets {
        push_u32(&mut body, offset);
    }
    body.extend_from_slice(&data);

    chunk(0x0001, &header_extra, &body)
}

pub(crate) fn res_value(value_type: u8, data: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    push_u16(&mut out, 8);
    out.push(0);
    out.push(value_type);
    push_u32(&mut out, data);
    out
}

pub(crate) fn simple_entry(key: u32, value_type: u8, data: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    push_u16(&mut out, 8);
    push_u16(&mut out, 0);
    push_u32(&mut out, key);
    out.extend_from_slice(&res_value(value_type, data));
    out
}

pub(crate) fn complex_entry(key: u32, parent: u32, pairs: &[(u32, u8, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u16(&mut out, 16);
    push_u16(&mut out, 0x0001);
    push_u32(&mut out, key);
    push_u32(&mut out, parent);
    push_u32(&mut out, pairs.len() as u32);
    for (name, value_type, data) in pairs {
        push_u32(&mut out, *name);
        out.extend_from_slice(&res_value(*value_type, *data));
    }
    out
}

pub(crate) fn type_spec_chunk(type_id: u8, masks: &[u32]) -> Vec<u8> {
    let mut header_extra = Vec::new();
    header_extra.push(type_id);
    header_extra.push(0);
    push_u16(&mut header_extra, 0);
    push_u32(&mut header_extra, masks.len() as u32);

    let mut body = Vec::new();
    for mask in masks {
        push_u32(&mut body, *mask);
    }

    chunk(0x0202, &header_extra, &body)
}

pub(crate) fn config_bytes(c: &ResTableConfig) -> Vec<u8> {
    let mut out = Vec::with_capacity(36);
    push_u32(&mut out, 36);
    push_u16(&mut out, c.mcc);
    push_u16(&mut out, c.mnc);
    out.extend_from_slice(&c.language);
    out.extend_from_slice(&c.country);
    out.push(c.orientation);
    out.push(c.touchscreen);
    push_u16(&mut out, c.density);
    out.push(c.keyboard);
    out.push(c.navigation);
    out.push(c.input_flags);
    out.push(0);
    push_u16(&mut out, c.screen_width);
    push_u16(&mut out, c.screen_height);
    push_u16(&mut out, c.sdk_version);
    push_u16(&mut out, c.minor_version);
    out.push(c.screen_layout);
    out.push(c.ui_mode);
    push_u16(&mut out, c.smallest_screen_width_dp);
    push_u16(&mut out, c.screen_width_dp);
    push_u16(&mut out, c.screen_height_dp);
    out
}

pub(crate) fn type_block_chunk(
    type_id: u8,
    config: &ResTableConfig,
    entries: &[Option<Vec<u8>>],
) -> Vec<u8> {
    let cfg = config_bytes(config);

    let mut entry_data = Vec::new();
    let mut offsets = Vec::new();
    for entry in entries {
        match entry {
            None => offsets.push(0xffff_ffff),
            Some(bytes) => {
                offsets.push(entry_data.len() as u32);
                entry_data.extend_from_slice(bytes);
            }
        }
    }

    let header_size = 8 + 12 + cfg.len();
    let entries_start = header_size + 4 * entries.len();

    let mut header_extra = Vec::new();
    header_extra.push(type_id);
    header_extra.push(0); // flags
    push_u16(&mut header_extra, 0);
    push_u32(&mut header_extra, entries.len() as u32);
    push_u32(&mut header_extra, entries_start as u32);
    header_extra.extend_from_slice(&cfg);

    let mut body = Vec::new();
    for offset in offsets {
        push_u32(&mut body, offset);
    }
    body.extend_from_slice(&entry_data);

    chunk(0x0201, &header_extra, &body)
}

pub(crate) fn package_chunk(id: u8, name: &str, chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut header_extra = Vec::new();
    push_u32(&mut header_extra, u32::from(id));

    let mut name_units = [0u16; 128];
    for (i, unit) in name.encode_utf16().take(127).enumerate() {
        name_units[i] = unit;
    }
    for unit in name_units {
        push_u16(&mut header_extra, unit);
    }

    // type_strings/last_public_type/key_strings/last_public_key/type_id_offset
    for _ in 0..5 {
        push_u32(&mut header_extra, 0);
    }

    let mut body = Vec::new();
    for c in chunks {
        body.extend_from_slice(c);
    }

    chunk(0x0200, &header_extra, &body)
}

pub(crate) fn table_chunk(chunks: &[Vec<u8>]) -> Vec<u8> {
    let package_count = chunks
        .iter()
        .filter(|c| c.len() >= 2 && u16::from_le_bytes([c[0], c[1]]) == 0x0200)
        .count() as u32;

    let mut header_extra = Vec::new();
    push_u32(&mut header_extra, package_count);

    let mut body = Vec::new();
    for c in chunks {
        body.extend_from_slice(c);
    }

    chunk(0x0002, &header_extra, &body)
}

///One package, one "string" type, configurable blocks. Resource ids take
///the form 0x7f01_xxxx.
pub(crate) fn hello_table_with_blocks(
    blocks: &[(ResTableConfig, Vec<Option<Vec<u8>>>)],
) -> Vec<u8> {
    let pool = string_pool_chunk(&["HelloApp"], false);
    let type_strings = string_pool_chunk(&["string"], false);
    let key_strings = string_pool_chunk(&["app_name", "other_name"], false);

    let spec_len = blocks.iter().map(|(_, e)| e.len()).max().unwrap_or(0);
    let spec = type_spec_chunk(1, &vec![0u32; spec_len]);

    let mut package_chunks = vec![type_strings, key_strings, spec];
    for (config, entries) in blocks {
        package_chunks.push(type_block_chunk(1, config, entries));
    }

    let package = package_chunk(0x7f, "com.example.hello", &package_chunks);
    table_chunk(&[pool, package])
}

pub(crate) fn hello_table_with_entries(entries: &[Option<Vec<u8>>]) -> Vec<u8> {
    hello_table_with_blocks(&[(ResTableConfig::default(), entries.to_vec())])
}

///The minimal round-trip table: id 0x7f010000 maps to the pool string
///"HelloApp" in the default configuration.
pub(crate) fn hello_table() -> Vec<u8> {
    hello_table_with_entries(&[Some(simple_entry(0, 0x03, 0))])
}

///A table whose type 1 is "attr" with the given key names, for resolving
///attribute names from resource ids (0x7f010000, 0x7f010001, ...).
pub(crate) fn attr_table(keys: &[&str]) -> Vec<u8> {
    let pool = string_pool_chunk(&[], false);
    let type_strings = string_pool_chunk(&["attr"], false);
    let key_strings = string_pool_chunk(keys, false);

    let spec = type_spec_chunk(1, &vec![0u32; keys.len()]);
    let entries: Vec<Option<Vec<u8>>> = (0..keys.len())
        .map(|i| Some(simple_entry(i as u32, 0x10, 0)))
        .collect();
    let block = type_block_chunk(1, &ResTableConfig::default(), &entries);

    let package = package_chunk(
        0x7f,
        "android",
        &[type_strings, key_strings, spec, block],
    );
    table_chunk(&[pool, package])
}

fn node_header() -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    push_u32(&mut out, 1); // line number
    push_u32(&mut out, 0xffff_ffff); // comment
    out
}

pub(crate) fn xml_chunk(children: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    for c in children {
        body.extend_from_slice(c);
    }
    chunk(0x0003, &[], &body)
}

pub(crate) fn resource_map_chunk(ids: &[u32]) -> Vec<u8> {
    let mut body = Vec::new();
    for id in ids {
        push_u32(&mut body, *id);
    }
    chunk(0x0180, &[], &body)
}

pub(crate) fn start_namespace_chunk(prefix: u32, uri: u32) -> Vec<u8> {
    let mut body = Vec::new();
    push_u32(&mut body, prefix);
    push_u32(&mut body, uri);
    chunk(0x0100, &node_header(), &body)
}

pub(crate) fn end_namespace_chunk(prefix: u32, uri: u32) -> Vec<u8> {
    let mut body = Vec::new();
    push_u32(&mut body, prefix);
    push_u32(&mut body, uri);
    chunk(0x0101, &node_header(), &body)
}

///`attrs` entries are (namespace index, name index, value type, data).
pub(crate) fn start_element_chunk(ns: u32, name: u32, attrs: &[(u32, u32, u8, u32)]) -> Vec<u8> {
    let mut body = Vec::new();
    push_u32(&mut body, ns);
    push_u32(&mut body, name);
    push_u16(&mut body, 20); // attribute_start
    push_u16(&mut body, 20); // attribute_size
    push_u16(&mut body, attrs.len() as u16);
    push_u16(&mut body, 0); // id_index
    push_u16(&mut body, 0); // class_index
    push_u16(&mut body, 0); // style_index

    for (attr_ns, attr_name, value_type, data) in attrs {
        push_u32(&mut body, *attr_ns);
        push_u32(&mut body, *attr_name);
        push_u32(&mut body, 0xffff_ffff); // raw value
        body.extend_from_slice(&res_value(*value_type, *data));
    }

    chunk(0x0102, &node_header(), &body)
}

pub(crate) fn end_element_chunk(ns: u32, name: u32) -> Vec<u8> {
    let mut body = Vec::new();
    push_u32(&mut body, ns);
    push_u32(&mut body, name);
    chunk(0x0103, &node_header(), &body)
}

pub(crate) fn cdata_chunk(data_index: u32) -> Vec<u8> {
    let mut body = Vec::new();
    push_u32(&mut body, data_index);
    body.extend_from_slice(&res_value(0x03, data_index));
    chunk(0x0104, &node_header(), &body)
}
