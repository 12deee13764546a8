use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::binaryxml::{BinaryXmlDocument, XmlAttribute, XmlEvent, XmlStartElement};
use crate::config::ResTableConfig;
use crate::resolver::ResourceId;
use crate::resource_value::ValueType;
use crate::stringpool::StringPool;
use crate::table::ResourceTable;
use crate::ParseError;

///A decoded XML document.
#[derive(Debug)]
pub struct XmlDocument {
    root: Option<Node>,
}

///A node within the decoded document.
#[derive(Debug)]
pub enum Node {
    Element(Element),
    Cdata(Cdata),
}

///An element: tag, attributes in document order, children.
#[derive(Debug)]
pub struct Element {
    tag: String,
    attributes: IndexMap<String, String>,
    children: Vec<Node>,
}

///A CDATA section, exposed as plain text.
#[derive(Debug)]
pub struct Cdata {
    data: String,
}

impl XmlDocument {
    pub(crate) fn new(
        doc: BinaryXmlDocument,
        resources: Option<&ResourceTable>,
    ) -> Result<Self, ParseError> {
        let pool = &doc.string_pool;
        let resource_map = &doc.resource_map;

        // Namespaces declared since the last element start; they become
        // xmlns attributes on the next element.
        let mut pending_namespaces: Vec<(String, String)> = Vec::new();
        // uri -> prefix for everything currently in scope.
        let mut namespaces: HashMap<String, String> = HashMap::new();

        let mut element_tracker: Vec<Element> = Vec::new();
        let mut root = None;

        for event in doc.events {
            match event {
                XmlEvent::StartNameSpace(e) => {
                    let prefix = pool.get_optional(e.prefix).unwrap_or_default().to_string();
                    let uri = pool.get_optional(e.uri).unwrap_or_default().to_string();
                    namespaces.insert(uri.clone(), prefix.clone());
                    pending_namespaces.push((prefix, uri));
                }
                XmlEvent::EndNameSpace(e) => {
                    if let Some(uri) = pool.get_optional(e.uri) {
                        namespaces.remove(uri);
                    }
                }
                XmlEvent::StartElement(e) => {
                    let element = process_start_element(
                        &e,
                        pool,
                        resource_map,
                        &namespaces,
                        &mut pending_namespaces,
                        resources,
                    )?;
                    element_tracker.push(element);
                }
                XmlEvent::EndElement(_) => {
                    let element = element_tracker.pop().ok_or(ParseError::InvalidFile)?;
                    match element_tracker.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => {
                            root = Some(Node::Element(element));
                            break;
                        }
                    }
                }
                XmlEvent::Cdata(e) => {
                    let data = match pool.get_optional(e.data) {
                        Some(s) => s.to_string(),
                        None => e.typed_data.render(pool)?,
                    };
                    if let Some(parent) = element_tracker.last_mut() {
                        parent.children.push(Node::Cdata(Cdata { data }));
                    }
                }
            }
        }

        Ok(Self { root })
    }

    ///Returns the root [Node] of the document.
    pub fn get_root(&self) -> &Option<Node> {
        &self.root
    }

    ///Materializes the textual form of the document.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        if let Some(root) = &self.root {
            format_node(root, 0, &mut out);
        }

        out.trim_end().to_string()
    }
}

impl Element {
    ///Returns the attributes associated with the element, in document
    ///order.
    pub fn get_attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    ///Returns the element tag.
    pub fn get_tag(&self) -> &str {
        &self.tag
    }

    ///Returns the child nodes.
    pub fn get_children(&self) -> &Vec<Node> {
        &self.children
    }
}

impl Cdata {
    pub fn get_data(&self) -> &str {
        &self.data
    }
}

fn process_start_element(
    e: &XmlStartElement,
    pool: &StringPool,
    resource_map: &[u32],
    namespaces: &HashMap<String, String>,
    pending_namespaces: &mut Vec<(String, String)>,
    resources: Option<&ResourceTable>,
) -> Result<Element, ParseError> {
    let mut tag = pool.get(e.name as usize)?.to_string();
    if let Some(uri) = pool.get_optional(e.ns) {
        if let Some(prefix) = namespaces.get(uri) {
            tag = format!("{}:{}", prefix, tag);
        }
    }

    let mut attributes = IndexMap::new();
    for (prefix, uri) in pending_namespaces.drain(..) {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", prefix)
        };
        attributes.insert(key, uri);
    }

    for attr in &e.attributes {
        let Some(name) = attribute_name(attr, pool, resource_map, resources) else {
            log::warn!("dropping attribute with unresolvable name on <{}>", tag);
            continue;
        };

        let mut final_name = String::new();
        if let Some(uri) = pool.get_optional(attr.ns) {
            if let Some(prefix) = namespaces.get(uri) {
                final_name.push_str(prefix);
                final_name.push(':');
            }
        }
        final_name.push_str(&name);

        let value = render_attribute_value(attr, pool, resources)?;
        attributes.insert(final_name, value);
    }

    Ok(Element {
        tag,
        attributes,
        children: Vec::new(),
    })
}

///Resolves an attribute name. The pool string wins when present; an empty
///pool entry falls back to the resource map, whose id names the attribute
///through the resource table's key strings.
fn attribute_name(
    attr: &XmlAttribute,
    pool: &StringPool,
    resource_map: &[u32],
    resources: Option<&ResourceTable>,
) -> Option<String> {
    let from_pool = pool.get_optional(attr.name).unwrap_or_default();
    if !from_pool.is_empty() {
        return Some(from_pool.to_string());
    }

    let id = *resource_map.get(attr.name as usize)?;
    if let Some(table) = resources {
        if let Some(name) = table.entry_key(ResourceId::from(id)) {
            return Some(name.to_string());
        }
    }

    Some(format!("attr_0x{:08x}", id))
}

///Renders an attribute value to text. Reference values are resolved
///through the table when one is supplied, falling back to the `@0x%08x`
///literal when resolution fails; the structured error stays with direct
///resolver callers.
fn render_attribute_value(
    attr: &XmlAttribute,
    pool: &StringPool,
    resources: Option<&ResourceTable>,
) -> Result<String, ParseError> {
    let value = &attr.typed_value;
    if matches!(
        value.value_type(),
        Some(ValueType::Reference) | Some(ValueType::DynamicReference)
    ) {
        if let Some(table) = resources {
            if let Ok(resolved) =
                table.resolve(ResourceId::from(value.data), &ResTableConfig::default())
            {
                return Ok(resolved.to_string());
            }
        }
    }

    value.render(pool)
}

fn format_node(node: &Node, level: usize, output: &mut String) {
    match node {
        Node::Element(e) => {
            let _ = write!(
                output,
                "{:indent$}{}\n",
                "",
                format_start_element(e),
                indent = level * 2
            );

            for child in &e.children {
                format_node(child, level + 1, output);
            }

            if !e.children.is_empty() {
                let _ = write!(
                    output,
                    "{:indent$}</{}>\n",
                    "",
                    e.tag,
                    indent = level * 2
                );
            }
        }
        Node::Cdata(e) => {
            let _ = write!(
                output,
                "{:indent$}<![CDATA[{}]]>\n",
                "",
                e.data,
                indent = level * 2
            );
        }
    }
}

fn format_start_element(e: &Element) -> String {
    let mut s = String::new();
    s.push('<');
    s.push_str(&e.tag);

    for (key, value) in &e.attributes {
        s.push(' ');
        s.push_str(key);
        s.push('=');
        s.push('"');
        s.push_str(&escape_xml(value));
        s.push('"');
    }

    if e.children.is_empty() {
        s.push('/');
    }
    s.push('>');

    s
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }

    out
}
