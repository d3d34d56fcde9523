//! XML property list codec.
//!
//! LaunchAgent descriptors are XML plists. Reading uses the `quick-xml` event
//! reader; writing builds the document directly, indenting with tabs the way
//! `plutil` does. Dictionaries keep their key order so a descriptor that is
//! read and written back only changes where it was edited.

use std::fmt::Write as _;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::PlistError;

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const DOCTYPE: &str = "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n";

/// A property list value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    /// ISO 8601 text, kept verbatim.
    Date(String),
    /// Base64 text, kept verbatim.
    Data(String),
    Array(Vec<PlistValue>),
    Dict(PlistDict),
}

impl PlistValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PlistValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PlistDict> {
        match self {
            PlistValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn into_dict(self) -> Option<PlistDict> {
        match self {
            PlistValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<&str> for PlistValue {
    fn from(s: &str) -> Self {
        PlistValue::String(s.to_string())
    }
}

impl From<String> for PlistValue {
    fn from(s: String) -> Self {
        PlistValue::String(s)
    }
}

impl From<i64> for PlistValue {
    fn from(i: i64) -> Self {
        PlistValue::Integer(i)
    }
}

impl From<bool> for PlistValue {
    fn from(b: bool) -> Self {
        PlistValue::Boolean(b)
    }
}

/// An insertion-ordered plist dictionary.
///
/// Equality ignores key order.
#[derive(Debug, Clone, Default)]
pub struct PlistDict {
    entries: Vec<(String, PlistValue)>,
}

impl PlistDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PlistValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<PlistValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlistValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl PartialEq for PlistDict {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl From<PlistDict> for PlistValue {
    fn from(dict: PlistDict) -> Self {
        PlistValue::Dict(dict)
    }
}

impl From<Vec<PlistValue>> for PlistValue {
    fn from(items: Vec<PlistValue>) -> Self {
        PlistValue::Array(items)
    }
}

impl<K: Into<String>, V: Into<PlistValue>> FromIterator<(K, V)> for PlistDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = PlistDict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

/// Parse an XML plist document into its root value.
pub fn parse(xml: &str) -> Result<PlistValue, PlistError> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"plist" => {
                return next_value(&mut reader)?
                    .ok_or_else(|| PlistError::Malformed("empty <plist> element".to_string()));
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() != b"plist" => {
                return Err(PlistError::Malformed(format!(
                    "expected <plist> root, found <{}>",
                    String::from_utf8_lossy(e.name().as_ref())
                )));
            }
            Event::Eof => return Err(PlistError::Malformed("missing <plist> root".to_string())),
            _ => {}
        }
    }
}

/// Serialize a value as a complete XML plist document.
pub fn to_xml(value: &PlistValue) -> String {
    let mut out = String::new();
    out.push_str(XML_HEADER);
    out.push_str(DOCTYPE);
    out.push_str("<plist version=\"1.0\">\n");
    write_value(&mut out, value, 0);
    out.push_str("</plist>\n");
    out
}

/// Next value element inside a container. `None` means the container closed.
fn next_value(reader: &mut Reader<&[u8]>) -> Result<Option<PlistValue>, PlistError> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = e.name().as_ref().to_vec();
                return parse_element(reader, &tag).map(Some);
            }
            Event::Empty(e) => return empty_element(e.name().as_ref()).map(Some),
            Event::End(_) => return Ok(None),
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(PlistError::Malformed("unexpected text between values".to_string()));
                }
            }
            Event::Eof => return Err(PlistError::Malformed("unexpected end of document".to_string())),
            _ => {}
        }
    }
}

fn parse_element(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<PlistValue, PlistError> {
    match tag {
        b"dict" => parse_dict(reader).map(PlistValue::Dict),
        b"array" => {
            let mut items = Vec::new();
            while let Some(item) = next_value(reader)? {
                items.push(item);
            }
            Ok(PlistValue::Array(items))
        }
        b"string" => Ok(PlistValue::String(read_text(reader)?)),
        b"integer" => {
            let text = read_text(reader)?;
            text.trim()
                .parse()
                .map(PlistValue::Integer)
                .map_err(|_| PlistError::Malformed(format!("invalid integer {:?}", text)))
        }
        b"real" => {
            let text = read_text(reader)?;
            text.trim()
                .parse()
                .map(PlistValue::Real)
                .map_err(|_| PlistError::Malformed(format!("invalid real {:?}", text)))
        }
        b"date" => Ok(PlistValue::Date(read_text(reader)?.trim().to_string())),
        b"data" => Ok(PlistValue::Data(
            read_text(reader)?.split_whitespace().collect::<String>(),
        )),
        b"true" | b"false" => {
            read_text(reader)?;
            Ok(PlistValue::Boolean(tag == b"true"))
        }
        other => Err(PlistError::Malformed(format!(
            "unsupported element <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn empty_element(tag: &[u8]) -> Result<PlistValue, PlistError> {
    match tag {
        b"true" => Ok(PlistValue::Boolean(true)),
        b"false" => Ok(PlistValue::Boolean(false)),
        b"string" => Ok(PlistValue::String(String::new())),
        b"dict" => Ok(PlistValue::Dict(PlistDict::new())),
        b"array" => Ok(PlistValue::Array(Vec::new())),
        b"data" => Ok(PlistValue::Data(String::new())),
        other => Err(PlistError::Malformed(format!(
            "unsupported empty element <{}/>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn parse_dict(reader: &mut Reader<&[u8]>) -> Result<PlistDict, PlistError> {
    let mut dict = PlistDict::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"key" => {
                let key = read_text(reader)?;
                let value = next_value(reader)?
                    .ok_or_else(|| PlistError::Malformed(format!("key {:?} has no value", key)))?;
                dict.insert(key, value);
            }
            Event::Empty(e) if e.name().as_ref() == b"key" => {
                let value = next_value(reader)?
                    .ok_or_else(|| PlistError::Malformed("empty key has no value".to_string()))?;
                dict.insert(String::new(), value);
            }
            Event::Start(e) | Event::Empty(e) => {
                return Err(PlistError::Malformed(format!(
                    "expected <key> in dict, found <{}>",
                    String::from_utf8_lossy(e.name().as_ref())
                )));
            }
            Event::End(_) => return Ok(dict),
            Event::Text(t) => {
                if !t.unescape()?.trim().is_empty() {
                    return Err(PlistError::Malformed("unexpected text in dict".to_string()));
                }
            }
            Event::Eof => return Err(PlistError::Malformed("unterminated <dict>".to_string())),
            _ => {}
        }
    }
}

/// Collect character data up to the closing tag of the current element.
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, PlistError> {
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(_) => return Ok(text),
            Event::Start(e) | Event::Empty(e) => {
                return Err(PlistError::Malformed(format!(
                    "unexpected <{}> inside a scalar",
                    String::from_utf8_lossy(e.name().as_ref())
                )));
            }
            Event::Eof => return Err(PlistError::Malformed("unterminated element".to_string())),
            _ => {}
        }
    }
}

fn write_value(out: &mut String, value: &PlistValue, depth: usize) {
    let indent = "\t".repeat(depth);
    match value {
        PlistValue::String(s) => {
            let _ = writeln!(out, "{}<string>{}</string>", indent, quick_xml::escape::escape(s.as_str()));
        }
        PlistValue::Integer(i) => {
            let _ = writeln!(out, "{}<integer>{}</integer>", indent, i);
        }
        PlistValue::Real(r) => {
            let _ = writeln!(out, "{}<real>{}</real>", indent, r);
        }
        PlistValue::Boolean(b) => {
            let _ = writeln!(out, "{}<{}/>", indent, if *b { "true" } else { "false" });
        }
        PlistValue::Date(d) => {
            let _ = writeln!(out, "{}<date>{}</date>", indent, quick_xml::escape::escape(d.as_str()));
        }
        PlistValue::Data(d) => {
            let _ = writeln!(out, "{}<data>{}</data>", indent, d);
        }
        PlistValue::Array(items) if items.is_empty() => {
            let _ = writeln!(out, "{}<array/>", indent);
        }
        PlistValue::Array(items) => {
            let _ = writeln!(out, "{}<array>", indent);
            for item in items {
                write_value(out, item, depth + 1);
            }
            let _ = writeln!(out, "{}</array>", indent);
        }
        PlistValue::Dict(dict) if dict.is_empty() => {
            let _ = writeln!(out, "{}<dict/>", indent);
        }
        PlistValue::Dict(dict) => {
            let _ = writeln!(out, "{}<dict>", indent);
            for (key, item) in dict.iter() {
                let _ = writeln!(out, "{}\t<key>{}</key>", indent, quick_xml::escape::escape(key));
                write_value(out, item, depth + 1);
            }
            let _ = writeln!(out, "{}</dict>", indent);
        }
    }
}

#[cfg(test)]
#[path = "plist_tests.rs"]
mod tests;
