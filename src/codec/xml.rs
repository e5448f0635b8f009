//! Low-level `<PatrolDevice>` document parsing.
//!
//! Both directions of the wire protocol use the same document shape:
//!
//! ```text
//! <PatrolDevice>
//!   <Type>NNNN</Type>
//!   <Command>1</Command>
//!   <Time>YYYY-MM-DD HH:MM:SS</Time>
//!   <Items>...</Items>          (repeated, or self-closing)
//! </PatrolDevice>
//! ```
//!
//! This module flattens a document into [`PatrolDoc`]: the envelope fields
//! plus one string map per `<Items>` element. Field interpretation happens
//! in [`crate::codec`]; missing fields fall back to defaults there, the
//! same way the device firmware treats them.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, SdkError};

/// A parsed `<PatrolDevice>` document.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatrolDoc {
    /// The numeric `<Type>` value.
    pub type_code: u16,
    /// The `<Time>` value, verbatim.
    pub time: String,
    /// One entry per `<Items>` element; self-closing `<Items/>` yields an
    /// empty map.
    pub items: Vec<HashMap<String, String>>,
}

impl PatrolDoc {
    /// Parse a UTF-8 body into a document.
    ///
    /// # Errors
    ///
    /// [`SdkError::InvalidResponse`] if the body is not UTF-8, is not
    /// well-formed XML, lacks the `<PatrolDevice>` root or a numeric
    /// `<Type>`.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body).map_err(|_| SdkError::InvalidResponse)?;

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut doc = PatrolDoc::default();
        let mut saw_root = false;
        let mut type_code: Option<u16> = None;

        // Path below <PatrolDevice>: [] at top level, ["Items"] inside an
        // item, ["Items", field] inside an item field.
        let mut path: Vec<String> = Vec::new();
        let mut in_root = false;
        let mut current_item: Option<HashMap<String, String>> = None;
        let mut current_text = String::new();

        loop {
            match reader.read_event().map_err(SdkError::Xml)? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if !in_root {
                        if name != "PatrolDevice" {
                            return Err(SdkError::InvalidResponse);
                        }
                        in_root = true;
                        saw_root = true;
                        continue;
                    }
                    if path.is_empty() && name == "Items" {
                        current_item = Some(HashMap::new());
                    }
                    path.push(name);
                    current_text.clear();
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if in_root && path.is_empty() && name == "Items" {
                        doc.items.push(HashMap::new());
                    } else if let Some(item) = current_item.as_mut() {
                        item.insert(name, String::new());
                    }
                }
                Event::Text(t) => {
                    let value = t.unescape().map_err(SdkError::Xml)?;
                    current_text.push_str(&value);
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if name == "PatrolDevice" {
                        break;
                    }
                    path.pop();

                    match (path.len(), name.as_str()) {
                        (0, "Type") => {
                            type_code =
                                Some(current_text.trim().parse().map_err(|_| {
                                    SdkError::InvalidResponse
                                })?);
                        }
                        (0, "Time") => doc.time = current_text.trim().to_string(),
                        (0, "Items") => {
                            if let Some(item) = current_item.take() {
                                doc.items.push(item);
                            }
                        }
                        (1, field) => {
                            if let Some(item) = current_item.as_mut() {
                                item.insert(field.to_string(), current_text.trim().to_string());
                            }
                        }
                        _ => {}
                    }
                    current_text.clear();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(SdkError::InvalidResponse);
        }
        doc.type_code = type_code.ok_or(SdkError::InvalidResponse)?;
        Ok(doc)
    }

    /// First `<Items>` map, if any.
    pub fn first_item(&self) -> Option<&HashMap<String, String>> {
        self.items.first()
    }
}

/// Read an integer field, defaulting to 0 when absent or malformed.
pub(crate) fn get_i32(item: &HashMap<String, String>, key: &str) -> i32 {
    item.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Read an unsigned 64-bit field, defaulting to 0.
pub(crate) fn get_u64(item: &HashMap<String, String>, key: &str) -> u64 {
    item.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Read a float field, defaulting to 0.0.
pub(crate) fn get_f64(item: &HashMap<String, String>, key: &str) -> f64 {
    item.get(key).and_then(|v| v.parse().ok()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_request_shaped_doc() {
        let body = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
            <PatrolDevice>\n\
            <Type>1002</Type>\n\
            <Command>1</Command>\n\
            <Time>2024-01-02 03:04:05</Time>\n\
            <Items/>\n\
            </PatrolDevice>";

        let doc = PatrolDoc::parse(body).unwrap();
        assert_eq!(doc.type_code, 1002);
        assert_eq!(doc.time, "2024-01-02 03:04:05");
        assert_eq!(doc.items.len(), 1);
        assert!(doc.items[0].is_empty());
    }

    #[test]
    fn parse_response_items() {
        let body = b"<PatrolDevice>\
            <Type>1004</Type><Command>1</Command><Time>t</Time>\
            <Items><ErrorCode>1</ErrorCode></Items>\
            </PatrolDevice>";

        let doc = PatrolDoc::parse(body).unwrap();
        assert_eq!(doc.type_code, 1004);
        let item = doc.first_item().unwrap();
        assert_eq!(get_i32(item, "ErrorCode"), 1);
    }

    #[test]
    fn parse_multiple_items() {
        let body = b"<PatrolDevice><Type>1003</Type>\
            <Items><Value>1</Value><PosX>1.5</PosX></Items>\
            <Items><Value>2</Value><PosX>-2.25</PosX></Items>\
            </PatrolDevice>";

        let doc = PatrolDoc::parse(body).unwrap();
        assert_eq!(doc.items.len(), 2);
        assert_eq!(get_i32(&doc.items[0], "Value"), 1);
        assert_eq!(get_f64(&doc.items[1], "PosX"), -2.25);
    }

    #[test]
    fn missing_fields_default() {
        let item = HashMap::new();
        assert_eq!(get_i32(&item, "ErrorCode"), 0);
        assert_eq!(get_u64(&item, "CurRuntime"), 0);
        assert_eq!(get_f64(&item, "Speed"), 0.0);
    }

    #[test]
    fn malformed_field_defaults() {
        let mut item = HashMap::new();
        item.insert("ErrorCode".to_string(), "abc".to_string());
        assert_eq!(get_i32(&item, "ErrorCode"), 0);
    }

    #[test]
    fn rejects_non_xml() {
        assert!(PatrolDoc::parse(b"{\"json\": true}").is_err());
    }

    #[test]
    fn rejects_wrong_root() {
        assert!(PatrolDoc::parse(b"<Other><Type>1002</Type></Other>").is_err());
    }

    #[test]
    fn rejects_missing_type() {
        assert!(PatrolDoc::parse(b"<PatrolDevice><Time>t</Time></PatrolDevice>").is_err());
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(PatrolDoc::parse(&[0xFF, 0xFE, 0x00]).is_err());
    }
}
