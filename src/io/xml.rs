//! Minimal element tree over `quick-xml` events.
//!
//! Metadata documents are a few hundred kilobytes at most, so they are read once into an
//! owned tree and every later lookup walks memory instead of re-scanning the text.
//! Element and attribute names are stored without their namespace prefix.
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parse a whole document and return its root element
    pub fn parse(xml: &str) -> Result<XmlElement> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        // Bottom of the stack is a synthetic document node collecting the root.
        let mut stack: Vec<XmlElement> = vec![XmlElement::default()];

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => stack.push(Self::from_start(e)?),
                Event::Empty(ref e) => {
                    let element = Self::from_start(e)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(Self::unbalanced)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Err(Self::unbalanced()),
                    }
                }
                Event::Text(e) => {
                    let txt = e.unescape()?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&txt);
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(Self::unbalanced());
        }
        let document = stack.pop().unwrap_or_default();
        let root = document
            .children
            .into_iter()
            .next()
            .ok_or_else(|| Error::missing("XML root element"))?;
        debug!("Parsed XML document with root <{}>", root.name);
        Ok(root)
    }

    fn unbalanced() -> Error {
        Error::Processing("malformed XML: unbalanced start and end tags".to_string())
    }

    /// Read and parse a document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<XmlElement> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    fn from_start(e: &BytesStart) -> Result<XmlElement> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            let value = attr.unescape_value()?.to_string();
            attributes.push((key, value));
        }
        Ok(XmlElement {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text content
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct children with the given name, in document order
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a XmlElement> + use<'a, 'n> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First direct child with the given name and attribute value
    pub fn child_with_attr(&self, name: &str, key: &str, value: &str) -> Option<&XmlElement> {
        self.children_named(name).find(|c| c.attr(key) == Some(value))
    }

    /// First descendant (not self) with the given name, depth-first in document order
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants (not self) with the given name, in document order
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }

    /// All elements reached by following `path` through direct children
    pub fn select<'a>(&'a self, path: &[&str]) -> Vec<&'a XmlElement> {
        let mut current: Vec<&XmlElement> = vec![self];
        for step in path {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter().filter(|c| c.name == *step))
                .collect();
        }
        current
    }

    /// Text of the first descendant named `name`, parsed as a number
    pub fn find_number<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        let element = self.find(name).ok_or_else(|| Error::missing(name))?;
        parse_number(element.text(), name)
    }

    /// Text of the direct child named `name`, parsed as a number
    pub fn child_number<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        let element = self.child(name).ok_or_else(|| {
            Error::missing(format!("{} in <{}>", name, self.name))
        })?;
        parse_number(element.text(), name)
    }
}

pub fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.trim()
        .parse::<T>()
        .map_err(|_| Error::missing(format!("{} (non-numeric value '{}')", what, text.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<n1:Level-1C_Tile_ID xmlns:n1="https://psd-14.sentinel2.eo.esa.int/PSD/S2_PDI_Level-1C_Tile_Metadata.xsd">
  <n1:Geometric_Info>
    <Tile_Geocoding metadataLevel="Brief">
      <HORIZONTAL_CS_CODE>EPSG:32631</HORIZONTAL_CS_CODE>
      <Size resolution="10"><NROWS>10980</NROWS><NCOLS>10980</NCOLS></Size>
      <Size resolution="60"><NROWS>1830</NROWS><NCOLS>1830</NCOLS></Size>
      <Note/>
    </Tile_Geocoding>
  </n1:Geometric_Info>
  <Comment><![CDATA[a < b]]></Comment>
  <Escaped>A &amp; B</Escaped>
</n1:Level-1C_Tile_ID>"#;

    #[test]
    fn parses_tree_without_namespace_prefixes() {
        let root = XmlElement::parse(DOC).unwrap();
        assert_eq!(root.name, "Level-1C_Tile_ID");
        let geocoding = root.find("Tile_Geocoding").unwrap();
        assert_eq!(geocoding.attr("metadataLevel"), Some("Brief"));
        assert_eq!(geocoding.child("HORIZONTAL_CS_CODE").unwrap().text(), "EPSG:32631");
        assert!(geocoding.child("Note").is_some());
    }

    #[test]
    fn attribute_filtered_children() {
        let root = XmlElement::parse(DOC).unwrap();
        let geocoding = root.find("Tile_Geocoding").unwrap();
        let size = geocoding.child_with_attr("Size", "resolution", "60").unwrap();
        assert_eq!(size.child_number::<usize>("NROWS").unwrap(), 1830);
        assert!(geocoding.child_with_attr("Size", "resolution", "20").is_none());
        assert_eq!(geocoding.children_named("Size").count(), 2);
    }

    #[test]
    fn child_lookup_outlives_the_name_argument() {
        let root = XmlElement::parse(DOC).unwrap();
        let geocoding = root.find("Tile_Geocoding").unwrap();
        let size = {
            let name = String::from("Size");
            geocoding.child_with_attr(&name, "resolution", "10")
        };
        let sizes: Vec<&XmlElement> = {
            let name = String::from("Size");
            geocoding.children_named(&name).collect()
        };
        assert_eq!(size.unwrap().child_number::<usize>("NCOLS").unwrap(), 10980);
        assert_eq!(sizes.len(), 2);
    }

    #[test]
    fn find_all_and_select() {
        let root = XmlElement::parse(DOC).unwrap();
        assert_eq!(root.find_all("NROWS").len(), 2);
        let ncols = root.select(&["Geometric_Info", "Tile_Geocoding", "Size", "NCOLS"]);
        assert_eq!(ncols.len(), 2);
        assert_eq!(ncols[1].text(), "1830");
        assert!(root.select(&["Tile_Geocoding"]).is_empty());
    }

    #[test]
    fn text_unescaping_and_cdata() {
        let root = XmlElement::parse(DOC).unwrap();
        assert_eq!(root.child("Escaped").unwrap().text(), "A & B");
        assert_eq!(root.child("Comment").unwrap().text(), "a < b");
    }

    #[test]
    fn missing_and_non_numeric_values() {
        let root = XmlElement::parse("<a><b>x1</b></a>").unwrap();
        assert!(matches!(root.find_number::<f64>("b"), Err(Error::MetadataMissing(_))));
        assert!(matches!(root.find_number::<f64>("c"), Err(Error::MetadataMissing(_))));
    }

    #[test]
    fn unclosed_elements_are_malformed_not_missing() {
        let err = XmlElement::parse("<a><b>1</b>").unwrap_err();
        assert!(!matches!(err, Error::MetadataMissing(_)), "{err:?}");
        assert!(matches!(err, Error::Processing(_) | Error::Xml(_)), "{err:?}");
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(XmlElement::parse("").is_err());
    }
}
