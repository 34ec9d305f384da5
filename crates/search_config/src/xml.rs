//! Minimal element tree on top of quick-xml.
//!
//! The configuration grammar only needs element names, attributes and text
//! content, so namespaces, comments and processing instructions are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Value of the attribute with the given local name, if present.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

pub(crate) fn parse_tree(xml: &str) -> Result<Element, ConfigError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(open_element(&e)?),
            Event::Empty(e) => {
                let element = open_element(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ConfigError::Malformed("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConfigError::Malformed(format!(
            "element <{}> is never closed",
            open.name
        )));
    }

    root.ok_or_else(|| ConfigError::Malformed("document has no root element".to_string()))
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, ConfigError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ConfigError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(ConfigError::Malformed(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements_in_order() {
        let tree = parse_tree(
            r#"<?xml version="1.0"?>
<Root>
  <A Name="first"/>
  <B>text</B>
  <A Name="second"></A>
</Root>"#,
        )
        .unwrap();

        assert_eq!(tree.name, "Root");
        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "A"]);
        assert_eq!(tree.children[0].attribute("Name").as_deref(), Some("first"));
        assert_eq!(tree.children[1].text, "text");
        assert_eq!(tree.children_named("A").count(), 2);
    }

    #[test]
    fn test_attribute_values_are_unescaped() {
        let tree = parse_tree(r#"<Root Url="http://a/?x=1&amp;y=2"/>"#).unwrap();
        assert_eq!(tree.attribute("Url").as_deref(), Some("http://a/?x=1&y=2"));
    }

    #[test]
    fn test_missing_attribute_is_none() {
        let tree = parse_tree("<Root/>").unwrap();
        assert!(tree.attribute("Name").is_none());
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        assert!(parse_tree("<Root><A>").is_err());
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(matches!(parse_tree(""), Err(ConfigError::Malformed(_))));
    }
}
