//! A minimal XML element tree for project documents.
//!
//! MSBuild project files use a narrow XML subset: attribute-bearing
//! elements with either text content or child elements, never both. The
//! writer keeps apostrophes unescaped because condition expressions such as
//! `'$(Configuration)|$(Platform)'=='Debug|x64'` are conventionally written
//! verbatim in `.vcxproj` files.

use std::fmt::{self, Display, Formatter};

/// XML declaration emitted at the top of every generated document.
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

/// An XML element with attributes and either text or child elements.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    /// Element name.
    pub name: String,
    /// Text content; mutually exclusive with children when rendering.
    pub text: Option<String>,
    /// Attributes in declaration order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in declaration order.
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Create an element with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append an attribute and return `self` for chaining.
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Set the text content and return `self` for chaining.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Append a child element built elsewhere.
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Append a new child element and return a mutable reference to it.
    pub fn child(&mut self, name: impl Into<String>) -> &mut XmlElement {
        self.children.push(XmlElement::new(name));
        self.children.last_mut().expect("child was just pushed")
    }

    /// Set an attribute on an existing element.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Set text content on an existing element.
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(text.into());
        self
    }

    /// Sort direct children by element name; used to keep settings groups
    /// deterministic regardless of declaration order.
    pub fn sort_children_by_name(&mut self) {
        self.children.sort_by(|a, b| a.name.cmp(&b.name));
    }

    fn write_indented(&self, f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{indent}<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}=\"{}\"", escape_attribute(value))?;
        }
        if let Some(text) = &self.text {
            writeln!(f, ">{}</{}>", escape_text(text), self.name)
        } else if self.children.is_empty() {
            writeln!(f, " />")
        } else {
            writeln!(f, ">")?;
            for c in &self.children {
                c.write_indented(f, depth + 1)?;
            }
            writeln!(f, "{indent}</{}>", self.name)
        }
    }
}

impl Display for XmlElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
