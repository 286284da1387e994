//! Minimal XML document writer for MPNS payloads.

use std::fmt;

/// Text content of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Text {
    /// Escaped when written
    Plain(String),
    /// Already escaped, written verbatim
    Escaped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<Text>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(Text::Plain(text.into()));
        self
    }

    pub fn escaped_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(Text::Escaped(text.into()));
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, escape(value, true))?;
        }
        if self.text.is_none() && self.children.is_empty() {
            return f.write_str("/>");
        }
        f.write_str(">")?;
        match &self.text {
            Some(Text::Plain(text)) => f.write_str(&escape(text, false))?,
            Some(Text::Escaped(text)) => f.write_str(text)?,
            None => {}
        }
        for child in &self.children {
            child.write(f)?;
        }
        write!(f, "</{}>", self.name)
    }
}

/// A UTF-8 XML document with a single root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n")?;
        self.root.write(f)?;
        f.write_str("\n")
    }
}

fn escape(value: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_rendering() {
        let doc = XmlDocument::new(
            XmlElement::new("wp:Notification")
                .attribute("xmlns:wp", "WPNotification")
                .child(XmlElement::new("wp:Toast").child(XmlElement::new("wp:Text1").text("a < b"))),
        );
        assert_eq!(
            doc.to_string(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <wp:Notification xmlns:wp=\"WPNotification\"><wp:Toast><wp:Text1>a &lt; b</wp:Text1></wp:Toast></wp:Notification>\n"
        );
    }

    #[test]
    fn test_empty_element_and_escaped_text() {
        assert_eq!(
            XmlDocument::new(XmlElement::new("root")).to_string(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<root/>\n"
        );
        let doc = XmlDocument::new(XmlElement::new("root").child(XmlElement::new("k").escaped_text("&amp;")));
        assert!(doc.to_string().contains("<k>&amp;</k>"));
    }
}
