//! Streaming XML writer with on-demand namespace declarations.
//!
//! Elements are written as they are opened. A start tag stays open until
//! the first child or text arrives, so attributes and `xmlns` declarations
//! can still be appended. A namespace is declared on the first element that
//! needs it and stays in scope for that element's subtree.

use std::collections::HashMap;
use std::io::Write;

use crate::config::{GML_NS, WFS_NS, XLINK_NS};
use crate::error::Result;

const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace URI to prefix assignment for one output document.
#[derive(Debug, Clone)]
pub struct NamespacePrefixes {
    prefixes: HashMap<String, String>,
    generated: usize,
}

impl Default for NamespacePrefixes {
    fn default() -> Self {
        let mut prefixes = HashMap::new();
        prefixes.insert(GML_NS.to_string(), "gml".to_string());
        prefixes.insert(WFS_NS.to_string(), "wfs".to_string());
        prefixes.insert(XLINK_NS.to_string(), "xlink".to_string());
        prefixes.insert(XSI_NS.to_string(), "xsi".to_string());
        Self {
            prefixes,
            generated: 0,
        }
    }
}

impl NamespacePrefixes {
    /// Prefer `prefix` for `namespace`. Ignored when either is already taken.
    pub fn register(&mut self, prefix: &str, namespace: &str) {
        if self.prefixes.contains_key(namespace) || self.prefixes.values().any(|p| p == prefix) {
            return;
        }
        self.prefixes
            .insert(namespace.to_string(), prefix.to_string());
    }

    /// Prefix for `namespace`, assigning `ns1`, `ns2`, ... to unknown ones.
    fn prefix_for(&mut self, namespace: &str) -> String {
        if let Some(prefix) = self.prefixes.get(namespace) {
            return prefix.clone();
        }
        loop {
            self.generated += 1;
            let candidate = format!("ns{}", self.generated);
            if !self.prefixes.values().any(|p| *p == candidate) {
                self.prefixes
                    .insert(namespace.to_string(), candidate.clone());
                return candidate;
            }
        }
    }
}

#[derive(Debug)]
struct OpenElement {
    tag: String,
    declared: Vec<String>,
}

/// Streaming writer over any [`Write`] sink.
pub struct XmlWriter<'w> {
    out: &'w mut dyn Write,
    prefixes: NamespacePrefixes,
    stack: Vec<OpenElement>,
    start_tag_open: bool,
}

impl<'w> XmlWriter<'w> {
    pub fn new(out: &'w mut dyn Write, prefixes: NamespacePrefixes) -> Self {
        Self {
            out,
            prefixes,
            stack: Vec::new(),
            start_tag_open: false,
        }
    }

    /// Write the XML declaration.
    pub fn declaration(&mut self) -> Result<()> {
        self.out
            .write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        Ok(())
    }

    /// Open an element. An empty namespace writes an unprefixed name.
    pub fn open_tag(&mut self, namespace: &str, local: &str) -> Result<()> {
        self.finish_start_tag()?;
        let tag = if namespace.is_empty() {
            local.to_string()
        } else {
            format!("{}:{local}", self.prefixes.prefix_for(namespace))
        };
        write!(self.out, "<{tag}")?;
        self.stack.push(OpenElement {
            tag,
            declared: Vec::new(),
        });
        self.start_tag_open = true;
        if !namespace.is_empty() {
            self.ensure_declared(namespace)?;
        }
        Ok(())
    }

    /// Add an attribute to the element just opened.
    ///
    /// Ignored when the start tag has already been closed by content.
    pub fn attribute(&mut self, namespace: &str, local: &str, value: &str) -> Result<()> {
        if !self.start_tag_open {
            tracing::warn!(attribute = local, "attribute written after element content");
            return Ok(());
        }
        if namespace.is_empty() {
            write!(self.out, " {local}=\"{}\"", escape(value, true))?;
        } else {
            self.ensure_declared(namespace)?;
            let prefix = self.prefixes.prefix_for(namespace);
            write!(self.out, " {prefix}:{local}=\"{}\"", escape(value, true))?;
        }
        Ok(())
    }

    /// Write escaped character data.
    pub fn text(&mut self, value: &str) -> Result<()> {
        self.finish_start_tag()?;
        self.out.write_all(escape(value, false).as_bytes())?;
        Ok(())
    }

    /// Close the innermost open element.
    pub fn close_tag(&mut self) -> Result<()> {
        let Some(element) = self.stack.pop() else {
            return Ok(());
        };
        if self.start_tag_open {
            self.out.write_all(b"/>")?;
            self.start_tag_open = false;
        } else {
            write!(self.out, "</{}>", element.tag)?;
        }
        Ok(())
    }

    /// Write `<tag>text</tag>`.
    pub fn text_element(&mut self, namespace: &str, local: &str, value: &str) -> Result<()> {
        self.open_tag(namespace, local)?;
        self.text(value)?;
        self.close_tag()
    }

    /// Close every open element and flush the sink.
    pub fn finish(mut self) -> Result<()> {
        while !self.stack.is_empty() {
            self.close_tag()?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn finish_start_tag(&mut self) -> Result<()> {
        if self.start_tag_open {
            self.out.write_all(b">")?;
            self.start_tag_open = false;
        }
        Ok(())
    }

    fn ensure_declared(&mut self, namespace: &str) -> Result<()> {
        let in_scope = self
            .stack
            .iter()
            .any(|e| e.declared.iter().any(|ns| ns == namespace));
        if in_scope {
            return Ok(());
        }
        let prefix = self.prefixes.prefix_for(namespace);
        write!(self.out, " xmlns:{prefix}=\"{}\"", escape(namespace, true))?;
        if let Some(current) = self.stack.last_mut() {
            current.declared.push(namespace.to_string());
        }
        Ok(())
    }
}

fn escape(value: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
