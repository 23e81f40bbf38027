//! Owned XML tree with resolved namespaces.
//!
//! Caller documents are parsed with quick-xml into [`Element`] trees. Each
//! element and attribute carries its namespace URI, resolved at parse time,
//! and the namespace declarations written on it. The tree is what signature
//! verification canonicalizes, so parsing normalizes line endings and
//! attribute whitespace the way an XML processor must.
//!
//! Documents with a DOCTYPE are refused, as are documents in which two
//! elements share an `ID`/`Id` value.

use std::collections::HashSet;
use std::fmt::Write as _;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{SamlError, SamlResult};
use crate::types::XML_NS;
use crate::xml::c14n::{escape_attr, escape_text};

const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Maximum element nesting accepted from callers.
const MAX_DEPTH: usize = 128;

/// A namespace binding: prefix (`None` for the default namespace) and URI.
pub type NsDecl = (Option<String>, String);

/// An attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Prefix as written, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub local: String,
    /// Namespace URI; unprefixed attributes have none.
    pub ns: Option<String>,
    /// Normalized, unescaped value.
    pub value: String,
}

impl Attribute {
    /// Qualified name as written.
    #[must_use]
    pub fn qname(&self) -> String {
        qualified(self.prefix.as_deref(), &self.local)
    }
}

/// A child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
    /// Comment body.
    Comment(String),
}

/// An element with resolved namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Prefix as written, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub local: String,
    /// Namespace URI.
    pub ns: Option<String>,
    /// Namespace declarations written on this element.
    pub ns_decls: Vec<NsDecl>,
    /// Attributes, excluding namespace declarations.
    pub attrs: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element in namespace `ns`, written with `prefix`.
    pub fn new(prefix: &str, local: &str, ns: &str) -> Self {
        Self {
            prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
            local: local.to_string(),
            ns: Some(ns.to_string()),
            ns_decls: Vec::new(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a namespace declaration.
    #[must_use]
    pub fn with_ns_decl(mut self, prefix: &str, uri: &str) -> Self {
        let prefix = (!prefix.is_empty()).then(|| prefix.to_string());
        self.ns_decls.push((prefix, uri.to_string()));
        self
    }

    /// Adds an unqualified attribute.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Sets or replaces an unqualified attribute.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(attr) = self
            .attrs
            .iter_mut()
            .find(|a| a.ns.is_none() && a.local == name)
        {
            attr.value = value;
        } else {
            self.attrs.push(Attribute {
                prefix: None,
                local: name.to_string(),
                ns: None,
                value,
            });
        }
    }

    /// Qualified name as written.
    #[must_use]
    pub fn qname(&self) -> String {
        qualified(self.prefix.as_deref(), &self.local)
    }

    /// Returns true if this element is `{ns}local`.
    #[must_use]
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.local == local && self.ns.as_deref() == Some(ns)
    }

    /// Value of an unqualified attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns.is_none() && a.local == name)
            .map(|a| a.value.as_str())
    }

    /// The element's `ID` (SAML) or `Id` (XML-DSig/XML-Enc) attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attr("ID").or_else(|| self.attr("Id"))
    }

    /// Iterates over child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Iterates mutably over child elements.
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements named `{ns}local`.
    pub fn children_named<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |e| e.is(ns, local))
    }

    /// First child element named `{ns}local`.
    #[must_use]
    pub fn child(&self, ns: &str, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(ns, local))
    }

    /// First child element named `{ns}local`, mutably.
    pub fn child_mut(&mut self, ns: &str, local: &str) -> Option<&mut Element> {
        self.child_elements_mut().find(|e| e.is(ns, local))
    }

    /// Index into `children` of the first element named `{ns}local`.
    #[must_use]
    pub fn child_position(&self, ns: &str, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.is(ns, local)))
    }

    /// Concatenated text of the direct text children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Depth-first iteration over this element and all descendants.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            out.push(el);
            let children: Vec<&Element> = el.child_elements().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Namespace bindings in scope at `target`, a node inside this tree.
    ///
    /// Later entries shadow earlier ones. Returns `None` if `target` is not
    /// part of this tree.
    #[must_use]
    pub fn scope_of(&self, target: &Element) -> Option<Vec<NsDecl>> {
        let mut scope = Vec::new();
        if self.collect_scope(target, &mut scope) {
            Some(scope)
        } else {
            None
        }
    }

    fn collect_scope(&self, target: &Element, scope: &mut Vec<NsDecl>) -> bool {
        let mark = scope.len();
        scope.extend(self.ns_decls.iter().cloned());
        if std::ptr::eq(self, target) {
            return true;
        }
        for child in self.child_elements() {
            if child.collect_scope(target, scope) {
                return true;
            }
        }
        scope.truncate(mark);
        false
    }

    /// Serializes the subtree, declaring any namespace it uses but does not
    /// itself declare so that the output stands alone.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut Vec::new(), &mut out);
        out
    }

    fn write_xml(&self, scope: &mut Vec<NsDecl>, out: &mut String) {
        let mark = scope.len();
        scope.extend(self.ns_decls.iter().cloned());

        let mut extra: Vec<NsDecl> = Vec::new();
        let mut require = |prefix: Option<&str>, ns: Option<&str>, scope: &[NsDecl]| {
            if prefix == Some("xml") {
                return;
            }
            let bound = lookup(&extra, prefix).or_else(|| lookup(scope, prefix));
            let wanted = ns.unwrap_or("");
            if bound.unwrap_or("") != wanted {
                extra.push((prefix.map(str::to_string), wanted.to_string()));
            }
        };
        require(self.prefix.as_deref(), self.ns.as_deref(), scope.as_slice());
        for attr in &self.attrs {
            if attr.prefix.is_some() {
                require(attr.prefix.as_deref(), attr.ns.as_deref(), scope.as_slice());
            }
        }
        scope.extend(extra.iter().cloned());

        out.push('<');
        out.push_str(&self.qname());
        for (prefix, uri) in self.ns_decls.iter().chain(extra.iter()) {
            match prefix {
                Some(p) => {
                    let _ = write!(out, " xmlns:{p}=\"{}\"", escape_attr(uri));
                }
                None => {
                    let _ = write!(out, " xmlns=\"{}\"", escape_attr(uri));
                }
            }
        }
        for attr in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", attr.qname(), escape_attr(&attr.value));
        }

        if self.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            for child in &self.children {
                match child {
                    Node::Element(e) => e.write_xml(scope, out),
                    Node::Text(t) => out.push_str(&escape_text(t)),
                    Node::Comment(c) => {
                        let _ = write!(out, "<!--{c}-->");
                    }
                }
            }
            let _ = write!(out, "</{}>", self.qname());
        }

        scope.truncate(mark);
    }
}

/// Parses a complete document and returns its root element.
///
/// # Errors
///
/// Returns [`SamlError::XmlParse`] for malformed XML, a DOCTYPE, an unbound
/// prefix, excessive nesting, or duplicate ID values.
pub fn parse(xml: &str) -> SamlResult<Element> {
    parse_with_scope(xml, &[])
}

/// Parses a fragment whose prefixes may be bound by `inherited`, the scope
/// of the place it came from.
///
/// Inherited bindings the fragment uses are copied onto the root so the
/// result is self-contained. A prefix counts as used when an element or
/// attribute name carries it, or an `xsi:type` value names it.
///
/// # Errors
///
/// Same as [`parse`].
pub fn parse_fragment(xml: &str, inherited: &[NsDecl]) -> SamlResult<Element> {
    let mut root = parse_with_scope(xml, inherited)?;
    let mut used = HashSet::new();
    collect_used_prefixes(&root, &mut used);
    for (prefix, uri) in inherited.iter().rev() {
        if used.contains(prefix) && !root.ns_decls.iter().any(|(p, _)| p == prefix) {
            root.ns_decls.push((prefix.clone(), uri.clone()));
        }
    }
    Ok(root)
}

fn collect_used_prefixes(el: &Element, used: &mut HashSet<Option<String>>) {
    used.insert(el.prefix.clone());
    for attr in &el.attrs {
        if attr.prefix.is_some() {
            used.insert(attr.prefix.clone());
        }
        if attr.local == "type" && attr.ns.as_deref() == Some(XSI_NS) {
            used.insert(split_qname(&attr.value).0.map(str::to_string));
        }
    }
    for child in el.child_elements() {
        collect_used_prefixes(child, used);
    }
}

fn parse_with_scope(xml: &str, inherited: &[NsDecl]) -> SamlResult<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut scope: Vec<NsDecl> = inherited.to_vec();
    let mut scope_marks: Vec<usize> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(parse_error("content after document element"));
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(parse_error("document nested too deeply"));
                }
                scope_marks.push(scope.len());
                stack.push(open_element(&e, &mut scope)?);
            }
            Event::Empty(e) => {
                if root.is_some() {
                    return Err(parse_error("content after document element"));
                }
                let mark = scope.len();
                let el = open_element(&e, &mut scope)?;
                scope.truncate(mark);
                attach(el, &mut stack, &mut root);
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| parse_error("unbalanced end tag"))?;
                if let Some(mark) = scope_marks.pop() {
                    scope.truncate(mark);
                }
                attach(el, &mut stack, &mut root);
            }
            Event::Text(t) => {
                let raw = std::str::from_utf8(&t)
                    .map_err(|e| parse_error(&format!("invalid UTF-8: {e}")))?;
                let text = unescape(&normalize_newlines(raw))
                    .map_err(|e| parse_error(&e.to_string()))?
                    .into_owned();
                push_text(&mut stack, text)?;
            }
            Event::CData(t) => {
                let raw = std::str::from_utf8(&t)
                    .map_err(|e| parse_error(&format!("invalid UTF-8: {e}")))?;
                push_text(&mut stack, normalize_newlines(raw))?;
            }
            Event::Comment(c) => {
                if let Some(parent) = stack.last_mut() {
                    let body = String::from_utf8_lossy(&c).into_owned();
                    parent.children.push(Node::Comment(normalize_newlines(&body)));
                }
            }
            Event::DocType(_) => return Err(parse_error("DOCTYPE is not allowed")),
            Event::Decl(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(parse_error("unexpected end of document"));
    }
    let root = root.ok_or_else(|| parse_error("no document element"))?;
    reject_duplicate_ids(&root)?;
    Ok(root)
}

fn open_element(start: &BytesStart<'_>, scope: &mut Vec<NsDecl>) -> SamlResult<Element> {
    let qname = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| parse_error(&format!("invalid UTF-8 in name: {e}")))?
        .to_string();

    let mut ns_decls = Vec::new();
    let mut raw_attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(&e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| parse_error(&format!("invalid UTF-8 in attribute: {e}")))?
            .to_string();
        let raw = std::str::from_utf8(&attr.value)
            .map_err(|e| parse_error(&format!("invalid UTF-8 in attribute: {e}")))?;
        let value = unescape(&normalize_attr_whitespace(raw))
            .map_err(|e| parse_error(&e.to_string()))?
            .into_owned();

        if key == "xmlns" {
            ns_decls.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            if value.is_empty() {
                return Err(parse_error(&format!("prefix {prefix} bound to empty URI")));
            }
            ns_decls.push((Some(prefix.to_string()), value));
        } else {
            raw_attrs.push((key, value));
        }
    }
    scope.extend(ns_decls.iter().cloned());

    let (prefix, local) = split_qname(&qname);
    let ns = resolve(scope, prefix)?;

    let mut attrs = Vec::with_capacity(raw_attrs.len());
    for (key, value) in raw_attrs {
        let (prefix, local) = split_qname(&key);
        let ns = match prefix {
            Some(_) => resolve(scope, prefix)?,
            None => None,
        };
        attrs.push(Attribute {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            ns,
            value,
        });
    }

    Ok(Element {
        prefix: prefix.map(str::to_string),
        local: local.to_string(),
        ns,
        ns_decls,
        attrs,
        children: Vec::new(),
    })
}

fn attach(el: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => *root = Some(el),
    }
}

fn push_text(stack: &mut [Element], text: String) -> SamlResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            if let Some(Node::Text(prev)) = parent.children.last_mut() {
                prev.push_str(&text);
            } else {
                parent.children.push(Node::Text(text));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(parse_error("text outside document element")),
    }
}

fn reject_duplicate_ids(root: &Element) -> SamlResult<()> {
    let mut seen = HashSet::new();
    for el in root.descendants() {
        for attr in &el.attrs {
            if attr.ns.is_none()
                && (attr.local == "ID" || attr.local == "Id")
                && !seen.insert(attr.value.as_str())
            {
                return Err(parse_error(&format!("duplicate ID value {}", attr.value)));
            }
        }
    }
    Ok(())
}

fn resolve(scope: &[NsDecl], prefix: Option<&str>) -> SamlResult<Option<String>> {
    if prefix == Some("xml") {
        return Ok(Some(XML_NS.to_string()));
    }
    match lookup(scope, prefix) {
        Some("") | None if prefix.is_none() => Ok(None),
        Some(uri) if !uri.is_empty() => Ok(Some(uri.to_string())),
        _ => Err(parse_error(&format!(
            "unbound namespace prefix {}",
            prefix.unwrap_or_default()
        ))),
    }
}

pub(crate) fn lookup<'a>(scope: &'a [NsDecl], prefix: Option<&str>) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p.as_deref() == prefix)
        .map(|(_, uri)| uri.as_str())
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local}"),
        None => local.to_string(),
    }
}

fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

fn normalize_attr_whitespace(raw: &str) -> String {
    raw.replace("\r\n", " ")
        .replace(|c| matches!(c, '\r' | '\n' | '\t'), " ")
}

fn parse_error(msg: &str) -> SamlError {
    SamlError::XmlParse(msg.to_string())
}
