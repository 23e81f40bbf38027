//! Exclusive XML Canonicalization 1.0.
//!
//! Works on the owned tree from [`dom`](super::dom). A namespace declaration
//! is emitted on an element only when the element or one of its attributes
//! visibly uses the prefix, or the prefix is listed in the
//! `InclusiveNamespaces PrefixList`, and the nearest output ancestor did not
//! already emit the same binding.

use std::collections::BTreeMap;

use crate::xml::dom::{lookup, Element, Node, NsDecl};

/// Exclusive canonicalization settings.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveC14n<'a> {
    with_comments: bool,
    inclusive_prefixes: Vec<String>,
    exclude: Option<&'a Element>,
}

impl<'a> ExclusiveC14n<'a> {
    /// Exclusive C14N without comments and an empty prefix list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps comment nodes in the output.
    #[must_use]
    pub const fn with_comments(mut self, with_comments: bool) -> Self {
        self.with_comments = with_comments;
        self
    }

    /// Sets the `InclusiveNamespaces` prefix list. `#default` names the
    /// default namespace.
    #[must_use]
    pub fn inclusive_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inclusive_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Leaves out `element` and its subtree (enveloped-signature transform).
    #[must_use]
    pub const fn excluding(mut self, element: &'a Element) -> Self {
        self.exclude = Some(element);
        self
    }

    /// Canonicalizes the subtree rooted at `element`.
    ///
    /// `scope` is the set of namespace bindings in scope at `element`, as
    /// returned by [`Element::scope_of`].
    #[must_use]
    pub fn canonicalize(&self, element: &Element, scope: &[NsDecl]) -> String {
        let mut out = String::new();
        let mut scope = scope.to_vec();
        let mut rendered = Vec::new();
        self.write(element, &mut scope, &mut rendered, &mut out);
        out
    }

    fn write(
        &self,
        el: &Element,
        scope: &mut Vec<NsDecl>,
        rendered: &mut Vec<NsDecl>,
        out: &mut String,
    ) {
        if self.exclude.is_some_and(|ex| std::ptr::eq(ex, el)) {
            return;
        }

        let scope_mark = scope.len();
        scope.extend(el.ns_decls.iter().cloned());
        let rendered_mark = rendered.len();

        // Keyed by prefix, "" for the default namespace; sorts default first.
        let mut needed: BTreeMap<String, String> = BTreeMap::new();
        needed.insert(
            el.prefix.clone().unwrap_or_default(),
            el.ns.clone().unwrap_or_default(),
        );
        for attr in &el.attrs {
            if let Some(prefix) = attr.prefix.as_ref().filter(|p| *p != "xml") {
                needed.insert(prefix.clone(), attr.ns.clone().unwrap_or_default());
            }
        }
        for listed in &self.inclusive_prefixes {
            let key = if listed == "#default" { "" } else { listed.as_str() };
            let prefix = (!key.is_empty()).then_some(key);
            if let Some(uri) = lookup(scope, prefix) {
                needed
                    .entry(key.to_string())
                    .or_insert_with(|| uri.to_string());
            }
        }

        out.push('<');
        out.push_str(&el.qname());

        for (key, uri) in &needed {
            let prefix = (!key.is_empty()).then_some(key.as_str());
            let current = lookup(rendered, prefix);
            if current == Some(uri.as_str()) {
                continue;
            }
            match prefix {
                None => {
                    if uri.is_empty() && current.map_or(true, str::is_empty) {
                        continue;
                    }
                    out.push_str(" xmlns=\"");
                }
                Some(p) => {
                    out.push_str(" xmlns:");
                    out.push_str(p);
                    out.push_str("=\"");
                }
            }
            out.push_str(&escape_attr(uri));
            out.push('"');
            rendered.push((prefix.map(str::to_string), uri.clone()));
        }

        let mut attrs: Vec<_> = el.attrs.iter().collect();
        attrs.sort_by(|a, b| {
            (a.ns.as_deref().unwrap_or(""), a.local.as_str())
                .cmp(&(b.ns.as_deref().unwrap_or(""), b.local.as_str()))
        });
        for attr in attrs {
            out.push(' ');
            out.push_str(&attr.qname());
            out.push_str("=\"");
            out.push_str(&escape_attr(&attr.value));
            out.push('"');
        }
        out.push('>');

        for child in &el.children {
            match child {
                Node::Element(e) => self.write(e, scope, rendered, out),
                Node::Text(t) => out.push_str(&escape_text(t)),
                Node::Comment(c) if self.with_comments => {
                    out.push_str("<!--");
                    out.push_str(c);
                    out.push_str("-->");
                }
                Node::Comment(_) => {}
            }
        }

        out.push_str("</");
        out.push_str(&el.qname());
        out.push('>');

        rendered.truncate(rendered_mark);
        scope.truncate(scope_mark);
    }
}

/// Escapes character data.
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes an attribute value for double-quoted output.
pub(crate) fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}
