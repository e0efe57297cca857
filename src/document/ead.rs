//! EAD finding-aid adapter.
//!
//! An arena-backed XML tree that round-trips an EAD record through
//! quick-xml, exposes heading candidates chosen by [`SelectionRules`], and
//! applies the orchestrator's mutations: identifier attributes, text
//! replacement, and comment annotations inserted next to the changed node.
//!
//! Escaped text is stored as read and written back verbatim, so entity
//! references and prefixes survive untouched in the parts of the record the
//! run does not modify.

use std::path::Path;

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::document::{CandidateRef, HeadingDocument, NodeId};
use crate::error::DocumentError;
use crate::heading::HeadingKind;

/// An attribute-based exclusion for candidate selection.
#[derive(Debug, Clone)]
pub struct SkipWhen {
    /// Attribute local name.
    pub attr: String,
    /// Skip when the attribute equals this value; `None` skips on mere
    /// presence.
    pub equals: Option<String>,
}

/// One candidate-selection rule: which elements, under which ancestors,
/// yield headings of which kind.
#[derive(Debug, Clone)]
pub struct SelectionRule {
    /// Required chain of ancestor element local names, innermost last.
    pub ancestors: Vec<String>,
    /// Candidate element local name; `None` matches any element.
    pub element: Option<String>,
    /// Kind assigned to matching headings.
    pub kind: HeadingKind,
    /// Additional exclusions beyond the identifier attribute.
    pub skip_when: Vec<SkipWhen>,
}

impl SelectionRule {
    fn new(ancestors: &[&str], element: &str, kind: HeadingKind) -> Self {
        Self {
            ancestors: ancestors.iter().map(|s| (*s).to_string()).collect(),
            element: Some(element.to_string()),
            kind,
            skip_when: Vec::new(),
        }
    }

    fn any_element(ancestors: &[&str], kind: HeadingKind) -> Self {
        Self {
            ancestors: ancestors.iter().map(|s| (*s).to_string()).collect(),
            element: None,
            kind,
            skip_when: Vec::new(),
        }
    }

    fn skip_equals(mut self, attr: &str, value: &str) -> Self {
        self.skip_when.push(SkipWhen {
            attr: attr.to_string(),
            equals: Some(value.to_string()),
        });
        self
    }
}

/// The full candidate-selection configuration for a document.
///
/// Nodes already carrying `uri_attribute` are always excluded, which makes
/// a re-run over an enriched document a no-op.
#[derive(Debug, Clone)]
pub struct SelectionRules {
    /// Attribute that receives the resolved URI (`authfilenumber` in EAD).
    pub uri_attribute: String,
    /// The rules, tried in order; the first match wins.
    pub rules: Vec<SelectionRule>,
}

impl Default for SelectionRules {
    /// The classic EAD selection set: controlled-access headings plus
    /// origination names, skipping locally-sourced subjects.
    fn default() -> Self {
        use HeadingKind::{CorporateName, PersonalName, Subject};
        let controlaccess: &[&str] = &["archdesc", "controlaccess"];
        let origination: &[&str] = &["archdesc", "did", "origination"];
        Self {
            uri_attribute: "authfilenumber".to_string(),
            rules: vec![
                SelectionRule::new(controlaccess, "subject", Subject)
                    .skip_equals("source", "local"),
                SelectionRule::new(controlaccess, "persname", PersonalName),
                SelectionRule::new(controlaccess, "famname", PersonalName),
                SelectionRule::new(controlaccess, "corpname", CorporateName),
                SelectionRule::new(origination, "persname", PersonalName),
                SelectionRule::new(origination, "famname", PersonalName),
                SelectionRule::new(origination, "corpname", CorporateName),
                // Every other origination creator element (e.g. a bare
                // name) goes to the personal-name index.
                SelectionRule::any_element(origination, PersonalName),
            ],
        }
    }
}

#[derive(Debug, Clone)]
struct ElementNode {
    /// Qualified name as it appeared in the source.
    name: String,
    /// Attribute pairs; values unescaped.
    attrs: Vec<(String, String)>,
    children: Vec<NodeId>,
    self_closing: bool,
}

#[derive(Debug, Clone)]
enum XmlNode {
    Element(ElementNode),
    /// Character data in its escaped source form.
    Text(String),
    Comment(String),
    CData(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// A parsed EAD record, mutable in place.
pub struct EadDocument {
    nodes: Vec<XmlNode>,
    parents: Vec<Option<NodeId>>,
    roots: Vec<NodeId>,
    decl: Option<(String, Option<String>, Option<String>)>,
    rules: SelectionRules,
}

fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

/// Comment text may not contain `--` and may not end with `-` (XML 1.0
/// §2.5). Normalized subject keys routinely carry `--`, so pad offending
/// hyphens with a space. Comments are not entity-parsed; everything else
/// goes through verbatim.
fn comment_text(note: &str) -> String {
    let mut out = String::with_capacity(note.len());
    for ch in note.chars() {
        if ch == '-' && out.ends_with('-') {
            out.push(' ');
        }
        out.push(ch);
    }
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

impl EadDocument {
    /// Parse a record from a string.
    ///
    /// # Errors
    /// `DocumentError::Parse` on malformed XML.
    pub fn from_str(xml: &str, rules: SelectionRules) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);

        let mut doc = Self {
            nodes: Vec::new(),
            parents: Vec::new(),
            roots: Vec::new(),
            decl: None,
            rules,
        };
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Decl(d)) => {
                    let version = d
                        .version()
                        .map(|v| String::from_utf8_lossy(&v).into_owned())
                        .unwrap_or_else(|_| "1.0".to_string());
                    let encoding = d
                        .encoding()
                        .and_then(Result::ok)
                        .map(|v| String::from_utf8_lossy(&v).into_owned());
                    let standalone = d
                        .standalone()
                        .and_then(Result::ok)
                        .map(|v| String::from_utf8_lossy(&v).into_owned());
                    doc.decl = Some((version, encoding, standalone));
                }
                Ok(Event::Start(e)) => {
                    let id = doc.push_element(&e, false, stack.last().copied())?;
                    stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    doc.push_element(&e, true, stack.last().copied())?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(t)) => {
                    let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                    doc.push_node(XmlNode::Text(raw), stack.last().copied());
                }
                Ok(Event::CData(c)) => {
                    let raw = String::from_utf8_lossy(c.as_ref()).into_owned();
                    doc.push_node(XmlNode::CData(raw), stack.last().copied());
                }
                Ok(Event::Comment(c)) => {
                    let raw = String::from_utf8_lossy(c.as_ref()).into_owned();
                    doc.push_node(XmlNode::Comment(raw), stack.last().copied());
                }
                Ok(Event::PI(pi)) => {
                    let raw = String::from_utf8_lossy(pi.as_ref()).into_owned();
                    doc.push_node(XmlNode::ProcessingInstruction(raw), stack.last().copied());
                }
                Ok(Event::DocType(d)) => {
                    let raw = String::from_utf8_lossy(d.as_ref()).into_owned();
                    doc.push_node(XmlNode::DocType(raw), stack.last().copied());
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(DocumentError::Parse(e.to_string())),
            }
        }

        if doc.roots.iter().all(|&id| !matches!(doc.nodes[id], XmlNode::Element(_))) {
            return Err(DocumentError::Parse("no root element".to_string()));
        }

        Ok(doc)
    }

    /// Parse a record from a file.
    ///
    /// # Errors
    /// `DocumentError::Io` on read failure, `DocumentError::Parse` on
    /// malformed XML.
    pub fn from_path(path: impl AsRef<Path>, rules: SelectionRules) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)
            .map_err(|e| DocumentError::io(path.display().to_string(), &e))?;
        Self::from_str(&xml, rules)
    }

    fn push_element(
        &mut self,
        e: &BytesStart<'_>,
        self_closing: bool,
        parent: Option<NodeId>,
    ) -> Result<NodeId, DocumentError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| DocumentError::Parse(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(std::borrow::Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            attrs.push((key, value));
        }

        Ok(self.push_node(
            XmlNode::Element(ElementNode {
                name,
                attrs,
                children: Vec::new(),
                self_closing,
            }),
            parent,
        ))
    }

    fn push_node(&mut self, node: XmlNode, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.parents.push(parent);
        match parent {
            Some(parent_id) => {
                if let XmlNode::Element(el) = &mut self.nodes[parent_id] {
                    el.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        id
    }

    /// Concatenated, unescaped text content of a node's subtree.
    fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id] {
            XmlNode::Text(raw) => match unescape(raw) {
                Ok(text) => out.push_str(&text),
                Err(_) => out.push_str(raw),
            },
            XmlNode::CData(raw) => out.push_str(raw),
            XmlNode::Element(el) => {
                for &child in &el.children {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id] {
            XmlNode::Element(el) => el
                .attrs
                .iter()
                .find(|(k, _)| local_name(k) == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn rule_matches(&self, id: NodeId, ancestors: &[String], rule: &SelectionRule) -> bool {
        let XmlNode::Element(el) = &self.nodes[id] else {
            return false;
        };
        if let Some(element) = &rule.element {
            if local_name(&el.name) != element {
                return false;
            }
        }

        // The innermost ancestors must end with the rule's chain.
        if ancestors.len() < rule.ancestors.len()
            || ancestors[ancestors.len() - rule.ancestors.len()..] != rule.ancestors[..]
        {
            return false;
        }

        // Never reprocess a node that already carries an identifier.
        if self.attribute(id, &self.rules.uri_attribute).is_some() {
            return false;
        }

        for skip in &rule.skip_when {
            match (&skip.equals, self.attribute(id, &skip.attr)) {
                (None, Some(_)) => return false,
                (Some(value), Some(actual)) if actual == value => return false,
                _ => {}
            }
        }

        true
    }

    fn select_into(&self, id: NodeId, ancestors: &mut Vec<String>, out: &mut Vec<CandidateRef>) {
        let XmlNode::Element(el) = &self.nodes[id] else {
            return;
        };

        if let Some(rule) = self
            .rules
            .rules
            .iter()
            .find(|rule| self.rule_matches(id, ancestors, rule))
        {
            let text = self.text_content(id);
            if !text.trim().is_empty() {
                out.push(CandidateRef {
                    id,
                    text,
                    kind: rule.kind,
                });
            }
            // A selected heading's children are its text, not further
            // candidates.
            return;
        }

        ancestors.push(local_name(&el.name).to_string());
        for &child in &el.children.clone() {
            self.select_into(child, ancestors, out);
        }
        ancestors.pop();
    }

    /// Serialize the document back to XML.
    ///
    /// # Errors
    /// `DocumentError::Parse` if an event cannot be written.
    pub fn to_xml(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new(Vec::new());

        if let Some((version, encoding, standalone)) = &self.decl {
            writer
                .write_event(Event::Decl(BytesDecl::new(
                    version,
                    encoding.as_deref(),
                    standalone.as_deref(),
                )))
                .map_err(|e| DocumentError::Parse(e.to_string()))?;
        }

        for &id in &self.roots {
            self.write_node(id, &mut writer)?;
        }

        String::from_utf8(writer.into_inner())
            .map_err(|e| DocumentError::Parse(format!("serialized document is not UTF-8: {e}")))
    }

    /// Serialize the document to a file.
    ///
    /// # Errors
    /// `DocumentError::Io` on write failure.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let xml = self.to_xml()?;
        std::fs::write(path, xml).map_err(|e| DocumentError::io(path.display().to_string(), &e))
    }

    fn write_node(&self, id: NodeId, writer: &mut Writer<Vec<u8>>) -> Result<(), DocumentError> {
        match &self.nodes[id] {
            XmlNode::Element(el) => {
                let mut start = BytesStart::new(el.name.as_str());
                for (key, value) in &el.attrs {
                    start.push_attribute((key.as_str(), value.as_str()));
                }

                if el.children.is_empty() && el.self_closing {
                    writer.write_event(Event::Empty(start)).map_err(|e| DocumentError::Parse(e.to_string()))?;
                } else {
                    writer.write_event(Event::Start(start)).map_err(|e| DocumentError::Parse(e.to_string()))?;
                    for &child in &el.children {
                        self.write_node(child, writer)?;
                    }
                    writer
                        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
                        .map_err(|e| DocumentError::Parse(e.to_string()))?;
                }
            }
            XmlNode::Text(raw) => {
                writer
                    .write_event(Event::Text(BytesText::from_escaped(raw.as_str())))
                    .map_err(|e| DocumentError::Parse(e.to_string()))?;
            }
            XmlNode::CData(raw) => {
                writer
                    .write_event(Event::CData(BytesCData::new(raw.as_str())))
                    .map_err(|e| DocumentError::Parse(e.to_string()))?;
            }
            XmlNode::Comment(raw) => {
                writer
                    .write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))
                    .map_err(|e| DocumentError::Parse(e.to_string()))?;
            }
            XmlNode::ProcessingInstruction(raw) => {
                writer
                    .write_event(Event::PI(BytesPI::new(raw.as_str())))
                    .map_err(|e| DocumentError::Parse(e.to_string()))?;
            }
            XmlNode::DocType(raw) => {
                writer
                    .write_event(Event::DocType(BytesText::from_escaped(raw.as_str())))
                    .map_err(|e| DocumentError::Parse(e.to_string()))?;
            }
        }

        Ok(())
    }

    /// Text content of the first element with the given local name, if
    /// any. EAD callers use this for the `eadid` in log prefixes.
    #[must_use]
    pub fn first_element_text(&self, name: &str) -> Option<String> {
        (0..self.nodes.len()).find_map(|id| match &self.nodes[id] {
            XmlNode::Element(el) if local_name(&el.name) == name => {
                let text = self.text_content(id);
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => None,
        })
    }
}

impl HeadingDocument for EadDocument {
    fn candidates(&self) -> Vec<CandidateRef> {
        let mut out = Vec::new();
        let mut ancestors = Vec::new();
        for &id in &self.roots {
            self.select_into(id, &mut ancestors, &mut out);
        }
        out
    }

    fn set_authority_uri(&mut self, id: NodeId, uri: &str) {
        let attr_name = self.rules.uri_attribute.clone();
        if let XmlNode::Element(el) = &mut self.nodes[id] {
            if let Some(pair) = el.attrs.iter_mut().find(|(k, _)| local_name(k) == attr_name) {
                pair.1 = uri.to_string();
            } else {
                el.attrs.push((attr_name, uri.to_string()));
            }
        }
    }

    fn replace_text(&mut self, id: NodeId, text: &str) {
        let raw = escape(text).into_owned();
        let text_id = self.nodes.len();
        self.nodes.push(XmlNode::Text(raw));
        self.parents.push(Some(id));
        if let XmlNode::Element(el) = &mut self.nodes[id] {
            el.children = vec![text_id];
            el.self_closing = false;
        }
    }

    fn annotate(&mut self, id: NodeId, note: &str) {
        let comment_id = self.nodes.len();
        self.nodes.push(XmlNode::Comment(comment_text(note)));
        self.parents.push(self.parents[id]);

        match self.parents[id] {
            Some(parent_id) => {
                if let XmlNode::Element(el) = &mut self.nodes[parent_id] {
                    let position = el.children.iter().position(|&c| c == id);
                    match position {
                        Some(at) => el.children.insert(at + 1, comment_id),
                        None => el.children.push(comment_id),
                    }
                }
            }
            None => {
                let position = self.roots.iter().position(|&c| c == id);
                match position {
                    Some(at) => self.roots.insert(at + 1, comment_id),
                    None => self.roots.push(comment_id),
                }
            }
        }
    }
}
