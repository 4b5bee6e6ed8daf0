//! XML gateway for CAML view documents.
//!
//! This module parses a raw CAML string into a [`ViewDom`]: an arena-backed
//! XML tree plus handles to the structural elements the rest of the crate
//! works with (`View`, `Query`, `ViewFields`, `OrderBy`, `GroupBy`, `Where`,
//! `RowLimit`). Nodes are addressed by copyable [`xot::Node`] handles owned
//! by a single `ViewDom`, never shared across documents.
//!
//! The gateway only ever scans *direct* children when locating structural
//! elements: `Query`, `ViewFields` and `RowLimit` directly under `View`, and
//! `OrderBy`, `GroupBy` and `Where` directly under `Query`. A `Query` or
//! `ViewFields` element is synthesized when missing, so both always exist
//! after a successful parse. When a structural tag appears more than once,
//! the first occurrence wins and later duplicates are ignored (but left in
//! the tree untouched).

use xot::{NameId, Node, Xot};

use crate::error::{CamlError, CamlResult};

/// The source string an empty view is built from.
pub const DEFAULT_VIEW_XML: &str = "<View/>";

/// Interned name ids for every load-bearing CAML tag and attribute.
///
/// All dispatch on tag names goes through these ids rather than string
/// comparison; an unknown tag simply matches none of them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CamlNames {
    // Structural elements
    pub view: NameId,
    pub query: NameId,
    pub view_fields: NameId,
    pub order_by: NameId,
    pub group_by: NameId,
    pub where_: NameId,
    pub row_limit: NameId,

    // Filter elements
    pub field_ref: NameId,
    pub value: NameId,
    pub values: NameId,
    pub today: NameId,
    pub and: NameId,
    pub or: NameId,
    pub eq: NameId,
    pub neq: NameId,
    pub geq: NameId,
    pub gt: NameId,
    pub leq: NameId,
    pub lt: NameId,
    pub begins_with: NameId,
    pub contains: NameId,
    pub includes: NameId,
    pub not_includes: NameId,
    pub is_null: NameId,
    pub is_not_null: NameId,
    pub membership: NameId,
    pub in_: NameId,

    // Attributes
    pub name: NameId,
    pub ascending: NameId,
    pub lookup_id: NameId,
    pub collapse: NameId,
    pub paged: NameId,
    pub type_: NameId,
    pub include_time_value: NameId,
    pub offset: NameId,
    pub offset_days: NameId,
    pub id: NameId,
}

impl CamlNames {
    /// Interns every CAML name in the given arena.
    pub(crate) fn register(xot: &mut Xot) -> Self {
        CamlNames {
            view: xot.add_name("View"),
            query: xot.add_name("Query"),
            view_fields: xot.add_name("ViewFields"),
            order_by: xot.add_name("OrderBy"),
            group_by: xot.add_name("GroupBy"),
            where_: xot.add_name("Where"),
            row_limit: xot.add_name("RowLimit"),
            field_ref: xot.add_name("FieldRef"),
            value: xot.add_name("Value"),
            values: xot.add_name("Values"),
            today: xot.add_name("Today"),
            and: xot.add_name("And"),
            or: xot.add_name("Or"),
            eq: xot.add_name("Eq"),
            neq: xot.add_name("Neq"),
            geq: xot.add_name("Geq"),
            gt: xot.add_name("Gt"),
            leq: xot.add_name("Leq"),
            lt: xot.add_name("Lt"),
            begins_with: xot.add_name("BeginsWith"),
            contains: xot.add_name("Contains"),
            includes: xot.add_name("Includes"),
            not_includes: xot.add_name("NotIncludes"),
            is_null: xot.add_name("IsNull"),
            is_not_null: xot.add_name("IsNotNull"),
            membership: xot.add_name("Membership"),
            in_: xot.add_name("In"),
            name: xot.add_name("Name"),
            ascending: xot.add_name("Ascending"),
            lookup_id: xot.add_name("LookupId"),
            collapse: xot.add_name("Collapse"),
            paged: xot.add_name("Paged"),
            type_: xot.add_name("Type"),
            include_time_value: xot.add_name("IncludeTimeValue"),
            offset: xot.add_name("Offset"),
            offset_days: xot.add_name("OffsetDays"),
            id: xot.add_name("id"),
        }
    }
}

/// Handles to the structural elements of a parsed view document.
///
/// `query` and `view_fields` always exist after a parse (they are created
/// when the source omits them); the remaining handles are present only when
/// the source carried the element. The snapshot reflects the tree as it was
/// at parse time; mutators re-locate optional elements live since they may
/// create or remove them.
#[derive(Debug, Clone, Copy)]
pub struct ViewDomParts {
    /// The document node.
    pub document: Node,
    /// The `View` root element.
    pub view: Node,
    /// The `Query` element (synthesized when absent from the source).
    pub query: Node,
    /// The `ViewFields` element (synthesized when absent from the source).
    pub view_fields: Node,
    /// The `RowLimit` element, when present.
    pub row_limit: Option<Node>,
    /// The `OrderBy` element under `Query`, when present.
    pub order_by: Option<Node>,
    /// The `GroupBy` element under `Query`, when present.
    pub group_by: Option<Node>,
    /// The `Where` element under `Query`, when present.
    pub where_: Option<Node>,
}

/// A parsed CAML view document: the XML arena plus structural handles.
///
/// The arena and every node handle in [`ViewDomParts`] are owned exclusively
/// by this value. A `ViewDom` is cheap to navigate and mutate in place; it is
/// rebuilt from scratch whenever the source string changes.
#[derive(Debug)]
pub struct ViewDom {
    pub(crate) xot: Xot,
    pub(crate) names: CamlNames,
    pub(crate) parts: ViewDomParts,
}

impl ViewDom {
    /// Parses a CAML view string into a document.
    ///
    /// # Errors
    ///
    /// Returns [`CamlError::MalformedXml`] when the string is not well-formed
    /// XML and [`CamlError::WrongRootElement`] when the root tag is anything
    /// other than `View` (matched case-sensitively).
    pub fn parse(xml: &str) -> CamlResult<ViewDom> {
        let mut xot = Xot::new();
        let names = CamlNames::register(&mut xot);

        let document = xot
            .parse(xml)
            .map_err(|e| CamlError::malformed(e.to_string()))?;
        let view = xot
            .document_element(document)
            .map_err(|e| CamlError::malformed(e.to_string()))?;
        let root_name = match xot.element(view) {
            Some(element) => element.name(),
            None => return Err(CamlError::malformed("document has no root element")),
        };
        if root_name != names.view {
            let (local, _) = xot.name_ns_str(root_name);
            return Err(CamlError::wrong_root(local));
        }

        // First occurrence wins for every structural tag.
        let mut query = find_direct_child(&xot, view, names.query);
        let mut view_fields = find_direct_child(&xot, view, names.view_fields);
        let row_limit = find_direct_child(&xot, view, names.row_limit);

        if view_fields.is_none() {
            let node = xot.new_element(names.view_fields);
            xot.append(view, node)
                .map_err(|e| CamlError::dom(e.to_string()))?;
            view_fields = Some(node);
        }
        if query.is_none() {
            let node = xot.new_element(names.query);
            xot.append(view, node)
                .map_err(|e| CamlError::dom(e.to_string()))?;
            query = Some(node);
        }
        // Both branches above guarantee the handles exist.
        let (query, view_fields) = match (query, view_fields) {
            (Some(q), Some(v)) => (q, v),
            _ => return Err(CamlError::dom("failed to synthesize Query/ViewFields")),
        };

        let order_by = find_direct_child(&xot, query, names.order_by);
        let group_by = find_direct_child(&xot, query, names.group_by);
        let where_ = find_direct_child(&xot, query, names.where_);

        Ok(ViewDom {
            xot,
            names,
            parts: ViewDomParts {
                document,
                view,
                query,
                view_fields,
                row_limit,
                order_by,
                group_by,
                where_,
            },
        })
    }

    /// The DOM of an empty view, the tree behind [`DEFAULT_VIEW_XML`].
    ///
    /// `Query` and `ViewFields` are synthesized as usual, so the result is
    /// ready for mutation straight away.
    pub fn empty() -> ViewDom {
        ViewDom::parse(DEFAULT_VIEW_XML).expect("the default view literal is well formed")
    }

    /// Returns the structural handles captured at parse time.
    pub fn parts(&self) -> &ViewDomParts {
        &self.parts
    }

    /// Serializes the subtree rooted at `node` back to an XML string.
    pub fn serialize(&self, node: Node) -> CamlResult<String> {
        self.xot
            .to_string(node)
            .map_err(|e| CamlError::serialize(e.to_string()))
    }

    /// Live lookup of the `OrderBy` element under `Query`.
    pub(crate) fn order_by(&self) -> Option<Node> {
        find_direct_child(&self.xot, self.parts.query, self.names.order_by)
    }

    /// Live lookup of the `GroupBy` element under `Query`.
    pub(crate) fn group_by(&self) -> Option<Node> {
        find_direct_child(&self.xot, self.parts.query, self.names.group_by)
    }

    /// Live lookup of the `Where` element under `Query`.
    pub(crate) fn where_node(&self) -> Option<Node> {
        find_direct_child(&self.xot, self.parts.query, self.names.where_)
    }

    /// Live lookup of the `RowLimit` element under `View`.
    pub(crate) fn row_limit_node(&self) -> Option<Node> {
        find_direct_child(&self.xot, self.parts.view, self.names.row_limit)
    }

    /// Returns the element children of `node` in document order.
    pub(crate) fn element_children(&self, node: Node) -> Vec<Node> {
        element_children(&self.xot, node)
    }

    /// Returns the name id of `node` when it is an element.
    pub(crate) fn element_name(&self, node: Node) -> Option<NameId> {
        self.xot.element(node).map(|e| e.name())
    }

    /// Reads an attribute value off an element node.
    pub(crate) fn attribute(&self, node: Node, name: NameId) -> Option<String> {
        attribute(&self.xot, node, name)
    }

    /// Reads a `TRUE`/`FALSE` attribute, falling back to `default` when the
    /// attribute is absent or carries any other text.
    pub(crate) fn bool_attribute(&self, node: Node, name: NameId, default: bool) -> bool {
        match self.attribute(node, name) {
            Some(value) => parse_caml_bool(&value, default),
            None => default,
        }
    }

    /// Concatenated text content of the direct text children of `node`.
    ///
    /// Returns `None` when the node has no text children at all, which is
    /// distinct from an empty string.
    pub(crate) fn text_content(&self, node: Node) -> Option<String> {
        text_content(&self.xot, node)
    }

    /// Finds the `FieldRef` child of `parent` whose `Name` is `field_name`.
    pub(crate) fn find_field_ref(&self, parent: Node, field_name: &str) -> Option<Node> {
        self.element_children(parent).into_iter().find(|&child| {
            self.element_name(child) == Some(self.names.field_ref)
                && self.attribute(child, self.names.name).as_deref() == Some(field_name)
        })
    }

    /// Collects the `FieldRef` element children of `parent`.
    pub(crate) fn field_refs(&self, parent: Node) -> Vec<Node> {
        self.element_children(parent)
            .into_iter()
            .filter(|&child| self.element_name(child) == Some(self.names.field_ref))
            .collect()
    }

    /// Creates a new detached element.
    pub(crate) fn new_element(&mut self, name: NameId) -> Node {
        self.xot.new_element(name)
    }

    /// Creates a new element and appends it to `parent`.
    pub(crate) fn append_new(&mut self, parent: Node, name: NameId) -> Node {
        let node = self.xot.new_element(name);
        // A freshly created node is unattached; appending it cannot fail.
        let _ = self.xot.append(parent, node);
        node
    }

    /// Appends a detached node to `parent`.
    pub(crate) fn append(&mut self, parent: Node, node: Node) {
        let _ = self.xot.append(parent, node);
    }

    /// Inserts a detached node immediately before `reference`.
    pub(crate) fn insert_before(&mut self, reference: Node, node: Node) {
        let _ = self.xot.insert_before(reference, node);
    }

    /// Detaches `node` from its parent, keeping its subtree alive.
    pub(crate) fn detach(&mut self, node: Node) {
        let _ = self.xot.detach(node);
    }

    /// Removes `node` and its subtree from the tree.
    pub(crate) fn remove(&mut self, node: Node) {
        let _ = self.xot.remove(node);
    }

    /// Sets an attribute on an element node.
    pub(crate) fn set_attribute(&mut self, node: Node, name: NameId, value: &str) {
        self.xot.attributes_mut(node).insert(name, value.to_string());
    }

    /// Removes an attribute from an element node, reporting whether it was
    /// present.
    pub(crate) fn remove_attribute(&mut self, node: Node, name: NameId) -> bool {
        let present = self.attribute(node, name).is_some();
        if present {
            self.xot.attributes_mut(node).remove(name);
        }
        present
    }

    /// Replaces the text content of `node` with a single text node.
    pub(crate) fn set_text(&mut self, node: Node, value: &str) {
        let children: Vec<Node> = self.xot.children(node).collect();
        let mut replaced = false;
        for child in children {
            if self.xot.text(child).is_none() {
                continue;
            }
            if replaced {
                let _ = self.xot.remove(child);
            } else if let Some(text) = self.xot.text_mut(child) {
                text.set(value.to_string());
                replaced = true;
            }
        }
        if !replaced {
            let text = self.xot.new_text(value);
            let _ = self.xot.append(node, text);
        }
    }

    /// Deep-copies a subtree (elements, attributes and text) into this
    /// document, returning the detached copy.
    ///
    /// Comments and processing instructions are not carried over; filter
    /// fragments never contain them.
    pub(crate) fn deep_copy(&mut self, source: Node) -> Option<Node> {
        if let Some(element) = self.xot.element(source) {
            let name = element.name();
            let attributes: Vec<(NameId, String)> = self
                .xot
                .attributes(source)
                .iter()
                .map(|(attr, value)| (attr, value.clone()))
                .collect();
            let copy = self.xot.new_element(name);
            for (attr, value) in attributes {
                self.xot.attributes_mut(copy).insert(attr, value);
            }
            let children: Vec<Node> = self.xot.children(source).collect();
            for child in children {
                if let Some(child_copy) = self.deep_copy(child) {
                    let _ = self.xot.append(copy, child_copy);
                }
            }
            Some(copy)
        } else if let Some(text) = self.xot.text(source) {
            let value = text.get().to_string();
            Some(self.xot.new_text(&value))
        } else {
            None
        }
    }

    /// Collects every descendant node of `node` (excluding `node` itself) in
    /// document order.
    pub(crate) fn collect_descendants(&self, node: Node) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut stack: Vec<Node> = self.xot.children(node).collect();
        stack.reverse();
        while let Some(current) = stack.pop() {
            nodes.push(current);
            let mut children: Vec<Node> = self.xot.children(current).collect();
            children.reverse();
            stack.append(&mut children);
        }
        nodes
    }
}

/// Finds the first direct element child of `parent` with the given name.
pub(crate) fn find_direct_child(xot: &Xot, parent: Node, name: NameId) -> Option<Node> {
    xot.children(parent)
        .find(|&child| xot.element(child).map(|e| e.name()) == Some(name))
}

/// Collects the element children of `node` in document order.
pub(crate) fn element_children(xot: &Xot, node: Node) -> Vec<Node> {
    xot.children(node)
        .filter(|&child| xot.element(child).is_some())
        .collect()
}

/// Reads an attribute value off an element node.
pub(crate) fn attribute(xot: &Xot, node: Node, name: NameId) -> Option<String> {
    if xot.element(node).is_none() {
        return None;
    }
    xot.attributes(node).get(name).map(|value| value.to_string())
}

/// Concatenated text content of the direct text children of `node`.
pub(crate) fn text_content(xot: &Xot, node: Node) -> Option<String> {
    let mut found = false;
    let mut content = String::new();
    for child in xot.children(node) {
        if let Some(text) = xot.text(child) {
            found = true;
            content.push_str(text.get());
        }
    }
    found.then_some(content)
}

/// Parses a CAML boolean attribute value.
///
/// CAML writes booleans as `TRUE`/`FALSE` but readers accept any casing;
/// unrecognized text falls back to the provided default.
pub(crate) fn parse_caml_bool(value: &str, default: bool) -> bool {
    if value.eq_ignore_ascii_case("true") {
        true
    } else if value.eq_ignore_ascii_case("false") {
        false
    } else {
        default
    }
}
