//! Mutable view model over a CAML document.
//!
//! A [`View`] owns its source XML string and a lazily-built DOM. The string
//! stays the source of truth until a mutator actually changes the tree:
//! serializing a clean view returns the original string byte-for-byte, and
//! only a dirty view is re-serialized from the live tree.
//!
//! The model moves through four states. *Unparsed* (no DOM yet) becomes
//! *parsed-clean* the first time an accessor or mutator needs the tree;
//! a successful mutation moves it to *parsed-dirty*; a gateway failure
//! parks it in a sticky *parse-error* state in which every mutator is a
//! no-op and the condition is reported through [`View::has_parse_error`]
//! rather than re-thrown. Assigning a new source string resets the state
//! machine and clears every modification flag.

use std::collections::HashMap;

use xot::Node;

use crate::arrange::{ArrangeInfo, GroupBy, OrderedField, RowLimit};
use crate::dom::{ViewDom, DEFAULT_VIEW_XML};
use crate::error::{CamlError, CamlResult};

/// The per-category modification flags of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewModification {
    /// Displayed fields changed.
    FieldNames,
    /// Sort order changed.
    Sorts,
    /// Grouping changed.
    GroupBy,
    /// Filters changed.
    Filters,
    /// Row limit changed.
    RowLimit,
}

/// Dirty-tracking flags, one per modification category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Modifications {
    field_names: bool,
    sorts: bool,
    group_by: bool,
    filters: bool,
    row_limit: bool,
}

impl Modifications {
    fn set(&mut self, category: ViewModification) {
        match category {
            ViewModification::FieldNames => self.field_names = true,
            ViewModification::Sorts => self.sorts = true,
            ViewModification::GroupBy => self.group_by = true,
            ViewModification::Filters => self.filters = true,
            ViewModification::RowLimit => self.row_limit = true,
        }
    }

    fn is_set(&self, category: ViewModification) -> bool {
        match category {
            ViewModification::FieldNames => self.field_names,
            ViewModification::Sorts => self.sorts,
            ViewModification::GroupBy => self.group_by,
            ViewModification::Filters => self.filters,
            ViewModification::RowLimit => self.row_limit,
        }
    }

    fn any(&self) -> bool {
        self.field_names || self.sorts || self.group_by || self.filters || self.row_limit
    }
}

/// Options for [`View::update_sort`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortUpdateOptions {
    /// Remove the given field's sort instead of setting it.
    pub remove_sort: bool,
    /// Wipe all existing sort entries first (the `OrderBy` element's own
    /// attributes survive).
    pub overwrite_all: bool,
    /// Insert a newly added sort entry first instead of last.
    pub prepend: bool,
}

/// The batch payload for [`View::update_all`].
///
/// Every part is optional; `None` leaves that category untouched. Filters
/// are accepted only as pre-serialized CAML fragment strings: there is no
/// structured setter mirroring the [`crate::Filter`] records the parser
/// emits. That asymmetry is long-standing and preserved on purpose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewUpdate {
    /// New sort order: the first entry overwrites all existing sorts, the
    /// rest are appended.
    pub sorts: Option<Vec<OrderedField>>,
    /// New grouping.
    pub group_by: Option<GroupBy>,
    /// New displayed fields, replacing the current set.
    pub field_names: Option<Vec<String>>,
    /// New row limit.
    pub row_limit: Option<RowLimit>,
    /// Pre-serialized CAML filter fragments replacing the current `Where`
    /// content. An empty list clears the filters.
    pub filters: Option<Vec<String>>,
}

/// A mutable CAML view: source XML, lazily-built DOM and dirty tracking.
#[derive(Debug)]
pub struct View {
    base_view_xml: String,
    dom: Option<ViewDom>,
    parse_failed: bool,
    modifications: Modifications,
}

impl Default for View {
    fn default() -> Self {
        View::new(DEFAULT_VIEW_XML)
    }
}

impl View {
    /// Creates a view over the given CAML source string.
    ///
    /// The string is not parsed yet; parsing happens on first access and a
    /// malformed string surfaces through [`View::has_parse_error`].
    pub fn new(base_view_xml: impl Into<String>) -> Self {
        View {
            base_view_xml: base_view_xml.into(),
            dom: None,
            parse_failed: false,
            modifications: Modifications::default(),
        }
    }

    /// The current source XML string.
    pub fn base_view_xml(&self) -> &str {
        &self.base_view_xml
    }

    /// Replaces the source XML string.
    ///
    /// The DOM is dropped, a previous parse error is forgotten and every
    /// modification flag is cleared; the view is back in the unparsed state.
    pub fn set_base_view_xml(&mut self, xml: impl Into<String>) {
        self.base_view_xml = xml.into();
        self.dom = None;
        self.parse_failed = false;
        self.modifications = Modifications::default();
    }

    /// Whether the current source string failed to parse.
    ///
    /// Triggers the lazy parse when it has not happened yet. While this
    /// returns true every mutator is a no-op and the view's arrangement is
    /// unknown.
    pub fn has_parse_error(&mut self) -> bool {
        self.ensure_dom();
        self.parse_failed
    }

    /// Whether any mutator changed the tree since the last source
    /// assignment.
    pub fn is_dirty(&self) -> bool {
        self.modifications.any()
    }

    /// Whether the given category was modified.
    pub fn is_modified(&self, category: ViewModification) -> bool {
        self.modifications.is_set(category)
    }

    /// The structured arrangement of this view, or `None` after a parse
    /// failure.
    pub fn arrange_info(&mut self) -> Option<ArrangeInfo> {
        if !self.ensure_dom() {
            return None;
        }
        self.dom.as_ref().map(ArrangeInfo::from_dom)
    }

    /// Idempotent ensure-step: builds the DOM for the current source if it
    /// is not built yet. Returns false while in the parse-error state.
    fn ensure_dom(&mut self) -> bool {
        if self.parse_failed {
            return false;
        }
        if self.dom.is_none() {
            match ViewDom::parse(&self.base_view_xml) {
                Ok(dom) => self.dom = Some(dom),
                Err(_) => {
                    self.parse_failed = true;
                    return false;
                }
            }
        }
        true
    }

    // ==================== Sorts ====================

    /// Updates the sort order.
    ///
    /// With `remove_sort` the given field's entry is deleted (and the whole
    /// `OrderBy` with it when it was the last one). With `overwrite_all`
    /// every existing entry is wiped first. Otherwise an existing entry for
    /// the field has its direction updated in place, and a new field is
    /// appended (or prepended with `prepend`).
    ///
    /// No-ops: no field given without `overwrite_all`; `remove_sort` when
    /// the view has no `OrderBy`; `remove_sort` for a field that is not
    /// sorted on.
    pub fn update_sort(&mut self, field: Option<&OrderedField>, options: SortUpdateOptions) {
        if field.is_none() && !options.overwrite_all {
            return;
        }
        if !self.ensure_dom() {
            return;
        }
        let Some(dom) = self.dom.as_mut() else {
            return;
        };
        let names = dom.names;
        let order_by = dom.order_by();

        if options.remove_sort {
            let (Some(order_by), Some(field)) = (order_by, field) else {
                return;
            };
            let Some(entry) = dom.find_field_ref(order_by, &field.field_name) else {
                return;
            };
            dom.remove(entry);
            if dom.element_children(order_by).is_empty() {
                dom.remove(order_by);
            }
            self.modifications.set(ViewModification::Sorts);
            return;
        }

        let query = dom.parts.query;
        let order_by = order_by.unwrap_or_else(|| dom.append_new(query, names.order_by));

        if options.overwrite_all {
            for child in dom.element_children(order_by) {
                dom.remove(child);
            }
            if let Some(field) = field {
                let entry = dom.append_new(order_by, names.field_ref);
                dom.set_attribute(entry, names.name, &field.field_name);
                dom.set_attribute(entry, names.ascending, caml_bool(field.is_ascending));
            }
            self.modifications.set(ViewModification::Sorts);
            return;
        }

        // Guarded above: a non-overwrite update always carries a field.
        let Some(field) = field else {
            return;
        };
        if let Some(existing) = dom.find_field_ref(order_by, &field.field_name) {
            dom.set_attribute(existing, names.ascending, caml_bool(field.is_ascending));
        } else {
            let entry = dom.new_element(names.field_ref);
            dom.set_attribute(entry, names.name, &field.field_name);
            dom.set_attribute(entry, names.ascending, caml_bool(field.is_ascending));
            match dom
                .element_children(order_by)
                .into_iter()
                .next()
                .filter(|_| options.prepend)
            {
                Some(first) => dom.insert_before(first, entry),
                None => dom.append(order_by, entry),
            }
        }
        self.modifications.set(ViewModification::Sorts);
    }

    // ==================== Grouping ====================

    /// Updates or removes the grouping.
    ///
    /// `None` (or a grouping whose first level has an empty field name)
    /// removes the `GroupBy` element entirely. Otherwise the element is
    /// created or reused, `Collapse` is set, and the first and second
    /// `FieldRef` slots are reconciled in place; the second slot is dropped
    /// when `group2` is absent or names the same field as `group1`.
    pub fn update_group_by(&mut self, group_by: Option<&GroupBy>) {
        if !self.ensure_dom() {
            return;
        }
        let Some(dom) = self.dom.as_mut() else {
            return;
        };
        let names = dom.names;

        let valid = group_by.filter(|g| !g.group1.field_name.is_empty());
        let Some(group) = valid else {
            if let Some(node) = dom.group_by() {
                dom.remove(node);
                self.modifications.set(ViewModification::GroupBy);
            }
            return;
        };

        let query = dom.parts.query;
        let node = dom
            .group_by()
            .unwrap_or_else(|| dom.append_new(query, names.group_by));
        dom.set_attribute(node, names.collapse, caml_bool(group.is_collapsed));

        let slots = dom.field_refs(node);
        let first = slots
            .first()
            .copied()
            .unwrap_or_else(|| dom.append_new(node, names.field_ref));
        dom.set_attribute(first, names.name, &group.group1.field_name);
        dom.set_attribute(first, names.ascending, caml_bool(group.group1.is_ascending));

        let second_wanted = group
            .group2
            .as_ref()
            .filter(|g2| !g2.field_name.is_empty() && g2.field_name != group.group1.field_name);
        match (slots.get(1).copied(), second_wanted) {
            (Some(slot), Some(level)) => {
                dom.set_attribute(slot, names.name, &level.field_name);
                dom.set_attribute(slot, names.ascending, caml_bool(level.is_ascending));
            }
            (None, Some(level)) => {
                let slot = dom.append_new(node, names.field_ref);
                dom.set_attribute(slot, names.name, &level.field_name);
                dom.set_attribute(slot, names.ascending, caml_bool(level.is_ascending));
            }
            (Some(slot), None) => dom.remove(slot),
            (None, None) => {}
        }
        self.modifications.set(ViewModification::GroupBy);
    }

    // ==================== Displayed Fields ====================

    /// Moves or inserts a single displayed field.
    ///
    /// An existing occurrence is removed first (keeping its attributes) and
    /// the field is re-inserted at `index`, or appended when `index` is at
    /// or past the end. Without an index the field is moved to the end; in
    /// that case a field that is not displayed at all is a no-op.
    pub fn update_field(&mut self, field_name: &str, index: Option<usize>) {
        if field_name.is_empty() {
            return;
        }
        if !self.ensure_dom() {
            return;
        }
        let Some(dom) = self.dom.as_mut() else {
            return;
        };
        let names = dom.names;
        let view_fields = dom.parts.view_fields;

        let existing = dom.find_field_ref(view_fields, field_name);
        if existing.is_none() && index.is_none() {
            return;
        }

        let entry = match existing {
            Some(node) => {
                dom.detach(node);
                node
            }
            None => {
                let node = dom.new_element(names.field_ref);
                dom.set_attribute(node, names.name, field_name);
                node
            }
        };

        match index {
            Some(index) => {
                let children = dom.element_children(view_fields);
                match children.get(index).copied() {
                    Some(reference) => dom.insert_before(reference, entry),
                    None => dom.append(view_fields, entry),
                }
            }
            None => dom.append(view_fields, entry),
        }
        self.modifications.set(ViewModification::FieldNames);
    }

    /// Replaces the displayed fields with the given names, in order.
    ///
    /// Names already displayed keep their existing `FieldRef` element (and
    /// with it any extra attributes); new names get a bare `FieldRef`. Empty
    /// names are dropped first, and a list that is empty after that is a
    /// no-op.
    pub fn replace_fields(&mut self, field_names: &[String]) {
        let wanted: Vec<&String> = field_names.iter().filter(|n| !n.is_empty()).collect();
        if wanted.is_empty() {
            return;
        }
        if !self.ensure_dom() {
            return;
        }
        let Some(dom) = self.dom.as_mut() else {
            return;
        };
        let names = dom.names;
        let view_fields = dom.parts.view_fields;

        // First occurrence wins when the current list carries duplicates.
        let mut reusable: HashMap<String, Node> = HashMap::new();
        for node in dom.field_refs(view_fields) {
            if let Some(name) = dom.attribute(node, names.name) {
                reusable.entry(name).or_insert(node);
            }
        }

        for child in dom.xot.children(view_fields).collect::<Vec<Node>>() {
            dom.detach(child);
        }

        for name in wanted {
            let entry = match reusable.remove(name.as_str()) {
                Some(node) => node,
                None => {
                    let node = dom.new_element(names.field_ref);
                    dom.set_attribute(node, names.name, name);
                    node
                }
            };
            dom.append(view_fields, entry);
        }

        // Anything not retained is gone for good.
        for (_, node) in reusable {
            dom.remove(node);
        }
        self.modifications.set(ViewModification::FieldNames);
    }

    // ==================== Filters ====================

    /// Removes the `Where` element entirely. No-op when there is none.
    pub fn clear_filters(&mut self) {
        if !self.ensure_dom() {
            return;
        }
        let Some(dom) = self.dom.as_mut() else {
            return;
        };
        if let Some(where_node) = dom.where_node() {
            dom.remove(where_node);
            self.modifications.set(ViewModification::Filters);
        }
    }

    /// Combines pre-serialized CAML filter fragments into the view with AND
    /// semantics.
    ///
    /// When `Where` already has content, its existing subtree becomes the
    /// FIRST operand of a new `And` and the fragment the second. The order
    /// is load-bearing: the first operand is the one expected to hit an
    /// indexed column, so the existing filter must stay in front.
    ///
    /// # Errors
    ///
    /// [`CamlError::EmptyFilterInput`] when no fragment (or a blank one) is
    /// given and [`CamlError::MalformedXml`] when a fragment fails to parse;
    /// in both cases the tree is left untouched. A view in the parse-error
    /// state swallows the call like every other mutator.
    pub fn add_filters(&mut self, caml_fragments: &[String]) -> CamlResult<()> {
        if caml_fragments.is_empty() || caml_fragments.iter().any(|f| f.trim().is_empty()) {
            return Err(CamlError::EmptyFilterInput);
        }
        if !self.ensure_dom() {
            return Ok(());
        }
        let Some(dom) = self.dom.as_mut() else {
            return Ok(());
        };
        let names = dom.names;

        // Parse and copy every fragment up front so a malformed one leaves
        // the view tree untouched.
        let mut fragments: Vec<Node> = Vec::new();
        for fragment in caml_fragments {
            let document = dom
                .xot
                .parse(fragment)
                .map_err(|e| CamlError::malformed(e.to_string()))?;
            let element = dom
                .xot
                .document_element(document)
                .map_err(|e| CamlError::malformed(e.to_string()))?;
            let copy = dom
                .deep_copy(element)
                .ok_or_else(|| CamlError::malformed("fragment has no element content"))?;
            fragments.push(copy);
        }

        let query = dom.parts.query;
        let where_node = dom
            .where_node()
            .unwrap_or_else(|| dom.append_new(query, names.where_));

        for fragment in fragments {
            match dom.element_children(where_node).into_iter().next() {
                Some(existing) => {
                    let and = dom.append_new(where_node, names.and);
                    dom.detach(existing);
                    // Existing subtree first, new fragment second.
                    dom.append(and, existing);
                    dom.append(and, fragment);
                }
                None => dom.append(where_node, fragment),
            }
        }
        self.modifications.set(ViewModification::Filters);
        Ok(())
    }

    // ==================== Row Limit ====================

    /// Sets the row limit, creating the `RowLimit` element when absent.
    ///
    /// A NaN limit is a no-op. The `Paged` attribute is written only when
    /// `is_per_page` is explicitly given; `None` leaves whatever the source
    /// had.
    pub fn update_row_limit(&mut self, row_limit: &RowLimit) {
        if row_limit.row_limit.is_nan() {
            return;
        }
        if !self.ensure_dom() {
            return;
        }
        let Some(dom) = self.dom.as_mut() else {
            return;
        };
        let names = dom.names;
        let view = dom.parts.view;

        let node = dom
            .row_limit_node()
            .unwrap_or_else(|| dom.append_new(view, names.row_limit));
        dom.set_text(node, &format_row_limit(row_limit.row_limit));
        if let Some(paged) = row_limit.is_per_page {
            dom.set_attribute(node, names.paged, caml_bool(paged));
        }
        self.modifications.set(ViewModification::RowLimit);
    }

    // ==================== Batch Update ====================

    /// Applies a whole arrangement update in one call.
    ///
    /// Sorts are applied as overwrite-with-the-first-entry followed by
    /// appending the rest; an explicitly empty sort list wipes the sort
    /// order. A filter list replaces the current `Where` content (an empty
    /// list just clears it).
    ///
    /// # Errors
    ///
    /// Propagates [`View::add_filters`] errors; every other category has
    /// been applied by then.
    pub fn update_all(&mut self, update: &ViewUpdate) -> CamlResult<()> {
        if let Some(field_names) = &update.field_names {
            self.replace_fields(field_names);
        }
        if let Some(sorts) = &update.sorts {
            match sorts.split_first() {
                Some((first, rest)) => {
                    self.update_sort(
                        Some(first),
                        SortUpdateOptions {
                            overwrite_all: true,
                            ..SortUpdateOptions::default()
                        },
                    );
                    for field in rest {
                        self.update_sort(Some(field), SortUpdateOptions::default());
                    }
                }
                None => self.update_sort(
                    None,
                    SortUpdateOptions {
                        overwrite_all: true,
                        ..SortUpdateOptions::default()
                    },
                ),
            }
        }
        if let Some(group_by) = &update.group_by {
            self.update_group_by(Some(group_by));
        }
        if let Some(row_limit) = &update.row_limit {
            self.update_row_limit(row_limit);
        }
        if let Some(filters) = &update.filters {
            self.clear_filters();
            if !filters.is_empty() {
                self.add_filters(filters)?;
            }
        }
        Ok(())
    }

    // ==================== Serialization ====================

    /// The view XML reflecting every mutation.
    ///
    /// A clean view returns the source string verbatim, byte-for-byte; only
    /// a dirty view is re-serialized from the live tree. A view in the
    /// parse-error state is always clean.
    pub fn effective_view_xml(&mut self) -> CamlResult<String> {
        if !self.is_dirty() || !self.ensure_dom() {
            return Ok(self.base_view_xml.clone());
        }
        let Some(dom) = self.dom.as_ref() else {
            return Ok(self.base_view_xml.clone());
        };
        dom.serialize(dom.parts.view)
    }

    /// The XML of the view's `Query` element, with or without the `Query`
    /// tag itself.
    ///
    /// Returns an empty string in the parse-error state.
    pub fn effective_query_xml(&mut self, include_query_tag: bool) -> CamlResult<String> {
        if !self.ensure_dom() {
            return Ok(String::new());
        }
        let Some(dom) = self.dom.as_ref() else {
            return Ok(String::new());
        };
        let query = dom.parts.query;
        if include_query_tag {
            return dom.serialize(query);
        }
        let mut xml = String::new();
        for child in dom.xot.children(query).collect::<Vec<Node>>() {
            xml.push_str(&dom.serialize(child)?);
        }
        Ok(xml)
    }

    /// Produces the XML to persist, with internal tracking attributes
    /// stripped.
    ///
    /// Smart-filter `id` attributes anywhere beneath `Where` are removed
    /// first; stripping one counts as a filter modification, so the result
    /// is re-serialized rather than echoed.
    pub fn prepare_for_saving(&mut self) -> CamlResult<String> {
        if !self.ensure_dom() {
            return Ok(self.base_view_xml.clone());
        }
        if let Some(dom) = self.dom.as_mut() {
            let names = dom.names;
            let mut stripped = false;
            if let Some(where_node) = dom.where_node() {
                for node in dom.collect_descendants(where_node) {
                    if dom.element_name(node).is_some() && dom.remove_attribute(node, names.id) {
                        stripped = true;
                    }
                }
            }
            if stripped {
                self.modifications.set(ViewModification::Filters);
            }
        }
        self.effective_view_xml()
    }
}

/// Writes a boolean the way CAML spells them.
fn caml_bool(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Formats a row limit the way `Number` stringification would.
fn format_row_limit(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
