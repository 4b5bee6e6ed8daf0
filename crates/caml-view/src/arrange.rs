//! Arrange-info extraction: sorts, grouping, row limit and displayed fields.
//!
//! These free functions convert the small structural elements of a parsed
//! view (`OrderBy`, `GroupBy`, `RowLimit`, `ViewFields`) into typed records,
//! and [`parse_view`] bundles them with the interpreted filters into one
//! read-only [`ArrangeInfo`] snapshot. Invalid entries are skipped, never
//! errored on: an `OrderBy` whose every `FieldRef` lacks a `Name` simply
//! yields no sorts.

use serde::{Deserialize, Serialize};
use xot::Node;

use crate::dom::ViewDom;
use crate::error::CamlResult;
use crate::filter::{parse_filters, Filter};

/// One sort entry of a view's `OrderBy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedField {
    /// Internal name of the sorted column.
    pub field_name: String,
    /// Sort direction; ascending unless `Ascending="FALSE"`.
    #[serde(default = "default_true")]
    pub is_ascending: bool,
}

impl OrderedField {
    /// Creates an ascending sort on the given field.
    pub fn ascending(field_name: impl Into<String>) -> Self {
        OrderedField {
            field_name: field_name.into(),
            is_ascending: true,
        }
    }

    /// Creates a descending sort on the given field.
    pub fn descending(field_name: impl Into<String>) -> Self {
        OrderedField {
            field_name: field_name.into(),
            is_ascending: false,
        }
    }
}

/// The grouping of a view: at most two levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    /// Whether groups render collapsed; defaults to true.
    #[serde(default = "default_true")]
    pub is_collapsed: bool,
    /// The first (required) grouping level.
    pub group1: OrderedField,
    /// The optional second grouping level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group2: Option<OrderedField>,
}

/// The row limit of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowLimit {
    /// The limit value. Non-numeric `RowLimit` text parses to NaN and is
    /// carried as-is rather than validated.
    pub row_limit: f64,
    /// Whether the limit is per page (`Paged` attribute). Parsing always
    /// yields `Some` (defaulting to false); `None` is only meaningful in
    /// update requests, where it leaves the `Paged` attribute untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_per_page: Option<bool>,
}

/// The structured, read-only summary of a view's arrangement.
///
/// Every part is optional: `None` means the view does not carry that
/// element, or that its content was entirely unsupported.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrangeInfo {
    /// The interpreted filters of the `Where` clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Filter>>,
    /// The sort order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorts: Option<Vec<OrderedField>>,
    /// The grouping, up to two levels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,
    /// The displayed field names, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_names: Option<Vec<String>>,
    /// The row limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<RowLimit>,
}

impl ArrangeInfo {
    /// Extracts the arrange info from an already-parsed document.
    ///
    /// Optional elements are located live rather than from the parse-time
    /// snapshot, so a snapshot taken after mutation reflects the mutation.
    pub fn from_dom(dom: &ViewDom) -> ArrangeInfo {
        ArrangeInfo {
            filters: parse_filters(dom, dom.where_node()),
            sorts: parse_sorts(dom, dom.order_by()),
            group_by: parse_group_by(dom, dom.group_by()),
            field_names: parse_view_fields(dom, Some(dom.parts().view_fields)),
            row_limit: parse_row_limit(dom, dom.row_limit_node()),
        }
    }
}

/// Parses a CAML view string into its arrange info.
///
/// # Errors
///
/// Fails with the gateway's errors when the string is malformed or not
/// rooted at `View`; see [`ViewDom::parse`].
///
/// # Example
///
/// ```
/// use caml_view_rs::parse_view;
///
/// let info = parse_view(
///     "<View><Query><OrderBy><FieldRef Name=\"Title\"/></OrderBy></Query></View>",
/// )
/// .unwrap();
/// assert_eq!(info.sorts.unwrap()[0].field_name, "Title");
/// ```
pub fn parse_view(xml: &str) -> CamlResult<ArrangeInfo> {
    let dom = ViewDom::parse(xml)?;
    Ok(ArrangeInfo::from_dom(&dom))
}

/// Converts an `OrderBy` element into sort entries.
///
/// Only `FieldRef` children with a non-empty `Name` count; `Ascending` is
/// read case-insensitively and defaults to true. `None` when the element is
/// absent or yields no valid entry.
pub fn parse_sorts(dom: &ViewDom, order_by: Option<Node>) -> Option<Vec<OrderedField>> {
    let order_by = order_by?;
    let names = &dom.names;
    let sorts: Vec<OrderedField> = dom
        .element_children(order_by)
        .into_iter()
        .filter(|&child| dom.element_name(child) == Some(names.field_ref))
        .filter_map(|child| {
            let field_name = dom.attribute(child, names.name).filter(|n| !n.is_empty())?;
            Some(OrderedField {
                field_name,
                is_ascending: dom.bool_attribute(child, names.ascending, true),
            })
        })
        .collect();
    (!sorts.is_empty()).then_some(sorts)
}

/// Converts a `GroupBy` element into the two-level grouping record.
///
/// The first two valid `FieldRef` children become group1/group2; `Collapse`
/// defaults to true. `None` without a valid first level.
pub fn parse_group_by(dom: &ViewDom, group_by: Option<Node>) -> Option<GroupBy> {
    let group_by = group_by?;
    let names = &dom.names;
    let mut levels = dom
        .element_children(group_by)
        .into_iter()
        .filter(|&child| dom.element_name(child) == Some(names.field_ref))
        .filter_map(|child| {
            let field_name = dom.attribute(child, names.name).filter(|n| !n.is_empty())?;
            Some(OrderedField {
                field_name,
                is_ascending: dom.bool_attribute(child, names.ascending, true),
            })
        });

    let group1 = levels.next()?;
    let group2 = levels.next();
    Some(GroupBy {
        is_collapsed: dom.bool_attribute(group_by, names.collapse, true),
        group1,
        group2,
    })
}

/// Converts a `RowLimit` element into the row limit record.
///
/// `None` when the element is absent or has no text. The text is converted
/// with JavaScript `Number` semantics: whitespace-only is zero, anything
/// non-numeric is NaN, and no further validation happens.
pub fn parse_row_limit(dom: &ViewDom, row_limit: Option<Node>) -> Option<RowLimit> {
    let row_limit = row_limit?;
    let text = dom.text_content(row_limit)?;
    let trimmed = text.trim();
    let value = if trimmed.is_empty() {
        0.0
    } else {
        trimmed.parse::<f64>().unwrap_or(f64::NAN)
    };
    Some(RowLimit {
        row_limit: value,
        is_per_page: Some(dom.bool_attribute(row_limit, dom.names.paged, false)),
    })
}

/// Collects the displayed field names from a `ViewFields` element.
///
/// Empty names are dropped; `None` only when the element itself is absent
/// (after a gateway parse it never is).
pub fn parse_view_fields(dom: &ViewDom, view_fields: Option<Node>) -> Option<Vec<String>> {
    let view_fields = view_fields?;
    let names = &dom.names;
    Some(
        dom.element_children(view_fields)
            .into_iter()
            .filter(|&child| dom.element_name(child) == Some(names.field_ref))
            .filter_map(|child| dom.attribute(child, names.name).filter(|n| !n.is_empty()))
            .collect(),
    )
}

fn default_true() -> bool {
    true
}
