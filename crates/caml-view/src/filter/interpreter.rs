//! Interpreter for the `Where` subtree of a CAML query.
//!
//! The interpreter walks a `Where` tree and classifies it into a flat list of
//! [`Filter`] records. It recognizes a restricted subset of CAML: `And`
//! concatenation, `Or` trees that fold into one multi-valued equality, the
//! unary and binary comparison operators, and `In`. Everything else is
//! *dropped*, never errored on: an unsupported shape silently removes only
//! its own slice of the tree.
//!
//! Each node classifies to an explicit [`Outcome`] so that "recognized
//! nothing" and "unsupported shape" stay distinct while walking the tree;
//! the public entry point collapses both to `None`, matching what consumers
//! of the arrangement currently expect.

use xot::Node;

use super::ast::{Filter, FilterOperator};
use crate::dom::ViewDom;
use crate::today;

/// Classification of a single `Where` subtree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The node maps onto one or more supported filters.
    Recognized(Vec<Filter>),
    /// The node (or a required piece of it) is outside the supported subset.
    Unsupported,
}

/// Interprets a `Where` element into a flat list of filters.
///
/// Returns `None` when `Where` is absent, has no element child, or its first
/// child classifies as unsupported. Dispatch looks at the *first* element
/// child only; any extra children are tolerated and ignored.
pub fn parse_filters(dom: &ViewDom, where_node: Option<Node>) -> Option<Vec<Filter>> {
    let where_node = where_node?;
    let first = dom.element_children(where_node).into_iter().next()?;
    match parse_filter(dom, first) {
        Outcome::Recognized(filters) if !filters.is_empty() => Some(filters),
        _ => None,
    }
}

/// Classifies one node of the `Where` tree.
pub(crate) fn parse_filter(dom: &ViewDom, node: Node) -> Outcome {
    let names = &dom.names;
    let Some(name) = dom.element_name(node) else {
        return Outcome::Unsupported;
    };

    if name == names.and {
        parse_and(dom, node)
    } else if name == names.or {
        parse_or(dom, node)
    } else {
        match FilterOperator::from_name(names, name) {
            Some(FilterOperator::IsNull) => parse_unary(dom, node, FilterOperator::IsNull),
            Some(FilterOperator::IsNotNull) => parse_unary(dom, node, FilterOperator::IsNotNull),
            Some(FilterOperator::Membership) => parse_unary(dom, node, FilterOperator::Membership),
            Some(FilterOperator::In) => parse_in(dom, node),
            Some(operator) => parse_binary(dom, node, operator),
            None => Outcome::Unsupported,
        }
    }
}

/// Parses an `And` node by concatenating the results of its two operands.
///
/// A degenerate `And` with a single child passes that child's result
/// through. When one side is unsupported the other side's filters are kept;
/// only when every side fails is the whole node dropped. That per-side
/// tolerance is asymmetric with `Or` (which drops wholesale) and is kept
/// deliberately.
fn parse_and(dom: &ViewDom, node: Node) -> Outcome {
    let children = dom.element_children(node);
    let mut filters = Vec::new();
    let mut recognized_any = false;

    for &child in children.iter().take(2) {
        if let Outcome::Recognized(mut side) = parse_filter(dom, child) {
            recognized_any = true;
            filters.append(&mut side);
        }
    }

    if recognized_any {
        Outcome::Recognized(filters)
    } else {
        Outcome::Unsupported
    }
}

/// Parses an `Or` tree by folding it into one multi-valued `Eq` filter.
///
/// Supported only when every leaf (through arbitrarily nested `Or`s) is an
/// `Eq` or `IsNull` over the same field with the same `LookupId` flag. An
/// `IsNull` leaf contributes an empty-string value; mixed `Value` types
/// across the `Eq` leaves clear the resulting type. Any other leaf shape, or
/// leaves spanning multiple fields, drops the whole node.
fn parse_or(dom: &ViewDom, node: Node) -> Outcome {
    let mut leaves = Vec::new();
    if !collect_or_leaves(dom, node, &mut leaves) || leaves.is_empty() {
        return Outcome::Unsupported;
    }

    let names = &dom.names;
    let mut field_name: Option<String> = None;
    let mut lookup_flag = false;
    let mut values = Vec::new();
    let mut value_type: Option<String> = None;
    let mut saw_typed_value = false;
    let mut mixed_types = false;

    for &leaf in &leaves {
        let Some(field_ref) = dom
            .element_children(leaf)
            .into_iter()
            .find(|&c| dom.element_name(c) == Some(names.field_ref))
        else {
            return Outcome::Unsupported;
        };
        let Some(leaf_field) = dom
            .attribute(field_ref, names.name)
            .filter(|n| !n.is_empty())
        else {
            return Outcome::Unsupported;
        };
        let leaf_lookup = dom.bool_attribute(field_ref, names.lookup_id, false);

        match &field_name {
            None => {
                field_name = Some(leaf_field);
                lookup_flag = leaf_lookup;
            }
            Some(existing) => {
                if *existing != leaf_field || lookup_flag != leaf_lookup {
                    return Outcome::Unsupported;
                }
            }
        }

        if dom.element_name(leaf) == Some(names.is_null) {
            values.push(String::new());
            continue;
        }

        // Eq leaf: a decodable Value is required.
        let Some(value_node) = crate::dom::find_direct_child(&dom.xot, leaf, names.value) else {
            return Outcome::Unsupported;
        };
        let Some(value) = today::decode_value(&dom.xot, names, value_node) else {
            return Outcome::Unsupported;
        };
        let leaf_type = dom.attribute(value_node, names.type_);
        if saw_typed_value {
            if value_type != leaf_type {
                mixed_types = true;
            }
        } else {
            value_type = leaf_type;
            saw_typed_value = true;
        }
        values.push(value);
    }

    let Some(field_name) = field_name else {
        return Outcome::Unsupported;
    };
    if mixed_types {
        value_type = None;
    }

    Outcome::Recognized(vec![Filter {
        field_name,
        id: dom.attribute(node, names.id),
        value_type,
        lookup_id: lookup_flag.then_some(true),
        operator: FilterOperator::Eq,
        values: Some(values),
    }])
}

/// Collects the leaves of an `Or` tree, recursing through nested `Or`s.
///
/// Returns false as soon as a leaf is anything other than `Eq` or `IsNull`.
fn collect_or_leaves(dom: &ViewDom, node: Node, leaves: &mut Vec<Node>) -> bool {
    let names = &dom.names;
    for child in dom.element_children(node) {
        let Some(name) = dom.element_name(child) else {
            return false;
        };
        if name == names.or {
            if !collect_or_leaves(dom, child, leaves) {
                return false;
            }
        } else if name == names.eq || name == names.is_null {
            leaves.push(child);
        } else {
            return false;
        }
    }
    true
}

/// Parses a unary operator node (`IsNull`, `IsNotNull`, `Membership`).
fn parse_unary(dom: &ViewDom, node: Node, operator: FilterOperator) -> Outcome {
    let names = &dom.names;
    let Some((field_name, lookup_id)) = required_field_ref(dom, node) else {
        return Outcome::Unsupported;
    };

    let values = match operator {
        FilterOperator::IsNull => Some(vec![String::new()]),
        FilterOperator::IsNotNull => None,
        FilterOperator::Membership => {
            // The membership group lives in the element's own Type attribute.
            let Some(membership_type) = dom.attribute(node, names.type_) else {
                return Outcome::Unsupported;
            };
            Some(vec![membership_type])
        }
        _ => return Outcome::Unsupported,
    };

    Outcome::Recognized(vec![Filter {
        field_name,
        id: dom.attribute(node, names.id),
        value_type: None,
        lookup_id,
        operator,
        values,
    }])
}

/// Parses a binary comparison node (`Eq`, `Neq`, `Geq`, ... `NotIncludes`).
fn parse_binary(dom: &ViewDom, node: Node, operator: FilterOperator) -> Outcome {
    let names = &dom.names;
    let Some((field_name, lookup_id)) = required_field_ref(dom, node) else {
        return Outcome::Unsupported;
    };
    let Some(value_node) = crate::dom::find_direct_child(&dom.xot, node, names.value) else {
        return Outcome::Unsupported;
    };
    let Some(value) = today::decode_value(&dom.xot, names, value_node) else {
        return Outcome::Unsupported;
    };

    Outcome::Recognized(vec![Filter {
        field_name,
        id: dom.attribute(node, names.id),
        value_type: dom.attribute(value_node, names.type_),
        lookup_id,
        operator,
        values: Some(vec![value]),
    }])
}

/// Parses an `In` node with its `Values` container.
fn parse_in(dom: &ViewDom, node: Node) -> Outcome {
    let names = &dom.names;
    let Some((field_name, lookup_id)) = required_field_ref(dom, node) else {
        return Outcome::Unsupported;
    };
    let Some(values_node) = crate::dom::find_direct_child(&dom.xot, node, names.values) else {
        return Outcome::Unsupported;
    };

    let mut values = Vec::new();
    let mut value_type: Option<String> = None;
    let mut saw_value = false;
    let mut mixed_types = false;

    for value_node in dom.element_children(values_node) {
        if dom.element_name(value_node) != Some(names.value) {
            continue;
        }
        // Empty-string values are dropped rather than failing the node.
        let Some(value) = today::decode_value(&dom.xot, names, value_node) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let leaf_type = dom.attribute(value_node, names.type_);
        if saw_value {
            if value_type != leaf_type {
                mixed_types = true;
            }
        } else {
            value_type = leaf_type;
            saw_value = true;
        }
        values.push(value);
    }

    if values.is_empty() {
        return Outcome::Unsupported;
    }
    if mixed_types {
        value_type = None;
    }

    Outcome::Recognized(vec![Filter {
        field_name,
        id: dom.attribute(node, names.id),
        value_type,
        lookup_id,
        operator: FilterOperator::In,
        values: Some(values),
    }])
}

/// Reads the required `FieldRef` child of an operator node.
///
/// Returns the field name and the lookup flag (`Some(true)` only when
/// `LookupId="TRUE"`), or `None` when the `FieldRef` or its `Name` is
/// missing.
fn required_field_ref(dom: &ViewDom, node: Node) -> Option<(String, Option<bool>)> {
    let names = &dom.names;
    let field_ref = crate::dom::find_direct_child(&dom.xot, node, names.field_ref)?;
    let field_name = dom
        .attribute(field_ref, names.name)
        .filter(|n| !n.is_empty())?;
    let lookup = dom.bool_attribute(field_ref, names.lookup_id, false);
    Some((field_name, lookup.then_some(true)))
}
