//! Tests for the filter tree interpreter.

use super::*;
use crate::dom::ViewDom;

/// Parses a `Where` body and interprets it.
fn filters(where_inner: &str) -> Option<Vec<Filter>> {
    let xml = format!("<View><Query><Where>{where_inner}</Where></Query></View>");
    let dom = ViewDom::parse(&xml).unwrap();
    parse_filters(&dom, dom.parts().where_)
}

// ==================== Where Dispatch Tests ====================

#[test]
fn test_absent_where_is_none() {
    let dom = ViewDom::parse("<View/>").unwrap();
    assert_eq!(parse_filters(&dom, dom.parts().where_), None);
}

#[test]
fn test_empty_where_is_none() {
    assert_eq!(filters(""), None);
}

#[test]
fn test_dispatch_uses_first_child_only() {
    let result = filters(
        "<Eq><FieldRef Name=\"A\"/><Value Type=\"Text\">1</Value></Eq>\
         <Eq><FieldRef Name=\"B\"/><Value Type=\"Text\">2</Value></Eq>",
    )
    .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].field_name, "A");
}

// ==================== Binary Operator Tests ====================

#[test]
fn test_parse_eq() {
    let result =
        filters("<Eq><FieldRef Name=\"Status\"/><Value Type=\"Text\">Open</Value></Eq>").unwrap();
    assert_eq!(
        result,
        vec![Filter {
            value_type: Some("Text".to_string()),
            values: Some(vec!["Open".to_string()]),
            ..Filter::new("Status", FilterOperator::Eq)
        }]
    );
}

#[test]
fn test_parse_each_binary_operator() {
    for operator in [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Geq,
        FilterOperator::Gt,
        FilterOperator::Leq,
        FilterOperator::Lt,
        FilterOperator::BeginsWith,
        FilterOperator::Contains,
        FilterOperator::Includes,
        FilterOperator::NotIncludes,
    ] {
        let tag = operator.tag();
        let inner = format!("<{tag}><FieldRef Name=\"F\"/><Value Type=\"Number\">5</Value></{tag}>");
        let result = filters(&inner).unwrap();
        assert_eq!(result[0].operator, operator, "operator tag {tag}");
        assert_eq!(result[0].values, Some(vec!["5".to_string()]));
    }
}

#[test]
fn test_binary_without_value_is_dropped() {
    assert_eq!(filters("<Eq><FieldRef Name=\"F\"/></Eq>"), None);
}

#[test]
fn test_binary_with_empty_value_is_dropped() {
    assert_eq!(
        filters("<Eq><FieldRef Name=\"F\"/><Value Type=\"Text\"/></Eq>"),
        None
    );
}

#[test]
fn test_binary_without_field_ref_is_dropped() {
    assert_eq!(filters("<Eq><Value Type=\"Text\">x</Value></Eq>"), None);
}

#[test]
fn test_binary_without_field_name_is_dropped() {
    assert_eq!(
        filters("<Eq><FieldRef/><Value Type=\"Text\">x</Value></Eq>"),
        None
    );
}

#[test]
fn test_lookup_id_flag_is_captured() {
    let result = filters(
        "<Eq><FieldRef Name=\"Author\" LookupId=\"TRUE\"/><Value Type=\"User\">7</Value></Eq>",
    )
    .unwrap();
    assert_eq!(result[0].lookup_id, Some(true));
}

#[test]
fn test_today_value_decodes_to_marker() {
    let result = filters(
        "<Geq><FieldRef Name=\"Modified\"/>\
         <Value Type=\"DateTime\"><Today Offset=\"-3\"/></Value></Geq>",
    )
    .unwrap();
    assert_eq!(result[0].values, Some(vec!["[Today]-3".to_string()]));
    assert_eq!(result[0].value_type.as_deref(), Some("DateTime"));
}

#[test]
fn test_smart_filter_id_is_captured() {
    let result =
        filters("<Eq id=\"sf-1\"><FieldRef Name=\"F\"/><Value Type=\"Text\">x</Value></Eq>")
            .unwrap();
    assert_eq!(result[0].id.as_deref(), Some("sf-1"));
}

// ==================== Unary Operator Tests ====================

#[test]
fn test_parse_is_null() {
    let result = filters("<IsNull><FieldRef Name=\"Editor\"/></IsNull>").unwrap();
    assert_eq!(result[0].operator, FilterOperator::IsNull);
    assert_eq!(result[0].values, Some(vec![String::new()]));
}

#[test]
fn test_parse_is_not_null() {
    let result = filters("<IsNotNull><FieldRef Name=\"Editor\"/></IsNotNull>").unwrap();
    assert_eq!(result[0].operator, FilterOperator::IsNotNull);
    assert_eq!(result[0].values, None);
}

#[test]
fn test_parse_membership() {
    let result =
        filters("<Membership Type=\"SPWeb.Users\"><FieldRef Name=\"Editor\"/></Membership>")
            .unwrap();
    assert_eq!(result[0].operator, FilterOperator::Membership);
    assert_eq!(result[0].values, Some(vec!["SPWeb.Users".to_string()]));
}

#[test]
fn test_membership_without_type_is_dropped() {
    assert_eq!(
        filters("<Membership><FieldRef Name=\"Editor\"/></Membership>"),
        None
    );
}

#[test]
fn test_unary_without_field_ref_is_dropped() {
    assert_eq!(filters("<IsNull/>"), None);
}

// ==================== And Tests ====================

#[test]
fn test_and_concatenates_both_sides() {
    let result = filters(
        "<And>\
           <Eq><FieldRef Name=\"A\"/><Value Type=\"Text\">1</Value></Eq>\
           <Eq><FieldRef Name=\"B\"/><Value Type=\"Text\">2</Value></Eq>\
         </And>",
    )
    .unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].field_name, "A");
    assert_eq!(result[1].field_name, "B");
}

#[test]
fn test_nested_and_flattens() {
    let result = filters(
        "<And>\
           <And>\
             <Eq><FieldRef Name=\"A\"/><Value Type=\"Text\">1</Value></Eq>\
             <Eq><FieldRef Name=\"B\"/><Value Type=\"Text\">2</Value></Eq>\
           </And>\
           <Eq><FieldRef Name=\"C\"/><Value Type=\"Text\">3</Value></Eq>\
         </And>",
    )
    .unwrap();
    let names: Vec<_> = result.iter().map(|f| f.field_name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn test_and_keeps_supported_side_when_other_fails() {
    let result = filters(
        "<And>\
           <DateRangesOverlap><FieldRef Name=\"Start\"/></DateRangesOverlap>\
           <Eq><FieldRef Name=\"B\"/><Value Type=\"Text\">2</Value></Eq>\
         </And>",
    )
    .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].field_name, "B");
}

#[test]
fn test_and_with_both_sides_unsupported_is_dropped() {
    assert_eq!(
        filters("<And><DateRangesOverlap/><Unknown/></And>"),
        None
    );
}

#[test]
fn test_degenerate_single_child_and() {
    let result = filters(
        "<And><Eq><FieldRef Name=\"A\"/><Value Type=\"Text\">1</Value></Eq></And>",
    )
    .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].field_name, "A");
}

#[test]
fn test_and_ignores_children_beyond_the_first_two() {
    let result = filters(
        "<And>\
           <Eq><FieldRef Name=\"A\"/><Value Type=\"Text\">1</Value></Eq>\
           <Eq><FieldRef Name=\"B\"/><Value Type=\"Text\">2</Value></Eq>\
           <Eq><FieldRef Name=\"C\"/><Value Type=\"Text\">3</Value></Eq>\
         </And>",
    )
    .unwrap();
    assert_eq!(result.len(), 2);
}

// ==================== Or Tests ====================

#[test]
fn test_or_folds_eq_and_is_null_into_multi_valued_eq() {
    let result = filters(
        "<Or>\
           <Eq><FieldRef Name=\"Editor\"/><Value Type=\"User\">A</Value></Eq>\
           <IsNull><FieldRef Name=\"Editor\"/></IsNull>\
         </Or>",
    )
    .unwrap();
    assert_eq!(
        result,
        vec![Filter {
            value_type: Some("User".to_string()),
            values: Some(vec!["A".to_string(), String::new()]),
            ..Filter::new("Editor", FilterOperator::Eq)
        }]
    );
}

#[test]
fn test_or_over_multiple_fields_is_dropped() {
    let result = filters(
        "<Or>\
           <Eq><FieldRef Name=\"Editor\"/><Value Type=\"User\">A</Value></Eq>\
           <Eq><FieldRef Name=\"Author\"/><Value Type=\"User\">B</Value></Eq>\
         </Or>",
    );
    assert_eq!(result, None);
}

#[test]
fn test_or_with_mismatched_lookup_flags_is_dropped() {
    let result = filters(
        "<Or>\
           <Eq><FieldRef Name=\"Editor\" LookupId=\"TRUE\"/><Value Type=\"User\">1</Value></Eq>\
           <Eq><FieldRef Name=\"Editor\"/><Value Type=\"User\">2</Value></Eq>\
         </Or>",
    );
    assert_eq!(result, None);
}

#[test]
fn test_or_with_unsupported_leaf_is_dropped() {
    let result = filters(
        "<Or>\
           <Eq><FieldRef Name=\"F\"/><Value Type=\"Text\">1</Value></Eq>\
           <Gt><FieldRef Name=\"F\"/><Value Type=\"Text\">2</Value></Gt>\
         </Or>",
    );
    assert_eq!(result, None);
}

#[test]
fn test_nested_or_leaves_are_flattened() {
    let result = filters(
        "<Or>\
           <Or>\
             <Eq><FieldRef Name=\"F\"/><Value Type=\"Text\">1</Value></Eq>\
             <Eq><FieldRef Name=\"F\"/><Value Type=\"Text\">2</Value></Eq>\
           </Or>\
           <Eq><FieldRef Name=\"F\"/><Value Type=\"Text\">3</Value></Eq>\
         </Or>",
    )
    .unwrap();
    assert_eq!(
        result[0].values,
        Some(vec![
            "1".to_string(),
            "2".to_string(),
            "3".to_string()
        ])
    );
}

#[test]
fn test_or_with_mixed_value_types_clears_type() {
    let result = filters(
        "<Or>\
           <Eq><FieldRef Name=\"F\"/><Value Type=\"Text\">1</Value></Eq>\
           <Eq><FieldRef Name=\"F\"/><Value Type=\"Number\">2</Value></Eq>\
         </Or>",
    )
    .unwrap();
    assert_eq!(result[0].value_type, None);
    assert_eq!(
        result[0].values,
        Some(vec!["1".to_string(), "2".to_string()])
    );
}

#[test]
fn test_or_is_null_leaves_do_not_mix_types() {
    // The IsNull leaf contributes '' but leaves the Eq leaf's type alone.
    let result = filters(
        "<Or>\
           <IsNull><FieldRef Name=\"F\"/></IsNull>\
           <Eq><FieldRef Name=\"F\"/><Value Type=\"User\">A</Value></Eq>\
         </Or>",
    )
    .unwrap();
    assert_eq!(result[0].value_type.as_deref(), Some("User"));
}

// ==================== In Tests ====================

#[test]
fn test_parse_in() {
    let result = filters(
        "<In><FieldRef Name=\"Editor\"/><Values>\
           <Value Type=\"User\">P1</Value>\
           <Value Type=\"User\">P2</Value>\
         </Values></In>",
    )
    .unwrap();
    assert_eq!(
        result,
        vec![Filter {
            value_type: Some("User".to_string()),
            values: Some(vec!["P1".to_string(), "P2".to_string()]),
            ..Filter::new("Editor", FilterOperator::In)
        }]
    );
}

#[test]
fn test_in_drops_empty_string_values() {
    let result = filters(
        "<In><FieldRef Name=\"F\"/><Values>\
           <Value Type=\"Text\"></Value>\
           <Value Type=\"Text\">kept</Value>\
         </Values></In>",
    )
    .unwrap();
    assert_eq!(result[0].values, Some(vec!["kept".to_string()]));
}

#[test]
fn test_in_with_no_surviving_values_is_dropped() {
    assert_eq!(
        filters("<In><FieldRef Name=\"F\"/><Values><Value Type=\"Text\"/></Values></In>"),
        None
    );
}

#[test]
fn test_in_without_values_container_is_dropped() {
    assert_eq!(filters("<In><FieldRef Name=\"F\"/></In>"), None);
}

#[test]
fn test_in_with_mixed_value_types_clears_type() {
    let result = filters(
        "<In><FieldRef Name=\"F\"/><Values>\
           <Value Type=\"Text\">a</Value>\
           <Value Type=\"Number\">1</Value>\
         </Values></In>",
    )
    .unwrap();
    assert_eq!(result[0].value_type, None);
}

// ==================== Unsupported Shape Tests ====================

#[test]
fn test_unknown_operator_is_dropped() {
    assert_eq!(
        filters(
            "<DateRangesOverlap><FieldRef Name=\"Start\"/><FieldRef Name=\"End\"/>\
             <Value Type=\"DateTime\"><Today/></Value></DateRangesOverlap>"
        ),
        None
    );
}
