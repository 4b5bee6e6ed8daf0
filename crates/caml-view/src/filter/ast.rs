//! Semantic filter records produced by the interpreter.

use serde::{Deserialize, Serialize};
use xot::NameId;

use crate::dom::CamlNames;

/// The comparison operator of a CAML filter clause.
///
/// This is the closed set of operator tags the interpreter recognizes.
/// Adding an operator means adding a variant here, which forces every match
/// over the enum to be revisited; any tag outside this set is dropped as
/// unsupported rather than errored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equal to.
    Eq,
    /// Not equal to.
    Neq,
    /// Greater than or equal to.
    Geq,
    /// Greater than.
    Gt,
    /// Less than or equal to.
    Leq,
    /// Less than.
    Lt,
    /// Text value starts with.
    BeginsWith,
    /// Text value contains.
    Contains,
    /// Multi-valued field includes.
    Includes,
    /// Multi-valued field does not include.
    NotIncludes,
    /// Field has no value.
    IsNull,
    /// Field has a value.
    IsNotNull,
    /// Person field membership test.
    Membership,
    /// Field value is one of a list of values.
    In,
}

impl FilterOperator {
    /// Resolves an element name id to an operator, or `None` for any tag
    /// outside the supported set.
    pub(crate) fn from_name(names: &CamlNames, name: NameId) -> Option<FilterOperator> {
        if name == names.eq {
            Some(FilterOperator::Eq)
        } else if name == names.neq {
            Some(FilterOperator::Neq)
        } else if name == names.geq {
            Some(FilterOperator::Geq)
        } else if name == names.gt {
            Some(FilterOperator::Gt)
        } else if name == names.leq {
            Some(FilterOperator::Leq)
        } else if name == names.lt {
            Some(FilterOperator::Lt)
        } else if name == names.begins_with {
            Some(FilterOperator::BeginsWith)
        } else if name == names.contains {
            Some(FilterOperator::Contains)
        } else if name == names.includes {
            Some(FilterOperator::Includes)
        } else if name == names.not_includes {
            Some(FilterOperator::NotIncludes)
        } else if name == names.is_null {
            Some(FilterOperator::IsNull)
        } else if name == names.is_not_null {
            Some(FilterOperator::IsNotNull)
        } else if name == names.membership {
            Some(FilterOperator::Membership)
        } else if name == names.in_ {
            Some(FilterOperator::In)
        } else {
            None
        }
    }

    /// The CAML tag this operator is written as.
    pub fn tag(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "Eq",
            FilterOperator::Neq => "Neq",
            FilterOperator::Geq => "Geq",
            FilterOperator::Gt => "Gt",
            FilterOperator::Leq => "Leq",
            FilterOperator::Lt => "Lt",
            FilterOperator::BeginsWith => "BeginsWith",
            FilterOperator::Contains => "Contains",
            FilterOperator::Includes => "Includes",
            FilterOperator::NotIncludes => "NotIncludes",
            FilterOperator::IsNull => "IsNull",
            FilterOperator::IsNotNull => "IsNotNull",
            FilterOperator::Membership => "Membership",
            FilterOperator::In => "In",
        }
    }
}

/// One recognized filter clause of a view's `Where` tree.
///
/// A `Filter` is flat: a supported `Or` tree folds into a single multi-valued
/// `Eq` filter, and `And` trees concatenate into a list of these records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Internal name of the filtered column.
    pub field_name: String,

    /// Smart-filter tracking id, when the operator element carried one.
    /// Stripped again by [`crate::View::prepare_for_saving`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The `Type` attribute of the value(s), e.g. `Text`, `User`, `DateTime`.
    /// `None` when the values carried no type or mixed types.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    /// Present and true when the field is compared by lookup id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_id: Option<bool>,

    /// The comparison operator.
    pub operator: FilterOperator,

    /// The comparison values. `None` for operators without values
    /// (`IsNotNull`); a folded `Or` carries one entry per leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl Filter {
    /// Creates a filter with just a field name and operator.
    pub fn new(field_name: impl Into<String>, operator: FilterOperator) -> Self {
        Filter {
            field_name: field_name.into(),
            id: None,
            value_type: None,
            lookup_id: None,
            operator,
            values: None,
        }
    }
}
