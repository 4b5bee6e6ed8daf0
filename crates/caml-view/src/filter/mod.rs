//! Filter tree interpreter for CAML `Where` clauses.
//!
//! CAML expresses filters as a recursive tree of operator elements under
//! `Query/Where`. This module classifies that tree into a flat list of
//! semantic [`Filter`] records covering the supported subset:
//!
//! - `And` trees concatenate into multiple filters
//! - `Or` trees over one field fold into a single multi-valued `Eq`
//! - unary operators: `IsNull`, `IsNotNull`, `Membership`
//! - binary operators: `Eq`, `Neq`, `Geq`, `Gt`, `Leq`, `Lt`, `BeginsWith`,
//!   `Contains`, `Includes`, `NotIncludes`
//! - `In` with a `Values` container
//!
//! Anything outside this subset (for example `DateRangesOverlap`) is dropped
//! silently; a view whose filters are only partially supported still parses,
//! losing just the unsupported slice.
//!
//! # Example
//!
//! ```
//! use caml_view_rs::dom::ViewDom;
//! use caml_view_rs::filter::{parse_filters, FilterOperator};
//!
//! let dom = ViewDom::parse(
//!     "<View><Query><Where>\
//!        <Eq><FieldRef Name=\"Status\"/><Value Type=\"Text\">Open</Value></Eq>\
//!      </Where></Query></View>",
//! )
//! .unwrap();
//!
//! let filters = parse_filters(&dom, dom.parts().where_).unwrap();
//! assert_eq!(filters[0].field_name, "Status");
//! assert_eq!(filters[0].operator, FilterOperator::Eq);
//! ```

mod ast;
mod interpreter;

pub use ast::{Filter, FilterOperator};
pub use interpreter::parse_filters;

#[cfg(test)]
mod tests;
