//! Parser, in-memory model and incremental mutator for CAML list views.
//!
//! CAML is a constrained XML query dialect describing a list "View": its
//! filters, sort order, grouping, displayed fields and row limit. This crate
//! covers the full round trip:
//!
//! - [`dom`] parses a raw view string into an arena-backed XML tree with
//!   handles to the structural elements, synthesizing `Query`/`ViewFields`
//!   when the source omits them.
//! - [`filter`] classifies the recursive `Where` tree into a flat list of
//!   semantic [`Filter`] records, silently dropping shapes outside the
//!   supported subset.
//! - [`arrange`] converts `OrderBy`/`GroupBy`/`RowLimit`/`ViewFields` into
//!   small typed records and bundles everything into an [`ArrangeInfo`]
//!   snapshot via [`parse_view`].
//! - [`today`] converts between `<Today Offset="N"/>` values and the
//!   `"[Today]±N"` string markers filter values travel as.
//! - [`view`] owns a mutable [`View`]: lazily-built DOM, surgical mutators
//!   with per-category dirty tracking, and serialization that returns the
//!   source string byte-for-byte for as long as nothing was changed.
//!
//! # Example
//!
//! ```
//! use caml_view_rs::{parse_view, OrderedField, SortUpdateOptions, View};
//!
//! let xml = "<View><Query><OrderBy><FieldRef Name=\"Title\"/></OrderBy></Query></View>";
//!
//! // Read-only snapshot.
//! let info = parse_view(xml).unwrap();
//! assert_eq!(info.sorts.unwrap()[0].field_name, "Title");
//!
//! // Incremental mutation.
//! let mut view = View::new(xml);
//! assert_eq!(view.effective_view_xml().unwrap(), xml); // clean: verbatim
//!
//! view.update_sort(
//!     Some(&OrderedField::descending("Modified")),
//!     SortUpdateOptions {
//!         overwrite_all: true,
//!         ..SortUpdateOptions::default()
//!     },
//! );
//! assert!(view.is_dirty());
//! assert!(view.effective_view_xml().unwrap().contains("Modified"));
//! ```
//!
//! Everything is synchronous and in-memory; a `View` (and the document it
//! owns) is never shared between instances.

pub mod arrange;
pub mod dom;
pub mod error;
pub mod filter;
pub mod today;
pub mod view;

pub use arrange::{
    parse_group_by, parse_row_limit, parse_sorts, parse_view, parse_view_fields, ArrangeInfo,
    GroupBy, OrderedField, RowLimit,
};
pub use dom::{ViewDom, ViewDomParts, DEFAULT_VIEW_XML};
pub use error::{CamlError, CamlResult};
pub use filter::{parse_filters, Filter, FilterOperator};
pub use today::{bucket_for_offset, today_marker, today_offset, today_value_xml, DateBucket};
pub use view::{SortUpdateOptions, View, ViewModification, ViewUpdate};
