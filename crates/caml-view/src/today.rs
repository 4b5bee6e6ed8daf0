//! Today-relative date value codec.
//!
//! CAML expresses "today plus or minus N days" as a nested element rather
//! than a literal date: `<Value Type="DateTime"><Today Offset="-3"/></Value>`.
//! Everywhere else in this crate (and in the consumers of [`crate::Filter`])
//! that value travels as a compact string marker: `"[Today]"` for a zero
//! offset, `"[Today]-3"` / `"[Today]+3"` otherwise. This module converts in
//! both directions and also carries the offset-to-bucket mapping consumers
//! use to label relative date ranges.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use xot::{Node, Xot};

use crate::dom::{self, CamlNames};

/// The prefix of a today-relative value marker.
pub const TODAY_MARKER: &str = "[Today]";

/// Formats a day offset as a today-relative marker string.
///
/// ```
/// use caml_view_rs::today::today_marker;
///
/// assert_eq!(today_marker(0), "[Today]");
/// assert_eq!(today_marker(-3), "[Today]-3");
/// assert_eq!(today_marker(7), "[Today]+7");
/// ```
pub fn today_marker(offset: i64) -> String {
    if offset > 0 {
        format!("{TODAY_MARKER}+{offset}")
    } else if offset < 0 {
        format!("{TODAY_MARKER}{offset}")
    } else {
        TODAY_MARKER.to_string()
    }
}

/// Extracts the day offset from a today-relative marker string.
///
/// Returns `None` when the string is not a today marker at all, or when the
/// suffix after `[Today]` is not a signed integer.
pub fn today_offset(value: &str) -> Option<i64> {
    let rest = value.strip_prefix(TODAY_MARKER)?;
    if rest.is_empty() {
        return Some(0);
    }
    let rest = rest.strip_prefix('+').unwrap_or(rest);
    rest.parse::<i64>().ok()
}

/// Renders the CAML `<Value>` fragment for a today-relative offset.
///
/// A zero offset writes a bare `<Today/>`, matching the shape servers emit.
pub fn today_value_xml(offset: i64) -> String {
    if offset == 0 {
        "<Value Type=\"DateTime\"><Today/></Value>".to_string()
    } else {
        format!("<Value Type=\"DateTime\"><Today Offset=\"{offset}\"/></Value>")
    }
}

/// The named date range a today-relative offset falls into.
///
/// Reproduced from the consuming UI's grouping of relative ranges; the
/// mapping is load-bearing for anything that labels a today-relative filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateBucket {
    /// The offset falls outside every named range.
    None,
    /// Exactly one day ago.
    Yesterday,
    /// Between 7 and 2 days ago.
    Last7Days,
    /// Between 30 and 8 days ago.
    Last30Days,
    /// Between 92 and 31 days ago.
    Last3Months,
    /// Today itself.
    Today,
    /// Between 1 and 6 days ahead.
    Tomorrow,
    /// Between 7 and 29 days ahead.
    Next7Days,
    /// Between 30 and 91 days ahead.
    Next30Days,
    /// Between 92 and 364 days ahead.
    Next3Months,
    /// 365 days ahead or more.
    NextYear,
}

/// Maps a day offset to its named date bucket.
pub fn bucket_for_offset(offset: i64) -> DateBucket {
    match offset {
        -1 => DateBucket::Yesterday,
        -7..=-2 => DateBucket::Last7Days,
        -30..=-8 => DateBucket::Last30Days,
        -92..=-31 => DateBucket::Last3Months,
        0 => DateBucket::Today,
        1..=6 => DateBucket::Tomorrow,
        7..=29 => DateBucket::Next7Days,
        30..=91 => DateBucket::Next30Days,
        92..=364 => DateBucket::Next3Months,
        o if o >= 365 => DateBucket::NextYear,
        _ => DateBucket::None,
    }
}

/// Decodes a `<Value>` element into its filter value string.
///
/// A nested `<Today>` child wins over any text content and produces a
/// today marker from its `Offset` (or legacy `OffsetDays`) attribute. A
/// literal value is the element's text; `DateTime` values that do not carry
/// `IncludeTimeValue="TRUE"` have their time portion stripped when the text
/// parses as an ISO date-time. Returns `None` when the element carries
/// neither a `<Today>` child nor text, which callers treat as unrecognized.
pub(crate) fn decode_value(xot: &Xot, names: &CamlNames, value_node: Node) -> Option<String> {
    if let Some(today) = dom::find_direct_child(xot, value_node, names.today) {
        let offset = dom::attribute(xot, today, names.offset)
            .or_else(|| dom::attribute(xot, today, names.offset_days))
            .and_then(|text| text.trim().parse::<i64>().ok())
            .unwrap_or(0);
        return Some(today_marker(offset));
    }

    let text = dom::text_content(xot, value_node)?;
    let value_type = dom::attribute(xot, value_node, names.type_);
    let include_time = dom::attribute(xot, value_node, names.include_time_value)
        .map(|v| dom::parse_caml_bool(&v, false))
        .unwrap_or(false);

    if value_type.as_deref() == Some("DateTime") && !include_time {
        if let Some(date_only) = strip_time(&text) {
            return Some(date_only);
        }
    }
    Some(text)
}

/// Reduces an ISO date-time string to its date portion.
///
/// Returns `None` when the text is not an ISO date-time, in which case the
/// caller keeps it verbatim.
fn strip_time(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed.date().format("%Y-%m-%d").to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ViewDom;

    fn decode(value_xml: &str) -> Option<String> {
        let xml = format!(
            "<View><Query><Where><Eq><FieldRef Name=\"F\"/>{value_xml}</Eq></Where></Query></View>"
        );
        let view = ViewDom::parse(&xml).unwrap();
        let where_ = view.parts().where_.unwrap();
        let eq = view.element_children(where_)[0];
        let value = view.element_children(eq)[1];
        decode_value(&view.xot, &view.names, value)
    }

    // ==================== Marker Formatting ====================

    #[test]
    fn test_today_marker_zero() {
        assert_eq!(today_marker(0), "[Today]");
    }

    #[test]
    fn test_today_marker_signed() {
        assert_eq!(today_marker(-3), "[Today]-3");
        assert_eq!(today_marker(14), "[Today]+14");
    }

    #[test]
    fn test_today_offset_round_trip() {
        for offset in [-92, -7, -1, 0, 1, 30, 365] {
            assert_eq!(today_offset(&today_marker(offset)), Some(offset));
        }
    }

    #[test]
    fn test_today_offset_rejects_non_markers() {
        assert_eq!(today_offset("2024-01-05"), None);
        assert_eq!(today_offset("[Today]abc"), None);
        assert_eq!(today_offset("Today"), None);
    }

    // ==================== Value Decoding ====================

    #[test]
    fn test_decode_today_with_offset() {
        let value = decode("<Value Type=\"DateTime\"><Today Offset=\"-3\"/></Value>");
        assert_eq!(value.as_deref(), Some("[Today]-3"));
    }

    #[test]
    fn test_decode_today_legacy_offset_days() {
        let value = decode("<Value Type=\"DateTime\"><Today OffsetDays=\"7\"/></Value>");
        assert_eq!(value.as_deref(), Some("[Today]+7"));
    }

    #[test]
    fn test_decode_bare_today() {
        let value = decode("<Value Type=\"DateTime\"><Today/></Value>");
        assert_eq!(value.as_deref(), Some("[Today]"));
    }

    #[test]
    fn test_decode_date_time_strips_time() {
        let value = decode("<Value Type=\"DateTime\">2024-01-05T00:00:00Z</Value>");
        assert_eq!(value.as_deref(), Some("2024-01-05"));
    }

    #[test]
    fn test_decode_date_time_keeps_time_when_included() {
        let value = decode(
            "<Value Type=\"DateTime\" IncludeTimeValue=\"TRUE\">2024-01-05T09:30:00Z</Value>",
        );
        assert_eq!(value.as_deref(), Some("2024-01-05T09:30:00Z"));
    }

    #[test]
    fn test_decode_plain_text() {
        let value = decode("<Value Type=\"Text\">hello</Value>");
        assert_eq!(value.as_deref(), Some("hello"));
    }

    #[test]
    fn test_decode_empty_value_is_unrecognized() {
        assert_eq!(decode("<Value Type=\"Text\"/>"), None);
    }

    #[test]
    fn test_today_value_xml() {
        assert_eq!(
            today_value_xml(0),
            "<Value Type=\"DateTime\"><Today/></Value>"
        );
        assert_eq!(
            today_value_xml(-3),
            "<Value Type=\"DateTime\"><Today Offset=\"-3\"/></Value>"
        );
    }

    // ==================== Bucket Mapping ====================

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(bucket_for_offset(-93), DateBucket::None);
        assert_eq!(bucket_for_offset(-92), DateBucket::Last3Months);
        assert_eq!(bucket_for_offset(-31), DateBucket::Last3Months);
        assert_eq!(bucket_for_offset(-30), DateBucket::Last30Days);
        assert_eq!(bucket_for_offset(-8), DateBucket::Last30Days);
        assert_eq!(bucket_for_offset(-7), DateBucket::Last7Days);
        assert_eq!(bucket_for_offset(-2), DateBucket::Last7Days);
        assert_eq!(bucket_for_offset(-1), DateBucket::Yesterday);
        assert_eq!(bucket_for_offset(0), DateBucket::Today);
        assert_eq!(bucket_for_offset(1), DateBucket::Tomorrow);
        assert_eq!(bucket_for_offset(6), DateBucket::Tomorrow);
        assert_eq!(bucket_for_offset(7), DateBucket::Next7Days);
        assert_eq!(bucket_for_offset(29), DateBucket::Next7Days);
        assert_eq!(bucket_for_offset(30), DateBucket::Next30Days);
        assert_eq!(bucket_for_offset(91), DateBucket::Next30Days);
        assert_eq!(bucket_for_offset(92), DateBucket::Next3Months);
        assert_eq!(bucket_for_offset(364), DateBucket::Next3Months);
        assert_eq!(bucket_for_offset(365), DateBucket::NextYear);
        assert_eq!(bucket_for_offset(4000), DateBucket::NextYear);
    }
}
