//! Parsing and validation of the `X-Amzn-Trace-Id` header value.
use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub(crate) const HEADER_ROOT_KEY: &str = "Root";
pub(crate) const HEADER_PARENT_KEY: &str = "Parent";
pub(crate) const HEADER_SAMPLED_KEY: &str = "Sampled";

pub(crate) const SAMPLED: &str = "1";
pub(crate) const NOT_SAMPLED: &str = "0";

const XRAY_VERSION: &str = "1";
const TIMESTAMP_HEX_LEN: usize = 8;
const RANDOM_HEX_LEN: usize = 24;
const SPAN_ID_HEX_LEN: usize = 16;
const RANDOM_MASK: u128 = (1 << 96) - 1;

/// Reason an X-Ray header value was rejected.
///
/// Extraction never surfaces this to callers, a rejected header yields an
/// invalid [`SpanContext`] instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HeaderError {
    /// A required field is absent or has an empty value.
    #[error("missing or empty `{0}` field")]
    MissingField(&'static str),

    /// The trace id is not made of three `-` separated parts.
    #[error("trace id `{0}` is not of the form <version>-<time>-<id>")]
    MalformedTraceId(String),

    /// The trace id version is not `1`.
    #[error("unsupported trace id version `{0}`")]
    UnsupportedVersion(String),

    /// The time part of the trace id is not 8 hex digits.
    #[error("trace id time `{0}` is not 8 hex digits")]
    InvalidTimestamp(String),

    /// The unique part of the trace id is not 24 hex digits.
    #[error("trace id unique part `{0}` is not 24 hex digits")]
    InvalidUniqueId(String),

    /// The trace id decodes to the all-zero invalid id.
    #[error("trace id is all zeros")]
    InvalidTraceId,

    /// The parent id is not 16 hex digits.
    #[error("parent id `{0}` is not 16 hex digits")]
    MalformedParentId(String),

    /// The parent id decodes to the all-zero invalid id.
    #[error("parent id is all zeros")]
    InvalidParentId,
}

/// Holds an X-Ray formatted trace id.
///
/// A trace id consists of three numbers separated by hyphens, for example
/// `1-58406520-a006649127e371903a2de979`:
///
/// * The version number, always `1`.
/// * The time of the original request in Unix epoch seconds, as 8 hex digits.
/// * A 96-bit identifier for the trace, globally unique, as 24 hex digits.
///
/// See the [AWS X-Ray documentation][xray-trace-id] for details.
///
/// [xray-trace-id]: https://docs.aws.amazon.com/xray/latest/devguide/xray-api-sendingdata.html#xray-api-traceids
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct XrayTraceId(String);

impl XrayTraceId {
    /// The X-Ray rendering of the trace id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for XrayTraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<TraceId> for XrayTraceId {
    fn from(trace_id: TraceId) -> Self {
        let id = u128::from_be_bytes(trace_id.to_bytes());
        XrayTraceId(format!(
            "{}-{:08x}-{:024x}",
            XRAY_VERSION,
            id >> 96,
            id & RANDOM_MASK
        ))
    }
}

impl FromStr for XrayTraceId {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_root(s)?;
        Ok(XrayTraceId(s.to_owned()))
    }
}

impl TryFrom<XrayTraceId> for TraceId {
    type Error = HeaderError;

    fn try_from(id: XrayTraceId) -> Result<Self, Self::Error> {
        parse_root(&id.0)
    }
}

/// The known fields of a header value. Unknown keys are dropped while
/// splitting.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ParsedFields<'a> {
    root: Option<&'a str>,
    parent: Option<&'a str>,
    sampled: Option<&'a str>,
}

impl<'a> ParsedFields<'a> {
    /// Splits `Key=Value` segments on `;`. Order does not matter; for a
    /// repeated key the last segment wins.
    pub(crate) fn split(header_value: &'a str) -> Self {
        let mut fields = ParsedFields::default();

        for (key, value) in header_value.split(';').filter_map(key_value_pair) {
            match key {
                HEADER_ROOT_KEY => fields.root = Some(value),
                HEADER_PARENT_KEY => fields.parent = Some(value),
                HEADER_SAMPLED_KEY => fields.sampled = Some(value),
                _ => {}
            }
        }

        fields
    }

    /// Validates every required field and builds a remote span context.
    pub(crate) fn into_span_context(self) -> Result<SpanContext, HeaderError> {
        let trace_id = parse_root(required(self.root, HEADER_ROOT_KEY)?)?;
        let span_id = parse_parent(required(self.parent, HEADER_PARENT_KEY)?)?;
        let trace_flags = parse_sampled(required(self.sampled, HEADER_SAMPLED_KEY)?);

        Ok(SpanContext::new(
            trace_id,
            span_id,
            trace_flags,
            true,
            TraceState::NONE,
        ))
    }
}

/// Parses a complete header value into a remote span context.
pub(crate) fn parse_header(header_value: &str) -> Result<SpanContext, HeaderError> {
    ParsedFields::split(header_value).into_span_context()
}

fn key_value_pair(segment: &str) -> Option<(&str, &str)> {
    segment
        .split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
}

fn required<'a>(value: Option<&'a str>, key: &'static str) -> Result<&'a str, HeaderError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(HeaderError::MissingField(key))
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_root(value: &str) -> Result<TraceId, HeaderError> {
    let mut parts = value.split('-');
    let (Some(version), Some(timestamp), Some(unique), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(HeaderError::MalformedTraceId(value.to_owned()));
    };

    if version != XRAY_VERSION {
        return Err(HeaderError::UnsupportedVersion(version.to_owned()));
    }
    if !is_hex(timestamp, TIMESTAMP_HEX_LEN) {
        return Err(HeaderError::InvalidTimestamp(timestamp.to_owned()));
    }
    if !is_hex(unique, RANDOM_HEX_LEN) {
        return Err(HeaderError::InvalidUniqueId(unique.to_owned()));
    }

    // Both parts are plain hex digits here, so the radix parses cannot fail.
    let timestamp = u128::from_str_radix(timestamp, 16)
        .map_err(|_| HeaderError::InvalidTimestamp(timestamp.to_owned()))?;
    let unique = u128::from_str_radix(unique, 16)
        .map_err(|_| HeaderError::InvalidUniqueId(unique.to_owned()))?;

    let trace_id = TraceId::from_bytes(((timestamp << 96) | unique).to_be_bytes());
    if trace_id == TraceId::INVALID {
        return Err(HeaderError::InvalidTraceId);
    }

    Ok(trace_id)
}

fn parse_parent(value: &str) -> Result<SpanId, HeaderError> {
    if !is_hex(value, SPAN_ID_HEX_LEN) {
        return Err(HeaderError::MalformedParentId(value.to_owned()));
    }

    let span_id =
        SpanId::from_hex(value).map_err(|_| HeaderError::MalformedParentId(value.to_owned()))?;
    if span_id == SpanId::INVALID {
        return Err(HeaderError::InvalidParentId);
    }

    Ok(span_id)
}

/// Only `1` means sampled. Any other non-empty value is a valid "not sampled".
fn parse_sampled(value: &str) -> TraceFlags {
    if value == SAMPLED {
        TraceFlags::SAMPLED
    } else {
        TraceFlags::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TRACE_ID: &str = "5759e988bd862e3fe1be46a994272793";
    const SPAN_ID: &str = "53995c3f42cd8ad8";

    #[test]
    fn split_ignores_unknown_and_keyless_segments() {
        let fields = ParsedFields::split("Foo=Bar;Root=1-a-b;garbage;;Self=x;Parent=p;Sampled=s");
        assert_eq!(
            fields,
            ParsedFields {
                root: Some("1-a-b"),
                parent: Some("p"),
                sampled: Some("s"),
            }
        );
    }

    #[test]
    fn split_keeps_last_repeated_key() {
        let fields = ParsedFields::split("Sampled=0;Sampled=1");
        assert_eq!(fields.sampled, Some("1"));
    }

    #[test]
    fn split_only_on_first_equals() {
        let fields = ParsedFields::split("Root==1-a-b");
        assert_eq!(fields.root, Some("=1-a-b"));
    }

    #[test]
    fn keys_are_case_sensitive() {
        let fields = ParsedFields::split("root=1-a-b;PARENT=p;sampled=1");
        assert_eq!(fields, ParsedFields::default());
    }

    #[test]
    fn parse_valid_header() {
        let span_context = parse_header(
            "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1",
        )
        .unwrap();

        assert_eq!(span_context.trace_id(), TraceId::from_hex(TRACE_ID).unwrap());
        assert_eq!(span_context.span_id(), SpanId::from_hex(SPAN_ID).unwrap());
        assert!(span_context.is_sampled());
        assert!(span_context.is_remote());
        assert_eq!(span_context.trace_state(), &TraceState::NONE);
    }

    #[test]
    fn parse_tolerates_whitespace_around_segments() {
        let span_context = parse_header(
            "Root=1-5759e988-bd862e3fe1be46a994272793; Parent=53995c3f42cd8ad8 ; Sampled=0",
        )
        .unwrap();

        assert_eq!(span_context.span_id(), SpanId::from_hex(SPAN_ID).unwrap());
        assert!(!span_context.is_sampled());
    }

    #[test]
    fn parse_accepts_upper_case_hex() {
        let span_context = parse_header(
            "Root=1-5759E988-BD862E3FE1BE46A994272793;Parent=53995C3F42CD8AD8;Sampled=1",
        )
        .unwrap();

        assert_eq!(span_context.trace_id(), TraceId::from_hex(TRACE_ID).unwrap());
        assert_eq!(span_context.span_id(), SpanId::from_hex(SPAN_ID).unwrap());
    }

    #[rstest]
    #[case("Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::MissingField(HEADER_ROOT_KEY))]
    #[case("Root=;Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::MissingField(HEADER_ROOT_KEY))]
    #[case("Root=1-5759e988-bd862e3fe1be46a994272793;Sampled=1", HeaderError::MissingField(HEADER_PARENT_KEY))]
    #[case("Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8", HeaderError::MissingField(HEADER_SAMPLED_KEY))]
    #[case("Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=", HeaderError::MissingField(HEADER_SAMPLED_KEY))]
    #[case("Root=1*5759e988*bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::MalformedTraceId("1*5759e988*bd862e3fe1be46a994272793".to_string()))]
    #[case("Root=1-5759e988-bd862e3f-e1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::MalformedTraceId("1-5759e988-bd862e3f-e1be46a994272793".to_string()))]
    #[case("Root=2-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::UnsupportedVersion("2".to_string()))]
    #[case("Root=1-5759e98s46v8-bd862e3fe1frbe46a994272793;Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::InvalidTimestamp("5759e98s46v8".to_string()))]
    #[case("Root=1-+759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::InvalidTimestamp("+759e988".to_string()))]
    #[case("Root=1-5759e988-bd862e3fe1be46a99427279;Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::InvalidUniqueId("bd862e3fe1be46a99427279".to_string()))]
    #[case("Root=1-00000000-000000000000000000000000;Parent=53995c3f42cd8ad8;Sampled=1", HeaderError::InvalidTraceId)]
    #[case("Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad85dg;Sampled=1", HeaderError::MalformedParentId("53995c3f42cd8ad85dg".to_string()))]
    #[case("Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8adx;Sampled=1", HeaderError::MalformedParentId("53995c3f42cd8adx".to_string()))]
    #[case("Root=1-5759e988-bd862e3fe1be46a994272793;Parent=0000000000000000;Sampled=1", HeaderError::InvalidParentId)]
    fn parse_rejects(#[case] header: &str, #[case] expected: HeaderError) {
        assert_eq!(parse_header(header), Err(expected));
    }

    #[rstest]
    #[case("1", true)]
    #[case("0", false)]
    #[case("?", false)]
    #[case("12345", false)]
    #[case("true", false)]
    fn sampled_values(#[case] value: &str, #[case] sampled: bool) {
        let header = format!(
            "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled={value}"
        );
        let span_context = parse_header(&header).unwrap();

        assert_eq!(span_context.is_sampled(), sampled);
        assert!(span_context.is_valid());
    }

    #[test]
    fn xray_trace_id_from_trace_id() {
        let xray_id: XrayTraceId = TraceId::from_hex(TRACE_ID).unwrap().into();
        assert_eq!(xray_id.as_str(), "1-5759e988-bd862e3fe1be46a994272793");
        assert_eq!(xray_id.to_string(), "1-5759e988-bd862e3fe1be46a994272793");
    }

    #[test]
    fn xray_trace_id_keeps_leading_zeros() {
        let xray_id = XrayTraceId::from(TraceId::from_hex("00000001000000000000000000000002").unwrap());
        assert_eq!(xray_id.as_str(), "1-00000001-000000000000000000000002");
    }

    #[test]
    fn xray_trace_id_into_trace_id() {
        let xray_id: XrayTraceId = "1-58406520-a006649127e371903a2de979".parse().unwrap();
        assert_eq!(
            TraceId::try_from(xray_id),
            Ok(TraceId::from_hex("58406520a006649127e371903a2de979").unwrap())
        );
    }

    #[test]
    fn xray_trace_id_from_str_rejects_bad_ids() {
        assert_eq!(
            "1-bogus-bad".parse::<XrayTraceId>(),
            Err(HeaderError::InvalidTimestamp("bogus".to_string()))
        );
        assert_eq!(
            "1-too-many-parts".parse::<XrayTraceId>(),
            Err(HeaderError::MalformedTraceId("1-too-many-parts".to_string()))
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            HeaderError::MissingField(HEADER_SAMPLED_KEY).to_string(),
            "missing or empty `Sampled` field"
        );
        assert_eq!(
            HeaderError::UnsupportedVersion("2".to_string()).to_string(),
            "unsupported trace id version `2`"
        );
    }
}
