use super::header::{
    parse_header, XrayTraceId, HEADER_PARENT_KEY, HEADER_ROOT_KEY, HEADER_SAMPLED_KEY,
    NOT_SAMPLED, SAMPLED,
};
use opentelemetry::{
    otel_debug,
    propagation::{text_map_propagator::FieldIter, Extractor, Injector, TextMapPropagator},
    trace::{SpanContext, TraceContextExt},
    Context,
};
use std::sync::OnceLock;

pub(crate) const AWS_XRAY_TRACE_HEADER: &str = "X-Amzn-Trace-Id";

static AWS_XRAY_HEADER_FIELD: OnceLock<[String; 1]> = OnceLock::new();

fn xray_header_field() -> &'static [String; 1] {
    AWS_XRAY_HEADER_FIELD.get_or_init(|| [AWS_XRAY_TRACE_HEADER.to_owned()])
}

/// Extracts and injects `SpanContext`s into `Extractor`s or `Injector`s using
/// the AWS X-Ray header format.
///
/// Reads and writes the `X-Amzn-Trace-Id` header, converting between the
/// OpenTelemetry [SpanContext][otel-spec] and the [X-Ray trace format][xray-trace-id]:
///
/// `X-Amzn-Trace-Id: Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1`
///
/// Only `Root`, `Parent` and `Sampled` are read; other fields are ignored and
/// never written. A header missing any of the three, or with a malformed
/// `Root` or `Parent`, is rejected as a whole. `Sampled=1` marks the context
/// sampled, any other non-empty value marks it not sampled.
///
/// For details on the [`X-Amzn-Trace-Id` header][xray-header] see the AWS X-Ray docs.
///
/// ## Example
///
/// ```
/// use opentelemetry::global;
/// use opentelemetry_xray_propagator::XrayPropagator;
///
/// global::set_text_map_propagator(XrayPropagator::default());
/// ```
///
/// [otel-spec]: https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/trace/api.md#spancontext
/// [xray-trace-id]: https://docs.aws.amazon.com/xray/latest/devguide/xray-api-sendingdata.html#xray-api-traceids
/// [xray-header]: https://docs.aws.amazon.com/xray/latest/devguide/xray-concepts.html#xray-concepts-tracingheader
#[derive(Clone, Debug, Default)]
pub struct XrayPropagator {
    _private: (),
}

impl XrayPropagator {
    /// Creates a new `XrayPropagator`.
    pub fn new() -> Self {
        XrayPropagator { _private: () }
    }

    /// Reads the X-Ray header from `extractor`.
    ///
    /// Returns a remote span context when the header is present and well
    /// formed, and [`SpanContext::NONE`] otherwise.
    pub fn extract_span_context(&self, extractor: &dyn Extractor) -> SpanContext {
        let header_value = extractor.get(AWS_XRAY_TRACE_HEADER).unwrap_or("").trim();
        if header_value.is_empty() {
            return SpanContext::NONE;
        }

        match parse_header(header_value) {
            Ok(span_context) => span_context,
            Err(err) => {
                otel_debug!(
                    name: "XrayPropagator.Extract.InvalidHeader",
                    reason = format!("{err}")
                );
                SpanContext::NONE
            }
        }
    }
}

impl TextMapPropagator for XrayPropagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return;
        }

        let sampled = if span_context.is_sampled() {
            SAMPLED
        } else {
            NOT_SAMPLED
        };

        injector.set(
            AWS_XRAY_TRACE_HEADER,
            format!(
                "{}={};{}={:016x};{}={}",
                HEADER_ROOT_KEY,
                XrayTraceId::from(span_context.trace_id()),
                HEADER_PARENT_KEY,
                span_context.span_id(),
                HEADER_SAMPLED_KEY,
                sampled,
            ),
        );
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        let span_context = self.extract_span_context(extractor);
        if span_context.is_valid() {
            cx.with_remote_span_context(span_context)
        } else {
            cx.clone()
        }
    }

    fn fields(&self) -> FieldIter<'_> {
        FieldIter::new(xray_header_field())
    }
}
