use opentelemetry::trace::{SpanId, TraceId};
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator};
use std::time::{SystemTime, UNIX_EPOCH};

const UNIQUE_ID_MASK: u128 = (1 << 96) - 1;

/// Generates AWS X-Ray compatible trace ids.
///
/// X-Ray expects the first 8 hex digits of a trace id to be the Unix epoch
/// time, in seconds, at which the trace started, and rejects ids that do not
/// follow this layout. Every trace id produced here keeps the 96 low bits
/// random and puts the current time in the 32 high bits. Span ids are
/// random.
///
/// ## Example
///
/// ```
/// use opentelemetry_sdk::trace::SdkTracerProvider;
/// use opentelemetry_xray_propagator::trace::XrayIdGenerator;
///
/// let _provider = SdkTracerProvider::builder()
///     .with_id_generator(XrayIdGenerator::default())
///     .build();
/// ```
#[derive(Clone, Debug, Default)]
pub struct XrayIdGenerator {
    random: RandomIdGenerator,
}

impl XrayIdGenerator {
    /// Creates a new `XrayIdGenerator`.
    pub fn new() -> Self {
        XrayIdGenerator::default()
    }

    fn trace_id_at(&self, epoch_seconds: u32) -> TraceId {
        let unique = u128::from_be_bytes(self.random.new_trace_id().to_bytes()) & UNIQUE_ID_MASK;
        TraceId::from_bytes(((u128::from(epoch_seconds) << 96) | unique).to_be_bytes())
    }
}

impl IdGenerator for XrayIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        // Clocks before 1970 get a zero timestamp; the random part keeps the id valid.
        let epoch_seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or_default();

        self.trace_id_at(epoch_seconds)
    }

    fn new_span_id(&self) -> SpanId {
        self.random.new_span_id()
    }
}
