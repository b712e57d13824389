//! AWS X-Ray trace propagation and id generation.
//!
//! [`XrayPropagator`] reads and writes the `X-Amzn-Trace-Id` header, and
//! [`XrayIdGenerator`] produces trace ids the X-Ray backend accepts.
mod header;
mod id_generator;
mod propagator;

pub use header::{HeaderError, XrayTraceId};
pub use id_generator::XrayIdGenerator;
pub use propagator::XrayPropagator;
