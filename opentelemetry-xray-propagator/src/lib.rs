//! Propagates trace context in the [AWS X-Ray tracing header] format.
//!
//! # Components
//!
//! ### X-Ray Propagator
//! [`XrayPropagator`] reads and writes the `X-Amzn-Trace-Id` header so that
//! spans created by OpenTelemetry join traces started by (or continued in)
//! AWS services such as API Gateway, Lambda or an Application Load Balancer.
//!
//! ### X-Ray Id Generator
//! [`trace::XrayIdGenerator`] generates trace ids whose first 32 bits hold the
//! trace start time, which the X-Ray backend requires.
//!
//! ### Quick start
//! ```
//! use opentelemetry::{
//!     global,
//!     propagation::TextMapPropagator,
//!     trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState},
//!     Context,
//! };
//! use opentelemetry_xray_propagator::XrayPropagator;
//! use std::collections::HashMap;
//!
//! // Make the X-Ray propagator the process wide default.
//! global::set_text_map_propagator(XrayPropagator::new());
//!
//! let span_context = SpanContext::new(
//!     TraceId::from_hex("5759e988bd862e3fe1be46a994272793").unwrap(),
//!     SpanId::from_hex("53995c3f42cd8ad8").unwrap(),
//!     TraceFlags::SAMPLED,
//!     false,
//!     TraceState::default(),
//! );
//! let cx = Context::new().with_remote_span_context(span_context);
//!
//! // Outgoing request: write the header.
//! let mut headers: HashMap<String, String> = HashMap::new();
//! global::get_text_map_propagator(|propagator| propagator.inject_context(&cx, &mut headers));
//! assert_eq!(
//!     headers.get("x-amzn-trace-id").map(String::as_str),
//!     Some("Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1")
//! );
//!
//! // Incoming request: read it back.
//! let parent_cx = global::get_text_map_propagator(|propagator| propagator.extract(&headers));
//! assert!(parent_cx.span().span_context().is_remote());
//! ```
//!
//! [AWS X-Ray tracing header]: https://docs.aws.amazon.com/xray/latest/devguide/xray-concepts.html#xray-concepts-tracingheader
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/open-telemetry/opentelemetry-rust/main/assets/logo.svg"
)]

#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub mod trace;

#[cfg(feature = "trace")]
pub use trace::XrayPropagator;
