//! W3C trace-context propagation over header bags.
//!
//! Carriers implement the OpenTelemetry [`Injector`] / [`Extractor`] traits;
//! the wire format is handled by [`TraceContextPropagator`].

use std::collections::BTreeMap;

use opentelemetry::Context;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{TraceContextExt, TraceId};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header carrying the trace context, on HTTP requests and broker messages.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Writes the span context of `cx` into the carrier. A context without a
/// valid span writes nothing.
pub fn inject(cx: &Context, injector: &mut dyn Injector) {
    TraceContextPropagator::new().inject_context(cx, injector);
}

/// Reads a remote span context from the carrier. Missing or malformed
/// headers yield `None`.
pub fn extract(extractor: &dyn Extractor) -> Option<Context> {
    let cx = TraceContextPropagator::new().extract_with_context(&Context::new(), extractor);
    if cx.span().span_context().is_valid() {
        Some(cx)
    } else {
        if extractor.get(TRACEPARENT_HEADER).is_some() {
            tracing::debug!("ignoring invalid traceparent");
        }
        None
    }
}

/// Context to send with a call made from inside `span`.
///
/// When spans are exported through `tracing-opentelemetry`, this is the
/// span's own context, so the receiver's parent is a recorded span.
/// Otherwise the caller's context is forwarded unchanged.
pub fn outbound_context(span: &tracing::Span, caller: &Context) -> Context {
    let cx = span.context();
    if cx.span().span_context().is_valid() {
        cx
    } else {
        caller.clone()
    }
}

/// Trace id of `cx`, all zeros when it carries no span.
pub fn trace_id(cx: &Context) -> TraceId {
    cx.span().span_context().trace_id()
}

/// Headers attached to a broker message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders(BTreeMap<String, String>);

impl MessageHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Injector for MessageHeaders {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }
}

impl Extractor for MessageHeaders {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// Writes into an HTTP header map.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) else {
            tracing::debug!(key, "dropping header that is not valid HTTP");
            return;
        };
        self.0.insert(name, value);
    }
}

/// Reads from an HTTP header map.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceState};

    fn remote(trace_id: u8, span_id: u8) -> Context {
        Context::new().with_remote_span_context(SpanContext::new(
            TraceId::from_bytes([trace_id; 16]),
            SpanId::from_bytes([span_id; 8]),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        ))
    }

    #[test]
    fn test_inject_extract_message_headers() {
        let cx = remote(0xab, 0x12);
        let mut headers = MessageHeaders::new();
        inject(&cx, &mut headers);

        assert_eq!(
            Extractor::get(&headers, TRACEPARENT_HEADER),
            Some("00-abababababababababababababababab-1212121212121212-01")
        );
        let carried = extract(&headers).unwrap();
        let span = carried.span();
        assert_eq!(span.span_context().trace_id(), TraceId::from_bytes([0xab; 16]));
        assert_eq!(span.span_context().span_id(), SpanId::from_bytes([0x12; 8]));
        assert!(span.span_context().is_remote());
    }

    #[test]
    fn test_inject_extract_http_headers() {
        let cx = remote(0x01, 0x02);
        let mut headers = HeaderMap::new();
        inject(&cx, &mut HeaderInjector(&mut headers));

        assert!(headers.contains_key(TRACEPARENT_HEADER));
        let carried = extract(&HeaderExtractor(&headers)).unwrap();
        assert_eq!(trace_id(&carried), TraceId::from_bytes([0x01; 16]));
    }

    #[test]
    fn test_context_without_span_writes_nothing() {
        let mut headers = MessageHeaders::new();
        inject(&Context::new(), &mut headers);
        assert!(headers.is_empty());
        assert_eq!(trace_id(&Context::new()), TraceId::INVALID);
    }

    #[test]
    fn test_extract_missing_or_invalid() {
        let mut headers = MessageHeaders::new();
        assert!(extract(&headers).is_none());

        headers.set(TRACEPARENT_HEADER, "not-a-trace".to_string());
        assert!(extract(&headers).is_none());

        headers.set(
            TRACEPARENT_HEADER,
            "00-00000000000000000000000000000000-1212121212121212-01".to_string(),
        );
        assert!(extract(&headers).is_none());
    }

    #[test]
    fn test_set_replaces_value() {
        let mut headers = MessageHeaders::new();
        headers.set("k", "a".to_string());
        headers.set("k", "b".to_string());
        assert_eq!(headers.len(), 1);
        assert_eq!(Extractor::get(&headers, "k"), Some("b"));
    }

    #[test]
    fn test_http_injector_skips_invalid_header_name() {
        let mut headers = HeaderMap::new();
        HeaderInjector(&mut headers).set("bad header", "v".to_string());
        assert!(HeaderExtractor(&headers).keys().is_empty());
    }

    #[test]
    fn test_outbound_context_falls_back_to_caller() {
        let cx = remote(0x07, 0x08);
        let outbound = outbound_context(&tracing::Span::none(), &cx);
        assert_eq!(trace_id(&outbound), TraceId::from_bytes([0x07; 16]));
    }
}
