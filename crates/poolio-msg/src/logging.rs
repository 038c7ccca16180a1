//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use tracing::debug;

use crate::envelope::EnvelopeHeader;
use crate::validator::ValidationError;

/// Direction of the message movement, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Message encoded for sending.
    Outbound,
    /// Message decoded after receipt.
    Inbound,
}

/// Emit a structured log entry for an encoded or decoded envelope.
pub fn log_envelope(direction: MessageDirection, header: &EnvelopeHeader) {
    debug!(
        device_id = header.device_id(),
        message_type = header.message_type(),
        version = header.version(),
        timestamp = header.timestamp(),
        direction = ?direction,
        "message envelope"
    );
}

/// Prometheus metric handles for message traffic.
#[derive(Clone)]
pub struct MessagingMetricsExporter {
    encoded: IntCounter,
    decoded: IntCounter,
    rejected: IntCounterVec,
    size: Histogram,
}

impl MessagingMetricsExporter {
    /// Register message metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let encoded = IntCounter::with_opts(Opts::new(
            "poolio_messages_encoded_total",
            "Messages encoded for sending",
        ))?;
        let decoded = IntCounter::with_opts(Opts::new(
            "poolio_messages_decoded_total",
            "Inbound messages accepted and decoded",
        ))?;
        let rejected = IntCounterVec::new(
            Opts::new(
                "poolio_messages_rejected_total",
                "Inbound messages screened out, by failure kind",
            ),
            &["reason"],
        )?;
        let size = Histogram::with_opts(
            HistogramOpts::new(
                "poolio_message_size_bytes",
                "UTF-8 size of inbound messages",
            )
            .buckets(vec![128.0, 256.0, 512.0, 1024.0, 2048.0, 4096.0, 8192.0]),
        )?;

        registry.register(Box::new(encoded.clone()))?;
        registry.register(Box::new(decoded.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(size.clone()))?;

        Ok(Self {
            encoded,
            decoded,
            rejected,
            size,
        })
    }

    /// Record an encoded message.
    pub fn observe_encoded(&self) {
        self.encoded.inc();
    }

    /// Record an accepted inbound message.
    pub fn observe_decoded(&self) {
        self.decoded.inc();
    }

    /// Record one rejection per failure kind.
    pub fn observe_rejected(&self, errors: &[ValidationError]) {
        for error in errors {
            self.rejected.with_label_values(&[error.kind()]).inc();
        }
    }

    /// Record a rejection that happened after screening, during decoding.
    pub fn observe_decode_failure(&self) {
        self.rejected.with_label_values(&["decode_failure"]).inc();
    }

    /// Record the size of an inbound message.
    pub fn observe_size(&self, bytes: usize) {
        self.size.observe(bytes as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(registry: &Registry, name: &str, label: Option<&str>) -> f64 {
        registry
            .gather()
            .iter()
            .find(|family| family.get_name() == name)
            .and_then(|family| {
                family.get_metric().iter().find(|metric| match label {
                    Some(value) => metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_value() == value),
                    None => true,
                })
                .map(|metric| metric.get_counter().get_value())
            })
            .unwrap_or_default()
    }

    #[test]
    fn metrics_exporter_records_counts() {
        let registry = Registry::new();
        let metrics = MessagingMetricsExporter::register(&registry).expect("register metrics");
        metrics.observe_encoded();
        metrics.observe_decoded();
        metrics.observe_decoded();
        metrics.observe_size(512);
        metrics.observe_rejected(&[
            ValidationError::MissingEnvelopeField("type"),
            ValidationError::MissingEnvelopeField("payload"),
            ValidationError::UnknownMessageType("bogus_type".into()),
        ]);

        assert_eq!(counter(&registry, "poolio_messages_encoded_total", None), 1.0);
        assert_eq!(counter(&registry, "poolio_messages_decoded_total", None), 2.0);
        assert_eq!(
            counter(
                &registry,
                "poolio_messages_rejected_total",
                Some("missing_envelope_field")
            ),
            2.0
        );
        assert_eq!(
            counter(
                &registry,
                "poolio_messages_rejected_total",
                Some("unknown_message_type")
            ),
            1.0
        );
        assert!(registry
            .gather()
            .iter()
            .any(|f| f.get_name() == "poolio_message_size_bytes"));
    }

    #[test]
    fn registering_twice_fails() {
        let registry = Registry::new();
        MessagingMetricsExporter::register(&registry).expect("first registration");
        assert!(MessagingMetricsExporter::register(&registry).is_err());
    }
}
