//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Screen-then-decode handling for messages arriving from a transport.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use poolio_common::time::{unix_seconds, Clock, SystemClock};
use tracing::warn;

use crate::decoder::decode_envelope;
use crate::envelope::{EnvelopeHeader, PROTOCOL_VERSION};
use crate::logging::MessagingMetricsExporter;
use crate::types::Payload;
use crate::validator::Validator;
use crate::{MessagingError, Result};

/// A screened and decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    /// Envelope metadata.
    pub header: EnvelopeHeader,
    /// Typed payload.
    pub payload: Payload,
}

/// Snapshot of pipeline outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Messages that passed screening and decoded.
    pub accepted: u64,
    /// Messages dropped by screening or decoding.
    pub rejected: u64,
}

struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Validates raw inbound JSON, then decodes it. Shareable across receive threads.
pub struct InboundPipeline {
    validator: Validator,
    clock: Arc<dyn Clock>,
    metrics: Option<MessagingMetricsExporter>,
    counters: Counters,
}

impl InboundPipeline {
    /// Pipeline using `validator` and the system clock.
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            clock: Arc::new(SystemClock),
            metrics: None,
            counters: Counters::new(),
        }
    }

    /// Judge freshness against `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Report outcomes to `metrics`.
    pub fn with_metrics(mut self, metrics: MessagingMetricsExporter) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Outcome counts so far.
    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Screen and decode one message.
    ///
    /// Screening failures come back as [`MessagingError::Rejected`] carrying every
    /// reason. A version other than the current protocol version is logged but
    /// accepted.
    pub fn accept(&self, json: &str) -> Result<ReceivedMessage> {
        if let Some(metrics) = &self.metrics {
            metrics.observe_size(json.len());
        }

        let (valid, errors) = self
            .validator
            .check(json, Some(unix_seconds(self.clock.as_ref())));
        if !valid {
            let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
            warn!(reasons = ?reasons, "inbound message rejected");
            if let Some(metrics) = &self.metrics {
                metrics.observe_rejected(&errors);
            }
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(MessagingError::Rejected(errors));
        }

        let (header, payload) = decode_envelope(json).map_err(|err| {
            warn!(error = %err, "inbound message failed to decode");
            if let Some(metrics) = &self.metrics {
                metrics.observe_decode_failure();
            }
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            err
        })?;

        if header.version() != PROTOCOL_VERSION {
            warn!(
                device_id = header.device_id(),
                received = header.version(),
                expected = PROTOCOL_VERSION,
                "protocol version skew"
            );
        }
        if let Some(metrics) = &self.metrics {
            metrics.observe_decoded();
        }
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(ReceivedMessage { header, payload })
    }
}

impl Default for InboundPipeline {
    fn default() -> Self {
        Self::new(Validator::default())
    }
}
