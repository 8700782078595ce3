//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing gate events to the ESP-IDF logger
//! (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::GateEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`GateEvent`] to the serial console.
pub struct LogEventSink;

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &GateEvent) {
        match event {
            GateEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            GateEvent::PhaseChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            GateEvent::PresenceChanged(edge) => {
                info!("SENSE | {:?}", edge);
            }
            GateEvent::DecisionRequested { request_id } => {
                info!("AUTHZ | #{} requested", request_id);
            }
            GateEvent::DecisionRefused { request_id } => {
                warn!("AUTHZ | #{} refused by dispatcher", request_id);
            }
            GateEvent::DecisionResolved {
                request_id,
                outcome,
                elapsed_ms,
            } => {
                info!(
                    "AUTHZ | #{} {} after {}ms",
                    request_id,
                    outcome.label(),
                    elapsed_ms
                );
            }
            GateEvent::DecisionTimedOut { request_id } => {
                warn!("AUTHZ | #{} timed out", request_id);
            }
        }
    }
}
