//! Serial realization of [`AuthorizationTransport`].
//!
//! Wire contract with the companion board:
//!
//! ```text
//!  gate ──▶ "CAR_DETECTED\n"        (up to N transmit attempts)
//!  gate ◀── "OK" | "NO"             (2 raw bytes, no terminator)
//! ```
//!
//! A transmit is retried only when the write itself fails. The reply is
//! collected in short receive attempts; a partial reply at the end of an
//! attempt is dropped. The overall budget runs from the first transmit.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::link::ByteLink;
use super::{AuthorizationOutcome, AuthorizationRequest, AuthorizationTransport};
use crate::app::ports::ClockPort;
use crate::config::SerialConfig;

/// Request line sent on every presence event.
pub const REQUEST_LINE: &[u8] = b"CAR_DETECTED\n";

const REPLY_GRANT: [u8; 2] = *b"OK";
const REPLY_DENY: [u8; 2] = *b"NO";

/// Pause between polls of the receive buffer (milliseconds).
const RX_POLL_MS: u32 = 5;

/// Upper bound on reads spent discarding stale input.
const DRAIN_LIMIT: usize = 64;

pub struct SerialDecisionTransport<L, C, D> {
    link: L,
    clock: C,
    delay: D,
    config: SerialConfig,
}

impl<L, C, D> SerialDecisionTransport<L, C, D>
where
    L: ByteLink,
    C: ClockPort,
    D: DelayNs,
{
    pub fn new(link: L, clock: C, delay: D, config: SerialConfig) -> Self {
        Self {
            link,
            clock,
            delay,
            config,
        }
    }

    /// Borrow the underlying link (tests inspect recorded traffic).
    pub fn link(&self) -> &L {
        &self.link
    }

    fn drain_stale_input(&mut self) {
        let mut scratch = [0u8; 16];
        let mut dropped = 0usize;
        for _ in 0..DRAIN_LIMIT {
            if !self.link.available() {
                break;
            }
            match self.link.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(n) => dropped += n,
            }
        }
        if dropped > 0 {
            debug!("AUTHZ/serial: dropped {} stale byte(s)", dropped);
        }
    }

    /// Send the request line, retrying failed writes. Returns the number
    /// of attempts used on success.
    fn transmit(&mut self) -> Option<u8> {
        let attempts = self.config.tx_attempts;
        for attempt in 1..=attempts {
            match self.link.write(REQUEST_LINE) {
                Ok(n) if n == REQUEST_LINE.len() => {
                    if let Err(e) = self.link.flush() {
                        debug!("AUTHZ/serial: flush failed: {:?}", e);
                    }
                    return Some(attempt);
                }
                Ok(n) => warn!(
                    "AUTHZ/serial: short write {}/{} (attempt {}/{})",
                    n,
                    REQUEST_LINE.len(),
                    attempt,
                    attempts
                ),
                Err(e) => warn!(
                    "AUTHZ/serial: tx failed: {:?} (attempt {}/{})",
                    e, attempt, attempts
                ),
            }
            if attempt < attempts {
                self.delay.delay_ms(self.config.tx_retry_interval_ms);
            }
        }
        None
    }

    /// Collect one two-byte reply within `window_ms`. Partial data is
    /// discarded when the window closes.
    fn receive_attempt(&mut self, window_ms: u32) -> Option<[u8; 2]> {
        let opened = self.clock.now_ms();
        let mut reply = [0u8; 2];
        let mut got = 0usize;
        loop {
            match self.link.read(&mut reply[got..]) {
                Ok(n) => got += n,
                Err(e) => {
                    debug!("AUTHZ/serial: rx error {:?}, discarding attempt", e);
                    got = 0;
                }
            }
            if got == reply.len() {
                return Some(reply);
            }
            if self.clock.now_ms().wrapping_sub(opened) >= window_ms {
                if got > 0 {
                    debug!("AUTHZ/serial: partial reply discarded");
                }
                return None;
            }
            self.delay.delay_ms(RX_POLL_MS.min(window_ms));
        }
    }
}

impl<L, C, D> AuthorizationTransport for SerialDecisionTransport<L, C, D>
where
    L: ByteLink,
    C: ClockPort,
    D: DelayNs,
{
    fn request_decision(
        &mut self,
        request: &AuthorizationRequest,
        budget_ms: u32,
    ) -> AuthorizationOutcome {
        self.drain_stale_input();
        let started = self.clock.now_ms();

        let Some(attempts) = self.transmit() else {
            warn!(
                "AUTHZ/serial: request #{} abandoned after {} tx attempts",
                request.id, self.config.tx_attempts
            );
            return AuthorizationOutcome::NoResponse;
        };
        debug!("AUTHZ/serial: request #{} sent (attempt {})", request.id, attempts);

        loop {
            let elapsed = self.clock.now_ms().wrapping_sub(started);
            if elapsed >= budget_ms {
                warn!("AUTHZ/serial: no reply to #{} within {} ms", request.id, budget_ms);
                return AuthorizationOutcome::NoResponse;
            }
            let window = self.config.rx_attempt_timeout_ms.min(budget_ms - elapsed).max(1);
            if let Some(reply) = self.receive_attempt(window) {
                let outcome = match reply {
                    REPLY_GRANT => AuthorizationOutcome::Granted(None),
                    REPLY_DENY => AuthorizationOutcome::Denied,
                    other => {
                        warn!("AUTHZ/serial: unexpected reply {:02x?}", other);
                        AuthorizationOutcome::NoResponse
                    }
                };
                info!("AUTHZ/serial: #{} -> {}", request.id, outcome.label());
                return outcome;
            }
        }
    }
}
