//! Time-based presence debouncer.
//!
//! A raw level is accepted as the new stable state only after it has been
//! observed unchanged for at least the debounce window. Each accepted
//! change produces exactly one [`PresenceEdge`]; edges therefore strictly
//! alternate. All time arithmetic is wrapping `u32` milliseconds so the
//! filter survives the ~49 day rollover of the uptime counter.

/// A committed change of the stable presence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEdge {
    /// Object arrived.
    Asserted,
    /// Object left.
    Cleared,
}

#[derive(Debug, Clone, Copy)]
struct Track {
    last_raw: bool,
    stable: bool,
    last_change_ms: u32,
}

#[derive(Debug, Clone)]
pub struct PresenceDebouncer {
    window_ms: u32,
    active_high: bool,
    /// `None` until the first sample primes the filter.
    track: Option<Track>,
}

impl PresenceDebouncer {
    /// Unprimed debouncer: the first call to [`sample`](Self::sample)
    /// initialises the stable state and reports no edge.
    pub fn new(window_ms: u32, active_high: bool) -> Self {
        Self {
            window_ms,
            active_high,
            track: None,
        }
    }

    /// Debouncer primed from an explicit boot-time read.
    pub fn primed(window_ms: u32, active_high: bool, raw: bool, now_ms: u32) -> Self {
        let mut d = Self::new(window_ms, active_high);
        d.track = Some(Track {
            last_raw: raw,
            stable: raw,
            last_change_ms: now_ms,
        });
        d
    }

    /// Feed one raw sample. Returns an edge when the stable state changes.
    pub fn sample(&mut self, raw: bool, now_ms: u32) -> Option<PresenceEdge> {
        let Some(t) = self.track.as_mut() else {
            self.track = Some(Track {
                last_raw: raw,
                stable: raw,
                last_change_ms: now_ms,
            });
            return None;
        };

        if raw != t.last_raw {
            t.last_raw = raw;
            t.last_change_ms = now_ms;
            return None;
        }

        if raw != t.stable && now_ms.wrapping_sub(t.last_change_ms) >= self.window_ms {
            t.stable = raw;
            return Some(if raw == self.active_high {
                PresenceEdge::Asserted
            } else {
                PresenceEdge::Cleared
            });
        }
        None
    }

    /// Debounced presence. `false` before the first sample.
    pub fn is_present(&self) -> bool {
        self.track
            .is_some_and(|t| t.stable == self.active_high)
    }

    pub fn is_primed(&self) -> bool {
        self.track.is_some()
    }
}
