//! Console status presenter.
//!
//! Renders each [`StatusScreen`] as log lines, prefixed `LCD |`. The last
//! frame is kept so callers (and tests) can see what is on screen. A
//! disabled presenter accepts every call and renders nothing.

use log::info;

use crate::app::ports::{StatusPresenter, StatusScreen};
use crate::authz::Identifier;
use crate::config::GateConfig;
use crate::text::truncated;

pub struct ConsolePresenter {
    enabled: bool,
    last: Option<(StatusScreen, Option<Identifier>)>,
    frames: u32,
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self {
            enabled: true,
            last: None,
            frames: 0,
        }
    }

    /// A presenter for builds without a display.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// The presenter the firmware installs for `config`.
    pub fn for_config(config: &GateConfig) -> Self {
        if config.status_display {
            Self::new()
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_screen(&self) -> Option<StatusScreen> {
        self.last.as_ref().map(|(s, _)| *s)
    }

    pub fn last_identifier(&self) -> Option<&str> {
        self.last.as_ref().and_then(|(_, id)| id.as_deref())
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }
}

impl StatusPresenter for ConsolePresenter {
    fn show(&mut self, screen: StatusScreen, identifier: Option<&str>) {
        if !self.enabled {
            return;
        }
        let identifier = identifier.map(truncated::<32>);
        for line in screen.lines() {
            info!("LCD | {}", line);
        }
        if let Some(id) = &identifier {
            info!("LCD | {}", id);
        }
        self.frames = self.frames.wrapping_add(1);
        self.last = Some((screen, identifier));
    }
}
