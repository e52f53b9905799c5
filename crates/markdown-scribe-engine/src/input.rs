//! Pointer/keyboard input descriptors and the raw-input coalescing policy.

use std::time::{Duration, Instant};

/// Modifier keys held during a pointer or keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        shift: false,
        ctrl: false,
    };

    pub fn alt() -> Self {
        Modifiers {
            alt: true,
            ..Default::default()
        }
    }

    pub fn shift() -> Self {
        Modifiers {
            shift: true,
            ..Default::default()
        }
    }

    pub fn ctrl() -> Self {
        Modifiers {
            ctrl: true,
            ..Default::default()
        }
    }

    pub fn is_only_alt(&self) -> bool {
        self.alt && !self.shift && !self.ctrl
    }

    pub fn is_only_shift(&self) -> bool {
        self.shift && !self.alt && !self.ctrl
    }

    pub fn is_only_ctrl(&self) -> bool {
        self.ctrl && !self.alt && !self.shift
    }

    pub fn is_ctrl_shift(&self) -> bool {
        self.ctrl && self.shift && !self.alt
    }

    pub fn is_alt_shift(&self) -> bool {
        self.alt && self.shift && !self.ctrl
    }
}

/// Keyboard selection keys the core understands. Character input arrives
/// through the command layer instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// Ctrl/Cmd-A.
    SelectAll,
}

/// Coalesces bursts of raw input events into single commands.
///
/// The host calls [`InputThrottle::admit`] per raw event; events arriving
/// within the window after an admitted one are dropped so fast typing and
/// autorepeat collapse into one command per window.
#[derive(Debug)]
pub struct InputThrottle {
    window: Duration,
    last_admitted: Option<Instant>,
}

impl Default for InputThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(8))
    }
}

impl InputThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_admitted: None,
        }
    }

    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    fn admit_at(&mut self, now: Instant) -> bool {
        match self.last_admitted {
            Some(prev) if now.duration_since(prev) < self.window => false,
            _ => {
                self.last_admitted = Some(now);
                true
            }
        }
    }
}
