use embassy_time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeEvent {
    Pressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebouncePhase {
    Stable,
    Settling,
}

/// Turns a bouncing button level into single press events.
///
/// A new level is committed once the raw input has held it for the whole
/// window. Only commits to the active level emit an event, and a committed
/// press within `cooldown` of the previous one is swallowed.
pub struct Debouncer {
    last_raw: bool,
    last_change: Instant,
    stable: bool,
    active: bool,
    phase: DebouncePhase,
    window: Duration,
    cooldown: Duration,
    last_press: Option<Instant>,
}

impl Debouncer {
    /// `active` is the level that means pressed; `false` for a pull-up button.
    pub fn new(initial: bool, active: bool, window: Duration, cooldown: Duration) -> Self {
        Self {
            last_raw: initial,
            last_change: Instant::from_ticks(0),
            stable: initial,
            active,
            phase: DebouncePhase::Stable,
            window,
            cooldown,
            last_press: None,
        }
    }

    pub fn phase(&self) -> DebouncePhase {
        self.phase
    }

    pub fn stable_level(&self) -> bool {
        self.stable
    }

    pub fn poll(&mut self, raw: bool, now: Instant) -> Option<EdgeEvent> {
        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_change = now;
            self.phase = DebouncePhase::Settling;
            return None;
        }

        if raw == self.stable {
            self.phase = DebouncePhase::Stable;
            return None;
        }

        if now.saturating_duration_since(self.last_change) < self.window {
            return None;
        }

        self.stable = raw;
        self.phase = DebouncePhase::Stable;

        if raw != self.active {
            return None;
        }

        if let Some(last) = self.last_press {
            if now.saturating_duration_since(last) < self.cooldown {
                log_debug!("button: press inside cooldown ignored");
                return None;
            }
        }

        self.last_press = Some(now);
        Some(EdgeEvent::Pressed)
    }
}
