use crate::presets::PresetId;
use std::time::{Duration, Instant};

/// Where a preset press currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Pressing { id: PresetId, since: Instant },
    /// Long press already reported; the release must not count as a click
    LongPressFired { id: PresetId },
}

/// What a gesture resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutput {
    Click(PresetId),
    LongPress(PresetId),
}

/// Tells a click from a long press on a preset.
///
/// Holds at most one pending long-press deadline; ending or cancelling the
/// press clears it.
#[derive(Debug)]
pub struct PressGesture {
    state: GestureState,
    threshold: Duration,
}

impl PressGesture {
    pub fn new(threshold: Duration) -> Self {
        Self {
            state: GestureState::Idle,
            threshold,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Start pressing `id`, dropping whatever gesture was under way
    pub fn press_start(&mut self, id: PresetId, now: Instant) {
        self.state = GestureState::Pressing { id, since: now };
    }

    /// When the pending long press fires, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            GestureState::Pressing { since, .. } => Some(since + self.threshold),
            _ => None,
        }
    }

    /// Fire the long press once the press has been held long enough
    pub fn poll(&mut self, now: Instant) -> Option<GestureOutput> {
        match self.state {
            GestureState::Pressing { id, since } if now.duration_since(since) >= self.threshold => {
                self.state = GestureState::LongPressFired { id };
                Some(GestureOutput::LongPress(id))
            }
            _ => None,
        }
    }

    /// Release the press. A short press is a click; after a long press
    /// nothing more happens.
    pub fn press_end(&mut self, now: Instant) -> Option<GestureOutput> {
        if let Some(long_press) = self.poll(now) {
            self.state = GestureState::Idle;
            return Some(long_press);
        }
        let output = match self.state {
            GestureState::Pressing { id, .. } => Some(GestureOutput::Click(id)),
            GestureState::LongPressFired { .. } | GestureState::Idle => None,
        };
        self.state = GestureState::Idle;
        output
    }

    /// Abort the gesture with no output
    pub fn press_cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(500);

    #[test]
    fn test_short_press_is_click() {
        let t0 = Instant::now();
        let mut gesture = PressGesture::new(THRESHOLD);
        gesture.press_start(3, t0);
        assert_eq!(gesture.poll(t0 + Duration::from_millis(100)), None);
        assert_eq!(
            gesture.press_end(t0 + Duration::from_millis(200)),
            Some(GestureOutput::Click(3))
        );
        assert_eq!(gesture.state(), GestureState::Idle);
    }

    #[test]
    fn test_long_press_fires_once_and_swallows_release() {
        let t0 = Instant::now();
        let mut gesture = PressGesture::new(THRESHOLD);
        gesture.press_start(3, t0);
        assert_eq!(gesture.deadline(), Some(t0 + THRESHOLD));
        assert_eq!(gesture.poll(t0 + THRESHOLD), Some(GestureOutput::LongPress(3)));
        assert_eq!(gesture.poll(t0 + THRESHOLD * 2), None);
        assert_eq!(gesture.deadline(), None);
        assert_eq!(gesture.press_end(t0 + THRESHOLD * 3), None);
    }

    #[test]
    fn test_late_release_without_poll_is_long_press() {
        let t0 = Instant::now();
        let mut gesture = PressGesture::new(THRESHOLD);
        gesture.press_start(8, t0);
        assert_eq!(
            gesture.press_end(t0 + THRESHOLD),
            Some(GestureOutput::LongPress(8))
        );
        assert_eq!(gesture.state(), GestureState::Idle);
    }

    #[test]
    fn test_cancel_clears_pending_long_press() {
        let t0 = Instant::now();
        let mut gesture = PressGesture::new(THRESHOLD);
        gesture.press_start(3, t0);
        gesture.press_cancel();
        assert_eq!(gesture.deadline(), None);
        assert_eq!(gesture.poll(t0 + THRESHOLD * 2), None);
        assert_eq!(gesture.press_end(t0 + THRESHOLD * 2), None);
    }

    #[test]
    fn test_new_press_replaces_old() {
        let t0 = Instant::now();
        let mut gesture = PressGesture::new(THRESHOLD);
        gesture.press_start(1, t0);
        gesture.press_start(2, t0 + Duration::from_millis(400));
        assert_eq!(gesture.poll(t0 + THRESHOLD), None);
        assert_eq!(
            gesture.press_end(t0 + Duration::from_millis(600)),
            Some(GestureOutput::Click(2))
        );
    }
}
