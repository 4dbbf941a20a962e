// Deadline timers driven by the host clock.
// One `Clock` signal per player fires whatever is due; disposal just clears the deadlines.

/// A one-shot deadline in host milliseconds (`performance.now()` scale).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timer {
    deadline_ms: Option<f64>,
}

impl Timer {
    pub fn new() -> Self {
        Timer::default()
    }

    /// Arm (or re-arm) the timer. Re-arming pushes the deadline back, which is what
    /// makes repeated resize signals debounce.
    pub fn arm(&mut self, now_ms: f64, delay_ms: u32) {
        self.deadline_ms = Some(now_ms + f64::from(delay_ms));
    }

    pub fn clear(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline_ms
    }

    /// Returns true and disarms if the deadline has passed.
    pub fn fire_if_due(&mut self, now_ms: f64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_when_due() {
        let mut timer = Timer::new();
        timer.arm(1_000.0, 100);
        assert!(!timer.fire_if_due(1_050.0));
        assert!(timer.fire_if_due(1_100.0));
        assert!(!timer.fire_if_due(1_200.0));
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearming_debounces() {
        let mut timer = Timer::new();
        timer.arm(0.0, 100);
        timer.arm(80.0, 100);
        assert!(!timer.fire_if_due(120.0));
        assert!(timer.fire_if_due(180.0));
    }

    #[test]
    fn cleared_timer_never_fires() {
        let mut timer = Timer::new();
        timer.arm(0.0, 10);
        timer.clear();
        assert!(!timer.fire_if_due(1_000.0));
        assert_eq!(timer.deadline(), None);
    }
}
