//! Entry persistence filter
//!
//! A candidate is only released once the same direction has qualified on
//! `required` consecutive snapshots. Any miss or a direction flip resets the
//! count. With `required = 1` every qualifying snapshot is released.

use tracing::debug;

use crate::domain::Direction;

#[derive(Debug, Clone)]
pub struct EntryConfirmation {
    required: u32,
    count: u32,
    direction: Option<Direction>,
}

impl EntryConfirmation {
    pub fn new(required: u32) -> Self {
        Self {
            required: required.max(1),
            count: 0,
            direction: None,
        }
    }

    /// Record one evaluation. `qualified` is the candidate direction, if any.
    /// Returns true when the persistence requirement is met; the counter then restarts.
    pub fn observe(&mut self, qualified: Option<Direction>) -> bool {
        let Some(direction) = qualified else {
            if self.count > 0 {
                debug!("Entry confirmation reset after {} samples", self.count);
            }
            self.reset();
            return false;
        };

        if self.direction != Some(direction) {
            self.direction = Some(direction);
            self.count = 0;
        }
        self.count += 1;

        if self.count >= self.required {
            self.reset();
            return true;
        }
        debug!("Entry confirmation {}/{} ({})", self.count, self.required, direction);
        false
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.direction = None;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_sample_passes_immediately() {
        let mut confirmation = EntryConfirmation::new(1);
        assert!(confirmation.observe(Some(Direction::Long)));
        assert!(!confirmation.observe(None));
    }

    #[test]
    fn test_requires_consecutive_samples() {
        let mut confirmation = EntryConfirmation::new(3);
        assert!(!confirmation.observe(Some(Direction::Short)));
        assert!(!confirmation.observe(Some(Direction::Short)));
        assert!(confirmation.observe(Some(Direction::Short)));
        assert_eq!(confirmation.count(), 0);
    }

    #[test]
    fn test_miss_or_flip_resets() {
        let mut confirmation = EntryConfirmation::new(3);
        confirmation.observe(Some(Direction::Long));
        confirmation.observe(Some(Direction::Long));
        confirmation.observe(None);
        assert_eq!(confirmation.count(), 0);

        confirmation.observe(Some(Direction::Long));
        confirmation.observe(Some(Direction::Short));
        assert_eq!(confirmation.count(), 1);
    }
}
