//! Five-burst staggering of session creates

use std::time::Duration;

/// Bursts a cohort is split into per second
pub const BURSTS_PER_COHORT: usize = 5;

/// Pause between bursts
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(200);

/// Splits a cohort's creates into roughly equal bursts separated by a pause
///
/// The batch size is `cohort_size / 5` (integer division). Cohorts smaller
/// than five get a batch size of 0, which disables staggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStagger {
    batch_size: usize,
    pause: Duration,
}

impl BatchStagger {
    /// Stagger for a cohort of `cohort_size` sessions
    pub fn for_cohort(cohort_size: usize) -> Self {
        Self {
            batch_size: cohort_size / BURSTS_PER_COHORT,
            pause: DEFAULT_BATCH_PAUSE,
        }
    }

    /// Override the pause
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Creates per burst; 0 means no staggering
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Pause between bursts
    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Whether to pause after issuing the create at `index` (0-based)
    pub fn pauses_after(&self, index: usize) -> bool {
        self.batch_size > 0 && index > 0 && index % self.batch_size == 0
    }

    /// Sleep if the create at `index` closes a burst
    pub async fn after_create(&self, index: usize) {
        if self.pauses_after(index) {
            tokio::time::sleep(self.pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pause_points(cohort_size: usize) -> Vec<usize> {
        let stagger = BatchStagger::for_cohort(cohort_size);
        (0..cohort_size).filter(|i| stagger.pauses_after(*i)).collect()
    }

    #[test]
    fn test_twenty_five_sessions_pause_four_times() {
        assert_eq!(BatchStagger::for_cohort(25).batch_size(), 5);
        assert_eq!(pause_points(25), vec![5, 10, 15, 20]);
    }

    #[test]
    fn test_small_cohort_never_pauses() {
        assert_eq!(BatchStagger::for_cohort(3).batch_size(), 0);
        assert!(pause_points(3).is_empty());
        assert!(pause_points(0).is_empty());
    }

    #[test]
    fn test_batch_size_rounds_down() {
        assert_eq!(BatchStagger::for_cohort(12).batch_size(), 2);
        assert_eq!(pause_points(12), vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_create_sleeps_only_at_boundaries() {
        let stagger = BatchStagger::for_cohort(10).with_pause(Duration::from_millis(200));
        let start = tokio::time::Instant::now();

        stagger.after_create(1).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        stagger.after_create(2).await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
