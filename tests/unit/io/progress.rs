//! Tests for phase-based progress reporting

#[cfg(test)]
mod tests {
    use seamweave::io::progress::{NoProgress, Progress, ProgressManager};

    // Tests phases are counted once each
    // Verified by counting on every advance
    #[test]
    fn test_phases_completed_counts_closed_phases() {
        let mut progress = ProgressManager::new();
        progress.start_phase("windows", 3);
        progress.advance("window 0");
        progress.advance("window 1");
        progress.start_phase("junctions", 1);
        progress.advance("junction 0");
        progress.finish_phase();
        assert_eq!(progress.phases_completed(), 2);
    }

    // Tests finishing without an open phase is a no-op
    // Verified by incrementing unconditionally in finish_phase
    #[test]
    fn test_finish_without_phase() {
        let mut progress = ProgressManager::default();
        progress.finish_phase();
        progress.finish();
        assert_eq!(progress.phases_completed(), 0);
    }

    // Tests the silent sink accepts events through the trait object
    // Verified by removing the trait implementation
    #[test]
    fn test_no_progress_as_trait_object() {
        let mut sink: Box<dyn Progress> = Box::new(NoProgress);
        sink.start_phase("seams", 2);
        sink.advance("seam 0");
        sink.finish_phase();
    }
}
