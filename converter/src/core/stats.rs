//! Running conversion statistics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversionStats {
    pub total_conversions: u64,
    pub successful_conversions: u64,
    pub failed_conversions: u64,
    /// Mean processing time in seconds across all recorded conversions.
    pub average_processing_time: f64,
}

impl ConversionStats {
    pub fn record(&mut self, success: bool, processing_time_secs: f64) {
        self.total_conversions += 1;
        if success {
            self.successful_conversions += 1;
        } else {
            self.failed_conversions += 1;
        }
        let total = self.total_conversions as f64;
        self.average_processing_time =
            (self.average_processing_time * (total - 1.0) + processing_time_secs) / total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_average_tracks_all_runs() {
        let mut stats = ConversionStats::default();
        stats.record(true, 2.0);
        stats.record(false, 4.0);
        stats.record(true, 6.0);

        assert_eq!(stats.total_conversions, 3);
        assert_eq!(stats.successful_conversions, 2);
        assert_eq!(stats.failed_conversions, 1);
        assert!((stats.average_processing_time - 4.0).abs() < 1e-9);
    }
}
