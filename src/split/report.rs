//! Final counts for one partition run.

use std::fmt;

use serde::Serialize;

/// How many samples each partition received.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitReport {
    pub train: usize,
    pub val: usize,
    pub test: usize,
    pub total: usize,
    /// Individual file copies that failed (logged, batch continued).
    pub failed: usize,
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final dataset split:")?;
        writeln!(f, "  train: {}", self.train)?;
        writeln!(f, "  val:   {}", self.val)?;
        writeln!(f, "  test:  {}", self.test)?;
        writeln!(f, "  total: {}", self.total)?;
        if self.failed > 0 {
            writeln!(f, "  failed copies: {}", self.failed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_all_partitions() {
        let report = SplitReport {
            train: 7,
            val: 2,
            test: 1,
            total: 10,
            failed: 0,
        };

        let text = report.to_string();
        assert!(text.contains("train: 7"));
        assert!(text.contains("val:   2"));
        assert!(text.contains("test:  1"));
        assert!(text.contains("total: 10"));
        assert!(!text.contains("failed copies"));
    }

    #[test]
    fn display_mentions_failures_only_when_present() {
        let report = SplitReport {
            train: 7,
            val: 2,
            test: 1,
            total: 10,
            failed: 2,
        };

        assert!(report.to_string().contains("failed copies: 2"));
    }
}
