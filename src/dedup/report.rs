//! Summary report for a duplicate-resolution scan.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Per-dataset match counts produced by one resolver run.
#[derive(Clone, Debug, Serialize)]
pub struct MatchReport {
    /// The base dataset the scan was anchored on.
    pub base: String,
    /// Prefix length the scan compared on.
    pub prefix_len: usize,
    /// Match count per non-base dataset (zero-match datasets included).
    pub per_dataset: BTreeMap<String, usize>,
    /// De-duplicated entry count in the base dataset's slot.
    pub base_matches: usize,
    /// Total foreign matches across all non-base datasets.
    pub total_matches: usize,
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Duplicate match summary (first {} characters, excluding base):",
            self.prefix_len
        )?;

        let mut any = false;
        for (dataset, count) in &self.per_dataset {
            if *count > 0 {
                writeln!(f, "  - {dataset}: {count} match(es)")?;
                any = true;
            }
        }
        if !any {
            writeln!(f, "  (no matches)")?;
        }

        writeln!(
            f,
            "Base dataset '{}' has {} matching file(s).",
            self.base, self.base_matches
        )?;
        writeln!(
            f,
            "Total duplicate matches (excluding base): {}",
            self.total_matches
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_only_matching_datasets() {
        let mut per_dataset = BTreeMap::new();
        per_dataset.insert("clean".to_string(), 0);
        per_dataset.insert("other".to_string(), 3);

        let report = MatchReport {
            base: "base".to_string(),
            prefix_len: 20,
            per_dataset,
            base_matches: 2,
            total_matches: 3,
        };

        let text = report.to_string();
        assert!(text.contains("other: 3 match(es)"));
        assert!(!text.contains("clean"));
        assert!(text.contains("Base dataset 'base' has 2 matching file(s)."));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = MatchReport {
            base: "base".to_string(),
            prefix_len: 20,
            per_dataset: BTreeMap::new(),
            base_matches: 0,
            total_matches: 0,
        };

        let json = serde_json::to_string(&report).expect("serialize report");
        assert!(json.contains("\"base\":\"base\""));
        assert!(json.contains("\"total_matches\":0"));
    }
}
