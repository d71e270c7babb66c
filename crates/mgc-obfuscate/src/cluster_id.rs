//! Cluster identifiers: 32 lowercase alphanumerics standing on their own.

use mgc_core::Result;

use crate::{Generator, RegexObfuscator, ReplacementType};

pub const CLUSTER_ID_PATTERN: &str = r"\b[a-z0-9]{32}\b";
pub const CLUSTER_ID_TEMPLATE: &str = "x-obfuscated-clusterid-%07d-x";
pub const STATIC_CLUSTER_ID: &str = "x-obfuscated-clusterid-x";

impl RegexObfuscator {
    pub fn cluster_id(mode: ReplacementType, max_count: Option<u64>) -> Result<Self> {
        let generator = Generator::new(mode, CLUSTER_ID_TEMPLATE, STATIC_CLUSTER_ID, max_count)?;
        Self::with_kind("cluster_id", CLUSTER_ID_PATTERN, generator)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Obfuscator, RegexObfuscator, ReplacementType, ReportingObfuscator};

    #[test]
    fn test_same_id_reuses_token() {
        let ids = RegexObfuscator::cluster_id(ReplacementType::Consistent, None).unwrap();
        let first = ids
            .contents("Cluster ID: 1234567890abcdefghijklmnopqrstuv")
            .unwrap();
        assert_eq!(first, "Cluster ID: x-obfuscated-clusterid-0000001-x");

        let second = ids
            .contents("cluster=1234567890abcdefghijklmnopqrstuv ready")
            .unwrap();
        assert_eq!(second, "cluster=x-obfuscated-clusterid-0000001-x ready");

        let report = ids.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report.replacements[0].total_occurrences(), 2);
        assert_eq!(ids.kind(), "cluster_id");
    }

    #[test]
    fn test_longer_or_uppercase_runs_are_ignored() {
        let ids = RegexObfuscator::cluster_id(ReplacementType::Consistent, None).unwrap();
        for line in [
            "sha1 da39a3ee5e6b4b0d3255bfef95601890afd80709",
            "ID 1234567890ABCDEFGHIJKLMNOPQRSTUV",
            "short abc123",
        ] {
            assert_eq!(ids.contents(line).unwrap(), line);
        }
    }

    #[test]
    fn test_static_token() {
        let ids = RegexObfuscator::cluster_id(ReplacementType::Static, None).unwrap();
        let out = ids
            .contents("aaaaaaaaaabbbbbbbbbbccccccccccdd / 0000000000111111111122222222223x")
            .unwrap();
        assert_eq!(out, "x-obfuscated-clusterid-x / x-obfuscated-clusterid-x");
        assert_eq!(ids.contents(&out).unwrap(), out);
    }
}
