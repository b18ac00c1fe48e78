//! Discovery indicator shown next to the player list.

use std::fmt;

use reflection_bridge::ProbeResult;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DiscoveryStatus {
    /// A probe is running, or none has produced a result yet.
    Pending,
    /// Every role resolved.
    Complete { total: usize },
    /// Some roles resolved.
    Partial { found: usize, total: usize },
    /// The battery ran but nothing resolved.
    NoneFound { total: usize },
    /// The battery ran with no roles at all.
    Unknown,
    /// The last probe failed; the counts describe the result still cached.
    Stale { found: usize, total: usize },
    /// The last probe failed and nothing is cached.
    Failed,
}

impl DiscoveryStatus {
    pub fn of(result: Option<&ProbeResult>, probing: bool) -> Self {
        let Some(result) = result.filter(|_| !probing) else {
            return Self::Pending;
        };
        let (found, total) = (result.found_count(), result.total());
        match (found, total) {
            (_, 0) => Self::Unknown,
            (0, total) => Self::NoneFound { total },
            (found, total) if found == total => Self::Complete { total },
            (found, total) => Self::Partial { found, total },
        }
    }

    /// Status after a failed probe, keeping the counts of whatever is cached.
    pub fn failed(cached: Option<&ProbeResult>) -> Self {
        match cached {
            Some(result) => Self::Stale {
                found: result.found_count(),
                total: result.total(),
            },
            None => Self::Failed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Stale { .. } | Self::Failed)
    }

    /// Longer explanation for tooltips and `roles` output.
    pub fn describe(&self) -> String {
        match self {
            Self::Pending => "Auto-discovery in progress, waiting for property scan".into(),
            Self::Complete { total } => {
                format!("Auto-discovery complete, all {total} properties found")
            }
            Self::Partial { found, total } => format!(
                "Auto-discovery partial, {found} of {total} properties found. Check discovery-log.json for details."
            ),
            Self::NoneFound { .. } => "Auto-discovery found no matching properties. Check discovery-log.json for raw property lists.".into(),
            Self::Unknown => "Discovery status unknown".into(),
            Self::Stale { found, total } => format!(
                "Last auto-discovery failed, showing previous result with {found} of {total} properties found"
            ),
            Self::Failed => "Auto-discovery failed, no properties discovered".into(),
        }
    }
}

impl fmt::Display for DiscoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("DISC ..."),
            Self::Complete { total } => write!(f, "DISC {total}/{total}"),
            Self::Partial { found, total } => write!(f, "DISC {found}/{total}"),
            Self::NoneFound { total } => write!(f, "DISC 0/{total}"),
            Self::Unknown => f.write_str("DISC ?"),
            Self::Stale { found, total } => write!(f, "DISC {found}/{total} !"),
            Self::Failed => f.write_str("DISC !"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(pairs: &[(&str, &str)]) -> ProbeResult {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_pending_without_result_or_while_probing() {
        assert_eq!(DiscoveryStatus::of(None, false), DiscoveryStatus::Pending);
        let r = result(&[("level", "A.Level")]);
        assert_eq!(DiscoveryStatus::of(Some(&r), true), DiscoveryStatus::Pending);
    }

    #[test]
    fn test_found_over_total() {
        let full = result(&[("level", "A.Level"), ("hp", "A.Hp")]);
        assert_eq!(
            DiscoveryStatus::of(Some(&full), false),
            DiscoveryStatus::Complete { total: 2 }
        );

        let partial = result(&[("level", "A.Level"), ("hp", "NOT_FOUND")]);
        let status = DiscoveryStatus::of(Some(&partial), false);
        assert_eq!(status, DiscoveryStatus::Partial { found: 1, total: 2 });
        assert_eq!(status.to_string(), "DISC 1/2");

        let none = result(&[("hp", "NOT_FOUND")]);
        assert_eq!(DiscoveryStatus::of(Some(&none), false).to_string(), "DISC 0/1");

        assert_eq!(
            DiscoveryStatus::of(Some(&ProbeResult::default()), false),
            DiscoveryStatus::Unknown
        );
    }

    #[test]
    fn test_failure_marks_cached_counts() {
        let cached = result(&[("level", "A.Level")]);
        let status = DiscoveryStatus::failed(Some(&cached));
        assert_eq!(status, DiscoveryStatus::Stale { found: 1, total: 1 });
        assert_eq!(status.to_string(), "DISC 1/1 !");
        assert!(status.is_failure());
        assert!(status.describe().starts_with("Last auto-discovery failed"));

        assert_eq!(DiscoveryStatus::failed(None).to_string(), "DISC !");
        assert!(!DiscoveryStatus::Complete { total: 1 }.is_failure());
    }
}
