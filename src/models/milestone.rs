use serde::{Deserialize, Serialize};

/// A named reminder point before an item's expiry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {
    #[serde(rename = "1_year")]
    OneYear,
    #[serde(rename = "6_months")]
    SixMonths,
    #[serde(rename = "30_days")]
    ThirtyDays,
    #[serde(rename = "7_days")]
    SevenDays,
    #[serde(rename = "1_day")]
    OneDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneOffset {
    pub days_before: u64,
    pub milestone: Milestone,
}

/// The fixed reminder schedule, furthest first.
pub const DEFAULT_MILESTONES: &[MilestoneOffset] = &[
    MilestoneOffset { days_before: 365, milestone: Milestone::OneYear },
    MilestoneOffset { days_before: 180, milestone: Milestone::SixMonths },
    MilestoneOffset { days_before: 30, milestone: Milestone::ThirtyDays },
    MilestoneOffset { days_before: 7, milestone: Milestone::SevenDays },
    MilestoneOffset { days_before: 1, milestone: Milestone::OneDay },
];

impl Milestone {
    pub fn label(&self) -> &'static str {
        match self {
            Milestone::OneYear => "1_year",
            Milestone::SixMonths => "6_months",
            Milestone::ThirtyDays => "30_days",
            Milestone::SevenDays => "7_days",
            Milestone::OneDay => "1_day",
        }
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_wire_format() {
        for offset in DEFAULT_MILESTONES {
            let json = serde_json::to_string(&offset.milestone).unwrap();
            assert_eq!(json, format!("\"{}\"", offset.milestone.label()));
        }
    }

    #[test]
    fn test_default_table_is_furthest_first() {
        let days: Vec<u64> = DEFAULT_MILESTONES.iter().map(|m| m.days_before).collect();
        assert_eq!(days, vec![365, 180, 30, 7, 1]);
    }
}
