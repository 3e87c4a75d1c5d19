//! Structured timestamp object attached to records.

use serde::{Deserialize, Serialize};

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// morning [6,12), afternoon [12,17), evening [17,21), night otherwise.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }
}

/// Every rendering of one instant that list views and reports need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampFields {
    /// `YYYY-MM-DD HH:MM:SS:ffffff`
    pub timestamp: String,
    /// `YYYYMMDDHHMMSSffffff`, sorts like the instant itself.
    pub timestamp_id: String,
    /// `timestamp` truncated to milliseconds.
    pub date: String,
    pub formatted_date_short: String,
    pub formatted_date_long: String,
    pub formatted_date_time: String,
    pub time_of_the_day: TimeOfDay,
    pub day: u32,
    pub day_suffix: String,
    pub day_name_short: String,
    pub day_name_long: String,
    pub hour: u32,
    pub hour_formatted: String,
    pub minute: u32,
    pub month_number: u32,
    pub month_short: String,
    pub month_long: String,
    #[serde(rename = "Year")]
    pub year: i32,
    pub week_number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, TimeOfDay::Night)]
    #[case(5, TimeOfDay::Night)]
    #[case(6, TimeOfDay::Morning)]
    #[case(11, TimeOfDay::Morning)]
    #[case(12, TimeOfDay::Afternoon)]
    #[case(16, TimeOfDay::Afternoon)]
    #[case(17, TimeOfDay::Evening)]
    #[case(20, TimeOfDay::Evening)]
    #[case(21, TimeOfDay::Night)]
    #[case(23, TimeOfDay::Night)]
    fn test_time_of_day_buckets(#[case] hour: u32, #[case] expected: TimeOfDay) {
        assert_eq!(TimeOfDay::from_hour(hour), expected);
    }

    #[test]
    fn test_time_of_day_serializes_lowercase() {
        let v = serde_json::to_value(TimeOfDay::Afternoon).unwrap();
        assert_eq!(v, serde_json::json!("afternoon"));
        assert_eq!(TimeOfDay::Evening.as_str(), "evening");
    }
}
