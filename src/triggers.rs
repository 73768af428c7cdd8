// ABOUTME: Trigger machinery: crontab records, change filters, trigger events.
// ABOUTME: The host scheduling boundary; events come in, matching pipelines get dispatched.

use chrono::{DateTime, Datelike, Local, Timelike};
use thiserror::Error;

use crate::types::ApplianceName;

#[derive(Debug, Error)]
pub enum CrontabError {
    #[error("crontab record must have 5 fields, got {0}")]
    WrongFieldCount(usize),

    #[error("invalid crontab field {0:?}: expected integer or '*'")]
    BadField(String),
}

/// One crontab field: a concrete integer or the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronField {
    Any,
    At(u32),
}

impl CronField {
    fn parse(field: &str) -> Result<Self, CrontabError> {
        if field == "*" {
            return Ok(CronField::Any);
        }
        field
            .parse::<u32>()
            .map(CronField::At)
            .map_err(|_| CrontabError::BadField(field.to_string()))
    }

    fn matches(self, value: u32) -> bool {
        match self {
            CronField::Any => true,
            CronField::At(at) => at == value,
        }
    }
}

/// A crontab-like record: `minute hour day-of-month month day-of-week`,
/// each an integer or `*`. Day-of-week is 0-6 with 0 (or 7) = Sunday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crontab {
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    pub month: CronField,
    pub day_of_week: CronField,
}

impl Crontab {
    pub fn parse(record: &str) -> Result<Self, CrontabError> {
        let fields: Vec<&str> = record.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CrontabError::WrongFieldCount(fields.len()));
        }

        Ok(Self {
            minute: CronField::parse(fields[0])?,
            hour: CronField::parse(fields[1])?,
            day_of_month: CronField::parse(fields[2])?,
            month: CronField::parse(fields[3])?,
            day_of_week: CronField::parse(fields[4])?,
        })
    }

    /// Whether a timer tick at `at` fires this record.
    pub fn matches(&self, at: &DateTime<Local>) -> bool {
        let dow = at.weekday().num_days_from_sunday();
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && (self.day_of_week.matches(dow)
                || (dow == 0 && self.day_of_week.matches(7)))
    }
}

/// Filters change events down to one pipeline's project and branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub project: ApplianceName,
    pub branch: String,
}

impl ChangeFilter {
    pub fn accepts(&self, project: &str, branch: &str) -> bool {
        self.project.as_str() == project && self.branch == branch
    }
}

/// Events the hosting framework feeds into the factory.
#[derive(Debug, Clone)]
pub enum TriggerEvent {
    /// A source change was detected on (project, branch).
    Change {
        project: String,
        branch: String,
    },

    /// A build was forced for an appliance; `None` forces all pipelines.
    Force {
        appliance: Option<ApplianceName>,
    },

    /// A timer tick, evaluated against nightly crontab records.
    Tick(DateTime<Local>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn parses_wildcards_and_integers() {
        let crontab = Crontab::parse("0 3 * * *").unwrap();
        assert_eq!(crontab.minute, CronField::At(0));
        assert_eq!(crontab.hour, CronField::At(3));
        assert_eq!(crontab.day_of_month, CronField::Any);
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(matches!(
            Crontab::parse("0 3 * *"),
            Err(CrontabError::WrongFieldCount(4))
        ));
        assert!(matches!(
            Crontab::parse("0 3 * * x"),
            Err(CrontabError::BadField(_))
        ));
    }

    #[test]
    fn matches_minute_and_hour() {
        let crontab = Crontab::parse("0 3 * * *").unwrap();
        assert!(crontab.matches(&local(2026, 8, 30, 3, 0)));
        assert!(!crontab.matches(&local(2026, 8, 30, 3, 1)));
        assert!(!crontab.matches(&local(2026, 8, 30, 4, 0)));
    }

    #[test]
    fn day_of_week_sunday_is_zero_or_seven() {
        // 2026-08-30 is a Sunday.
        let zero = Crontab::parse("* * * * 0").unwrap();
        let seven = Crontab::parse("* * * * 7").unwrap();
        let monday = Crontab::parse("* * * * 1").unwrap();
        let sunday = local(2026, 8, 30, 12, 0);
        assert!(zero.matches(&sunday));
        assert!(seven.matches(&sunday));
        assert!(!monday.matches(&sunday));
    }

    #[test]
    fn change_filter_requires_both_fields() {
        let filter = ChangeFilter {
            project: ApplianceName::new("core").unwrap(),
            branch: "master".to_string(),
        };
        assert!(filter.accepts("core", "master"));
        assert!(!filter.accepts("core", "devel"));
        assert!(!filter.accepts("lamp", "master"));
    }
}
