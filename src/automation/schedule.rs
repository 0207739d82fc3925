use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::{Result, SwapError};

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A parsed cron expression.
///
/// Five-field expressions have minute resolution and fire at second zero.
/// Six and seven field expressions lead with seconds (and may end with a year).
/// Numeric days of the week follow crontab: 0 and 7 are Sunday, 1 is Monday.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let invalid = |reason: String| SwapError::InvalidCron {
            expression: expression.to_string(),
            reason,
        };

        let mut fields: Vec<String> = trimmed.split_whitespace().map(str::to_string).collect();
        match fields.len() {
            5 => fields.insert(0, "0".to_string()),
            6 | 7 => {}
            n => return Err(invalid(format!("expected 5, 6 or 7 fields, found {}", n))),
        }
        fields[5] = weekday_names(&fields[5]).map_err(invalid)?;
        let normalized = fields.join(" ");

        let schedule = Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

/// Rewrites numeric day-of-week items to day names, leaving named items as they are.
fn weekday_names(field: &str) -> std::result::Result<String, String> {
    let items = field
        .split(',')
        .map(weekday_item)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items.join(","))
}

fn weekday_item(item: &str) -> std::result::Result<String, String> {
    let numeric = item
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '*' | '-' | '/'));
    if item == "*" || item == "?" || !numeric {
        return Ok(item.to_string());
    }

    let (base, step) = match item.split_once('/') {
        Some((base, step)) => {
            let step: u8 = step
                .parse()
                .map_err(|_| format!("invalid day-of-week step in '{}'", item))?;
            if step == 0 {
                return Err(format!("day-of-week step must be positive in '{}'", item));
            }
            (base, Some(step))
        }
        None => (item, None),
    };

    let (start, end) = match base.split_once('-') {
        _ if base == "*" => (0, 6),
        Some((from, to)) => (weekday_number(from)?, weekday_number(to)?),
        None => {
            let day = weekday_number(base)?;
            (day, if step.is_some() { day.max(6) } else { day })
        }
    };
    if start > end {
        return Err(format!("day-of-week range '{}' runs backwards", item));
    }

    let days: BTreeSet<u8> = (start..=end)
        .step_by(usize::from(step.unwrap_or(1)))
        .map(|day| day % 7)
        .collect();
    Ok(days
        .into_iter()
        .map(|day| WEEKDAYS[usize::from(day)])
        .collect::<Vec<_>>()
        .join(","))
}

fn weekday_number(value: &str) -> std::result::Result<u8, String> {
    match value.parse::<u8>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(format!("day of week '{}' is outside 0-7", value)),
    }
}
