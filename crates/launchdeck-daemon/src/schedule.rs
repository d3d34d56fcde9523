//! Calendar schedule translation.
//!
//! launchd stores calendar triggers under `StartCalendarInterval`, either as a
//! single dict or as an array of dicts. The dashboard works with an ordered
//! list of [`DisplaySchedule`]s instead. [`decode`] and [`encode`] convert
//! between the two; a one-element list always encodes back to the single-dict
//! form so an untouched single trigger keeps its on-disk shape.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::ScheduleError;
use crate::plist::{PlistDict, PlistValue};

const HOUR_KEY: &str = "Hour";
const MINUTE_KEY: &str = "Minute";
const DAY_KEY: &str = "Day";
const WEEKDAY_KEY: &str = "Weekday";

/// One calendar trigger. `hour: None` fires every hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTrigger {
    pub hour: Option<u32>,
    pub minute: u32,
    pub day: Option<u32>,
    pub weekday: Option<u32>,
}

impl CalendarTrigger {
    /// Daily trigger at `hour:minute`.
    pub fn at(hour: u32, minute: u32) -> Self {
        Self {
            hour: Some(hour),
            minute,
            day: None,
            weekday: None,
        }
    }

    pub fn on_day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn on_weekday(mut self, weekday: u32) -> Self {
        self.weekday = Some(weekday);
        self
    }

    fn from_dict(dict: &PlistDict) -> Result<Self, ScheduleError> {
        Ok(Self {
            hour: native_field(dict, HOUR_KEY)?,
            minute: native_field(dict, MINUTE_KEY)?.unwrap_or(0),
            day: native_field(dict, DAY_KEY)?,
            weekday: native_field(dict, WEEKDAY_KEY)?,
        })
    }

    fn to_dict(self) -> PlistDict {
        let mut dict = PlistDict::new();
        if let Some(hour) = self.hour {
            dict.insert(HOUR_KEY, i64::from(hour));
        }
        dict.insert(MINUTE_KEY, i64::from(self.minute));
        if let Some(day) = self.day {
            dict.insert(DAY_KEY, i64::from(day));
        }
        if let Some(weekday) = self.weekday {
            dict.insert(WEEKDAY_KEY, i64::from(weekday));
        }
        dict
    }
}

/// Native `StartCalendarInterval` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarInterval {
    Single(CalendarTrigger),
    Multiple(Vec<CalendarTrigger>),
}

impl CalendarInterval {
    /// All triggers in order.
    pub fn triggers(&self) -> &[CalendarTrigger] {
        match self {
            CalendarInterval::Single(trigger) => std::slice::from_ref(trigger),
            CalendarInterval::Multiple(triggers) => triggers,
        }
    }

    pub fn from_plist(value: &PlistValue) -> Result<Self, ScheduleError> {
        match value {
            PlistValue::Dict(dict) => CalendarTrigger::from_dict(dict).map(CalendarInterval::Single),
            PlistValue::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_dict().ok_or_else(|| {
                        ScheduleError::InvalidNative("array element is not a dict".to_string())
                    })
                })
                .map(|dict| dict.and_then(CalendarTrigger::from_dict))
                .collect::<Result<Vec<_>, _>>()
                .map(CalendarInterval::Multiple),
            _ => Err(ScheduleError::InvalidNative(
                "expected a dict or an array of dicts".to_string(),
            )),
        }
    }

    pub fn to_plist(&self) -> PlistValue {
        match self {
            CalendarInterval::Single(trigger) => PlistValue::Dict(trigger.to_dict()),
            CalendarInterval::Multiple(triggers) => PlistValue::Array(
                triggers.iter().map(|t| PlistValue::Dict(t.to_dict())).collect(),
            ),
        }
    }
}

fn native_field(dict: &PlistDict, key: &'static str) -> Result<Option<u32>, ScheduleError> {
    let Some(value) = dict.get(key) else {
        return Ok(None);
    };
    let parsed = match value {
        PlistValue::Integer(i) => u32::try_from(*i).ok(),
        PlistValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| ScheduleError::InvalidNative(format!("{} is not a non-negative integer", key)))
}

/// Hour of a display schedule: a concrete hour or every hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourSpec {
    Any,
    At(u32),
}

impl From<Option<u32>> for HourSpec {
    fn from(hour: Option<u32>) -> Self {
        hour.map_or(HourSpec::Any, HourSpec::At)
    }
}

impl fmt::Display for HourSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HourSpec::Any => write!(f, "*"),
            HourSpec::At(h) => write!(f, "{}", h),
        }
    }
}

impl Serialize for HourSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HourSpec::Any => serializer.serialize_str("*"),
            HourSpec::At(h) => serializer.serialize_u32(*h),
        }
    }
}

/// A trigger as shown to the dashboard, with rendered time and cron strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplaySchedule {
    pub hour: HourSpec,
    pub minute: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday: Option<u32>,
    /// `HH:MM`, or `*:MM` when the hour is unconstrained.
    pub time: String,
    /// `minute hour day * weekday`.
    pub cron: String,
}

impl From<&CalendarTrigger> for DisplaySchedule {
    fn from(trigger: &CalendarTrigger) -> Self {
        let hour = HourSpec::from(trigger.hour);
        let time = match hour {
            HourSpec::Any => format!("*:{:02}", trigger.minute),
            HourSpec::At(h) => format!("{:02}:{:02}", h, trigger.minute),
        };
        let cron = format!(
            "{} {} {} * {}",
            trigger.minute,
            hour,
            optional_cron_field(trigger.day),
            optional_cron_field(trigger.weekday)
        );
        Self {
            hour,
            minute: trigger.minute,
            day: trigger.day,
            weekday: trigger.weekday,
            time,
            cron,
        }
    }
}

fn optional_cron_field(value: Option<u32>) -> String {
    value.map_or_else(|| "*".to_string(), |v| v.to_string())
}

/// A loosely typed schedule field: the dashboard sends numbers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Integer value, or the raw text when it is not one.
    fn to_integer(&self) -> Result<i64, String> {
        match self {
            FieldValue::Int(i) => Ok(*i),
            FieldValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
            FieldValue::Float(f) => Err(f.to_string()),
            FieldValue::Text(s) => s.trim().parse().map_err(|_| s.clone()),
        }
    }

    /// `"*"`: every value of the field.
    fn is_wildcard(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim() == "*")
    }

    fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// One entry of a schedule update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default)]
    pub hour: Option<FieldValue>,
    #[serde(default)]
    pub minute: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<FieldValue>,
}

impl ScheduleEntry {
    pub fn new(hour: impl Into<FieldValue>, minute: impl Into<FieldValue>) -> Self {
        Self {
            hour: Some(hour.into()),
            minute: Some(minute.into()),
            day: None,
            weekday: None,
        }
    }

    pub fn with_day(mut self, day: impl Into<FieldValue>) -> Self {
        self.day = Some(day.into());
        self
    }

    pub fn with_weekday(mut self, weekday: impl Into<FieldValue>) -> Self {
        self.weekday = Some(weekday.into());
        self
    }

    fn validate(&self, index: usize) -> Result<CalendarTrigger, ScheduleError> {
        let hour = match &self.hour {
            Some(v) if v.is_wildcard() => None,
            other => Some(required(index, "hour", other.as_ref(), 0, 23)?),
        };
        let minute = required(index, "minute", self.minute.as_ref(), 0, 59)?;
        let day = optional(index, "day", self.day.as_ref(), 1, 31)?;
        let weekday = optional(index, "weekday", self.weekday.as_ref(), 0, 7)?;
        Ok(CalendarTrigger {
            hour,
            minute,
            day,
            weekday,
        })
    }
}

impl From<&DisplaySchedule> for ScheduleEntry {
    fn from(schedule: &DisplaySchedule) -> Self {
        Self {
            hour: Some(match schedule.hour {
                HourSpec::Any => FieldValue::Text("*".to_string()),
                HourSpec::At(h) => h.into(),
            }),
            minute: Some(schedule.minute.into()),
            day: schedule.day.map(FieldValue::from),
            weekday: schedule.weekday.map(FieldValue::from),
        }
    }
}

fn required(
    index: usize,
    field: &'static str,
    value: Option<&FieldValue>,
    min: i64,
    max: i64,
) -> Result<u32, ScheduleError> {
    match value {
        Some(v) if !v.is_blank() => in_range(index, field, v, min, max),
        _ => Err(ScheduleError::Missing { index, field }),
    }
}

fn optional(
    index: usize,
    field: &'static str,
    value: Option<&FieldValue>,
    min: i64,
    max: i64,
) -> Result<Option<u32>, ScheduleError> {
    match value {
        Some(v) if !v.is_blank() => in_range(index, field, v, min, max).map(Some),
        _ => Ok(None),
    }
}

fn in_range(
    index: usize,
    field: &'static str,
    value: &FieldValue,
    min: i64,
    max: i64,
) -> Result<u32, ScheduleError> {
    let n = value
        .to_integer()
        .map_err(|raw| ScheduleError::NotAnInteger { index, field, value: raw })?;
    if n < min || n > max {
        return Err(ScheduleError::OutOfRange {
            index,
            field,
            value: n,
            min,
            max,
        });
    }
    // Range checked above.
    Ok(n as u32)
}

/// Native interval to display list, order-preserving.
pub fn decode(interval: &CalendarInterval) -> Vec<DisplaySchedule> {
    interval.triggers().iter().map(DisplaySchedule::from).collect()
}

/// Display list to native interval. Every entry is validated before anything
/// is produced; one entry collapses to the single-dict form.
pub fn encode(entries: &[ScheduleEntry]) -> Result<CalendarInterval, ScheduleError> {
    let mut triggers = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| entry.validate(index))
        .collect::<Result<Vec<_>, _>>()?;

    match triggers.len() {
        0 => Err(ScheduleError::Empty),
        1 => Ok(CalendarInterval::Single(triggers.remove(0))),
        _ => Ok(CalendarInterval::Multiple(triggers)),
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
