//! Schedule generation: turns one admin form submission into one or more
//! training-session rows, written in a single transaction.

use chrono::{Days, Months, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::str::FromStr;
use tracing::info;

use crate::db::{blank_to_none, NewTrainingSession, SessionStatus, Store, TrainingSession};
use crate::error::{AppError, AppResult};
use crate::telemetry;

pub const MAX_RECURRENCE_COUNT: u32 = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Date of the `index`-th occurrence counted from `start`. Monthly steps
    /// use calendar months and clamp to the last day of shorter months.
    pub fn occurrence(self, start: NaiveDate, index: u32) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => start.checked_add_days(Days::new(u64::from(index))),
            Frequency::Weekly => start.checked_add_days(Days::new(7 * u64::from(index))),
            Frequency::Monthly => start.checked_add_months(Months::new(index)),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(format!("unknown recurrence frequency: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    OneOff,
    Recurring { frequency: Frequency, count: u32 },
}

impl Recurrence {
    pub fn dates(&self, start: NaiveDate) -> AppResult<Vec<NaiveDate>> {
        match *self {
            Recurrence::OneOff => Ok(vec![start]),
            Recurrence::Recurring { frequency, count } => {
                if count == 0 || count > MAX_RECURRENCE_COUNT {
                    return Err(AppError::Validation(format!(
                        "recurrence count must be between 1 and {}",
                        MAX_RECURRENCE_COUNT
                    )));
                }
                (0..count)
                    .map(|i| {
                        frequency.occurrence(start, i).ok_or_else(|| {
                            AppError::Validation("recurrence runs past the supported calendar".into())
                        })
                    })
                    .collect()
            }
        }
    }
}

/// Schedule input as received; mandatory fields are checked by [`ScheduleRequest::validate`].
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub course_id: Option<i64>,
    pub campus_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub max_participants: Option<i32>,
    pub instructor_name: Option<String>,
    pub status: SessionStatus,
    pub recurrence: Recurrence,
}

#[derive(Debug, Clone)]
struct SchedulePlan {
    course_id: i64,
    campus_id: i64,
    start_time: NaiveTime,
    end_time: NaiveTime,
    max_participants: Option<i32>,
    instructor_name: Option<String>,
    status: SessionStatus,
    dates: Vec<NaiveDate>,
}

impl SchedulePlan {
    fn row(&self, session_date: NaiveDate, max_participants: i32) -> NewTrainingSession {
        NewTrainingSession {
            course_id: self.course_id,
            campus_id: self.campus_id,
            session_date,
            start_time: self.start_time,
            end_time: self.end_time,
            instructor_name: self.instructor_name.clone(),
            max_participants,
            status: self.status,
        }
    }
}

impl ScheduleRequest {
    fn validate(&self) -> AppResult<SchedulePlan> {
        let mut missing = Vec::new();
        if self.course_id.is_none() {
            missing.push("course_id");
        }
        if self.campus_id.is_none() {
            missing.push("campus_id");
        }
        if self.start_date.is_none() {
            missing.push("session_date");
        }
        if self.start_time.is_none() {
            missing.push("start_time");
        }
        if self.end_time.is_none() {
            missing.push("end_time");
        }

        let (Some(course_id), Some(campus_id), Some(start_date), Some(start_time), Some(end_time)) = (
            self.course_id,
            self.campus_id,
            self.start_date,
            self.start_time,
            self.end_time,
        ) else {
            return Err(AppError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        };

        if start_time >= end_time {
            return Err(AppError::Validation(
                "start time must be before end time".into(),
            ));
        }
        if matches!(self.max_participants, Some(max) if max <= 0) {
            return Err(AppError::Validation(
                "max participants must be at least 1".into(),
            ));
        }

        Ok(SchedulePlan {
            course_id,
            campus_id,
            start_time,
            end_time,
            max_participants: self.max_participants,
            instructor_name: blank_to_none(self.instructor_name.clone()),
            status: self.status,
            dates: self.recurrence.dates(start_date)?,
        })
    }
}

/// Create every session the request describes. Either all rows are written
/// or none are.
pub async fn generate(store: &dyn Store, request: &ScheduleRequest) -> AppResult<Vec<TrainingSession>> {
    let plan = request.validate()?;

    let mut tx = store.begin().await?;
    let course = tx
        .course(plan.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("course {}", plan.course_id)))?;
    if tx.campus(plan.campus_id).await?.is_none() {
        return Err(AppError::NotFound(format!("campus {}", plan.campus_id)));
    }

    let capacity = plan.max_participants.unwrap_or(course.max_capacity);
    let mut created = Vec::with_capacity(plan.dates.len());
    for date in &plan.dates {
        created.push(tx.insert_session(&plan.row(*date, capacity)).await?);
    }
    tx.commit().await?;

    info!(
        course_id = plan.course_id,
        campus_id = plan.campus_id,
        count = created.len(),
        "Scheduled training sessions"
    );
    telemetry::record_counter("sessions_generated_total", created.len() as u64, &[]);
    Ok(created)
}

#[derive(Debug, Clone)]
pub struct Rescheduled {
    pub updated: TrainingSession,
    pub siblings: Vec<TrainingSession>,
}

/// Edit a session in place; a recurring request also adds the remaining
/// occurrences as new sessions.
pub async fn reschedule(
    store: &dyn Store,
    session_id: i64,
    request: &ScheduleRequest,
) -> AppResult<Rescheduled> {
    let plan = request.validate()?;

    let mut tx = store.begin().await?;
    let existing = tx
        .session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("session {}", session_id)))?;
    if tx.course(plan.course_id).await?.is_none() {
        return Err(AppError::NotFound(format!("course {}", plan.course_id)));
    }
    if tx.campus(plan.campus_id).await?.is_none() {
        return Err(AppError::NotFound(format!("campus {}", plan.campus_id)));
    }

    let capacity = plan.max_participants.unwrap_or(existing.max_participants);
    if capacity < existing.current_participants {
        return Err(AppError::Validation(format!(
            "session already has {} participants; capacity cannot be lowered to {}",
            existing.current_participants, capacity
        )));
    }

    let (first, rest) = plan
        .dates
        .split_first()
        .ok_or_else(|| AppError::Validation("schedule produced no dates".into()))?;
    let updated = tx
        .update_session(session_id, &plan.row(*first, capacity))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("session {}", session_id)))?;

    let mut siblings = Vec::with_capacity(rest.len());
    for date in rest {
        siblings.push(tx.insert_session(&plan.row(*date, capacity)).await?);
    }
    tx.commit().await?;

    info!(session_id, siblings = siblings.len(), "Rescheduled training session");
    Ok(Rescheduled { updated, siblings })
}

/// Raw admin schedule form. Browsers send every field as text, empty when
/// left blank.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleForm {
    pub course_id: Option<String>,
    pub campus_id: Option<String>,
    pub session_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub max_participants: Option<String>,
    pub instructor_name: Option<String>,
    pub status: Option<String>,
    pub schedule_type: Option<String>,
    pub recurrence_frequency: Option<String>,
    pub recurrence_count: Option<String>,
}

fn parse_field<T: FromStr>(name: &str, value: Option<String>) -> AppResult<Option<T>> {
    match blank_to_none(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{} has an invalid value: {}", name, raw))),
    }
}

fn parse_time(name: &str, value: Option<String>) -> AppResult<Option<NaiveTime>> {
    match blank_to_none(value) {
        None => Ok(None),
        Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{} has an invalid value: {}", name, raw))),
    }
}

impl TryFrom<ScheduleForm> for ScheduleRequest {
    type Error = AppError;

    fn try_from(form: ScheduleForm) -> Result<Self, Self::Error> {
        let recurrence = match blank_to_none(form.schedule_type).as_deref() {
            None | Some("one_off") | Some("one-off") | Some("single") => Recurrence::OneOff,
            Some("recurring") => {
                let frequency = parse_field::<Frequency>("recurrence_frequency", form.recurrence_frequency)?
                    .unwrap_or(Frequency::Weekly);
                let count = parse_field::<u32>("recurrence_count", form.recurrence_count)?
                    .ok_or_else(|| {
                        AppError::Validation("recurrence_count is required for recurring schedules".into())
                    })?;
                Recurrence::Recurring { frequency, count }
            }
            Some(other) => {
                return Err(AppError::Validation(format!("unknown schedule type: {}", other)));
            }
        };

        Ok(ScheduleRequest {
            course_id: parse_field("course_id", form.course_id)?,
            campus_id: parse_field("campus_id", form.campus_id)?,
            start_date: parse_field("session_date", form.session_date)?,
            start_time: parse_time("start_time", form.start_time)?,
            end_time: parse_time("end_time", form.end_time)?,
            max_participants: parse_field("max_participants", form.max_participants)?,
            instructor_name: form.instructor_name,
            status: parse_field("status", form.status)?.unwrap_or_default(),
            recurrence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_steps_clamp_to_month_end() {
        let dates = Recurrence::Recurring {
            frequency: Frequency::Monthly,
            count: 3,
        }
        .dates(date(2025, 1, 31))
        .unwrap();
        assert_eq!(dates, vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]);

        let leap = Frequency::Monthly.occurrence(date(2024, 1, 31), 1);
        assert_eq!(leap, Some(date(2024, 2, 29)));
    }

    #[test]
    fn weekly_steps_are_seven_days_apart() {
        let dates = Recurrence::Recurring {
            frequency: Frequency::Weekly,
            count: 4,
        }
        .dates(date(2025, 12, 17))
        .unwrap();
        for pair in dates.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 7);
        }
        assert_eq!(dates.last(), Some(&date(2026, 1, 7)));
    }

    #[test]
    fn count_outside_range_is_rejected() {
        for count in [0, MAX_RECURRENCE_COUNT + 1] {
            let result = Recurrence::Recurring {
                frequency: Frequency::Daily,
                count,
            }
            .dates(date(2025, 1, 1));
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn one_off_form_ignores_recurrence_fields() {
        let form = ScheduleForm {
            course_id: Some("1".into()),
            campus_id: Some("2".into()),
            session_date: Some("2025-03-10".into()),
            start_time: Some("09:00".into()),
            end_time: Some("12:30:00".into()),
            schedule_type: Some("one_off".into()),
            recurrence_frequency: Some("fortnightly".into()),
            recurrence_count: Some("many".into()),
            ..Default::default()
        };
        let request = ScheduleRequest::try_from(form).unwrap();
        assert_eq!(request.recurrence, Recurrence::OneOff);
        assert_eq!(request.end_time, NaiveTime::from_hms_opt(12, 30, 0));
        assert_eq!(request.status, SessionStatus::Scheduled);
    }

    #[test]
    fn missing_fields_are_named() {
        let request = ScheduleRequest::try_from(ScheduleForm {
            course_id: Some("1".into()),
            start_time: Some("".into()),
            ..Default::default()
        })
        .unwrap();
        match request.validate() {
            Err(AppError::Validation(message)) => {
                assert!(message.contains("campus_id"));
                assert!(message.contains("session_date"));
                assert!(message.contains("start_time"));
                assert!(!message.contains("course_id"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_number_is_a_validation_error() {
        let result = ScheduleRequest::try_from(ScheduleForm {
            course_id: Some("abc".into()),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
