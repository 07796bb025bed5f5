use serde::Deserialize;

use super::repo_types::{JobChanges, NewJob};
use crate::error::AppError;

pub const EMPLOYMENT_TYPES: [&str; 5] = [
    "full-time",
    "part-time",
    "contract",
    "internship",
    "temporary",
];

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub q: Option<String>,
}

impl JobListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Blank searches are treated as absent.
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub employment_type: String,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::Validation(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

fn check_employment_type(value: &str) -> Result<String, AppError> {
    let value = value.trim().to_lowercase();
    if EMPLOYMENT_TYPES.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(AppError::Validation(format!(
            "employmentType must be one of {}",
            EMPLOYMENT_TYPES.join(", ")
        )))
    }
}

pub(crate) fn check_salary_range(min: Option<i32>, max: Option<i32>) -> Result<(), AppError> {
    if min.is_some_and(|v| v < 0) || max.is_some_and(|v| v < 0) {
        return Err(AppError::Validation("salary cannot be negative".into()));
    }
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => Err(AppError::Validation(
            "salaryMin must not exceed salaryMax".into(),
        )),
        _ => Ok(()),
    }
}

impl CreateJobRequest {
    pub fn into_new_job(self) -> Result<NewJob, AppError> {
        check_salary_range(self.salary_min, self.salary_max)?;
        Ok(NewJob {
            title: required("title", &self.title)?,
            company: required("company", &self.company)?,
            location: required("location", &self.location)?,
            description: required("description", &self.description)?,
            employment_type: check_employment_type(&self.employment_type)?,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub employment_type: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub is_open: Option<bool>,
}

impl UpdateJobRequest {
    pub fn into_changes(self) -> Result<JobChanges, AppError> {
        let opt = |field: &str, v: Option<String>| v.map(|s| required(field, &s)).transpose();
        Ok(JobChanges {
            title: opt("title", self.title)?,
            company: opt("company", self.company)?,
            location: opt("location", self.location)?,
            description: opt("description", self.description)?,
            employment_type: self
                .employment_type
                .as_deref()
                .map(check_employment_type)
                .transpose()?,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            is_open: self.is_open,
        })
    }
}
