use serde::Deserialize;

use super::repo_types::ApplicationStatus;
use crate::error::AppError;

const MAX_COVER_LETTER_CHARS: usize = 5000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
}

impl ApplyRequest {
    /// Blank fields become `None`.
    pub fn normalize_and_validate(&mut self) -> Result<(), AppError> {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        self.cover_letter = clean(self.cover_letter.take());
        self.resume_url = clean(self.resume_url.take());

        if self
            .cover_letter
            .as_deref()
            .is_some_and(|c| c.chars().count() > MAX_COVER_LETTER_CHARS)
        {
            return Err(AppError::Validation(format!(
                "coverLetter must be at most {MAX_COVER_LETTER_CHARS} characters"
            )));
        }
        if let Some(url) = &self.resume_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Validation("resumeUrl must be an http(s) URL".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ApplicationStatus,
}
