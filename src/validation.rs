use crate::error::{ReportError, Result};

pub const MIN_REPORT_YEAR: i32 = 1900;
pub const MAX_REPORT_YEAR: i32 = 2100;
pub const MAX_DESCRIPTION_LENGTH: usize = 4000;

pub fn ensure_year(year: i32) -> Result<()> {
    if (MIN_REPORT_YEAR..=MAX_REPORT_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(ReportError::Validation(format!(
            "year must be between {MIN_REPORT_YEAR} and {MAX_REPORT_YEAR}"
        )))
    }
}

pub fn ensure_description(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReportError::Validation(
            "description must not be empty".into(),
        ));
    }
    if value.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ReportError::Validation(format!(
            "description cannot exceed {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn ensure_reporter_id(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReportError::Validation(
            "reporter identity must not be empty".into(),
        ));
    }
    Ok(())
}
