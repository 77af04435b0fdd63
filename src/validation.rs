use chrono::NaiveDate;
use std::fmt;

/// Bad input on a record write, as opposed to a storage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    FutureDateFounded { date_founded: NaiveDate, today: NaiveDate },
    Blank(&'static str),
    TooLong { field: &'static str, max: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FutureDateFounded { date_founded, today } => write!(
                f,
                "date_founded {} cannot be in the future (today is {})",
                date_founded, today
            ),
            ValidationError::Blank(field) => write!(f, "{} may not be blank", field),
            ValidationError::TooLong { field, max } => {
                write!(f, "{} must be at most {} characters", field, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A company can't have been founded after `today`. A missing date is fine.
pub fn validate_date_founded(
    date_founded: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    match date_founded {
        Some(date_founded) if date_founded > today => {
            Err(ValidationError::FutureDateFounded { date_founded, today })
        }
        _ => Ok(()),
    }
}

pub fn validate_required(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    validate_max_len(field, value, max)
}

pub fn validate_max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_future_date_founded_is_rejected() {
        let today = date(2024, 6, 1);
        let err = validate_date_founded(Some(date(2024, 6, 2)), today).unwrap_err();
        assert_eq!(
            err,
            ValidationError::FutureDateFounded { date_founded: date(2024, 6, 2), today }
        );
        assert!(err.to_string().contains("cannot be in the future"));
    }

    #[test]
    fn test_today_past_and_missing_dates_are_accepted() {
        let today = date(2024, 6, 1);
        assert!(validate_date_founded(Some(today), today).is_ok());
        assert!(validate_date_founded(Some(date(2019, 1, 1)), today).is_ok());
        assert!(validate_date_founded(None, today).is_ok());
    }

    #[test]
    fn test_field_lengths() {
        assert_eq!(validate_required("name", "  ", 200), Err(ValidationError::Blank("name")));
        assert!(validate_required("name", "A Company LTD", 200).is_ok());
        assert_eq!(
            validate_max_len("companies_house_id", "123456789", 8),
            Err(ValidationError::TooLong { field: "companies_house_id", max: 8 })
        );
    }
}
