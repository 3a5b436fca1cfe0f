//! Monthly quota and request-size limits

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::{config::BorrowingConfig, error::BorrowingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub max_requests_per_month: i64,
    pub max_books_per_request: usize,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            max_requests_per_month: 3,
            max_books_per_request: 5,
        }
    }
}

impl From<&BorrowingConfig> for QuotaPolicy {
    fn from(config: &BorrowingConfig) -> Self {
        Self {
            max_requests_per_month: config.max_requests_per_month,
            max_books_per_request: config.max_books_per_request,
        }
    }
}

impl QuotaPolicy {
    /// Check a new request against the limits, in order: monthly quota,
    /// too many books, no books. Per-book checks happen afterwards in the
    /// workflow.
    pub fn validate_new_request(
        &self,
        monthly_count: i64,
        book_ids: &[Uuid],
    ) -> Result<(), BorrowingError> {
        if monthly_count >= self.max_requests_per_month {
            return Err(BorrowingError::QuotaExceeded {
                limit: self.max_requests_per_month,
            });
        }

        if book_ids.len() > self.max_books_per_request {
            return Err(BorrowingError::TooManyBooks {
                limit: self.max_books_per_request,
            });
        }

        if book_ids.is_empty() {
            return Err(BorrowingError::NoBooks);
        }

        Ok(())
    }
}

/// Calendar month containing `now`, as `[first instant, first instant of next month)` in UTC
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first_day = now.date_naive() - Duration::days(i64::from(now.day0()));
    let next_first_day = first_day
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX);

    (
        first_day.and_time(NaiveTime::MIN).and_utc(),
        next_first_day.and_time(NaiveTime::MIN).and_utc(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn quota_is_checked_before_book_count() {
        let policy = QuotaPolicy::default();
        assert_eq!(
            policy.validate_new_request(3, &[]),
            Err(BorrowingError::QuotaExceeded { limit: 3 })
        );
        assert_eq!(
            policy.validate_new_request(3, &ids(6)),
            Err(BorrowingError::QuotaExceeded { limit: 3 })
        );
    }

    #[test]
    fn book_count_bounds() {
        let policy = QuotaPolicy::default();
        assert_eq!(
            policy.validate_new_request(0, &ids(6)),
            Err(BorrowingError::TooManyBooks { limit: 5 })
        );
        assert_eq!(policy.validate_new_request(0, &[]), Err(BorrowingError::NoBooks));
        assert_eq!(policy.validate_new_request(2, &ids(5)), Ok(()));
        assert_eq!(policy.validate_new_request(0, &ids(1)), Ok(()));
    }

    #[test]
    fn month_bounds_cover_the_whole_last_day() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 18, 30, 0).unwrap();
        let (from, to) = month_bounds(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert!(now >= from && now < to);
    }

    #[test]
    fn month_bounds_roll_over_the_year() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        let (from, to) = month_bounds(now);
        assert_eq!(from, now);
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_bounds_in_leap_february() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        let (from, to) = month_bounds(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }
}
