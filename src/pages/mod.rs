//! The dashboard's feature pages
//!
//! Each page is a set of async operations over a [`DataGateway`]. Operations
//! own their state; results the user should see as a transient message come
//! back as a [`Notice`].
//!
//! [`DataGateway`]: crate::gateway::DataGateway

pub mod parent_progress;
pub mod sign_in;
pub mod student_assignments;
pub mod teacher_assignments;
pub mod teacher_attendance;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::error::Error;

/// Abbreviated month names as French locales print them
const FRENCH_SHORT_MONTHS: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.",
    "déc.",
];

/// Abbreviated French name of the date's month
pub fn french_short_month(date: NaiveDate) -> &'static str {
    FRENCH_SHORT_MONTHS[date.month0() as usize]
}

/// "02 mai 2024"
pub fn french_short_date(date: NaiveDate) -> String {
    format!("{:02} {} {}", date.day(), french_short_month(date), date.year())
}

/// Kind of transient message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// An error notice for a failed operation, `prefix` followed by the cause
    pub fn failure(prefix: &str, error: &Error) -> Self {
        log::warn!("{}{}", prefix, error);
        Self::error(format!("{}{}", prefix, describe(error)))
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Rounded share of `part` in `total`, as a percentage
pub(crate) fn percentage(part: usize, total: usize) -> Option<u32> {
    if total == 0 {
        return None;
    }
    Some((part as f64 / total as f64 * 100.0).round() as u32)
}

/// The part of an error worth showing to a user
pub fn describe(error: &Error) -> String {
    match error {
        Error::Api { message, .. } => message.clone(),
        Error::Auth(message)
        | Error::Database(message)
        | Error::Storage(message)
        | Error::General(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Lifetime of a mounted view.
///
/// Work started for a view runs to completion, but its result is dropped once
/// the view has been unmounted.
#[derive(Debug, Clone)]
pub struct ViewScope {
    mounted: Arc<AtomicBool>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Mark the view as gone. Every clone of the scope observes it.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    /// Await `work` and hand back its output if the view is still mounted
    pub async fn run<F, T>(&self, work: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let output = work.await;
        if self.is_mounted() {
            Some(output)
        } else {
            log::debug!("Discarding result for an unmounted view");
            None
        }
    }
}
