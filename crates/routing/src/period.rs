//! Calendar helpers: resolving a record's date hint to an entry date and to
//! the start of a query period.

use {
    chrono::{Datelike, Days, NaiveDate},
    tally_common::types::DateHint,
};

/// Date a new entry is booked on.
#[must_use]
pub fn entry_date(hint: DateHint, today: NaiveDate) -> NaiveDate {
    let days = u64::try_from(hint.days_ago()).unwrap_or(0);
    today.checked_sub_days(Days::new(days)).unwrap_or(today)
}

/// Query period: start date plus a human label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub since: NaiveDate,
    pub label: &'static str,
}

/// A query without a date looks at the current month; "hoje"/"ontem"
/// narrow it down.
#[must_use]
pub fn query_period(hint: DateHint, today: NaiveDate) -> Period {
    match hint {
        DateHint::Unspecified => Period {
            since: today.with_day(1).unwrap_or(today),
            label: "neste mês",
        },
        DateHint::Today => Period {
            since: today,
            label: "hoje",
        },
        DateHint::Yesterday => Period {
            since: entry_date(hint, today),
            label: "desde ontem",
        },
        DateHint::DayBeforeYesterday => Period {
            since: entry_date(hint, today),
            label: "desde anteontem",
        },
    }
}
