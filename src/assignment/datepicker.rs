//! Date and time entry against the react-datepicker widget.
//!
//! The widget shows one month at a time, so picking a date means rotating
//! the calendar month-by-month until the header matches the target, then
//! clicking the day cell. The rotation re-reads the header after every
//! arrow click; it never assumes a click landed.

use crate::browser::dom::{js_string, DEFAULT_WAIT};
use crate::browser::ChromeSession;
use crate::error::{HelperError, Result};
use chrono::{Datelike, NaiveDate};
use std::str::FromStr;
use std::time::Duration;

const HEADER: &str = ".react-datepicker__current-month";
const NEXT_ARROW: &str = ".react-datepicker__navigation--next";
const PREV_ARROW: &str = ".react-datepicker__navigation--previous";

/// Which schedule column a date or time lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Open,
    Due,
}

impl Target {
    fn css_fragment(&self) -> &'static str {
        match self {
            Target::Open => "-open",
            Target::Due => "-due",
        }
    }
}

/// Parse an `MM/DD/YYYY` date string
pub fn parse_mdy(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%m/%d/%Y").map_err(|_| HelperError::InvalidDate {
        value: value.to_string(),
    })
}

/// Parse a `Month YYYY` calendar heading into (month, year)
pub fn parse_month_year(heading: &str) -> Result<(u32, i32)> {
    let mut parts = heading.split_whitespace();
    let month_name = parts.next().unwrap_or_default();
    let year_text = parts.next().unwrap_or_default();

    let month = chrono::Month::from_str(month_name)
        .map_err(|_| HelperError::Other(format!("Unreadable calendar heading: {}", heading)))?
        .number_from_month();
    let year = year_text
        .parse::<i32>()
        .map_err(|_| HelperError::Other(format!("Unreadable calendar heading: {}", heading)))?;
    Ok((month, year))
}

/// Signed number of month steps from (`from_month`, `from_year`) to the
/// target; positive means the calendar must advance
pub fn month_delta(from_month: u32, from_year: i32, to_month: u32, to_year: i32) -> i32 {
    (to_year - from_year) * 12 + (to_month as i32 - from_month as i32)
}

/// Normalize a wall-clock time string into the widget's keystroke form:
/// `8:00 pm` becomes `800p`
pub fn normalize_time(time: &str) -> String {
    time.to_ascii_lowercase()
        .chars()
        .filter(|c| *c != ':' && *c != ' ' && *c != 'm')
        .collect()
}

/// Today shifted by `day_delta` days, in the `MM/DD/YYYY` form the
/// scheduling API takes. Handy for plans that schedule relative to the run
/// date.
pub fn date_string(day_delta: i64) -> String {
    (chrono::Local::now().date_naive() + chrono::Duration::days(day_delta))
        .format("%m/%d/%Y")
        .to_string()
}

/// Set the open or due date on a schedule row.
///
/// `scope` is a selector addressing one period row, or `None` for the
/// collective panel. Opens the picker attached to that row's date input,
/// rotates it to the target month, and clicks the day.
pub async fn enter_date(
    session: &ChromeSession,
    scope: Option<&str>,
    target: Target,
    date: &str,
) -> Result<()> {
    let parsed = parse_mdy(date)?;
    let input_selector = format!(
        "{}div[class*=\"{}-date\"] div[class*=\"react-datepicker__input\"] input",
        scope.map(|s| format!("{} ", s)).unwrap_or_default(),
        target.css_fragment(),
    );

    let input = session.wait_for(&input_selector).await?;
    tokio::time::sleep(Duration::from_millis(150)).await;
    session.scroll_to(&input).await?;
    input.click().await?;

    rotate_to_month(session, parsed).await?;
    click_day(session, parsed.day()).await
}

/// Set the open or due time on a schedule row
pub async fn enter_time(
    session: &ChromeSession,
    scope: Option<&str>,
    target: Target,
    time: &str,
) -> Result<()> {
    let input_selector = format!(
        "{}div[class*=\"{}-time\"] input",
        scope.map(|s| format!("{} ", s)).unwrap_or_default(),
        target.css_fragment(),
    );
    let input = session.wait_for(&input_selector).await?;
    session.clear_and_type(&input, &normalize_time(time)).await
}

/// Rotate the open picker until its heading shows the target month/year.
///
/// One arrow click per month of offset, re-reading the heading each step,
/// so the walk lands exactly regardless of direction or year boundaries.
async fn rotate_to_month(session: &ChromeSession, date: NaiveDate) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    if today.year() == date.year() && today.month() == date.month() {
        // Pickers open on the current month
        return Ok(());
    }

    let heading = session.inner_text(HEADER).await?;
    let (mut month, mut year) = parse_month_year(&heading)?;
    let initial_delta = month_delta(month, year, date.month(), date.year());
    // Slack for a click that lands while the widget is re-rendering
    let mut budget = initial_delta.unsigned_abs() + 24;

    loop {
        let delta = month_delta(month, year, date.month(), date.year());
        if delta == 0 {
            return Ok(());
        }
        if budget == 0 {
            return Err(HelperError::Other(format!(
                "Date picker never reached {}/{} (stuck at {}/{})",
                date.month(),
                date.year(),
                month,
                year
            )));
        }
        budget -= 1;

        let arrow = if delta > 0 { NEXT_ARROW } else { PREV_ARROW };
        session.click(arrow).await?;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let heading = session.inner_text(HEADER).await?;
        let (m, y) = parse_month_year(&heading)?;
        month = m;
        year = y;
    }
}

/// Click the enabled day cell with the given day number
async fn click_day(session: &ChromeSession, day: u32) -> Result<()> {
    let script = format!(
        "(() => {{ \
           const cell = Array.from(document.querySelectorAll('div[class*=\"react-datepicker__day\"]')) \
             .find(e => !e.className.includes('disabled') && e.textContent.trim() === {day}); \
           if (!cell) return false; \
           cell.click(); \
           return true; \
         }})()",
        day = js_string(&day.to_string()),
    );
    session
        .js_true(&format!("react-datepicker day {}", day), &script, DEFAULT_WAIT)
        .await
}
