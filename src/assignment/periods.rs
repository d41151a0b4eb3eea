//! Open/close scheduling for course periods.
//!
//! An assignment form offers two scheduling panels: a collective one that
//! applies a single open/due pair to every period, and a per-period one
//! with an enable checkbox and its own date/time inputs on each row.

use super::datepicker::{self, Target};
use super::{PeriodMap, When, ALL_PERIODS};
use crate::browser::ChromeSession;
use crate::error::{HelperError, Result};

const COLLECTIVE_RADIO: &str = "#hide-periods-radio";
const PER_PERIOD_RADIO: &str = "#show-periods-radio";
const PERIOD_TOGGLES: &str = "input[id*=\"period-toggle-period\"]";

/// Assign open/close dates (and optional times) to periods.
///
/// The sentinel key `"all"` routes to the collective panel; otherwise each
/// named row is enabled and scheduled, and rows not named are disabled.
/// Raises [`HelperError::NoMatchingPeriod`] when none of the requested names
/// exist on the page.
pub async fn assign_periods(session: &ChromeSession, periods: &PeriodMap) -> Result<()> {
    if let Some((open, close)) = periods.get(ALL_PERIODS) {
        return assign_collectively(session, open, close).await;
    }

    session.click(PER_PERIOD_RADIO).await?;

    // Enumerate the period rows by their toggle checkbox and label text
    let toggles = session.find_all(PERIOD_TOGGLES).await?;
    let mut options: Vec<(String, String)> = Vec::new();
    for toggle in &toggles {
        let Some(id) = toggle.attribute("id").await? else {
            continue;
        };
        let label = session
            .inner_text(&format!("label[for=\"{}\"]", id))
            .await?
            .trim()
            .to_string();
        options.push((label, id));
    }

    let mut period_match = false;
    for (name, id) in &options {
        log::debug!("Period row: {}", name);
        let toggle_selector = format!("#{}", id);

        let Some((open, close)) = periods.get(name) else {
            // Disable rows that are not part of the request
            if session.is_checked(&toggle_selector).await? {
                session.click(&toggle_selector).await?;
            }
            continue;
        };
        period_match = true;

        if !session.is_checked(&toggle_selector).await? {
            session.click(&toggle_selector).await?;
        }

        // Address this row's inputs through its container, two levels above
        // the toggle checkbox
        let row = session
            .mark_ancestor(&toggle_selector, 2, &format!("sched-{}", id))
            .await?;

        datepicker::enter_date(session, Some(&row), Target::Due, close.date()).await?;
        datepicker::enter_date(session, Some(&row), Target::Open, open.date()).await?;
        if let Some(time) = close.time() {
            datepicker::enter_time(session, Some(&row), Target::Due, time).await?;
        }
        if let Some(time) = open.time() {
            datepicker::enter_time(session, Some(&row), Target::Open, time).await?;
        }
    }

    if !period_match {
        let requested: Vec<&str> = periods.keys().map(String::as_str).collect();
        return Err(HelperError::NoMatchingPeriod(requested.join(", ")));
    }
    Ok(())
}

async fn assign_collectively(session: &ChromeSession, open: &When, close: &When) -> Result<()> {
    session.click(COLLECTIVE_RADIO).await?;
    datepicker::enter_date(session, None, Target::Open, open.date()).await?;
    datepicker::enter_date(session, None, Target::Due, close.date()).await?;
    if let Some(time) = open.time() {
        datepicker::enter_time(session, None, Target::Open, time).await?;
    }
    if let Some(time) = close.time() {
        datepicker::enter_time(session, None, Target::Due, time).await?;
    }
    Ok(())
}
