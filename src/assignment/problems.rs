//! Exercise selection for homework assignments.
//!
//! A homework plan names exercises per chapter/section key through a small
//! grammar: `"all"`, a fixed count, a `[low, high]` random range, or an
//! explicit ID list. The grammar resolves against the catalog scraped from
//! the exercise chooser, and the resolved IDs are then added through the
//! hover-overlay cards.

use super::sections::{self, is_chapter_key};
use super::TUTOR_KEY;
use crate::browser::dom::DEFAULT_WAIT;
use crate::browser::ChromeSession;
use crate::error::{HelperError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Exercise IDs available per chapter/section key, in page order
pub type Catalog = BTreeMap<String, Vec<String>>;

/// One selection rule from the homework problem grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemSelector {
    /// Every exercise the catalog offers for the key
    All,
    /// The first N available exercises
    First(usize),
    /// A random count within `[low, high]`, no duplicates
    Random(usize, usize),
    /// Exactly the listed exercise IDs, where present in the catalog
    Ids(Vec<String>),
}

/// Serde mirror of the grammar: `"all"`, an integer, a two-integer array,
/// or an array of ID strings
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelector {
    Keyword(String),
    Count(usize),
    Pair(usize, usize),
    List(Vec<String>),
}

impl Serialize for ProblemSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let raw = match self {
            ProblemSelector::All => RawSelector::Keyword("all".to_string()),
            ProblemSelector::First(n) => RawSelector::Count(*n),
            ProblemSelector::Random(low, high) => RawSelector::Pair(*low, *high),
            ProblemSelector::Ids(ids) => RawSelector::List(ids.clone()),
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProblemSelector {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        match RawSelector::deserialize(deserializer)? {
            RawSelector::Keyword(word) if word.eq_ignore_ascii_case("all") => {
                Ok(ProblemSelector::All)
            }
            RawSelector::Keyword(word) => Err(serde::de::Error::custom(format!(
                "unknown selection keyword {:?} (expected \"all\")",
                word
            ))),
            RawSelector::Count(n) => Ok(ProblemSelector::First(n)),
            RawSelector::Pair(low, high) => Ok(ProblemSelector::Random(low, high)),
            RawSelector::List(ids) => Ok(ProblemSelector::Ids(ids)),
        }
    }
}

/// Per-key selection rules for one homework assignment.
///
/// The reserved key `tutor` carries the adaptive-selection target count
/// instead of a content rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemSet(pub BTreeMap<String, ProblemSelector>);

impl ProblemSet {
    /// The adaptive-selection target count, when the plan sets one
    pub fn tutor_count(&self) -> Option<usize> {
        match self.0.get(TUTOR_KEY) {
            Some(ProblemSelector::First(n)) => Some(*n),
            _ => None,
        }
    }

    /// The content keys, excluding the reserved `tutor` entry
    pub fn section_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| *k != TUTOR_KEY)
    }
}

/// Every catalog entry for a whole-chapter key, in section order
pub fn chapter_exercises(catalog: &Catalog, chapter_key: &str) -> Vec<String> {
    let chapter = chapter_key.trim_start_matches("ch");
    catalog
        .iter()
        .filter(|(section, _)| section.split('.').next() == Some(chapter))
        .flat_map(|(_, ids)| ids.iter().cloned())
        .collect()
}

/// Resolve a problem set against a scraped catalog into a duplicate-free
/// list of exercise IDs.
///
/// Pure over the catalog and RNG so selection policies stay testable
/// without a browser.
pub fn resolve_selection<R: Rng>(
    problems: &ProblemSet,
    catalog: &Catalog,
    rng: &mut R,
) -> Result<Vec<String>> {
    let mut using: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |id: String, using: &mut Vec<String>, seen: &mut HashSet<String>| {
        if seen.insert(id.clone()) {
            using.push(id);
        }
    };

    for (key, selector) in &problems.0 {
        if key == TUTOR_KEY {
            continue;
        }
        let available: Vec<String> = if is_chapter_key(key) {
            chapter_exercises(catalog, key)
        } else {
            catalog.get(key).cloned().unwrap_or_default()
        };

        match selector {
            ProblemSelector::All => {
                log::debug!("Selecting all {} exercises from {}", available.len(), key);
                for id in available {
                    push(id, &mut using, &mut seen);
                }
            }
            ProblemSelector::First(count) => {
                if *count > available.len() {
                    return Err(HelperError::NotEnoughExercises {
                        section: key.clone(),
                        requested: *count,
                        available: available.len(),
                    });
                }
                log::debug!("Selecting first {} from {}", count, key);
                for id in available.into_iter().take(*count) {
                    push(id, &mut using, &mut seen);
                }
            }
            ProblemSelector::Random(low, high) => {
                if low > high {
                    return Err(HelperError::InvalidPlan(format!(
                        "Selection range for {} is inverted: [{}, {}]",
                        key, low, high
                    )));
                }
                if *low > available.len() {
                    return Err(HelperError::NotEnoughExercises {
                        section: key.clone(),
                        requested: *low,
                        available: available.len(),
                    });
                }
                // A range reaching past the catalog shrinks to what exists
                let high = (*high).min(available.len());
                let count = rng.gen_range(*low..=high);
                log::debug!("Selecting {} random from {} ({} to {})", count, key, low, high);
                for id in available.choose_multiple(rng, count) {
                    push(id.clone(), &mut using, &mut seen);
                }
            }
            ProblemSelector::Ids(ids) => {
                log::debug!("Adding up to {} explicit exercises", ids.len());
                for wanted in ids {
                    let present = catalog.values().any(|section| section.contains(wanted));
                    if present {
                        push(wanted.clone(), &mut using, &mut seen);
                    }
                }
            }
        }
    }

    Ok(using)
}

/// Scrape the exercise chooser into a catalog of per-section IDs.
///
/// Waits out the transient `Loading...` marker first; both waits are
/// best-effort because a fast response may never show it.
pub async fn scrape_catalog(session: &ChromeSession) -> Result<Catalog> {
    let loading_probe = "Array.from(document.querySelectorAll('span')) \
                           .some(e => e.textContent.trim() === 'Loading...')";
    let appeared = session
        .js_true("Loading... marker", loading_probe, Duration::from_secs(5))
        .await
        .is_ok();
    if appeared {
        let gone_probe = format!("!({})", loading_probe);
        let _ = session
            .js_true("Loading... cleared", &gone_probe, DEFAULT_WAIT)
            .await;
    }

    let script = r#"(() => {
        const out = {};
        for (const row of document.querySelectorAll('div[class*="exercise-sections"]')) {
            const label = row.querySelector('label span.chapter-section');
            if (!label) continue;
            const ids = [];
            for (const tag of row.querySelectorAll('div.exercises span')) {
                const text = tag.textContent.trim();
                if (!text.includes('ID:')) continue;
                const parts = text.split(' ');
                if (parts.length > 1) ids.push(parts[1]);
            }
            out[label.textContent.trim()] = ids;
        }
        return out;
    })()"#;

    session.execute_script_typed(script).await
}

/// Drive the adaptive-selection stepper to the requested count
pub async fn set_tutor_selections(session: &ChromeSession, count: usize) -> Result<()> {
    let current: i64 = session
        .inner_text("div.tutor-selections h2")
        .await?
        .trim()
        .parse()
        .map_err(|_| HelperError::Other("Unreadable tutor-selection count".to_string()))?;

    let mut change = count as i64 - current;
    log::debug!("Tutor selections: {} -> {}", current, count);
    // The stepper is inverted: the "down" control raises the count
    while change > 0 {
        session
            .click("div.tutor-selections button[class*=\"-move-exercise-down\"]")
            .await?;
        change -= 1;
    }
    while change < 0 {
        session
            .click("div.tutor-selections button[class*=\"-move-exercise-up\"]")
            .await?;
        change += 1;
    }
    Ok(())
}

/// Walk the full exercise sub-flow on an open homework form: pick sections,
/// reveal the cards, resolve the selection, add each exercise, and advance.
pub async fn add_homework_problems<R: Rng>(
    session: &ChromeSession,
    problems: &ProblemSet,
    rng: &mut R,
) -> Result<()> {
    session.click("#problems-select").await?;
    session
        .wait_for("div.homework-plan-exercise-select-topics")
        .await?;

    sections::select_sections(session, problems.section_keys()).await?;

    session
        .execute_script("window.scrollTo(0, document.body.scrollHeight);")
        .await?;
    session.click("button[class*=\"-show-problems\"]").await?;

    if let Some(count) = problems.tutor_count() {
        set_tutor_selections(session, count).await?;
    }

    let catalog = scrape_catalog(session).await?;
    let selection = resolve_selection(problems, &catalog, rng)?;
    log::info!("Adding {} exercises", selection.len());

    for (index, exercise) in selection.iter().enumerate() {
        add_exercise_card(session, exercise, index).await?;
    }

    session.click_by_text("*", "Next").await
}

/// Hover an exercise card's controls overlay and click it to add the card
async fn add_exercise_card(session: &ChromeSession, exercise: &str, index: usize) -> Result<()> {
    let row = session
        .mark_ancestor_of_text("span", exercise, 2, &format!("exercise-{}", index))
        .await?;
    let overlay = session
        .wait_for(&format!("{} div.controls-overlay", row))
        .await?;
    session.scroll_to(&overlay).await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    overlay.hover().await?;
    overlay.click().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        let mut map = Catalog::new();
        map.insert("1.1".into(), vec!["q101".into(), "q102".into(), "q103".into()]);
        map.insert("1.2".into(), vec!["q201".into(), "q202".into()]);
        map.insert("2.1".into(), vec!["q301".into()]);
        map
    }

    fn set(entries: Vec<(&str, ProblemSelector)>) -> ProblemSet {
        ProblemSet(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_all_selects_every_entry_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let problems = set(vec![("1.1", ProblemSelector::All)]);
        let picked = resolve_selection(&problems, &catalog(), &mut rng).unwrap();
        assert_eq!(picked, vec!["q101", "q102", "q103"]);
    }

    #[test]
    fn test_chapter_key_aggregates_sections() {
        let mut rng = StdRng::seed_from_u64(7);
        let problems = set(vec![("ch1", ProblemSelector::All)]);
        let picked = resolve_selection(&problems, &catalog(), &mut rng).unwrap();
        assert_eq!(picked, vec!["q101", "q102", "q103", "q201", "q202"]);
    }

    #[test]
    fn test_first_n_is_a_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        let problems = set(vec![("1.1", ProblemSelector::First(2))]);
        let picked = resolve_selection(&problems, &catalog(), &mut rng).unwrap();
        assert_eq!(picked, vec!["q101", "q102"]);
    }

    #[test]
    fn test_first_n_past_catalog_errors() {
        let mut rng = StdRng::seed_from_u64(7);
        let problems = set(vec![("1.2", ProblemSelector::First(5))]);
        let err = resolve_selection(&problems, &catalog(), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            HelperError::NotEnoughExercises {
                requested: 5,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_random_range_count_and_uniqueness() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let problems = set(vec![("1.1", ProblemSelector::Random(1, 3))]);
            let picked = resolve_selection(&problems, &catalog(), &mut rng).unwrap();
            assert!((1..=3).contains(&picked.len()), "len {} out of range", picked.len());
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), picked.len(), "duplicates in {:?}", picked);
        }
    }

    #[test]
    fn test_random_range_validation() {
        let mut rng = StdRng::seed_from_u64(7);
        let inverted = set(vec![("1.1", ProblemSelector::Random(3, 1))]);
        assert!(matches!(
            resolve_selection(&inverted, &catalog(), &mut rng),
            Err(HelperError::InvalidPlan(_))
        ));

        let starved = set(vec![("2.1", ProblemSelector::Random(2, 4))]);
        assert!(matches!(
            resolve_selection(&starved, &catalog(), &mut rng),
            Err(HelperError::NotEnoughExercises { .. })
        ));
    }

    #[test]
    fn test_explicit_ids_filtered_to_catalog() {
        let mut rng = StdRng::seed_from_u64(7);
        let problems = set(vec![(
            "1.1",
            ProblemSelector::Ids(vec!["q202".into(), "q999".into(), "q101".into()]),
        )]);
        let picked = resolve_selection(&problems, &catalog(), &mut rng).unwrap();
        assert_eq!(picked, vec!["q202", "q101"]);
    }

    #[test]
    fn test_overlapping_rules_stay_duplicate_free() {
        let mut rng = StdRng::seed_from_u64(7);
        let problems = set(vec![
            ("1.1", ProblemSelector::All),
            ("ch1", ProblemSelector::All),
        ]);
        let picked = resolve_selection(&problems, &catalog(), &mut rng).unwrap();
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), picked.len());
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn test_tutor_key_is_reserved() {
        let mut rng = StdRng::seed_from_u64(7);
        let problems = set(vec![
            ("tutor", ProblemSelector::First(3)),
            ("1.2", ProblemSelector::All),
        ]);
        assert_eq!(problems.tutor_count(), Some(3));
        let picked = resolve_selection(&problems, &catalog(), &mut rng).unwrap();
        assert_eq!(picked, vec!["q201", "q202"]);
    }

    #[test]
    fn test_selector_json_grammar() {
        let parsed: ProblemSelector = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(parsed, ProblemSelector::All);

        let parsed: ProblemSelector = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, ProblemSelector::First(4));

        let parsed: ProblemSelector = serde_json::from_str("[2, 5]").unwrap();
        assert_eq!(parsed, ProblemSelector::Random(2, 5));

        let parsed: ProblemSelector = serde_json::from_str("[\"q1\", \"q2\"]").unwrap();
        assert_eq!(parsed, ProblemSelector::Ids(vec!["q1".into(), "q2".into()]));

        assert!(serde_json::from_str::<ProblemSelector>("\"some\"").is_err());

        let set: ProblemSet =
            serde_json::from_str(r#"{"1.1": "all", "tutor": 2, "ch2": [1, 3]}"#).unwrap();
        assert_eq!(set.0.len(), 3);
        assert_eq!(set.tutor_count(), Some(2));
        let json = serde_json::to_string(&set).unwrap();
        let back: ProblemSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
