//! Student session: dashboard navigation and assessment-working flows.

use super::User;
use crate::config::{Credentials, Role};
use crate::error::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

/// Which practice set a student works
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PracticeSet {
    /// The weakest-topics card
    #[default]
    Weakest,
    /// A random section from the performance bars
    RandomSection,
}

pub struct Student {
    user: User,
}

impl Student {
    /// Launch a browser and bind the student credentials from the environment
    pub async fn from_env() -> Result<Self> {
        let credentials = Credentials::from_env(Role::Student)?;
        Ok(Self {
            user: User::launch(credentials).await?,
        })
    }

    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// Open a named entry from the user menu
    pub async fn goto_menu_item(&self, item: &str) -> Result<()> {
        if self.current_url().await?.contains("courses") {
            self.open_user_menu().await?;
            self.session().click_by_text("a", item).await?;
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        Ok(())
    }

    /// Go to the current-work dashboard
    pub async fn goto_dashboard(&self) -> Result<()> {
        self.goto_menu_item("Dashboard").await
    }

    /// View work from previous weeks
    pub async fn goto_past_work(&self) -> Result<()> {
        self.goto_dashboard().await?;
        self.session().click_by_text("a", "All Past Work").await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    pub async fn goto_performance_forecast(&self) -> Result<()> {
        self.goto_menu_item("Performance Forecast").await
    }

    /// Work a practice set of up to five problems, answering each one
    pub async fn practice(&self, set: PracticeSet) -> Result<()> {
        let mut rng = StdRng::from_entropy();
        self.goto_dashboard().await?;

        // Let the performance meters finish loading; a fast page may never
        // show the spinner at all
        let _ = self
            .session()
            .wait_gone(".is-loading", Duration::from_secs(60))
            .await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        self.session().wait_for(".practice").await?;
        match set {
            PracticeSet::Weakest => {
                self.session().click(".practice").await?;
            }
            PracticeSet::RandomSection => {
                let sections = self
                    .session()
                    .find_all("button[aria-describedby*=\"progress-bar-tooltip-\"]")
                    .await?;
                if sections.is_empty() {
                    self.session().click(".practice").await?;
                } else {
                    let pick = rng.gen_range(0..sections.len());
                    self.session().scroll_to(&sections[pick]).await?;
                    sections[pick].click().await?;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        // One breadcrumb per question plus the completion crumb
        self.session().wait_for(".task-breadcrumbs").await?;
        let crumbs = self.session().find_all(".task-breadcrumbs span").await?;
        let questions = crumbs.len().saturating_sub(1);
        log::info!("Practice set has {} questions", questions);
        for _ in 0..questions {
            self.answer_assessment(&mut rng).await?;
        }

        self.session()
            .click_by_text_contains("a[class*=\"btn\"]", "Dashboard")
            .await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    /// Answer the assessment currently on screen: fill the free-response box
    /// when one is offered, then pick a random multiple-choice answer
    pub async fn answer_assessment<R: Rng>(&self, rng: &mut R) -> Result<()> {
        self.session().wait_for(".openstax-question").await?;

        // Free response only appears on two-step questions
        match self
            .session()
            .wait_for_with("textarea", Duration::from_secs(3))
            .await
        {
            Ok(text_block) => {
                log::debug!("Entering a free response");
                let response = filler_text(rng);
                self.session().clear_and_type(&text_block, &response).await?;
                self.session().click(".continue").await?;
            }
            Err(_) => log::debug!("No free response on this question"),
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        let answers = self.session().find_all(".answer-letter").await?;
        if answers.is_empty() {
            return Err(crate::error::HelperError::ElementTimeout {
                selector: ".answer-letter".to_string(),
                waited: Duration::ZERO,
            });
        }
        tokio::time::sleep(Duration::from_millis(800)).await;
        let pick = rng.gen_range(0..answers.len());
        log::debug!("Selecting answer {}", (b'a' + pick as u8) as char);
        self.session().scroll_to(&answers[pick]).await?;
        answers[pick].click().await?;
        tokio::time::sleep(Duration::from_secs(1)).await;

        self.session().click_closest("span", "Submit", "button").await?;
        self.session().click(".continue").await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }
}

impl Deref for Student {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

impl DerefMut for Student {
    fn deref_mut(&mut self) -> &mut User {
        &mut self.user
    }
}

const FILLER_WORDS: &[&str] = &[
    "the", "momentum", "of", "a", "system", "remains", "constant", "when", "net", "external",
    "force", "is", "zero", "so", "each", "collision", "conserves", "it", "while", "kinetic",
    "energy", "may", "dissipate", "into", "heat", "and", "sound", "depending", "on", "elasticity",
];

/// Generate a few sentences of plausible free-response filler
fn filler_text<R: Rng>(rng: &mut R) -> String {
    let words = rng.gen_range(12..=40);
    let mut out = String::new();
    for i in 0..words {
        let word = FILLER_WORDS[rng.gen_range(0..FILLER_WORDS.len())];
        if i == 0 {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        } else {
            out.push(' ');
            out.push_str(word);
        }
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filler_text_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..16 {
            let text = filler_text(&mut rng);
            assert!(text.ends_with('.'));
            assert!(text.chars().next().unwrap().is_ascii_uppercase());
            let words = text.trim_end_matches('.').split(' ').count();
            assert!((12..=40).contains(&words), "{} words", words);
        }
    }
}
