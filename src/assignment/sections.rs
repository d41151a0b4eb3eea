//! Chapter and section checkbox flows for the content chooser.
//!
//! Keys are either `chN` (whole chapter) or `N.M` (single section); the
//! reserved `tutor` key is a problem-count control, not content, and is
//! skipped here.

use super::TUTOR_KEY;
use crate::browser::dom::{js_string, DEFAULT_WAIT};
use crate::browser::ChromeSession;
use crate::error::Result;
use std::time::Duration;

/// Expand a chapter's section list if it is collapsed
pub async fn open_chapter_list(session: &ChromeSession, chapter: &str) -> Result<()> {
    let selector = format!("div[data-chapter-section=\"{}\"] > a", chapter);
    let expanded = session.attribute(&selector, "aria-expanded").await?;
    if expanded.as_deref() == Some("false") {
        session.click(&selector).await?;
    }
    Ok(())
}

/// Whether a key names a whole chapter (`ch` prefix)
pub fn is_chapter_key(key: &str) -> bool {
    key.strip_prefix("ch")
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Tick the chooser checkboxes for the requested chapters and sections
pub async fn select_sections<'a, I>(session: &ChromeSession, keys: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    for key in keys {
        if key.contains(TUTOR_KEY) {
            continue;
        }
        if is_chapter_key(key) {
            log::debug!("Adding chapter {}", key);
            select_whole_chapter(session, &key[2..]).await?;
        } else {
            log::debug!("Adding section {}", key);
            let chapter = key.split('.').next().unwrap_or(key);
            open_chapter_list(session, chapter).await?;
            tokio::time::sleep(Duration::from_millis(500)).await;
            select_single_section(session, key).await?;
        }
    }
    Ok(())
}

async fn select_whole_chapter(session: &ChromeSession, chapter: &str) -> Result<()> {
    let selector = format!(
        "div[data-chapter-section=\"{}\"] i[class*=\"tutor-icon\"]",
        chapter
    );
    tokio::time::sleep(Duration::from_millis(500)).await;
    let element = session.wait_for(&selector).await?;
    if element.attribute("aria-checked").await?.as_deref() != Some("true") {
        element.click().await?;
    }
    Ok(())
}

/// Tick the checkbox paired with a section's number span. The checkbox sits
/// in a preceding sibling of the numbered span, so the walk happens in
/// JavaScript.
async fn select_single_section(session: &ChromeSession, key: &str) -> Result<()> {
    let script = format!(
        "(() => {{ \
           const span = Array.from(document.querySelectorAll('span[data-chapter-section]')) \
             .find(e => (e.dataset.chapterSection || '').includes({key}) && e.textContent.trim() === {key}); \
           if (!span) return false; \
           let sib = span.previousElementSibling; \
           while (sib) {{ \
             const input = sib.tagName === 'INPUT' ? sib : sib.querySelector('input'); \
             if (input) {{ \
               if (!input.checked) input.click(); \
               return true; \
             }} \
             sib = sib.previousElementSibling; \
           }} \
           return false; \
         }})()",
        key = js_string(key),
    );
    session
        .js_true(&format!("section checkbox {}", key), &script, DEFAULT_WAIT)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_key_detection() {
        assert!(is_chapter_key("ch1"));
        assert!(is_chapter_key("ch12"));
        assert!(!is_chapter_key("1.2"));
        assert!(!is_chapter_key("ch"));
        assert!(!is_chapter_key("chapter1"));
        assert!(!is_chapter_key("tutor"));
    }
}
