//! Element location and wait primitives.
//!
//! Every workflow in this crate talks to the page through these helpers:
//! bounded-wait polling for CSS selectors, real-input click/type on element
//! handles, and a few JavaScript-backed lookups for what CSS cannot express
//! (text matching, ancestor addressing).

use crate::browser::chrome::ChromeSession;
use crate::error::{HelperError, Result};
use chromiumoxide::element::Element;
use std::time::Duration;

/// Default deadline for an element to appear before the wait escalates
pub const DEFAULT_WAIT: Duration = Duration::from_secs(15);

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Quote a Rust string as a JavaScript string literal
pub(crate) fn js_string(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

impl ChromeSession {
    /// Wait up to the default deadline for a selector to match
    pub async fn wait_for(&self, selector: &str) -> Result<Element> {
        self.wait_for_with(selector, DEFAULT_WAIT).await
    }

    /// Wait up to `timeout` for a selector to match
    pub async fn wait_for_with(&self, selector: &str, timeout: Duration) -> Result<Element> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let page = self.page().await?;
            if let Ok(element) = page.find_element(selector).await {
                return Ok(element);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HelperError::ElementTimeout {
                    selector: selector.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait up to `timeout` for a selector to stop matching
    pub async fn wait_gone(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let page = self.page().await?;
            if page.find_element(selector).await.is_err() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HelperError::ElementTimeout {
                    selector: format!("(gone) {}", selector),
                    waited: timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Check whether a selector matches right now, without waiting
    pub async fn exists(&self, selector: &str) -> bool {
        match self.page().await {
            Ok(page) => page.find_element(selector).await.is_ok(),
            Err(_) => false,
        }
    }

    /// All current matches for a selector
    pub async fn find_all(&self, selector: &str) -> Result<Vec<Element>> {
        let page = self.page().await?;
        Ok(page.find_elements(selector).await.unwrap_or_default())
    }

    /// Wait for a selector, scroll it into view, and click it
    pub async fn click(&self, selector: &str) -> Result<()> {
        let element = self.wait_for(selector).await?;
        self.scroll_to(&element).await?;
        element.click().await?;
        Ok(())
    }

    /// Best-effort click; returns whether the element was there to click
    pub async fn click_if_present(&self, selector: &str) -> bool {
        let Ok(page) = self.page().await else {
            return false;
        };
        match page.find_element(selector).await {
            Ok(element) => {
                let _ = self.scroll_to(&element).await;
                element.click().await.is_ok()
            }
            Err(_) => false,
        }
    }

    /// Wait for an input, clear it, and type `text` with real key events
    pub async fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        let element = self.wait_for(selector).await?;
        self.clear_and_type(&element, text).await
    }

    /// Clear an input element and type into it with real key events
    pub async fn clear_and_type(&self, element: &Element, text: &str) -> Result<()> {
        self.scroll_to(element).await?;
        element
            .call_js_fn(
                "function() { \
                   this.value = ''; \
                   this.dispatchEvent(new Event('input', { bubbles: true })); \
                 }",
                false,
            )
            .await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    /// Visible text of the first match
    pub async fn inner_text(&self, selector: &str) -> Result<String> {
        let element = self.wait_for(selector).await?;
        let text = element
            .inner_text()
            .await
            .map_err(|_| HelperError::ElementTimeout {
                selector: selector.to_string(),
                waited: DEFAULT_WAIT,
            })?
            .unwrap_or_default();
        Ok(text)
    }

    /// Attribute value of the first match, if set
    pub async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let element = self.wait_for(selector).await?;
        Ok(element.attribute(name).await?)
    }

    /// Scroll an element into view, backing off below the fixed page header
    pub async fn scroll_to(&self, element: &Element) -> Result<()> {
        element
            .call_js_fn("function() { this.scrollIntoView(); }", false)
            .await?;
        self.execute_script("window.scrollBy(0, -80);").await?;
        Ok(())
    }

    /// Click the first element of `tag` whose trimmed text equals `text`.
    ///
    /// Link-text and button-text lookups have no CSS equivalent, so this
    /// polls a JavaScript predicate until it finds and clicks the node.
    pub async fn click_by_text(&self, tag: &str, text: &str) -> Result<()> {
        self.click_by_text_with(tag, text, true, DEFAULT_WAIT).await
    }

    /// Click the first element of `tag` whose text contains `text`
    pub async fn click_by_text_contains(&self, tag: &str, text: &str) -> Result<()> {
        self.click_by_text_with(tag, text, false, DEFAULT_WAIT).await
    }

    pub async fn click_by_text_with(
        &self,
        tag: &str,
        text: &str,
        exact: bool,
        timeout: Duration,
    ) -> Result<()> {
        let predicate = if exact {
            format!("e.textContent.trim() === {}", js_string(text))
        } else {
            format!("e.textContent.includes({})", js_string(text))
        };
        let script = format!(
            "(() => {{ \
               const el = Array.from(document.querySelectorAll({tag})).find(e => {predicate}); \
               if (!el) return false; \
               el.scrollIntoView({{ block: 'center' }}); \
               el.click(); \
               return true; \
             }})()",
            tag = js_string(tag),
            predicate = predicate,
        );
        self.js_true(&format!("{}:text({:?})", tag, text), &script, timeout)
            .await
    }

    /// Poll a JavaScript expression until it returns `true`.
    ///
    /// The script runs repeatedly, so it must be safe to re-execute; the
    /// `description` names the target in the timeout error.
    pub async fn js_true(&self, description: &str, script: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(true) = self.execute_script_typed::<bool>(script).await {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HelperError::ElementTimeout {
                    selector: description.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Click the `ancestor_sel` ancestor of the element of `tag` whose
    /// trimmed text equals `text` (e.g. the link wrapping a calendar label)
    pub async fn click_closest(&self, tag: &str, text: &str, ancestor_sel: &str) -> Result<()> {
        let script = format!(
            "(() => {{ \
               const el = Array.from(document.querySelectorAll({tag})).find(e => e.textContent.trim() === {text}); \
               if (!el) return false; \
               const target = el.closest({ancestor}); \
               if (!target) return false; \
               target.scrollIntoView({{ block: 'center' }}); \
               target.click(); \
               return true; \
             }})()",
            tag = js_string(tag),
            text = js_string(text),
            ancestor = js_string(ancestor_sel),
        );
        self.js_true(
            &format!("{}:text({:?}) < {}", tag, text, ancestor_sel),
            &script,
            DEFAULT_WAIT,
        )
        .await
    }

    /// Whether any element of `tag` with exactly `text` is present
    pub async fn text_exists(&self, tag: &str, text: &str) -> bool {
        let script = format!(
            "Array.from(document.querySelectorAll({})).some(e => e.textContent.trim() === {})",
            js_string(tag),
            js_string(text),
        );
        matches!(self.execute_script_typed::<bool>(&script).await, Ok(true))
    }

    /// Tag the `levels`-deep ancestor of the first `child_css` match with a
    /// data attribute and return a selector addressing it.
    ///
    /// The driver's scoped lookups only descend, so row containers reached
    /// by walking up from a known child get marked from JavaScript first.
    pub async fn mark_ancestor(
        &self,
        child_css: &str,
        levels: usize,
        marker: &str,
    ) -> Result<String> {
        let script = format!(
            "(() => {{ \
               let el = document.querySelector({child}); \
               if (!el) return false; \
               for (let i = 0; i < {levels}; i++) {{ \
                 if (!el.parentElement) return false; \
                 el = el.parentElement; \
               }} \
               el.setAttribute('data-e2e-mark', {marker}); \
               return true; \
             }})()",
            child = js_string(child_css),
            levels = levels,
            marker = js_string(marker),
        );
        match self.execute_script_typed::<bool>(&script).await {
            Ok(true) => Ok(format!("[data-e2e-mark=\"{}\"]", marker)),
            _ => Err(HelperError::ElementTimeout {
                selector: child_css.to_string(),
                waited: Duration::ZERO,
            }),
        }
    }

    /// Like [`mark_ancestor`](Self::mark_ancestor), but the child is located
    /// by tag and contained text instead of a CSS selector
    pub async fn mark_ancestor_of_text(
        &self,
        tag: &str,
        text: &str,
        levels: usize,
        marker: &str,
    ) -> Result<String> {
        let script = format!(
            "(() => {{ \
               let el = Array.from(document.querySelectorAll({tag})).find(e => e.textContent.includes({text})); \
               if (!el) return false; \
               for (let i = 0; i < {levels}; i++) {{ \
                 if (!el.parentElement) return false; \
                 el = el.parentElement; \
               }} \
               el.setAttribute('data-e2e-mark', {marker}); \
               return true; \
             }})()",
            tag = js_string(tag),
            text = js_string(text),
            levels = levels,
            marker = js_string(marker),
        );
        self.js_true(
            &format!("{}:text({:?})", tag, text),
            &script,
            DEFAULT_WAIT,
        )
        .await?;
        Ok(format!("[data-e2e-mark=\"{}\"]", marker))
    }

    /// Whether a checkbox or radio is currently checked
    pub async fn is_checked(&self, selector: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return !!(el && el.checked); }})()",
            js_string(selector)
        );
        self.execute_script_typed(&script).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escaping() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(js_string("with \"quotes\""), "\"with \\\"quotes\\\"\"");
        assert_eq!(js_string("back\\slash"), "\"back\\\\slash\"");
        assert_eq!(js_string("line\nbreak"), "\"line\\nbreak\"");
    }
}
