//! The host page: document, location, and session history.
//!
//! A [`Page`] stands in for the browser window the search box lives in. It
//! owns the document body (which must contain exactly one `#search` input
//! and one `#results` container), the current URL, and the history stack.
//!
//! The URL carries the last committed search term in its `search` query
//! parameter so that a reload replays the same search. Writes go through
//! [`Page::replace_search_term`], which rewrites the current history entry
//! rather than pushing a new one.

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde_json::{json, Value};

use crate::dom::Element;

/// Id of the text input holding the search term.
pub const SEARCH_INPUT_ID: &str = "search";
/// Id of the container the renderer swaps results into.
pub const RESULTS_ID: &str = "results";
/// Query-string parameter mirroring the committed search term.
pub const SEARCH_PARAM: &str = "search";

/// One entry in the session history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: Url,
    pub state: Option<Value>,
}

/// Session history with a cursor on the current entry.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl History {
    fn new(url: Url) -> Self {
        Self {
            entries: vec![HistoryEntry { url, state: None }],
            index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Overwrites the current entry without creating a new one.
    pub fn replace_state(&mut self, state: Option<Value>, url: Url) {
        self.entries[self.index] = HistoryEntry { url, state };
    }

    /// Adds an entry after the current one, dropping any forward entries,
    /// and makes it current.
    pub fn push_state(&mut self, state: Option<Value>, url: Url) {
        self.entries.truncate(self.index + 1);
        self.entries.push(HistoryEntry { url, state });
        self.index = self.entries.len() - 1;
    }

    /// Moves to the previous entry. Returns `None` at the first entry.
    pub fn back(&mut self) -> Option<&HistoryEntry> {
        self.index = self.index.checked_sub(1)?;
        Some(&self.entries[self.index])
    }
}

/// A loaded search page.
#[derive(Debug, Clone)]
pub struct Page {
    body: Element,
    location: Url,
    history: History,
}

impl Page {
    /// Loads the standard search page markup at `url`.
    pub fn new(url: Url) -> Self {
        let body = Element::new("body")
            .with_child(
                Element::new("input")
                    .with_attribute("id", SEARCH_INPUT_ID)
                    .with_attribute("type", "text")
                    .with_attribute("value", ""),
            )
            .with_child(Element::new("div").with_attribute("id", RESULTS_ID));
        Self {
            body,
            history: History::new(url.clone()),
            location: url,
        }
    }

    /// Loads a page with caller-supplied markup.
    ///
    /// Fails unless `body` contains both the `#search` input and the
    /// `#results` container.
    pub fn with_body(url: Url, body: Element) -> Result<Self> {
        if body.find_by_id(SEARCH_INPUT_ID).is_none() {
            bail!("page markup has no #{} element", SEARCH_INPUT_ID);
        }
        if body.find_by_id(RESULTS_ID).is_none() {
            bail!("page markup has no #{} element", RESULTS_ID);
        }
        Ok(Self {
            body,
            history: History::new(url.clone()),
            location: url,
        })
    }

    /// Parses `url` and loads the standard page there.
    pub fn open(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid page URL: {}", url))?;
        Ok(Self::new(url))
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Element {
        &mut self.body
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn results(&self) -> Option<&Element> {
        self.body.find_by_id(RESULTS_ID)
    }

    /// Current value of the `#search` input (empty if unset).
    pub fn search_value(&self) -> String {
        self.body
            .find_by_id(SEARCH_INPUT_ID)
            .and_then(|input| input.attribute("value"))
            .unwrap_or_default()
            .to_string()
    }

    pub fn set_search_value(&mut self, term: &str) {
        if let Some(input) = self.body.find_by_id_mut(SEARCH_INPUT_ID) {
            input.set_attribute("value", term);
        }
    }

    /// The `search` parameter of the current URL, if present.
    pub fn url_search_term(&self) -> Option<String> {
        self.location
            .query_pairs()
            .find(|(key, _)| key == SEARCH_PARAM)
            .map(|(_, value)| value.into_owned())
    }

    /// Same-document navigation to `url`: pushes a history entry and moves
    /// the location there.
    pub fn push_url(&mut self, url: Url) {
        self.history.push_state(None, url.clone());
        self.location = url;
    }

    /// Steps back one history entry and moves the location to it. Returns
    /// `false` when already at the first entry.
    pub fn back(&mut self) -> bool {
        match self.history.back() {
            Some(entry) => {
                self.location = entry.url.clone();
                true
            }
            None => false,
        }
    }

    /// Rewrites the query string to `search=<term>` and replaces the current
    /// history entry with it. Never adds a history entry.
    pub fn replace_search_term(&mut self, term: &str) {
        let mut url = self.location.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair(SEARCH_PARAM, term);
        self.history
            .replace_state(Some(json!({ "search": term })), url.clone());
        self.location = url;
    }

    /// Swaps the `#results` container for `container`, returning the old one.
    pub fn replace_results(&mut self, container: Element) -> Result<Element> {
        self.body
            .replace_by_id(RESULTS_ID, container)
            .with_context(|| format!("page has no #{} container", RESULTS_ID))
    }

    pub fn to_html(&self) -> String {
        self.body.to_html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_has_required_elements() {
        let page = Page::open("http://localhost/whence/").unwrap();
        assert!(page.results().is_some());
        assert_eq!(page.search_value(), "");
        assert_eq!(page.history().len(), 1);
    }

    #[test]
    fn test_url_search_term_read() {
        let page = Page::open("http://localhost/whence/?search=cat%20dog").unwrap();
        assert_eq!(page.url_search_term().as_deref(), Some("cat dog"));

        let page = Page::open("http://localhost/whence/").unwrap();
        assert_eq!(page.url_search_term(), None);
    }

    #[test]
    fn test_replace_search_term_does_not_grow_history() {
        let mut page = Page::open("http://localhost/predict/?other=1").unwrap();
        page.replace_search_term("x");
        page.replace_search_term("y & z");

        assert_eq!(page.history().len(), 1);
        assert_eq!(page.url_search_term().as_deref(), Some("y & z"));
        assert_eq!(page.history().current().url, *page.location());
        assert_eq!(
            page.history().current().state,
            Some(json!({ "search": "y & z" }))
        );
        assert!(!page.location().as_str().contains("other"));
    }

    #[test]
    fn test_push_and_back() {
        let mut page = Page::open("http://localhost/whence/").unwrap();
        page.push_url(Url::parse("http://localhost/whence/?tab=2").unwrap());
        page.push_url(Url::parse("http://localhost/whence/?tab=3").unwrap());
        assert_eq!(page.history().len(), 3);
        assert_eq!(page.history().index(), 2);

        assert!(page.back());
        assert_eq!(page.location().as_str(), "http://localhost/whence/?tab=2");

        // Pushing from the middle drops the forward entry.
        page.push_url(Url::parse("http://localhost/whence/?tab=4").unwrap());
        assert_eq!(page.history().len(), 3);
        assert!(page.back());
        assert!(page.back());
        assert!(!page.back());
        assert_eq!(page.location().as_str(), "http://localhost/whence/");
    }

    #[test]
    fn test_search_after_push_replaces_pushed_entry() {
        let mut page = Page::open("http://localhost/whence/").unwrap();
        page.push_url(Url::parse("http://localhost/whence/?tab=2").unwrap());
        page.replace_search_term("cat");

        assert_eq!(page.history().len(), 2);
        assert_eq!(page.history().index(), 1);
        assert!(page
            .history()
            .entries()
            .iter()
            .all(|entry| !entry.url.as_str().contains("tab=2")));
        assert!(page.back());
        assert_eq!(page.location().as_str(), "http://localhost/whence/");
    }

    #[test]
    fn test_search_value_round_trip() {
        let mut page = Page::open("http://localhost/").unwrap();
        page.set_search_value("hello");
        assert_eq!(page.search_value(), "hello");
    }

    #[test]
    fn test_with_body_requires_ids() {
        let url = Url::parse("http://localhost/").unwrap();
        let body = Element::new("body").with_child(Element::new("div").with_attribute("id", "results"));
        let err = Page::with_body(url, body).unwrap_err();
        assert!(err.to_string().contains("#search"));
    }

    #[test]
    fn test_replace_results() {
        let mut page = Page::open("http://localhost/").unwrap();
        let fresh = Element::new("div")
            .with_attribute("id", RESULTS_ID)
            .with_child("done");
        page.replace_results(fresh).unwrap();
        assert_eq!(page.results().unwrap().text_content(), "done");
    }
}
