//! Result rendering.
//!
//! Turns a [`SearchResponse`] into collapsible `<details>` entries and swaps
//! them into the page's `#results` container. Every render builds a complete
//! new container and replaces the old one in a single step, so the page never
//! shows a partially updated list.
//!
//! # Views
//!
//! **Prediction** entries accumulate: each response is prepended to the
//! entries already on the page.
//!
//! ```text
//! <details open>
//!   <summary>{output.text}</summary>
//!   <p>{input.text} - <code>tok</code> <code>tok</code> </p>
//!   <p><code>tok</code> <code>tok</code> </p>
//! </details>
//! ```
//!
//! **Lexicon** entries replace whatever was shown before: one entry per
//! word, each holding one nested entry per reference.
//!
//! ```text
//! <details>
//!   <summary>{word} ({count})</summary>
//!   <details>
//!     <summary>{source} - {text}</summary>
//!     <code>tok</code> <code>tok</code>
//!   </details>
//! </details>
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dom::{Element, Node};
use crate::models::{Lexicon, Prediction, Reference, SearchResponse};
use crate::page::{Page, RESULTS_ID};

const OPEN: &str = "open";
const ERROR_CLASS: &str = "error";

/// Which top-level entries start expanded after a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpandPolicy {
    /// Only the first (newest) entry is open.
    NewestOnly,
    /// The entry is open only when it is the sole entry.
    SingleResult,
    /// Every entry is open.
    All,
}

impl ExpandPolicy {
    fn opens(self, index: usize, count: usize) -> bool {
        match self {
            ExpandPolicy::NewestOnly => index == 0,
            ExpandPolicy::SingleResult => count == 1,
            ExpandPolicy::All => true,
        }
    }
}

/// Renders token strings as `<code>` spans, each followed by a space.
pub fn token_spans(tokens: &[String]) -> Vec<Node> {
    tokens
        .iter()
        .flat_map(|token| {
            [
                Node::Element(Element::new("code").with_child(token.as_str())),
                Node::from(" "),
            ]
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ResultRenderer {
    policy: ExpandPolicy,
}

impl ResultRenderer {
    pub fn new(policy: ExpandPolicy) -> Self {
        Self { policy }
    }

    /// Renders a response into the page, replacing the `#results` container.
    pub fn render(&self, page: &mut Page, response: &SearchResponse) -> Result<()> {
        match response {
            SearchResponse::Prediction(prediction) => self.render_prediction(page, prediction),
            SearchResponse::Lexicon(lexicon) => self.render_lexicon(page, lexicon),
        }
    }

    pub fn render_prediction(&self, page: &mut Page, prediction: &Prediction) -> Result<()> {
        let previous = current_results(page)?;

        let mut entries = vec![prediction_entry(prediction)];
        entries.extend(
            previous
                .child_elements()
                .filter(|el| !is_error(el))
                .cloned(),
        );

        let container = self.assemble(previous, entries);
        page.replace_results(container)?;
        Ok(())
    }

    pub fn render_lexicon(&self, page: &mut Page, lexicon: &Lexicon) -> Result<()> {
        let previous = current_results(page)?;
        let entries = lexicon
            .entries
            .iter()
            .map(|entry| lexicon_entry(&entry.word, &entry.references))
            .collect();

        let container = self.assemble(previous, entries);
        page.replace_results(container)?;
        Ok(())
    }

    /// Shows `message` as the first child of `#results`, replacing any earlier
    /// error. The previous results stay visible underneath.
    pub fn render_error(&self, page: &mut Page, message: &str) -> Result<()> {
        let previous = current_results(page)?;

        let mut container = previous.shallow_clone();
        container.append_child(
            Element::new("p")
                .with_attribute("class", ERROR_CLASS)
                .with_attribute("role", "alert")
                .with_child(message),
        );
        for child in previous.children() {
            match child {
                Node::Element(el) if is_error(el) => {}
                other => container.append_child(other.clone()),
            }
        }

        page.replace_results(container)?;
        Ok(())
    }

    /// Builds a fresh container around `entries`, setting or clearing `open`
    /// on each one according to the policy.
    fn assemble(&self, previous: Element, entries: Vec<Element>) -> Element {
        let count = entries.len();
        let mut container = previous.shallow_clone();
        for (index, mut entry) in entries.into_iter().enumerate() {
            if self.policy.opens(index, count) {
                entry.set_attribute(OPEN, OPEN);
            } else {
                entry.remove_attribute(OPEN);
            }
            container.append_child(entry);
        }
        container
    }
}

fn current_results(page: &Page) -> Result<Element> {
    page.results()
        .cloned()
        .with_context(|| format!("page has no #{} container", RESULTS_ID))
}

fn is_error(element: &Element) -> bool {
    element.tag() == "p" && element.attribute("class") == Some(ERROR_CLASS)
}

fn prediction_entry(prediction: &Prediction) -> Element {
    Element::new("details")
        .with_child(Element::new("summary").with_child(prediction.output.text.as_str()))
        .with_child(
            Element::new("p")
                .with_child(prediction.input.text.as_str())
                .with_child(" - ")
                .with_children(token_spans(&prediction.input.tokens)),
        )
        .with_child(Element::new("p").with_children(token_spans(&prediction.output.tokens)))
}

fn lexicon_entry(word: &str, references: &[Reference]) -> Element {
    Element::new("details")
        .with_child(
            Element::new("summary").with_child(format!("{} ({})", word, references.len())),
        )
        .with_children(references.iter().map(reference_entry))
}

fn reference_entry(reference: &Reference) -> Element {
    Element::new("details")
        .with_child(
            Element::new("summary")
                .with_child(format!("{} - {}", reference.source, reference.text)),
        )
        .with_children(token_spans(&reference.tokens))
}
