//! Core data models used throughout snerge-search.
//!
//! These types represent the query typed into the search box and the two
//! response shapes returned by the external endpoint: the prediction shape
//! (`POST predict`) and the lexicon shape (`POST search`).

use anyhow::{Context, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-empty search term.
///
/// The empty string means "no active search" and never becomes a `Query`,
/// so holding one is proof that a request may be issued. The term is kept
/// exactly as typed; no trimming or normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Returns `None` for the empty string.
    pub fn new(term: impl Into<String>) -> Option<Self> {
        let term = term.into();
        if term.is_empty() {
            None
        } else {
            Some(Self(term))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which endpoint a page talks to, and therefore which response shape it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// `POST predict`, answered with a [`Prediction`].
    Predict,
    /// `POST search`, answered with a [`Lexicon`].
    Search,
}

impl EndpointKind {
    /// Path of the endpoint, relative to the page (or configured base) URL.
    pub fn path(self) -> &'static str {
        match self {
            EndpointKind::Predict => "predict",
            EndpointKind::Search => "search",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Text together with the tokens the server recognised in it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Annotated {
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// Prediction shape: the submitted input and the generated output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Prediction {
    pub input: Annotated,
    pub output: Annotated,
}

/// One place a word was seen: a source label, the original text, and its tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reference {
    pub source: String,
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// A word and every reference to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    pub word: String,
    pub references: Vec<Reference>,
}

/// Lexicon shape: a JSON object mapping each word to its references.
///
/// Entries keep the key order of the JSON object, which is the order the
/// words appeared in the query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Lexicon {
    pub entries: Vec<LexiconEntry>,
}

impl<'de> Deserialize<'de> for Lexicon {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LexiconVisitor;

        impl<'de> Visitor<'de> for LexiconVisitor {
            type Value = Lexicon;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping words to lists of references")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Lexicon, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<LexiconEntry> = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((word, references)) = map.next_entry::<String, Vec<Reference>>()? {
                    // A repeated word keeps its first position and its last value.
                    match entries.iter_mut().find(|entry| entry.word == word) {
                        Some(existing) => existing.references = references,
                        None => entries.push(LexiconEntry { word, references }),
                    }
                }
                Ok(Lexicon { entries })
            }
        }

        deserializer.deserialize_map(LexiconVisitor)
    }
}

/// A decoded response from the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResponse {
    Prediction(Prediction),
    Lexicon(Lexicon),
}

impl SearchResponse {
    /// Decode a response body according to the endpoint that produced it.
    pub fn parse(kind: EndpointKind, body: &[u8]) -> Result<Self> {
        match kind {
            EndpointKind::Predict => serde_json::from_slice(body)
                .map(SearchResponse::Prediction)
                .context("Invalid prediction response"),
            EndpointKind::Search => serde_json::from_slice(body)
                .map(SearchResponse::Lexicon)
                .context("Invalid lexicon response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_rejects_empty() {
        assert!(Query::new("").is_none());
    }

    #[test]
    fn test_query_keeps_whitespace() {
        let query = Query::new("  cat ").unwrap();
        assert_eq!(query.as_str(), "  cat ");
    }

    #[test]
    fn test_parse_prediction() {
        let body = br#"{"input":{"text":"a","tokens":["a"]},"output":{"text":"b","tokens":["b"]}}"#;
        let response = SearchResponse::parse(EndpointKind::Predict, body).unwrap();
        match response {
            SearchResponse::Prediction(p) => {
                assert_eq!(p.input.text, "a");
                assert_eq!(p.output.tokens, vec!["b".to_string()]);
            }
            other => panic!("expected prediction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_lexicon_preserves_key_order() {
        let body = br#"{
            "zebra": [],
            "apple": [{"source": "S", "text": "T", "tokens": ["t1", "t2"]}],
            "mango": []
        }"#;
        let response = SearchResponse::parse(EndpointKind::Search, body).unwrap();
        let SearchResponse::Lexicon(lexicon) = response else {
            panic!("expected lexicon");
        };
        let words: Vec<&str> = lexicon.entries.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["zebra", "apple", "mango"]);
        assert_eq!(lexicon.entries[1].references[0].tokens, vec!["t1", "t2"]);
    }

    #[test]
    fn test_parse_lexicon_repeated_word_keeps_last_value() {
        let body = br#"{
            "cat": [],
            "dog": [],
            "cat": [{"source": "S", "text": "T", "tokens": ["cat"]}]
        }"#;
        let SearchResponse::Lexicon(lexicon) = SearchResponse::parse(EndpointKind::Search, body).unwrap()
        else {
            panic!("expected lexicon");
        };
        let words: Vec<&str> = lexicon.entries.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["cat", "dog"]);
        assert_eq!(lexicon.entries[0].references.len(), 1);
    }

    #[test]
    fn test_parse_empty_lexicon() {
        let response = SearchResponse::parse(EndpointKind::Search, b"{}").unwrap();
        assert_eq!(response, SearchResponse::Lexicon(Lexicon::default()));
    }

    #[test]
    fn test_parse_wrong_shape_fails() {
        let err = SearchResponse::parse(EndpointKind::Predict, br#"{"cat": []}"#).unwrap_err();
        assert!(err.to_string().contains("prediction"));
    }

    #[test]
    fn test_parse_malformed_json_fails() {
        assert!(SearchResponse::parse(EndpointKind::Search, b"{not json").is_err());
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(EndpointKind::Predict.path(), "predict");
        assert_eq!(EndpointKind::Search.path(), "search");
    }
}
