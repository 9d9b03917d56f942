//! # snerge-search
//!
//! A debounced search box and collapsible result views for the snerge
//! prediction (`POST predict`) and lexicon (`POST search`) endpoints.
//!
//! The crate models the search page headlessly: a [`page::Page`] holds the
//! document (with its `#search` input and `#results` container), the URL and
//! the session history; a [`controller::SearchController`] turns keystrokes
//! and commits into requests; a [`render::ResultRenderer`] turns responses
//! into nested `<details>` entries.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  keyup / change  ┌──────────────┐  POST term  ┌──────────┐
//! │ #search    │─────────────────▶│  Controller   │────────────▶│ Endpoint │
//! │ input      │                  │ (debounce)    │◀────────────│ (JSON)   │
//! └────────────┘                  └──────┬───────┘   response  └──────────┘
//!                                        │
//!                      ?search=term      │ render
//!                 ┌──────────────┐       ▼
//!                 │ URL/history  │◀── ┌──────────┐
//!                 └──────────────┘    │ #results │
//!                                     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snerge_search::config::Config;
//! use snerge_search::controller::SearchController;
//! use snerge_search::models::EndpointKind;
//! use snerge_search::page::Page;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::preset(EndpointKind::Search);
//! let page = Page::open("http://localhost:8080/whence/?search=cat")?;
//! let controller = SearchController::from_config(&config, page)?;
//! controller.initialize();
//! controller.wait_idle().await;
//! println!("{}", controller.with_page(|page| page.to_html()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Query and response types |
//! | [`dom`] | Element tree and HTML output |
//! | [`page`] | Host page, URL state, history |
//! | [`client`] | Search endpoint transport |
//! | [`render`] | Result rendering |
//! | [`controller`] | Debounced search controller |

pub mod client;
pub mod config;
pub mod controller;
pub mod dom;
pub mod models;
pub mod page;
pub mod render;
