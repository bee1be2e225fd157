//! # RAG-MCP Assistant
//!
//! A question-answering service that tries a local document index first and
//! escalates to an external web search when the local answer is not
//! confident enough, fusing both into one response.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────────┐
//!   query ──────▶ │  QueryController   │ ─────▶ QueryResult
//!                 └─┬───────┬────────┬─┘
//!          confidence│       │fallback│fusion
//!                   ▼       ▼        ▼
//!            ┌──────────┐ ┌─────┐ ┌────────────┐
//!            │Retriever │ │ Web │ │Synthesizer │
//!            └────┬─────┘ └─────┘ └────────────┘
//!                 ▼
//!          ┌─────────────┐
//!          │ VectorIndex │◀── SQLite
//!          └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragmcp add ./docs                     # index local documents
//! ragmcp query "What is ownership?"     # ask a question
//! ragmcp serve                          # start the HTTP service
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Error enums for each component boundary |
//! | [`models`] | Core data types |
//! | [`documents`] | File discovery and text extraction |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory vector index |
//! | [`storage`] | Index persistence |
//! | [`retriever`] | Local retrieval and confidence scoring |
//! | [`web`] | Web search client |
//! | [`synthesis`] | Answer synthesis providers |
//! | [`controller`] | Routing between local and web answers |
//! | [`server`] | HTTP service |
//! | [`app`] | Component wiring from config |

pub mod app;
pub mod chunk;
pub mod config;
pub mod controller;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod retriever;
pub mod server;
pub mod storage;
pub mod synthesis;
pub mod web;
