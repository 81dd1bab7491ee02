//! # corpus-forge
//!
//! Flattens heterogeneous sources into one tagged text corpus for LLM
//! retrieval pipelines.
//!
//! A single input locator (URL, DOI/PMID or local path) is classified, the
//! matching assembler produces one interchange document wrapped in a
//! `<source type="...">` envelope, and the normalizer writes a lossy,
//! compressed copy of it next to the original.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────┐   ┌───────────┐   ┌───────────┐
//! │ Locator  │──▶│     Assemblers      │──▶│ Normalize │──▶│ Artifacts │
//! │ classify │   │ repo/PR/issue/paper │   │ + tokens  │   │ raw/comp. │
//! └──────────┘   │ transcript/local    │   └───────────┘   └───────────┘
//!                └─────────┬──────────┘
//!                          ▼
//!                 ┌─────────────────┐
//!                 │  RemoteClient   │
//!                 │ (HTTP / memory) │
//!                 └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cforge https://github.com/o/r                 # repository snapshot
//! cforge https://github.com/o/r/pull/42 --urls  # PR + URL list
//! cforge ./docs --out-dir ./corpus              # local directory
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`error`] | Library error type |
//! | [`models`] | Domain values and GitHub payload shapes |
//! | [`filetype`] | Extension allow-list and notebook export |
//! | [`markup`] | Markup escaping |
//! | [`envelope`] | `<source>` envelopes and the document builder |
//! | [`fetch`] | Remote-call seam, HTTP and in-memory clients |
//! | [`repository`] | Remote repository walker |
//! | [`pull_request`] | Pull request assembler |
//! | [`issue`] | Issue assembler |
//! | [`local_folder`] | Local directory serializer |
//! | [`paper`] | arXiv and Sci-Hub papers |
//! | [`transcript`] | YouTube transcripts |
//! | [`normalize`] | Text normalizer |
//! | [`tokens`] | Token and size report |
//! | [`links`] | URL list extraction |
//! | [`locator`] | Input classification |
//! | [`ingest`] | Run orchestration |

pub mod config;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod filetype;
pub mod ingest;
pub mod issue;
pub mod links;
pub mod local_folder;
pub mod locator;
pub mod markup;
pub mod models;
pub mod normalize;
pub mod paper;
pub mod pull_request;
pub mod repository;
pub mod tokens;
pub mod transcript;
