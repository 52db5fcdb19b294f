//! Individual steps that run before the transaction.
//!
//! Each collaborator sits behind a trait so the orchestrator can run against
//! fakes: [`check::ReleaseLocator`], [`download::Fetcher`] and
//! [`extract::Extractor`].

pub mod check;
pub mod download;
pub mod extract;
pub mod verify;
