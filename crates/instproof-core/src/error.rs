// crates/instproof-core/src/error.rs

//! Error taxonomy for proof construction.
//!
//! Every failure a caller can observe falls into one of four kinds. The
//! pipeline wraps the first failure in a [`RequestError`] that names the
//! request, so "not found" for one height is distinguishable from an
//! internal inconsistency without string matching.

use crate::types::Hash;
use std::fmt;

/// Boxed upstream cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`ProofError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requested data does not exist (no such block, no matching instruction).
    NotFound,
    /// Caller supplied a malformed or unsupported request.
    InvalidInput,
    /// Chain data contradicts itself (root mismatch, signature count mismatch).
    Inconsistency,
    /// A collaborator (store, consensus, replay) failed.
    Upstream,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::InvalidInput => "invalid input",
            Self::Inconsistency => "inconsistency",
            Self::Upstream => "upstream",
        })
    }
}

/// A single proof-construction failure.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// See [`ErrorKind::NotFound`].
    #[error("not found: {0}")]
    NotFound(String),
    /// See [`ErrorKind::InvalidInput`].
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// See [`ErrorKind::Inconsistency`].
    #[error("inconsistent chain data: {0}")]
    Inconsistency(String),
    /// See [`ErrorKind::Upstream`].
    #[error("{op} failed: {source}")]
    Upstream {
        /// Collaborator operation that failed.
        op: &'static str,
        /// Cause reported by the collaborator.
        #[source]
        source: BoxError,
    },
}

impl ProofError {
    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Inconsistency(_) => ErrorKind::Inconsistency,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }

    /// Wrap a collaborator failure.
    #[must_use]
    pub fn upstream(op: &'static str, err: anyhow::Error) -> Self {
        Self::Upstream {
            op,
            source: err.into(),
        }
    }

    /// Shorthand for [`ProofError::NotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Shorthand for [`ProofError::InvalidInput`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Shorthand for [`ProofError::Inconsistency`].
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::Inconsistency(msg.into())
    }
}

/// Identifies the request a failure belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    /// Registered proof type name.
    pub proof_type: String,
    /// Requested block height; `None` when it is looked up by tx id.
    pub height: Option<u64>,
    /// Transaction id, when the proof type selects by id.
    pub tx_id: Option<Hash>,
    /// Whether the request targeted the beacon chain only.
    pub on_beacon_only: bool,
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.height {
            Some(height) => {
                let chain = if self.on_beacon_only { "beacon" } else { "bridge" };
                write!(f, "{} proof at {chain} height {height}", self.proof_type)?;
            }
            None => write!(f, "{} proof at indexed height", self.proof_type)?,
        }
        if let Some(id) = &self.tx_id {
            write!(f, " for tx {id}")?;
        }
        Ok(())
    }
}

/// First failure of a request, annotated with the request.
#[derive(Debug, thiserror::Error)]
#[error("{request}: {source}")]
pub struct RequestError {
    /// The failing request.
    pub request: RequestContext,
    /// What went wrong.
    #[source]
    pub source: ProofError,
}

impl RequestError {
    /// Classification of the underlying error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_cause_chain() {
        let cause = anyhow::anyhow!("disk gone").context("reading block 9");
        let err = ProofError::upstream("shard_blocks_by_height", cause);
        assert_eq!(err.kind(), ErrorKind::Upstream);
        let msg = err.to_string();
        assert!(msg.starts_with("shard_blocks_by_height failed"), "{msg}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn request_error_names_the_request() {
        let err = RequestError {
            request: RequestContext {
                proof_type: "burn".into(),
                height: Some(42),
                tx_id: Some(Hash::ZERO),
                on_beacon_only: false,
            },
            source: ProofError::not_found("no matching instruction"),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let msg = err.to_string();
        assert!(msg.starts_with("burn proof at bridge height 42 for tx 0000"), "{msg}");
        assert!(msg.ends_with("not found: no matching instruction"), "{msg}");
    }

    #[test]
    fn indexed_request_names_the_tx() {
        let ctx = RequestContext {
            proof_type: "burn-v2".into(),
            height: None,
            tx_id: Some(Hash([0x11; 32])),
            on_beacon_only: false,
        };
        assert_eq!(
            ctx.to_string(),
            format!("burn-v2 proof at indexed height for tx {}", "11".repeat(32))
        );
    }
}
