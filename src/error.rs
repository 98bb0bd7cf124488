use crate::host::NodeKey;
use thiserror::Error;

/// Failures surfaced by [`Renderer`](`crate::Renderer`) and [`Reconciler`](`crate::diff::Reconciler`).
///
/// Host failures are never retried or swallowed by the differ itself.
/// Broken tree invariants are bugs and panic instead of showing up here.
#[derive(Debug, Error)]
pub enum Error {
	#[error("no window or document is available")]
	NoDocument,

	#[error("no element with id {0:?} was found to mount into")]
	ContainerNotFound(String),

	#[error("host operation `{operation}` failed: {message}")]
	Host { operation: &'static str, message: String },

	#[error("unknown or already released DOM handle {0:?}")]
	UnknownNode(NodeKey),

	#[error("depth limit reached while patching")]
	DepthLimit,
}

impl Error {
	pub(crate) fn host(operation: &'static str, message: impl Into<String>) -> Self {
		Self::Host {
			operation,
			message: message.into(),
		}
	}
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
