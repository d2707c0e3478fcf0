//! Error taxonomy for the interceptor engine.
//!
//! The engine distinguishes four kinds of failure, and one non-failure:
//!
//! - [`InterceptorError::Abort`] — control flow only. "Stop the pipeline
//!   now, return the response as accumulated." Never logged as an error,
//!   never surfaced to the transport layer as a failure.
//! - [`InterceptorError::Fault`] — a bug or unexpected input in bidding
//!   logic. Propagates out of request handling so the transport layer can
//!   answer with a failure status and upstream load balancing routes
//!   traffic away from an unhealthy bidder.
//! - [`ControllerError::StartupFailed`] — fatal; the server must refuse to
//!   begin serving.
//! - [`StopError`] — shutdown hook failures, split into a recoverable class
//!   (logged and swallowed so remaining interceptors still clean up) and a
//!   fatal class (fails the whole shutdown).
//! - [`ControllerError::NotRunning`] — a state precondition fault, rejected
//!   before any interceptor runs.

use crate::controller::LifecycleState;
use thiserror::Error;

/// Outcome of one interceptor execution, other than plain success.
#[derive(Debug, Error)]
pub enum InterceptorError {
    /// Stop the remainder of the pipeline immediately.
    ///
    /// This is not an error: it means "no further action should be taken
    /// for this request" (e.g. "I decided not to bid, don't let anyone else
    /// bid either"). The controller swallows it and returns the response in
    /// whatever state it accumulated before the abort.
    #[error("chain aborted: {reason}")]
    Abort {
        /// Why the pipeline was stopped, for debug logging.
        reason: String,
    },

    /// A runtime fault in bidding logic.
    ///
    /// Not caught by the chain or controller; propagates out of request
    /// handling as a [`ControllerError::Execution`]. Must never be
    /// converted into an [`InterceptorError::Abort`].
    #[error("interceptor `{}` fault: {source}", .interceptor.unwrap_or("unattributed"))]
    Fault {
        /// Name of the interceptor the fault was raised in, filled in by
        /// the chain frame that invoked it.
        interceptor: Option<&'static str>,
        /// The underlying fault.
        #[source]
        source: anyhow::Error,
    },
}

impl InterceptorError {
    /// Creates an abort signal.
    #[must_use]
    pub fn abort(reason: impl Into<String>) -> Self {
        Self::Abort {
            reason: reason.into(),
        }
    }

    /// Creates an unattributed fault; the chain attributes it to the
    /// interceptor whose `execute` raised it.
    #[must_use]
    pub fn fault(source: impl Into<anyhow::Error>) -> Self {
        Self::Fault {
            interceptor: None,
            source: source.into(),
        }
    }

    /// Returns `true` for the abort signal.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort { .. })
    }

    /// Fills in the raising interceptor's name if not already attributed.
    #[must_use]
    pub(crate) fn attributed_to(self, name: &'static str) -> Self {
        match self {
            Self::Fault {
                interceptor: None,
                source,
            } => Self::Fault {
                interceptor: Some(name),
                source,
            },
            other => other,
        }
    }
}

impl From<anyhow::Error> for InterceptorError {
    fn from(source: anyhow::Error) -> Self {
        Self::fault(source)
    }
}

/// Failure of an interceptor's pre-destroy hook.
#[derive(Debug, Error)]
pub enum StopError {
    /// An ordinary fault: logged, and the remaining interceptors' hooks
    /// still run. Does not fail the overall shutdown.
    #[error("recoverable shutdown fault: {0}")]
    Recoverable(#[source] anyhow::Error),

    /// An unrecoverable fault (resource corruption, allocation failure):
    /// aborts the remaining hooks and fails the whole shutdown.
    #[error("fatal shutdown fault: {0}")]
    Fatal(#[source] anyhow::Error),
}

impl StopError {
    /// Creates a recoverable shutdown fault.
    #[must_use]
    pub fn recoverable(source: impl Into<anyhow::Error>) -> Self {
        Self::Recoverable(source.into())
    }

    /// Creates a fatal shutdown fault.
    #[must_use]
    pub fn fatal(source: impl Into<anyhow::Error>) -> Self {
        Self::Fatal(source.into())
    }
}

/// Errors surfaced by the [`crate::InterceptorController`].
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A request arrived while the controller was not running. Rejected
    /// before any interceptor executes.
    #[error("controller is not running (state: {0})")]
    NotRunning(LifecycleState),

    /// `start` called from a state other than `New`.
    #[error("controller cannot start from state {0}")]
    CannotStart(LifecycleState),

    /// `stop` called from a state other than `Running`.
    #[error("controller cannot stop from state {0}")]
    CannotStop(LifecycleState),

    /// A post-construct hook failed; the controller is now `Failed` and
    /// will never serve.
    #[error("startup failed in interceptor `{interceptor}`: {source}")]
    StartupFailed {
        /// The interceptor whose hook failed.
        interceptor: &'static str,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// A pre-destroy hook failed fatally; the controller is now `Failed`.
    #[error("shutdown failed in interceptor `{interceptor}`: {source}")]
    ShutdownFailed {
        /// The interceptor whose hook failed.
        interceptor: &'static str,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// An interceptor raised a runtime fault during request processing.
    #[error("interceptor `{}` failed: {source}", .interceptor.unwrap_or("unattributed"))]
    Execution {
        /// The interceptor the fault was attributed to.
        interceptor: Option<&'static str>,
        /// The underlying fault.
        #[source]
        source: anyhow::Error,
    },
}

/// Errors over the bid message model's dual representation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The request has no canonical (OpenRTB) form — the exchange adapter
    /// did not map it. Accessing it is a state error, not a crash.
    #[error("OpenRTB request is not available")]
    OpenRtbUnavailable,

    /// The response already chose its native representation; the canonical
    /// builder can no longer be used.
    #[error("response already holds a native payload; OpenRTB form is unavailable")]
    PayloadIsNative,

    /// The response already chose its canonical representation; a native
    /// payload can no longer be installed.
    #[error("response already holds an OpenRTB payload; native form is unavailable")]
    PayloadIsOpenRtb,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_is_not_a_fault() {
        let abort = InterceptorError::abort("no bid");
        assert!(abort.is_abort());
        assert!(!InterceptorError::fault(anyhow::anyhow!("boom")).is_abort());
        assert_eq!(abort.to_string(), "chain aborted: no bid");
    }

    #[test]
    fn test_fault_attribution_fills_once() {
        let fault = InterceptorError::fault(anyhow::anyhow!("boom"))
            .attributed_to("inner")
            .attributed_to("outer");
        match fault {
            InterceptorError::Fault { interceptor, .. } => {
                assert_eq!(interceptor, Some("inner"));
            }
            InterceptorError::Abort { .. } => panic!("expected fault"),
        }
    }

    #[test]
    fn test_abort_attribution_is_a_no_op() {
        let abort = InterceptorError::abort("done").attributed_to("a");
        assert!(abort.is_abort());
    }

    #[test]
    fn test_anyhow_converts_to_unattributed_fault() {
        let error: InterceptorError = anyhow::anyhow!("boom").into();
        assert!(error.to_string().contains("unattributed"));
    }
}
