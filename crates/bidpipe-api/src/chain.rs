//! Chain-of-responsibility execution over one request.

use crate::controller::InterceptorController;
use crate::error::InterceptorError;
use crate::message::{UserRequest, UserResponse};
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// The execution state of one request traversing the controller's
/// interceptors.
///
/// Single use: created by [`InterceptorController::on_request`] for one
/// request/response pair and discarded when the traversal finishes.
/// Execution is nested, not sequential — each interceptor's `execute`
/// frame stays on the stack while everything downstream of it runs inside
/// its [`InterceptorChain::proceed`] call, so an interceptor regains
/// control (and can post-process the response) after all later
/// interceptors complete.
pub struct InterceptorChain<'a, Req, Resp>
where
    Req: UserRequest + 'static,
    Resp: UserResponse + 'static,
{
    controller: &'a InterceptorController<Req, Resp>,
    request: &'a Req,
    response: &'a mut Resp,
    cursor: usize,
}

impl<'a, Req, Resp> InterceptorChain<'a, Req, Resp>
where
    Req: UserRequest + 'static,
    Resp: UserResponse + 'static,
{
    pub(crate) fn new(
        controller: &'a InterceptorController<Req, Resp>,
        request: &'a Req,
        response: &'a mut Resp,
    ) -> Self {
        Self {
            controller,
            request,
            response,
            cursor: 0,
        }
    }

    /// The request being processed.
    #[must_use]
    pub fn request(&self) -> &Req {
        self.request
    }

    /// The response being assembled.
    pub fn response(&mut self) -> &mut Resp {
        self.response
    }

    /// Number of interceptors not yet entered.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.controller.interceptors().len() - self.cursor
    }

    /// Advances to the next interceptor and runs it, returning once it (and
    /// everything it proceeded into) has finished.
    ///
    /// Past the last interceptor this is a no-op returning `Ok(())`, so the
    /// final interceptor can call `proceed` unconditionally. Each
    /// invocation is timed inclusively (the frame's histogram sample covers
    /// all nested downstream work) and unattributed faults are stamped with
    /// the name of the interceptor that raised them.
    ///
    /// An interceptor must call this at most once per execution.
    pub fn proceed(&mut self) -> Result<(), InterceptorError> {
        let index = self.cursor;
        let Some(interceptor) = self.controller.interceptors().get(index).map(Arc::clone) else {
            return Ok(());
        };
        self.cursor += 1;

        trace!(interceptor = interceptor.name(), position = index, "entering interceptor");
        let started = Instant::now();
        let result = interceptor.execute(self);
        self.controller.timer_at(index).record(started.elapsed());

        result.map_err(|error| error.attributed_to(interceptor.name()))
    }
}
