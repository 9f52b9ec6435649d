use tokio_util::sync::CancellationToken;

/// A token issued for every workload registered with
/// [`AgentSpindown`](crate::AgentSpindown).
///
/// The owning workload [punches out](SpindownToken::punch_out) the token to
/// signal that it has finished its cleanup. Dropping the token punches it out
/// implicitly, so a workload that simply returns is also accounted for.
pub struct SpindownToken {
    token: CancellationToken,
}

impl SpindownToken {
    /// Internal constructor.
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Signals that the workload associated with this token has completed its
    /// spindown procedure, whatever it might be.
    pub fn punch_out(&self) {
        self.token.cancel();
    }
}

impl Drop for SpindownToken {
    fn drop(&mut self) {
        self.punch_out();
    }
}
