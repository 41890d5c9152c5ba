use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, FetchStage};

/// Caller-owned cancellation and deadline for a fetch.
///
/// Cloning shares the underlying token, so cancelling any clone cancels them
/// all. No deadline is applied unless the caller sets one.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl FetchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A context cancelled with this one but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn check(&self, stage: FetchStage) -> Result<(), FetchError> {
        if self.token.is_cancelled() {
            return Err(FetchError::Cancelled { stage });
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(FetchError::DeadlineExceeded { stage });
        }
        Ok(())
    }

    /// Drives `fut` until it completes, the token fires or the deadline
    /// passes. On abort `fut` is dropped before returning.
    pub(crate) async fn run<F>(&self, stage: FetchStage, fut: F) -> Result<F::Output, FetchError>
    where
        F: Future,
    {
        self.check(stage)?;

        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FetchError::Cancelled { stage }),
            _ = expiry => Err(FetchError::DeadlineExceeded { stage }),
            output = fut => Ok(output),
        }
    }
}
