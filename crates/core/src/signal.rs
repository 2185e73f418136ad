use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::error::{Result, VidsumError};

/// Cooperative stop request, checked between per-chunk steps.
///
/// Once raised it stays raised, so one Ctrl-C abandons the current video and
/// every video after it.
pub struct StopSignal {
    rx: Option<broadcast::Receiver<()>>,
    raised: bool,
}

impl StopSignal {
    pub fn new(rx: broadcast::Receiver<()>) -> Self {
        Self {
            rx: Some(rx),
            raised: false,
        }
    }

    pub fn never() -> Self {
        Self {
            rx: None,
            raised: false,
        }
    }

    pub fn is_raised(&mut self) -> bool {
        if !self.raised
            && let Some(rx) = self.rx.as_mut()
        {
            match rx.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => self.raised = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => {}
            }
        }
        self.raised
    }

    /// Resolves once the signal is raised; never resolves for [`StopSignal::never`]
    /// or after every sender is gone. Used to abandon an in-flight remote call.
    pub async fn raised(&mut self) {
        if self.raised {
            return;
        }
        if let Some(rx) = self.rx.as_mut() {
            match rx.recv().await {
                Ok(()) | Err(RecvError::Lagged(_)) => {
                    self.raised = true;
                    return;
                }
                Err(RecvError::Closed) => {}
            }
        }
        std::future::pending::<()>().await
    }

    /// Run `call` unless the signal is raised first.
    pub async fn guard<T>(&mut self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            result = call => result,
            () = self.raised() => Err(VidsumError::Cancelled),
        }
    }

    pub fn check(&mut self) -> Result<()> {
        if self.is_raised() {
            Err(VidsumError::Cancelled)
        } else {
            Ok(())
        }
    }
}
