use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};

/// One-shot signal resolved when no section is outstanding.
#[derive(Debug)]
pub struct RenderWait {
    rx: Receiver<()>,
    ready: bool,
}

impl RenderWait {
    pub(crate) fn pair() -> (Sender<()>, RenderWait) {
        let (tx, rx) = bounded(1);
        (tx, RenderWait { rx, ready: false })
    }

    pub(crate) fn resolved() -> RenderWait {
        let (tx, wait) = Self::pair();
        let _ = tx.send(());
        wait
    }

    pub fn is_ready(&mut self) -> bool {
        if !self.ready {
            self.ready = match self.rx.try_recv() {
                Ok(()) => true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
            };
        }
        self.ready
    }

    /// Blocks up to `timeout`; the coordinator must be ticked from another thread meanwhile.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        if !self.ready {
            self.ready = match self.rx.recv_timeout(timeout) {
                Ok(()) => true,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
            };
        }
        self.ready
    }
}
