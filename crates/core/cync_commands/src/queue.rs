use tokio::sync::mpsc;

use crate::Command;

/// The process-wide FIFO of typed commands (§4.3). Enqueue never blocks;
/// [`run_worker`](crate::run_worker) drains it serially.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<Command>,
}

/// The receiving half, owned exclusively by the worker task.
pub struct CommandReceiver {
    pub(crate) rx: mpsc::UnboundedReceiver<Command>,
}

impl CommandQueue {
    pub fn new() -> (CommandQueue, CommandReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CommandQueue { tx }, CommandReceiver { rx })
    }

    /// Enqueue a command. Non-blocking; only fails if the worker has
    /// shut down.
    pub fn enqueue(&self, command: Command) -> Result<(), Command> {
        self.tx.send(command).map_err(|e| e.0)
    }
}
