use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::error::Error;

/// Keeps the first errors reported during a run, up to its capacity.
///
/// Reporting never waits: once the queue is full further errors are dropped,
/// so a task that fails while the pool is shutting down cannot stall it.
#[derive(Debug)]
pub struct ErrorsQueue {
    sender:   mpsc::Sender<Error>,
    receiver: Mutex<mpsc::Receiver<Error>>,
}

impl ErrorsQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Returns whether the error was kept.
    pub fn add_error(&self, error: Error) -> bool {
        match self.sender.try_send(error) {
            Ok(()) => true,
            Err(dropped) => {
                tracing::debug!(error = %dropped.into_inner(), "errors queue full, dropping error");
                false
            }
        }
    }

    /// Oldest kept error, if any.
    pub fn get_error(&self) -> Option<Error> {
        let mut receiver = self.receiver.lock().ok()?;
        receiver.try_recv().ok()
    }
}

impl Default for ErrorsQueue {
    fn default() -> Self { Self::new(1) }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_empty_queue() {
        assert!(ErrorsQueue::default().get_error().is_none());
    }

    #[test]
    fn test_first_error_wins() {
        let queue = ErrorsQueue::new(1);
        assert!(queue.add_error(Error::MissingPath("first".into())));
        assert!(!queue.add_error(Error::MissingPath("second".into())));

        let kept = queue.get_error().unwrap();
        assert!(kept.to_string().contains("first"));
        assert!(queue.get_error().is_none());
    }

    #[test]
    fn test_many_reporters_never_block() {
        let queue = Arc::new(ErrorsQueue::new(2));
        let reporters: Vec<_> = (0..16)
            .map(|i| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || queue.add_error(Error::MissingPath(format!("e{i}").into())))
            })
            .collect();
        let kept = reporters
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|kept| *kept)
            .count();

        assert_eq!(kept, 2);
        assert!(queue.get_error().is_some());
        assert!(queue.get_error().is_some());
        assert!(queue.get_error().is_none());
    }
}
