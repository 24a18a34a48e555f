use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    data::TokenId,
    error::ServeError,
    stream::{FinishReason, RequestStreamOutput},
};

/// Creates a FIFO channel for stream events shared by many requests.
pub fn output_channel(capacity: usize) -> (OutputSender, OutputReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sender = OutputSender {
        tx,
        live: Arc::new(Mutex::new(HashSet::new())),
    };
    (sender, OutputReceiver { rx })
}

/// Producer side. Hands out at most one [`RequestEmitter`] per live request id.
#[derive(Clone)]
pub struct OutputSender {
    tx: mpsc::Sender<RequestStreamOutput>,
    live: Arc<Mutex<HashSet<String>>>,
}

impl OutputSender {
    pub fn emitter(&self, request_id: impl Into<String>) -> Result<RequestEmitter, ServeError> {
        let request_id = request_id.into();
        if !self.live.lock().insert(request_id.clone()) {
            return Err(ServeError::InvalidArgument(format!(
                "request '{request_id}' already has an active emitter"
            )));
        }
        Ok(RequestEmitter {
            request_id,
            tx: self.tx.clone(),
            live: self.live.clone(),
            finished: false,
        })
    }

    pub fn active_emitters(&self) -> usize {
        self.live.lock().len()
    }
}

/// Sole writer of events for one request.
///
/// Not `Clone`: per-request ordering holds because only this handle sends
/// for its id, and [`RequestEmitter::finish`] consumes it.
pub struct RequestEmitter {
    request_id: String,
    tx: mpsc::Sender<RequestStreamOutput>,
    live: Arc<Mutex<HashSet<String>>>,
    finished: bool,
}

impl RequestEmitter {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub async fn send_delta(&mut self, delta_tokens: Vec<TokenId>) -> Result<(), ServeError> {
        self.send(RequestStreamOutput::new(
            self.request_id.clone(),
            delta_tokens,
            None,
        ))
        .await
    }

    pub async fn finish(
        mut self,
        delta_tokens: Vec<TokenId>,
        finish_reason: FinishReason,
    ) -> Result<(), ServeError> {
        self.finished = true;
        self.send(RequestStreamOutput::new(
            self.request_id.clone(),
            delta_tokens,
            Some(finish_reason),
        ))
        .await
    }

    async fn send(&self, output: RequestStreamOutput) -> Result<(), ServeError> {
        self.tx
            .send(output)
            .await
            .map_err(|_| ServeError::StreamClosed(self.request_id.clone()))
    }
}

impl Drop for RequestEmitter {
    fn drop(&mut self) {
        self.live.lock().remove(&self.request_id);
        if !self.finished {
            debug!(request_id = %self.request_id, "emitter dropped before a terminal event");
        }
    }
}

pub struct OutputReceiver {
    rx: mpsc::Receiver<RequestStreamOutput>,
}

impl OutputReceiver {
    /// Next event in production order; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<RequestStreamOutput> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_emitter_per_live_id() {
        let (sender, _receiver) = output_channel(4);
        let first = sender.emitter("r1").unwrap();
        assert!(matches!(
            sender.emitter("r1"),
            Err(ServeError::InvalidArgument(_))
        ));
        assert_eq!(sender.active_emitters(), 1);

        drop(first);
        assert_eq!(sender.active_emitters(), 0);
        assert!(sender.emitter("r1").is_ok());
    }

    #[tokio::test]
    async fn finish_releases_the_id_and_marks_the_event() {
        let (sender, mut receiver) = output_channel(4);
        let mut emitter = sender.emitter("r1").unwrap();
        emitter.send_delta(vec![1, 2]).await.unwrap();
        emitter.finish(vec![3], FinishReason::Length).await.unwrap();
        assert_eq!(sender.active_emitters(), 0);

        let first = receiver.recv().await.unwrap();
        let last = receiver.recv().await.unwrap();
        assert_eq!(first.delta_tokens(), &[1, 2]);
        assert!(!first.is_finished());
        assert_eq!(last.finish_reason(), Some(FinishReason::Length));
    }

    #[tokio::test]
    async fn closed_receiver_surfaces_as_stream_closed() {
        let (sender, receiver) = output_channel(1);
        drop(receiver);
        let mut emitter = sender.emitter("r1").unwrap();
        let err = emitter.send_delta(vec![1]).await.unwrap_err();
        assert!(matches!(err, ServeError::StreamClosed(id) if id == "r1"));
    }
}
