use facerec_core::{embed_single, Embedding, ExtractError, Extractor};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    /// Embed every face in the image.
    Embed {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<Vec<Embedding>, EngineError>>,
    },
    /// Embed an image that must contain exactly one face.
    EmbedSingle {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<Embedding, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// One embedding per detected face, in detection order.
    pub async fn embed(&self, image: Vec<u8>) -> Result<Vec<Embedding>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Embed {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// The embedding of the only face in the image.
    pub async fn embed_single(&self, image: Vec<u8>) -> Result<Embedding, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::EmbedSingle {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Move the extractor onto a dedicated OS thread and return a handle to it.
///
/// Inference sessions need exclusive access, so requests are served one at
/// a time in arrival order. The thread exits once every handle is dropped.
pub fn spawn_engine<E: Extractor + 'static>(mut extractor: E) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("facerec-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Embed { image, reply } => {
                        let result = extractor.embed(&image).map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                    EngineRequest::EmbedSingle { image, reply } => {
                        let result = embed_single(&mut extractor, &image).map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}
