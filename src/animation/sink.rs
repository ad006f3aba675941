use async_trait::async_trait;
use tokio::sync::mpsc;

use super::RenderInstruction;
use crate::error::{PipelineError, Result};

/// Receives the frames of a running animation, one per tick.
#[async_trait]
pub trait FrameSink: Send {
    async fn render(&mut self, frame: RenderInstruction) -> Result<()>;
}

#[async_trait]
impl FrameSink for mpsc::Sender<RenderInstruction> {
    async fn render(&mut self, frame: RenderInstruction) -> Result<()> {
        self.send(frame).await.map_err(|_| PipelineError::SinkClosed)
    }
}
