//! Provider adapters translating normalized chat turns into native calls.
//!
//! Every provider sits behind the same `handle` contract so dispatch never
//! branches on provider internals, only on model identity and image
//! capability.

pub mod common;
pub mod gemini;
pub mod groq;
pub mod openrouter;
pub mod xai;

use crate::error::ProviderResult;
use crate::io_struct::{ImagePayload, Message};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ProviderHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Issue one remote call over the full normalized history and return the
    /// extracted completion text.
    async fn handle(
        &self,
        messages: &[Message],
        image: Option<&ImagePayload>,
    ) -> ProviderResult<String>;
}

pub type SharedProviderHandler = Arc<dyn ProviderHandler>;
