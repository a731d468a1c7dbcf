//! Completion Provider Abstraction
//!
//! One trait seam between the dispatch loop and the network. The real
//! backend speaks an OpenAI-compatible completions endpoint; tests inject
//! a scripted mock.

pub mod http;

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::Result;

pub use http::HttpBackend;

/// Outbound completion request.
///
/// Transport encoding (message arrays, field names) is the backend's
/// business; the dispatch loop only speaks this flat shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

/// What one provider call produced.
///
/// `Failure` is a *delivered* provider response with a non-success status;
/// transport-level problems (timeout, connect, decode) surface as `Err`
/// from [`CompletionBackend::complete`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    Success {
        text: String,
        /// `usage.total_tokens` when the provider reported it
        total_tokens: Option<u64>,
    },
    Failure {
        status: u16,
        code: String,
        message: String,
    },
}

/// A completion endpoint
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issue one blocking call; the configured timeout applies.
    async fn complete(&self, request: &CompletionRequest) -> Result<ProviderReply>;
}

/// Shared backend handle
pub type SharedBackend = Arc<dyn CompletionBackend>;

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::types::QuizError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted backend: pops one reply per call, records what was asked.
    pub(crate) struct MockBackend {
        replies: Mutex<VecDeque<Result<ProviderReply>>>,
        calls: AtomicU32,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockBackend {
        pub fn new(replies: Vec<Result<ProviderReply>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn models_called(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.model.clone())
                .collect()
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn success(text: &str, total_tokens: u64) -> Result<ProviderReply> {
            Ok(ProviderReply::Success {
                text: text.to_string(),
                total_tokens: Some(total_tokens),
            })
        }

        pub fn failure(status: u16, code: &str, message: &str) -> Result<ProviderReply> {
            Ok(ProviderReply::Failure {
                status,
                code: code.to_string(),
                message: message.to_string(),
            })
        }

        pub fn transport_error(message: &str) -> Result<ProviderReply> {
            Err(QuizError::Io(std::io::Error::other(message.to_string())))
        }
    }

    #[async_trait]
    impl CompletionBackend for MockBackend {
        async fn complete(&self, request: &CompletionRequest) -> Result<ProviderReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected provider call for {}", request.model))
        }
    }
}
