//! Generative-model and segmenter collaborators.
//!
//! The canvas never calls these directly. The orchestrator sets the
//! controller busy, awaits one of these calls, and feeds the outcome back
//! as a command.

pub mod client;
pub mod error;
pub mod parse;
pub mod retry;
pub mod variations;

pub use client::{GenAiClient, GenerationRequest, ImageGenerator, Segmenter};
pub use error::{GenAiError, GenAiResult};
pub use parse::parse_segmentation;
pub use retry::{RetryPolicy, with_retry};
pub use variations::generate_variations;
