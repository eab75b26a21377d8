//! Collaborator interfaces and the retrying front door over them.
//!
//! Transports (HTTP clients for a particular model vendor, test fakes)
//! implement [`ImageGenerator`] and [`Segmenter`]. The orchestrator talks
//! to [`GenAiClient`], which adds the retry policy, variation fan-out and
//! segmentation parsing on top.

use crate::error::{GenAiError, GenAiResult};
use crate::parse::parse_segmentation;
use crate::retry::{RetryPolicy, with_retry};
use crate::variations::generate_variations;
use async_trait::async_trait;
use mc_core::{DataUri, GeneratedImage, ImageRef, MaskSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input to one generation call: reference images (base image first) and
/// the instruction text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub images: Vec<DataUri>,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(base: DataUri, prompt: impl Into<String>) -> Self {
        Self {
            images: vec![base],
            prompt: prompt.into(),
        }
    }

    /// Add a reference image (an asset to place, a style sample).
    pub fn with_image(mut self, image: DataUri) -> Self {
        self.images.push(image);
        self
    }
}

/// A generative image model.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// One generation call. May return several images; an empty list is
    /// reported by the caller as [`GenAiError::NoImage`].
    async fn generate(&self, request: &GenerationRequest) -> GenAiResult<Vec<GeneratedImage>>;
}

/// A vision model that finds objects in an image.
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Raw response text for `image`; parsed by [`parse_segmentation`].
    async fn detect(&self, image: &DataUri) -> GenAiResult<String>;
}

pub struct GenAiClient {
    generator: Arc<dyn ImageGenerator>,
    segmenter: Arc<dyn Segmenter>,
    policy: RetryPolicy,
}

impl GenAiClient {
    pub fn new(generator: Arc<dyn ImageGenerator>, segmenter: Arc<dyn Segmenter>) -> Self {
        Self {
            generator,
            segmenter,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate with retries. A response without images counts as a
    /// failed attempt.
    pub async fn generate(&self, request: &GenerationRequest) -> GenAiResult<Vec<GeneratedImage>> {
        generate_once(self.generator.as_ref(), &self.policy, request).await
    }

    /// Run `count` independent generations concurrently and keep every
    /// one that succeeds.
    pub async fn generate_variations(
        &self,
        request: &GenerationRequest,
        count: usize,
    ) -> GenAiResult<Vec<GeneratedImage>> {
        generate_variations(Arc::clone(&self.generator), self.policy.clone(), request, count).await
    }

    /// Segment `image` and tag the result with its id, so a response that
    /// arrives after the base image changed can be recognised as stale.
    pub async fn segment(&self, image: &ImageRef) -> GenAiResult<MaskSet> {
        let text = with_retry(&self.policy, "segmentation", || self.segmenter.detect(&image.data)).await?;
        parse_segmentation(image.id, &text)
    }
}

pub(crate) async fn generate_once(
    generator: &dyn ImageGenerator,
    policy: &RetryPolicy,
    request: &GenerationRequest,
) -> GenAiResult<Vec<GeneratedImage>> {
    with_retry(policy, "generation", || async {
        let images = generator.generate(request).await?;
        if images.is_empty() {
            return Err(GenAiError::NoImage);
        }
        Ok(images)
    })
    .await
}
