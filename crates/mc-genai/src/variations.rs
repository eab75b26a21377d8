//! Variation fan-out: N concurrent generations, all successes kept.

use crate::client::{GenerationRequest, ImageGenerator, generate_once};
use crate::error::{GenAiError, GenAiResult};
use crate::retry::RetryPolicy;
use mc_core::GeneratedImage;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Generate `count` variations of `request`, each with its own retries.
///
/// Succeeds if at least one variation does; results keep request order.
/// Fails with [`GenAiError::AllVariationsFailed`] only when none succeed.
pub async fn generate_variations(
    generator: Arc<dyn ImageGenerator>,
    policy: RetryPolicy,
    request: &GenerationRequest,
    count: usize,
) -> GenAiResult<Vec<GeneratedImage>> {
    let count = count.max(1);
    let mut tasks = JoinSet::new();
    for index in 0..count {
        let generator = Arc::clone(&generator);
        let policy = policy.clone();
        let request = request.clone();
        tasks.spawn(async move {
            let result = generate_once(generator.as_ref(), &policy, &request).await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<Vec<GeneratedImage>>> = vec![None; count];
    let mut last_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(images))) => slots[index] = Some(images),
            Ok((index, Err(e))) => {
                log::warn!("variation {}/{count} failed: {e}", index + 1);
                last_error = Some(e);
            }
            Err(e) => {
                log::warn!("variation task failed: {e}");
                last_error = Some(GenAiError::Request(e.to_string()));
            }
        }
    }

    let succeeded = slots.iter().filter(|s| s.is_some()).count();
    let images: Vec<GeneratedImage> = slots.into_iter().flatten().flatten().collect();
    if images.is_empty() {
        return Err(GenAiError::AllVariationsFailed {
            requested: count,
            last: Box::new(last_error.unwrap_or(GenAiError::NoImage)),
        });
    }
    log::debug!("{succeeded}/{count} variations succeeded");
    Ok(images)
}
