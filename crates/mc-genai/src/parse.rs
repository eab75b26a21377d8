//! Segmentation response parsing.
//!
//! The segmenter answers with JSON text:
//!
//! ```json
//! [{"label": "boat", "mask": "data:image/png;base64,...", "box_2d": [y0, x0, y1, x1]}]
//! ```
//!
//! `mask` may also be a bare base64 PNG, `box_2d` may be absent, and the
//! whole array may arrive inside a fenced code block.

use crate::error::{GenAiError, GenAiResult};
use mc_core::{DataUri, Id, MaskBox, MaskSet};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Detection {
    label: String,
    mask: String,
    #[serde(default)]
    box_2d: Option<[f64; 4]>,
}

/// Parse segmenter output into a mask set for `image_id`.
///
/// Entries with an unreadable mask are skipped; a response that is not a
/// JSON array of detections is [`GenAiError::MalformedResponse`].
pub fn parse_segmentation(image_id: Id, text: &str) -> GenAiResult<MaskSet> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(GenAiError::MalformedResponse("empty segmentation response".into()));
    }
    let detections: Vec<Detection> = serde_json::from_str(body)?;
    let total = detections.len();

    let masks: Vec<(String, DataUri, Option<MaskBox>)> = detections
        .into_iter()
        .filter_map(|d| {
            let label = d.label.trim();
            if label.is_empty() {
                log::warn!("segmentation: dropping detection without a label");
                return None;
            }
            match DataUri::parse_lenient(d.mask.trim()) {
                Ok(mask) => Some((label.to_string(), mask, d.box_2d.map(MaskBox::from))),
                Err(e) => {
                    log::warn!("segmentation: dropping `{label}`: {e}");
                    None
                }
            }
        })
        .collect();

    log::debug!("segmentation for {image_id}: {}/{total} detections usable", masks.len());
    Ok(MaskSet::from_detections(image_id, masks))
}

/// The contents of a leading ```` ``` ```` fence, or `text` trimmed.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}
