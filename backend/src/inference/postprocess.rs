use shared::PredictionResponse;

use super::labels::{label_for, NUM_CLASSES};

/// Index and value of the highest score. Ties resolve to the first index and
/// NaN scores never win unless every score is NaN.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            None => best = Some((index, score)),
            Some((_, current)) if score > current || (current.is_nan() && !score.is_nan()) => {
                best = Some((index, score))
            }
            _ => {}
        }
    }
    best
}

/// Probability in `[0, 1]` to a percentage rounded to two decimals.
pub fn confidence_percent(score: f32) -> f64 {
    (f64::from(score) * 100.0 * 100.0).round() / 100.0
}

pub fn top_prediction(scores: &[f32]) -> Option<PredictionResponse> {
    if scores.len() != NUM_CLASSES {
        log::debug!(
            "Model returned {} scores, expected {}",
            scores.len(),
            NUM_CLASSES
        );
    }

    let (class_id, score) = argmax(scores)?;
    Some(PredictionResponse {
        class_id,
        class_name: label_for(class_id).to_string(),
        confidence: confidence_percent(score),
    })
}
