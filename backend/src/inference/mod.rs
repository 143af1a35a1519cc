pub mod labels;
#[cfg(feature = "torch")]
pub mod model;
pub mod postprocess;
pub mod preprocess;

use ndarray::Array4;

#[cfg(feature = "torch")]
pub use model::TorchModel;
pub use postprocess::top_prediction;
pub use preprocess::{preprocess_image, PreprocessError};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[cfg(feature = "torch")]
    #[error("Failed to load model from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: tch::TchError,
    },
    #[cfg(feature = "torch")]
    #[error("Model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("Model lock poisoned")]
    Poisoned,
    #[error("Model returned an empty output")]
    EmptyOutput,
}

/// Maps a preprocessed `[1, 224, 224, 3]` tensor to one score per class.
///
/// Implementations are loaded once at startup and shared read-only by every
/// request handler.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}
