use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use sha2::{Digest, Sha256};
use shared::ErrorResponse;

use crate::inference::{preprocess_image, top_prediction, Classifier, InferenceError, PreprocessError};

pub const IMAGE_FIELD: &str = "image";

/// Largest accepted `image` field, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("No image uploaded")]
    NoImage,
    #[error("Image too large")]
    TooLarge,
    #[error("Multipart error: {0}")]
    Upload(#[from] MultipartError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    pub fn client_message(&self) -> String {
        match self {
            PredictError::NoImage | PredictError::TooLarge => self.to_string(),
            PredictError::Upload(_) => "Invalid multipart payload".to_string(),
            PredictError::Preprocess(e @ PreprocessError::Decode(_)) => e.to_string(),
            PredictError::Preprocess(PreprocessError::Shape(_)) | PredictError::Inference(_) => {
                "Model inference failed".to_string()
            }
        }
    }
}

impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictError::NoImage
            | PredictError::Upload(_)
            | PredictError::Preprocess(PreprocessError::Decode(_)) => StatusCode::BAD_REQUEST,
            PredictError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            PredictError::Preprocess(PreprocessError::Shape(_)) | PredictError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Prediction failed: {}", self);
        } else {
            warn!("Rejected prediction request: {}", self);
        }
        HttpResponse::build(status).json(ErrorResponse::new(self.client_message()))
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, upload_limit: UploadLimit) {
    cfg.app_data(web::Data::new(upload_limit))
        .service(web::resource("/predict").route(web::post().to(predict)));
}

async fn predict(
    classifier: web::Data<dyn Classifier>,
    upload_limit: web::Data<UploadLimit>,
    mut payload: Multipart,
) -> Result<HttpResponse, PredictError> {
    let image_data = read_image_field(&mut payload, upload_limit.0).await?;
    info!(
        "Received image: {} bytes, sha256 {}",
        image_data.len(),
        image_digest(&image_data)
    );

    let input = preprocess_image(&image_data)?;
    let scores = classifier.classify(&input)?;
    let prediction = top_prediction(&scores).ok_or(InferenceError::EmptyOutput)?;

    info!(
        "Predicted {} ({}) with {:.2}% confidence",
        prediction.class_id, prediction.class_name, prediction.confidence
    );
    Ok(HttpResponse::Ok().json(prediction))
}

/// Returns the content of the first file part named `image`. Plain form fields
/// carry no filename and are skipped. A payload that is not multipart at all
/// yields `NoImage`, same as one without the field.
async fn read_image_field(payload: &mut Multipart, max_bytes: usize) -> Result<Vec<u8>, PredictError> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        if !is_image_file(&field) {
            while let Some(Ok(_)) = field.next().await {}
            continue;
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if image_data.len() + data.len() > max_bytes {
                return Err(PredictError::TooLarge);
            }
            image_data.extend_from_slice(&data);
        }
        return Ok(image_data);
    }
    Err(PredictError::NoImage)
}

fn is_image_file(field: &Field) -> bool {
    field.name() == Some(IMAGE_FIELD)
        && field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some()
}

fn image_digest(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}
