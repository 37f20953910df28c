use actix_web::error::BlockingError;
use actix_web::web;
use chrono::Utc;
use shared::{EmotionClass, ExtendedPrediction, PredictionResponse, SimplePrediction};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::ResponseMode;
use crate::inference::scoring::{emotion_percentages, top_prediction};
use crate::inference::{InferenceError, Predictor, preprocess};
use crate::storage::{ImageStore, S3Service};

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("model returned no usable scores")]
    NoPrediction,
    #[error("inference task was cancelled")]
    Cancelled(#[from] BlockingError),
}

#[derive(Clone)]
pub struct ClassifyService {
    model: Arc<dyn Predictor>,
    store: Option<Arc<dyn ImageStore>>,
    mode: ResponseMode,
}

impl ClassifyService {
    pub fn new(model: Arc<dyn Predictor>, mode: ResponseMode) -> Self {
        Self {
            model,
            store: None,
            mode,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Classifies one uploaded image. `file_name` only feeds the storage key extension.
    pub async fn classify(
        &self,
        image_data: Vec<u8>,
        file_name: Option<&str>,
    ) -> Result<PredictionResponse, ClassifyError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let model = Arc::clone(&self.model);
        let (scores, image_data) = web::block(move || {
            let input = preprocess(&image_data)?;
            let scores = model.predict(&input)?;
            Ok::<_, InferenceError>((scores, image_data))
        })
        .await??;

        let (label, confidence) = top_prediction(&scores).ok_or(ClassifyError::NoPrediction)?;
        log::info!(
            "[{}] classified as {} ({:.3}) in {} ms",
            request_id,
            label,
            confidence,
            started.elapsed().as_millis()
        );

        let response = match self.mode {
            ResponseMode::Simple => PredictionResponse::Simple(SimplePrediction {
                prediction: label,
                confidence,
            }),
            ResponseMode::Extended => {
                let emotions = emotion_percentages(&scores).ok_or(ClassifyError::NoPrediction)?;
                let image_url = self
                    .store_original(request_id, label, &image_data, file_name)
                    .await;
                PredictionResponse::Extended(ExtendedPrediction {
                    prediction: label,
                    emotions,
                    image_url,
                })
            }
        };

        Ok(response)
    }

    /// Best effort: a failed upload is logged and reported as a missing URL.
    async fn store_original(
        &self,
        request_id: Uuid,
        label: EmotionClass,
        image_data: &[u8],
        file_name: Option<&str>,
    ) -> Option<String> {
        let store = self.store.as_ref()?;

        let extension = S3Service::file_extension(file_name, image_data);
        let key = S3Service::generate_object_key(label, &extension, Utc::now());
        let content_type = S3Service::content_type_for_extension(&extension);

        match store.store_image(image_data, &key, content_type).await {
            Ok(url) => {
                log::info!("[{}] stored upload as {}", request_id, key);
                Some(url)
            }
            Err(e) => {
                log::warn!("[{}] failed to store upload {}: {}", request_id, key, e);
                None
            }
        }
    }
}
