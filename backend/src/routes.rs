use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, warn};
use shared::PredictionResponse;

use crate::classify::ClassifyService;

pub const IMAGE_FIELD: &str = "image";

/// Upper bound on the size of the `image` part, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("missing form field 'image'")]
    MissingField,
    #[error("uploaded file exceeds {0} bytes")]
    TooLarge(usize),
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

struct ImageUpload {
    data: Vec<u8>,
    file_name: Option<String>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, limit: UploadLimit) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(
            web::resource("/predict")
                .app_data(web::Data::new(limit))
                .route(web::post().to(predict)),
        );
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Hello from PuppySense!")
}

/// Every outcome, including failures, is answered with 200 and a JSON body.
async fn predict(
    service: web::Data<ClassifyService>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> HttpResponse {
    let response = match read_image_field(payload, limit.0).await {
        Ok(upload) => service
            .classify(upload.data, upload.file_name.as_deref())
            .await
            .unwrap_or_else(|e| {
                error!("Classification failed: {}", e);
                PredictionResponse::error(e.to_string())
            }),
        Err(e) => {
            warn!("Rejected upload: {}", e);
            PredictionResponse::error(e.to_string())
        }
    };

    HttpResponse::Ok().json(response)
}

async fn read_image_field(mut payload: Multipart, limit: usize) -> Result<ImageUpload, UploadError> {
    while let Some(field) = payload.try_next().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);
        let data = read_field(field, limit).await?;
        return Ok(ImageUpload { data, file_name });
    }
    Err(UploadError::MissingField)
}

async fn read_field(mut field: Field, limit: usize) -> Result<Vec<u8>, UploadError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if data.len() + chunk.len() > limit {
            return Err(UploadError::TooLarge(limit));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}
