pub mod s3_service;

pub use s3_service::{ImageStore, S3Service, S3ServiceError};
