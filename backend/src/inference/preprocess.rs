use image::imageops::{self, FilterType};
use ndarray::Array4;

use super::model::InferenceError;

/// Spatial size expected by the classifier.
pub const INPUT_SIZE: u32 = 224;

/// Decodes `image` and lays it out as a `(1, 224, 224, 3)` f32 batch.
///
/// Pixel values stay in `0.0..=255.0`; the model normalizes internally.
pub fn preprocess(image: &[u8]) -> Result<Array4<f32>, InferenceError> {
    let rgb = image::load_from_memory(image)?.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    let side = INPUT_SIZE as usize;
    let data: Vec<f32> = resized.into_raw().into_iter().map(f32::from).collect();
    Array4::from_shape_vec((1, side, side, 3), data)
        .map_err(|e| InferenceError::InvalidInput(e.to_string()))
}
