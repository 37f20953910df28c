pub mod model;
pub mod preprocess;
pub mod scoring;

pub use model::{InferenceError, ModelLoadError, Predictor, TorchModel};
pub use preprocess::{INPUT_SIZE, preprocess};
