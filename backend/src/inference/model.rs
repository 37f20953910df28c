use ndarray::Array4;
use shared::EmotionClass;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use strum::EnumCount;
use tch::{CModule, Device, Kind, Tensor};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("cannot identify image file: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid model input: {0}")]
    InvalidInput(String),
    #[error("model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("model returned {0} scores, expected {expected}", expected = EmotionClass::COUNT)]
    UnexpectedOutput(usize),
    #[error("model is unavailable")]
    ModelUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to load model (primary: {primary}; fallback: {fallback})")]
    Exhausted { primary: String, fallback: String },
}

/// Anything that maps a `(1, 224, 224, 3)` batch to one score per emotion class.
pub trait Predictor: Send + Sync {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// TorchScript classifier loaded once at startup.
pub struct TorchModel {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        let device = Device::cuda_if_available();
        let (mut module, device) = match CModule::load_on_device(path, device) {
            Ok(module) => (module, device),
            Err(primary) => {
                log::warn!(
                    "Loading {} on {:?} failed, retrying from memory on CPU: {}",
                    path.display(),
                    device,
                    primary
                );
                let module = load_from_memory(path).map_err(|fallback| ModelLoadError::Exhausted {
                    primary: primary.to_string(),
                    fallback,
                })?;
                (module, Device::Cpu)
            }
        };
        module.set_eval();

        log::info!("Loaded model {} on {:?}", path.display(), device);
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }
}

/// Reads the whole artifact and deserializes it from a buffer instead of a path.
fn load_from_memory(path: &Path) -> Result<CModule, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    CModule::load_data_on_device(&mut Cursor::new(bytes), Device::Cpu).map_err(|e| e.to_string())
}

impl Predictor for TorchModel {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data = input
            .as_slice()
            .ok_or_else(|| InferenceError::InvalidInput("tensor is not contiguous".into()))?;
        let tensor = Tensor::from_slice(data).view(shape.as_slice()).to_device(self.device);

        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| InferenceError::ModelUnavailable)?;
            tch::no_grad(|| module.forward_ts(&[tensor]))?
        };

        let flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .flatten(0, -1);
        let scores = Vec::<f32>::try_from(&flat)?;
        if scores.len() != EmotionClass::COUNT {
            return Err(InferenceError::UnexpectedOutput(scores.len()));
        }
        Ok(scores)
    }
}
