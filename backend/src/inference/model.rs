use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use tch::{CModule, Device, IValue, Kind, Tensor};

use super::{Classifier, InferenceError};

/// TorchScript classifier. `CModule` is `Send` but not `Sync`, so calls are
/// serialized through a mutex.
pub struct TorchModel {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchModel {
    pub fn load(model_path: impl AsRef<Path>, device: Device) -> Result<Self, InferenceError> {
        let model_path = model_path.as_ref();
        let mut module = CModule::load_on_device(model_path, device).map_err(|source| {
            InferenceError::Load {
                path: model_path.display().to_string(),
                source,
            }
        })?;
        module.set_eval();
        log::info!("Loaded model {} on {:?}", model_path.display(), device);

        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }

    fn to_input(&self, input: &Array4<f32>) -> Tensor {
        let shape = input.shape().iter().map(|&d| d as i64).collect::<Vec<_>>();
        let data = input.iter().copied().collect::<Vec<f32>>();
        Tensor::from_slice(&data)
            .reshape(shape.as_slice())
            .to_device(self.device)
    }
}

impl Classifier for TorchModel {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let tensor = self.to_input(input);
        let module = self.module.lock().map_err(|_| InferenceError::Poisoned)?;

        let output = tch::no_grad(|| module.forward_is(&[IValue::Tensor(tensor)]))?;
        let output = match output {
            IValue::Tensor(t) => t,
            IValue::Tuple(values) | IValue::GenericList(values) => match values.into_iter().next() {
                Some(IValue::Tensor(t)) => t,
                _ => return Err(InferenceError::EmptyOutput),
            },
            _ => return Err(InferenceError::EmptyOutput),
        };

        let output = output
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .view([-1]);
        let scores = Vec::<f32>::try_from(&output)?;
        if scores.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        Ok(scores)
    }
}
