use std::sync::Arc;

use obe_core::{
    Engine, EngineArgs, EngineFactory, ErrorInfo, Measurement, ModelArg, ModelFunction, ObeError,
    Tensor,
};

struct ConstantModel;

impl ModelFunction for ConstantModel {
    fn evaluate(
        &self,
        settings: ModelArg<'_>,
        parameters: ModelArg<'_>,
        constants: &[f64],
    ) -> Result<Tensor, ObeError> {
        let shape = settings
            .shape()
            .or_else(|| parameters.shape())
            .map(<[usize]>::to_vec)
            .unwrap_or_default();
        let value = constants.first().copied().unwrap_or(0.0);
        Ok(Tensor::from_fn(shape, |_| value))
    }
}

struct DummyEngine {
    grid: Vec<Tensor>,
    constants: Vec<f64>,
    weights: Vec<f64>,
}

impl Engine for DummyEngine {
    fn setting_grid(&self) -> &[Tensor] {
        &self.grid
    }

    fn parameters(&self) -> Tensor {
        Tensor::from_fn(vec![1, self.weights.len()], |_| 0.0)
    }

    fn constants(&self) -> &[f64] {
        &self.constants
    }

    fn particle_weights(&self) -> &[f64] {
        &self.weights
    }

    fn pdf_update(&mut self, _measurement: &Measurement) -> Result<(), ObeError> {
        Ok(())
    }

    fn good_setting(&mut self, _pickiness: Option<u32>) -> Result<Vec<f64>, ObeError> {
        Ok(vec![0.0])
    }

    fn opt_setting(&mut self) -> Result<Vec<f64>, ObeError> {
        Err(ObeError::Upstream(ErrorInfo::new("dummy.opt", "not supported")))
    }

    fn mean(&self) -> Result<Vec<f64>, ObeError> {
        Ok(vec![0.0])
    }

    fn std(&self) -> Result<Vec<f64>, ObeError> {
        Ok(vec![0.0])
    }

    fn covariance(&self) -> Result<Tensor, ObeError> {
        Tensor::from_rows(&[vec![0.0]])
    }
}

#[test]
fn engine_factory_builds_boxed_engine() {
    let factory: EngineFactory = Arc::new(|args: &EngineArgs| -> Result<Box<dyn Engine>, ObeError> {
        Ok(Box::new(DummyEngine {
            grid: vec![Tensor::vector(args.setting_axes[0].clone())],
            constants: args.constants.clone(),
            weights: vec![0.5, 0.5],
        }))
    });
    let args = EngineArgs {
        model: Arc::new(ConstantModel),
        setting_axes: vec![vec![0.0, 1.0]],
        parameter_axes: vec![vec![1.0]],
        constants: vec![3.0],
    };
    let mut engine = factory(&args).expect("engine");
    assert_eq!(engine.constants(), &[3.0]);
    assert_eq!(engine.setting_grid()[0].shape(), &[2]);
    assert!(engine.opt_setting().is_err());

    let out = args
        .model
        .evaluate(ModelArg::Point(&[0.5]), ModelArg::Array(engine.setting_grid()), &args.constants)
        .expect("model");
    assert_eq!(out.data(), &[3.0, 3.0]);
}
