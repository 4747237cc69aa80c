use std::sync::Arc;

use obe_grid::{GridEvaluator, Pointwise};
use proptest::prelude::*;

fn axes_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 1..5), 1..4)
}

fn sum_model() -> Arc<Pointwise<impl Fn(&[f64], &[f64], &[f64]) -> f64 + Send + Sync>> {
    Arc::new(Pointwise::new(|s: &[f64], p: &[f64], _: &[f64]| {
        s.iter().sum::<f64>() * p.iter().product::<f64>()
    }))
}

proptest! {
    #[test]
    fn grid_shapes_follow_axis_lengths(settings in axes_strategy(), parameters in axes_strategy()) {
        let mut grid = GridEvaluator::new();
        grid.configure(&settings, &parameters, &[1.0]).unwrap();

        let setting_shape: Vec<usize> = settings.iter().map(Vec::len).collect();
        let parameter_shape: Vec<usize> = parameters.iter().map(Vec::len).collect();
        prop_assert_eq!(grid.setting_grid().len(), settings.len());
        prop_assert_eq!(grid.parameter_grid().len(), parameters.len());
        for tensor in grid.setting_grid() {
            prop_assert_eq!(tensor.shape(), setting_shape.as_slice());
        }
        for tensor in grid.parameter_grid() {
            prop_assert_eq!(tensor.shape(), parameter_shape.as_slice());
        }

        grid.configure(&settings, &parameters, &[1.0]).unwrap();
        prop_assert_eq!(grid.setting_shape(), Some(setting_shape));
        prop_assert_eq!(grid.parameter_shape(), Some(parameter_shape));
    }

    #[test]
    fn evaluations_take_the_swept_shape(settings in axes_strategy(), parameters in axes_strategy()) {
        let mut grid = GridEvaluator::with_model(sum_model());
        grid.configure(&settings, &parameters, &[]).unwrap();

        let setting_point: Vec<f64> = settings.iter().map(|a| a[0]).collect();
        let parameter_point: Vec<f64> = parameters.iter().map(|a| a[0]).collect();

        let over_params = grid.evaluate_over_parameter_grid(&setting_point).unwrap();
        prop_assert_eq!(Some(over_params.shape().to_vec()), grid.parameter_shape());

        let over_settings = grid.evaluate_over_setting_grid(&parameter_point).unwrap();
        prop_assert_eq!(Some(over_settings.shape().to_vec()), grid.setting_shape());
    }

    #[test]
    fn grid_cells_keep_axis_order(settings in axes_strategy()) {
        let mut grid = GridEvaluator::new();
        grid.configure(&settings, &[vec![0.0]], &[]).unwrap();
        let shape = grid.setting_shape().unwrap();
        let count: usize = shape.iter().product();
        for flat in 0..count {
            let point = grid.setting_point(flat).unwrap();
            let mut index = vec![0usize; shape.len()];
            obe_core::unravel_index(flat, &shape, &mut index);
            for (k, tensor) in grid.setting_grid().iter().enumerate() {
                prop_assert_eq!(tensor.get(&index), Some(settings[k][index[k]]));
                prop_assert_eq!(point[k], settings[k][index[k]]);
            }
        }
    }
}
