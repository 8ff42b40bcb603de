mod trainer_tests;

use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{linear, ops::sigmoid, Linear, Module, VarBuilder, VarMap};

use crate::data::TensorDataset;

/// Logistic regression: one linear unit and a sigmoid.
pub struct Logistic {
    linear: Linear,
}

impl Logistic {
    pub fn new(varmap: &VarMap, num_features: usize) -> Result<Self> {
        let vs = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        Ok(Self {
            linear: linear(num_features, 1, vs.pp("linear"))?,
        })
    }
}

impl Module for Logistic {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        sigmoid(&x.apply(&self.linear)?)
    }
}

/// Evenly spaced points in [-1, 1], labelled 1 when positive.
pub fn separable(rows: usize, batch_size: usize) -> Result<TensorDataset> {
    let x: Vec<f32> = (0..rows)
        .map(|i| -1.0 + 2.0 * (i as f32 + 0.5) / rows as f32)
        .collect();
    let y: Vec<f32> = x.iter().map(|&v| if v > 0.0 { 1.0 } else { 0.0 }).collect();

    TensorDataset::new(
        Tensor::from_vec(x, (rows, 1), &Device::Cpu)?,
        Tensor::from_vec(y, (rows,), &Device::Cpu)?,
        batch_size,
    )
}

/// Flattened copy of every parameter, in a stable order.
pub fn snapshot(varmap: &VarMap) -> Result<Vec<(String, Vec<f32>)>> {
    let data = varmap.data().lock().unwrap();
    let mut params = data
        .iter()
        .map(|(name, var)| Ok((name.clone(), var.flatten_all()?.to_vec1::<f32>()?)))
        .collect::<Result<Vec<_>>>()?;
    params.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(params)
}
