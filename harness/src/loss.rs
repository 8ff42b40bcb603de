use candle_core::{Result, Tensor};

// Keeps ln() finite when the sigmoid saturates
const PROB_EPSILON: f64 = 1e-7;

/// Mean binary cross-entropy between probabilities and 0/1 targets.
pub fn binary_cross_entropy(pred: &Tensor, target: &Tensor) -> Result<Tensor> {
    let p = pred.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON)?;

    let positive = (target * p.log()?)?;
    let negative = (target.affine(-1.0, 1.0)? * p.affine(-1.0, 1.0)?.log()?)?;

    (positive + negative)?.neg()?.mean_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_matches_closed_form() -> Result<()> {
        let pred = Tensor::new(&[[0.8f32], [0.3]], &Device::Cpu)?;
        let target = Tensor::new(&[[1f32], [0.]], &Device::Cpu)?;

        let loss = binary_cross_entropy(&pred, &target)?.to_scalar::<f32>()?;
        let expected = -(0.8f32.ln() + 0.7f32.ln()) / 2.0;
        assert!((loss - expected).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_saturated_prediction_is_finite() -> Result<()> {
        let pred = Tensor::new(&[[0f32], [1.]], &Device::Cpu)?;
        let target = Tensor::new(&[[1f32], [0.]], &Device::Cpu)?;

        let loss = binary_cross_entropy(&pred, &target)?.to_scalar::<f32>()?;
        assert!(loss.is_finite());
        assert!(loss > 10.0);
        Ok(())
    }
}
