use candle_core::{Result, Tensor};
use candle_nn::{linear, ops::sigmoid, Dropout, Linear, ModuleT, VarBuilder};

// Default binary classifier: a small MLP with a single sigmoid output
pub struct Classifier {
    input: Linear,
    hidden: Linear,
    output: Linear,
    dropout: Dropout,
}

impl Classifier {
    pub fn new(
        vs: &VarBuilder,
        num_features: usize,
        hidden_size: usize,
        dropout: f32,
    ) -> Result<Self> {
        Ok(Self {
            input: linear(num_features, hidden_size, vs.pp("input"))?,
            hidden: linear(hidden_size, hidden_size, vs.pp("hidden"))?,
            output: linear(hidden_size, 1, vs.pp("output"))?,
            dropout: Dropout::new(dropout),
        })
    }
}

impl ModuleT for Classifier {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let x = x.apply(&self.input)?.relu()?;
        let x = self.dropout.forward_t(&x, train)?;
        let x = x.apply(&self.hidden)?.relu()?;
        sigmoid(&x.apply(&self.output)?)
    }
}
