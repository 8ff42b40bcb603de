/// Epochs without a strict improvement before training stops.
pub const DEFAULT_PATIENCE: u64 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoppingState {
    Improving,
    Exhausted,
}

/// Tracks the best evaluation loss and the run of epochs since it was seen.
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    best_loss: f32,
    epochs_no_improve: u64,
    patience: u64,
}

impl EarlyStopping {
    pub fn new(patience: u64) -> Self {
        Self {
            best_loss: f32::INFINITY,
            epochs_no_improve: 0,
            patience,
        }
    }

    // Returns if the loss strictly improved on the best seen so far
    pub fn update(&mut self, eval_loss: f32) -> bool {
        if eval_loss < self.best_loss {
            self.best_loss = eval_loss;
            self.epochs_no_improve = 0;
            true
        } else {
            self.epochs_no_improve += 1;
            false
        }
    }

    pub fn state(&self) -> StoppingState {
        if self.epochs_no_improve >= self.patience {
            StoppingState::Exhausted
        } else {
            StoppingState::Improving
        }
    }

    pub fn should_stop(&self) -> bool {
        self.state() == StoppingState::Exhausted
    }

    pub fn best_loss(&self) -> f32 {
        self.best_loss
    }

    pub fn epochs_no_improve(&self) -> u64 {
        self.epochs_no_improve
    }

    pub fn patience(&self) -> u64 {
        self.patience
    }
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self::new(DEFAULT_PATIENCE)
    }
}
