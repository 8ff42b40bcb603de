use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use candle_core::{Device, Result as CandleResult, Tensor};

/// Feature rows and their labels, as read from CSV.
#[derive(Clone, Debug, Default)]
pub struct Samples {
    pub features: Vec<f32>,
    pub labels: Vec<f32>,
    pub num_features: usize,
}

impl Samples {
    pub fn load(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    // Header line is skipped, the last column is the label
    pub fn read<R: BufRead>(mut reader: R) -> io::Result<Self> {
        let mut samples = Self::default();

        let mut header_line = String::new();
        let _ = reader.read_line(&mut header_line)?;

        for (line_no, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            if line.trim().is_empty() {
                continue;
            }

            let values = line
                .split(',')
                .map(|field| field.trim().parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| invalid(format!("line {}: {}", line_no + 2, e)))?;

            let Some((&label, features)) = values.split_last() else {
                continue;
            };

            if samples.labels.is_empty() {
                samples.num_features = features.len();
            } else if features.len() != samples.num_features {
                return Err(invalid(format!(
                    "line {}: expected {} features, found {}",
                    line_no + 2,
                    samples.num_features,
                    features.len()
                )));
            }

            if label != 0.0 && label != 1.0 {
                return Err(invalid(format!(
                    "line {}: label must be 0 or 1, found {}",
                    line_no + 2,
                    label
                )));
            }

            samples.features.extend_from_slice(features);
            samples.labels.push(label);
        }

        Ok(samples)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Count of positive labels.
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1.0).count()
    }

    pub fn to_tensors(&self, device: &Device) -> CandleResult<(Tensor, Tensor)> {
        let x = Tensor::from_slice(&self.features, (self.len(), self.num_features), device)?;
        let y = Tensor::from_slice(&self.labels, (self.len(),), device)?;
        Ok((x, y))
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
