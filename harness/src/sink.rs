use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use candle_core::{Result as CandleResult, Tensor};
use candle_nn::{ModuleT, VarMap};

use crate::step::InferenceScope;

/// Receiver for per-epoch scalars and a one-off description of the model.
pub trait MetricsSink {
    /// Records a group of related scalars under `main_tag` at `step`.
    fn add_scalars(
        &mut self,
        main_tag: &str,
        values: &[(&str, f32)],
        step: usize,
    ) -> io::Result<()>;

    fn add_graph(&mut self, graph: &ModelGraph) -> io::Result<()>;

    /// Flushes pending records. Writing after close is an error.
    fn close(&mut self) -> io::Result<()>;
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "metrics sink is closed")
}

/// Shapes observed by running a model once on an example input.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelGraph {
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub parameters: Vec<(String, Vec<usize>)>,
}

impl ModelGraph {
    pub fn trace<M: ModuleT + ?Sized>(model: &M, example_input: &Tensor) -> CandleResult<Self> {
        let output = InferenceScope::enter(model).forward(example_input)?;

        Ok(Self {
            input_shape: example_input.dims().to_vec(),
            output_shape: output.dims().to_vec(),
            parameters: Vec::new(),
        })
    }

    /// Adds the named parameters of `varmap`, sorted by name.
    pub fn with_parameters(mut self, varmap: &VarMap) -> Self {
        let data = varmap.data().lock().unwrap_or_else(|e| e.into_inner());

        let mut parameters: Vec<(String, Vec<usize>)> = data
            .iter()
            .map(|(name, var)| (name.clone(), var.dims().to_vec()))
            .collect();
        parameters.sort();

        self.parameters = parameters;
        self
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters
            .iter()
            .map(|(_, shape)| shape.iter().product::<usize>())
            .sum()
    }
}

impl fmt::Display for ModelGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "input: {:?}", self.input_shape)?;
        writeln!(f, "output: {:?}", self.output_shape)?;
        writeln!(f, "parameters: {}", self.num_parameters())?;
        for (name, shape) in &self.parameters {
            writeln!(f, "  {} {:?}", name, shape)?;
        }
        Ok(())
    }
}

/// Writes a run into a directory: `scalars.csv` with one row per scalar and
/// `graph.txt` with the model description.
pub struct RunWriter {
    dir: PathBuf,
    scalars: Option<BufWriter<File>>,
}

impl RunWriter {
    pub fn create<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut scalars = BufWriter::new(File::create(dir.join("scalars.csv"))?);
        writeln!(scalars, "step,group,tag,value")?;

        Ok(Self {
            dir,
            scalars: Some(scalars),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MetricsSink for RunWriter {
    fn add_scalars(
        &mut self,
        main_tag: &str,
        values: &[(&str, f32)],
        step: usize,
    ) -> io::Result<()> {
        let writer = self.scalars.as_mut().ok_or_else(closed)?;
        for (tag, value) in values {
            writeln!(writer, "{},{},{},{}", step, main_tag, tag, value)?;
        }
        Ok(())
    }

    fn add_graph(&mut self, graph: &ModelGraph) -> io::Result<()> {
        if self.scalars.is_none() {
            return Err(closed());
        }
        fs::write(self.dir.join("graph.txt"), graph.to_string())
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.scalars.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScalarGroup {
    pub main_tag: String,
    pub values: Vec<(String, f32)>,
    pub step: usize,
}

/// Keeps every record in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub scalars: Vec<ScalarGroup>,
    pub graphs: Vec<ModelGraph>,
    pub closes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closes > 0
    }

    /// Values recorded for `tag` across all groups, in step order.
    pub fn values(&self, tag: &str) -> Vec<(usize, f32)> {
        self.scalars
            .iter()
            .flat_map(|group| {
                group
                    .values
                    .iter()
                    .filter(|(t, _)| t == tag)
                    .map(|(_, v)| (group.step, *v))
            })
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn add_scalars(
        &mut self,
        main_tag: &str,
        values: &[(&str, f32)],
        step: usize,
    ) -> io::Result<()> {
        if self.is_closed() {
            return Err(closed());
        }
        self.scalars.push(ScalarGroup {
            main_tag: main_tag.to_string(),
            values: values.iter().map(|(t, v)| (t.to_string(), *v)).collect(),
            step,
        });
        Ok(())
    }

    fn add_graph(&mut self, graph: &ModelGraph) -> io::Result<()> {
        if self.is_closed() {
            return Err(closed());
        }
        self.graphs.push(graph.clone());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closes += 1;
        Ok(())
    }
}
