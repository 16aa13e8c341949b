//! End-of-run output sink (spec §6). Grounded on
//! `altar/simulations/Archiver.py`: writes the final θ, Σ, and
//! posterior log-likelihood at `simulationFinish`, plus the optional
//! parameter-set layout and per-β checkpoints spec §6 allows.
//!
//! Checkpoint restart from these files is an explicit Non-goal (spec
//! §1) -- the archiver is a write-only sink.

use crate::cooling_step::CoolingStep;
use crate::error::Result;
use crate::parameter_set::ParameterSet;
use nalgebra::{DMatrix, DVector};
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON-friendly view of a [`CoolingStep`], row-major so it serializes
/// without a `nalgebra` `serde` feature. Written by
/// [`Archiver::write_final_json`] when the `serde_support` feature is
/// enabled -- the optional JSON archiver output spec §6 allows alongside
/// the mandatory `theta.txt`/`sigma.txt`/`llk.txt` triple.
#[cfg(feature = "serde_support")]
#[derive(Serialize, Deserialize)]
struct ArchiveRecord {
    beta: f64,
    samples: usize,
    parameters: usize,
    theta: Vec<Vec<f64>>,
    prior: Vec<f64>,
    data: Vec<f64>,
    posterior: Vec<f64>,
}

#[cfg(feature = "serde_support")]
impl ArchiveRecord {
    fn from_step(step: &CoolingStep) -> Self {
        let theta = (0..step.samples())
            .map(|i| (0..step.parameters()).map(|j| step.theta[(i, j)]).collect())
            .collect();
        ArchiveRecord {
            beta: step.beta,
            samples: step.samples(),
            parameters: step.parameters(),
            theta,
            prior: step.prior.iter().cloned().collect(),
            data: step.data.iter().cloned().collect(),
            posterior: step.posterior.iter().cloned().collect(),
        }
    }
}

/// Writes `theta.txt`/`sigma.txt`/`llk.txt` (and, on request,
/// `parameters.csv` and per-β CSV checkpoints) under one output
/// directory.
pub struct Archiver {
    directory: PathBuf,
    checkpoints: bool,
}

impl Archiver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Archiver {
            directory: directory.into(),
            checkpoints: false,
        }
    }

    /// Enable per-β CSV checkpoint writing via [`Archiver::write_checkpoint`].
    pub fn with_checkpoints(mut self) -> Self {
        self.checkpoints = true;
        self
    }

    /// Write `theta.txt` (S×P), `sigma.txt` (P×P), and `llk.txt` (S),
    /// the three mandatory outputs of spec §6.
    pub fn write_final(&self, step: &CoolingStep) -> Result<()> {
        std::fs::create_dir_all(&self.directory)?;
        write_matrix(self.directory.join("theta.txt"), &step.theta)?;
        write_matrix(self.directory.join("sigma.txt"), &step.sigma)?;
        write_vector(self.directory.join("llk.txt"), &step.posterior)?;
        Ok(())
    }

    /// Write `final.json`, an alternative to `write_final`'s plain-text
    /// triple for consumers that want one structured document instead of
    /// three files. Requires the `serde_support` feature.
    #[cfg(feature = "serde_support")]
    pub fn write_final_json(&self, step: &CoolingStep) -> Result<()> {
        std::fs::create_dir_all(&self.directory)?;
        let record = ArchiveRecord::from_step(step);
        let file = std::fs::File::create(self.directory.join("final.json"))?;
        serde_json::to_writer_pretty(file, &record)?;
        Ok(())
    }

    /// Write the optional `parameters.csv` layout (`name,count,offset`).
    pub fn write_parameter_layout(&self, sets: &[ParameterSet]) -> Result<()> {
        std::fs::create_dir_all(&self.directory)?;
        let mut writer = csv::Writer::from_path(self.directory.join("parameters.csv"))?;
        writer.write_record(&["name", "count", "offset"])?;
        for set in sets {
            writer.write_record(&[
                set.name.clone(),
                set.count.to_string(),
                set.offset.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Append one fixed-width-named checkpoint CSV
    /// (`checkpoint-NNNNNN.csv`, keyed by `step.iteration`) containing
    /// β, θ, prior, data, posterior for every sample. A no-op unless
    /// [`Archiver::with_checkpoints`] was set -- spec §6 marks these
    /// optional, and no HDF5 crate appears in the retrieval pack to
    /// ground the HDF5 variant spec §6 also allows (DESIGN.md).
    pub fn write_checkpoint(&self, step: &CoolingStep) -> Result<()> {
        if !self.checkpoints {
            return Ok(());
        }
        std::fs::create_dir_all(&self.directory)?;
        let filename = format!("checkpoint-{:06}.csv", step.iteration);
        let mut writer = csv::Writer::from_path(self.directory.join(filename))?;
        let parameters = step.parameters();
        let mut header = vec!["sample".to_string(), "beta".to_string()];
        header.extend((0..parameters).map(|j| format!("theta_{}", j)));
        header.push("prior".to_string());
        header.push("data".to_string());
        header.push("posterior".to_string());
        writer.write_record(&header)?;

        for i in 0..step.samples() {
            let mut row = vec![i.to_string(), step.beta.to_string()];
            row.extend((0..parameters).map(|j| step.theta[(i, j)].to_string()));
            row.push(step.prior[i].to_string());
            row.push(step.data[i].to_string());
            row.push(step.posterior[i].to_string());
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn write_matrix(path: impl AsRef<Path>, m: &DMatrix<f64>) -> Result<()> {
    let mut f = std::fs::File::create(path)?;
    for i in 0..m.nrows() {
        let row: Vec<String> = (0..m.ncols()).map(|j| format!("{:.17e}", m[(i, j)])).collect();
        writeln!(f, "{}", row.join(" "))?;
    }
    Ok(())
}

fn write_vector(path: impl AsRef<Path>, v: &DVector<f64>) -> Result<()> {
    let mut f = std::fs::File::create(path)?;
    for x in v.iter() {
        writeln!(f, "{:.17e}", x)?;
    }
    Ok(())
}
