//! Fixed model catalog and workload grids swept by the orchestrator.

use crate::errors::BenchError;
use std::fmt;
use std::str::FromStr;

/// Backbones profiled by the sweep, in sweep order.
pub const MODELS: [&str; 12] = [
    "google_en_uncased_bert_base",
    "google_en_uncased_bert_large",
    "google_albert_base_v2",
    "google_albert_large_v2",
    "google_albert_xlarge_v2",
    "google_albert_xxlarge_v2",
    "google_electra_small",
    "google_electra_base",
    "google_electra_large",
    "google_uncased_mobilebert",
    "fairseq_bart_base",
    "fairseq_bart_large",
];

/// BART backbones do not support a compute layout that differs from the input layout.
pub const LAYOUT_RESTRICTED_FAMILY: &str = "bart";

/// One input shape to benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Workload {
    pub batch_size: usize,
    pub sequence_length: usize,
}

impl Workload {
    pub const fn new(batch_size: usize, sequence_length: usize) -> Self {
        Self {
            batch_size,
            sequence_length,
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.batch_size, self.sequence_length)
    }
}

pub const TRAIN_WORKLOADS: [Workload; 8] = [
    Workload::new(4, 128),
    Workload::new(8, 128),
    Workload::new(16, 128),
    Workload::new(32, 128),
    Workload::new(1, 512),
    Workload::new(2, 512),
    Workload::new(4, 512),
    Workload::new(8, 512),
];

pub const INFERENCE_WORKLOADS: [Workload; 9] = [
    Workload::new(1, 128),
    Workload::new(1, 384),
    Workload::new(1, 512),
    Workload::new(8, 32),
    Workload::new(8, 128),
    Workload::new(8, 512),
    Workload::new(32, 512),
    Workload::new(256, 128),
    Workload::new(400, 100),
];

/// Whether the collaborator profiles training steps or inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Train,
    Inference,
}

impl Mode {
    /// Label used in output directory and summary file names.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Inference => "infer",
        }
    }

    pub fn workloads(&self) -> &'static [Workload] {
        match self {
            Mode::Train => &TRAIN_WORKLOADS,
            Mode::Inference => &INFERENCE_WORKLOADS,
        }
    }

    pub fn is_train(&self) -> bool {
        matches!(self, Mode::Train)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => write!(f, "train"),
            Mode::Inference => write!(f, "inference"),
        }
    }
}

impl FromStr for Mode {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Mode::Train),
            "inference" => Ok(Mode::Inference),
            other => Err(BenchError::UnsupportedMode(other.to_string())),
        }
    }
}

/// Instance type hint forwarded to the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceType {
    C4,
    C5,
    #[default]
    G4,
    P3,
}

impl InstanceType {
    pub const VARIANTS: [&'static str; 4] = ["c4", "c5", "g4", "p3"];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceType::C4 => "c4",
            InstanceType::C5 => "c5",
            InstanceType::G4 => "g4",
            InstanceType::P3 => "p3",
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceType {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c4" => Ok(InstanceType::C4),
            "c5" => Ok(InstanceType::C5),
            "g4" => Ok(InstanceType::G4),
            "p3" => Ok(InstanceType::P3),
            other => Err(BenchError::ConfigError(format!(
                "Unknown instance type '{}', expected one of {}",
                other,
                Self::VARIANTS.join(", ")
            ))),
        }
    }
}

/// Floating point precision of the benchmarked model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Float32,
    Float16,
}

impl Precision {
    pub fn from_fp16_flag(use_fp16: bool) -> Self {
        if use_fp16 {
            Precision::Float16
        } else {
            Precision::Float32
        }
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            Precision::Float32 => "float32",
            Precision::Float16 => "float16",
        }
    }

    pub fn is_fp16(&self) -> bool {
        matches!(self, Precision::Float16)
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dtype())
    }
}

/// Models to profile for a layout pair. BART is skipped when the layouts differ.
pub fn profile_models(layout: &str, compute_layout: &str) -> Vec<&'static str> {
    if compute_layout != layout {
        MODELS
            .iter()
            .copied()
            .filter(|model| !model.contains(LAYOUT_RESTRICTED_FAMILY))
            .collect()
    } else {
        MODELS.to_vec()
    }
}
