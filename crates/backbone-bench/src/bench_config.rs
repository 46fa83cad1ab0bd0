use crate::catalog::{self, InstanceType, Mode, Precision, Workload};
use crate::errors::{BenchError, BenchResult};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_LAYOUT: &str = "NT";
pub const SUMMARY_PREFIX: &str = "gluonnlp";
const ENV_PREFIX: &str = "BACKBONE_BENCH";
const CHILD_ENV_PREFIX: &str = "BACKBONE_BENCH_ENV__";

/// When the accumulated results table is written to the summary CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointPolicy {
    /// Overwrite the summary after every (model, workload) task so partial
    /// progress survives a crash.
    #[default]
    EveryTask,
    /// Write the summary once, after the last task.
    EndOfSweep,
}

impl FromStr for CheckpointPolicy {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "every" => Ok(CheckpointPolicy::EveryTask),
            "end" => Ok(CheckpointPolicy::EndOfSweep),
            other => Err(BenchError::ConfigError(format!(
                "Unknown checkpoint policy '{}', expected 'every' or 'end'",
                other
            ))),
        }
    }
}

impl fmt::Display for CheckpointPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointPolicy::EveryTask => write!(f, "every"),
            CheckpointPolicy::EndOfSweep => write!(f, "end"),
        }
    }
}

/// Sweep parameters as given on the command line, before resolution.
#[derive(Debug, Clone)]
pub struct SweepArgs {
    pub layout: String,
    pub compute_layout: Option<String>,
    pub use_tvm: bool,
    pub instance_type: String,
    pub use_fp16: bool,
    pub mode: String,
    pub output_root: PathBuf,
    pub checkpoint: CheckpointPolicy,
}

impl Default for SweepArgs {
    fn default() -> Self {
        SweepArgs {
            layout: DEFAULT_LAYOUT.to_string(),
            compute_layout: None,
            use_tvm: false,
            instance_type: InstanceType::default().to_string(),
            use_fp16: false,
            mode: Mode::default().to_string(),
            output_root: PathBuf::from("."),
            checkpoint: CheckpointPolicy::default(),
        }
    }
}

/// Resolved, immutable sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub layout: String,
    pub compute_layout: String,
    pub use_tvm: bool,
    pub instance_type: InstanceType,
    pub precision: Precision,
    pub mode: Mode,
    pub output_root: PathBuf,
    pub checkpoint: CheckpointPolicy,
}

impl SweepConfig {
    /// Resolve raw arguments. Fails before any side effect on an unsupported
    /// mode or instance type.
    pub fn resolve(args: SweepArgs) -> BenchResult<SweepConfig> {
        let mode: Mode = args.mode.parse()?;
        let instance_type: InstanceType = args.instance_type.parse()?;
        if args.layout.is_empty() {
            return Err(BenchError::ConfigError("Layout must not be empty".to_string()));
        }
        let compute_layout = args
            .compute_layout
            .filter(|layout| !layout.is_empty())
            .unwrap_or_else(|| args.layout.clone());

        Ok(SweepConfig {
            layout: args.layout,
            compute_layout,
            use_tvm: args.use_tvm,
            instance_type,
            precision: Precision::from_fp16_flag(args.use_fp16),
            mode,
            output_root: args.output_root,
            checkpoint: args.checkpoint,
        })
    }

    pub fn models(&self) -> Vec<&'static str> {
        catalog::profile_models(&self.layout, &self.compute_layout)
    }

    pub fn workloads(&self) -> &'static [Workload] {
        self.mode.workloads()
    }

    /// TVM only applies to inference; training always runs the default engine.
    pub fn effective_use_tvm(&self) -> bool {
        !self.mode.is_train() && self.use_tvm
    }

    fn run_tag(&self) -> String {
        let base = format!(
            "{}_{}_{}_{}",
            self.mode.label(),
            self.precision.dtype(),
            self.layout,
            self.compute_layout
        );
        match self.mode {
            Mode::Train => base,
            Mode::Inference => format!("{}_tvm{}", base, u8::from(self.use_tvm)),
        }
    }

    /// Directory name holding the per-task CSVs, e.g. `infer_float32_NT_NT_tvm0`.
    pub fn output_dir_name(&self) -> String {
        self.run_tag()
    }

    /// Summary file name, e.g. `gluonnlp_train_float16_NC_NC.csv`.
    pub fn summary_file_name(&self) -> String {
        format!("{}_{}.csv", SUMMARY_PREFIX, self.run_tag())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(self.output_dir_name())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_root.join(self.summary_file_name())
    }

    pub fn total_tasks(&self) -> usize {
        self.models().len() * self.workloads().len()
    }
}

impl fmt::Display for SweepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode={} dtype={} layout={} compute_layout={} use_tvm={} instance_type={} checkpoint={}",
            self.mode,
            self.precision,
            self.layout,
            self.compute_layout,
            self.effective_use_tvm(),
            self.instance_type,
            self.checkpoint
        )
    }
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-m".to_string(), "gluonnlp_backbone_benchmark".to_string()]
}

/// How the external backbone benchmark is launched for each task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorSettings {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub env_file: Option<PathBuf>,
    /// Child environment. Read outside `config`, which lowercases keys.
    #[serde(default, skip_deserializing)]
    pub env: HashMap<String, String>,
}

#[derive(Deserialize, Default)]
struct EnvTable {
    #[serde(default)]
    env: HashMap<String, toml::Value>,
}

impl Default for CollaboratorSettings {
    fn default() -> Self {
        CollaboratorSettings {
            program: default_program(),
            args: default_args(),
            env_file: None,
            env: HashMap::new(),
        }
    }
}

impl CollaboratorSettings {
    /// Layer defaults, an optional TOML file and `BACKBONE_BENCH_*` environment variables.
    pub fn load(file: Option<&Path>) -> BenchResult<Self> {
        let mut builder = Config::builder()
            .set_default("program", default_program())?
            .set_default("args", default_args())?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("args")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: CollaboratorSettings = config.try_deserialize()?;
        if settings.program.trim().is_empty() {
            return Err(BenchError::ConfigError(
                "Benchmark program must not be empty".to_string(),
            ));
        }
        settings.env = Self::load_child_env(file)?;
        Ok(settings)
    }

    /// `[env]` from the TOML file, then `BACKBONE_BENCH_ENV__<NAME>` variables,
    /// with key case preserved.
    fn load_child_env(file: Option<&Path>) -> BenchResult<HashMap<String, String>> {
        let mut child_env = HashMap::new();
        if let Some(path) = file {
            let content = fs::read_to_string(path)?;
            let table: EnvTable = toml::from_str(&content).map_err(|e| {
                BenchError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            for (key, value) in table.env {
                let value = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                child_env.insert(key, value);
            }
        }

        for (key, value) in env::vars() {
            if let Some(name) = key.strip_prefix(CHILD_ENV_PREFIX) {
                if !name.is_empty() {
                    child_env.insert(name.to_string(), value);
                }
            }
        }
        Ok(child_env)
    }

    /// Environment for every child: the env file first, explicit entries override it.
    pub fn child_environment(&self) -> BenchResult<Vec<(String, String)>> {
        let mut envs = Vec::new();
        if let Some(env_file) = &self.env_file {
            let iter = dotenvy::from_path_iter(env_file).map_err(|e| {
                BenchError::EnvironmentError(format!(
                    "Failed to open env file {}: {}",
                    env_file.display(),
                    e
                ))
            })?;
            for item in iter {
                let (key, value) = item.map_err(|e| {
                    BenchError::EnvironmentError(format!(
                        "Failed to parse env file {}: {}",
                        env_file.display(),
                        e
                    ))
                })?;
                envs.push((key, value));
            }
        }

        let mut explicit: Vec<(String, String)> = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        explicit.sort();
        envs.extend(explicit);
        Ok(envs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;
    use test_case::test_case;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("BACKBONE_BENCH_") {
                env::remove_var(&key);
            }
        }
    }

    fn args(mode: &str, layout: &str, compute_layout: Option<&str>) -> SweepArgs {
        SweepArgs {
            mode: mode.to_string(),
            layout: layout.to_string(),
            compute_layout: compute_layout.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_inference_defaults_naming() {
        let config = SweepConfig::resolve(args("inference", "NT", None)).unwrap();
        assert_eq!(config.output_dir_name(), "infer_float32_NT_NT_tvm0");
        assert_eq!(config.summary_file_name(), "gluonnlp_infer_float32_NT_NT_tvm0.csv");
    }

    #[test]
    fn test_train_fp16_resolves_compute_layout() {
        let mut raw = args("train", "NC", None);
        raw.use_fp16 = true;
        let config = SweepConfig::resolve(raw).unwrap();
        assert_eq!(config.precision, Precision::Float16);
        assert_eq!(config.compute_layout, "NC");
        assert_eq!(config.output_dir_name(), "train_float16_NC_NC");
        assert_eq!(config.summary_file_name(), "gluonnlp_train_float16_NC_NC.csv");
    }

    #[test_case("train", false, "train_float32_NT_TN" ; "train ignores tvm flag")]
    #[test_case("train", true, "train_float32_NT_TN" ; "train with tvm flag")]
    #[test_case("inference", false, "infer_float32_NT_TN_tvm0" ; "inference without tvm")]
    #[test_case("inference", true, "infer_float32_NT_TN_tvm1" ; "inference with tvm")]
    fn test_output_dir_name(mode: &str, use_tvm: bool, expected: &str) {
        let mut raw = args(mode, "NT", Some("TN"));
        raw.use_tvm = use_tvm;
        let config = SweepConfig::resolve(raw).unwrap();
        assert_eq!(config.output_dir_name(), expected);
        assert_eq!(config.output_dir(), PathBuf::from(".").join(expected));
    }

    #[test]
    fn test_naming_is_deterministic() {
        let a = SweepConfig::resolve(args("inference", "TN", Some("NT"))).unwrap();
        let b = SweepConfig::resolve(args("inference", "TN", Some("NT"))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.output_dir(), b.output_dir());
        assert_eq!(a.summary_path(), b.summary_path());
    }

    #[test]
    fn test_train_never_uses_tvm() {
        let mut raw = args("train", "NT", None);
        raw.use_tvm = true;
        assert!(!SweepConfig::resolve(raw).unwrap().effective_use_tvm());

        let mut raw = args("inference", "NT", None);
        raw.use_tvm = true;
        assert!(SweepConfig::resolve(raw).unwrap().effective_use_tvm());
    }

    #[test]
    fn test_unsupported_mode_is_rejected() {
        let err = SweepConfig::resolve(args("finetune", "NT", None)).unwrap_err();
        assert!(matches!(err, BenchError::UnsupportedMode(ref m) if m == "finetune"));
    }

    #[test]
    fn test_unknown_instance_type_is_rejected() {
        let mut raw = args("train", "NT", None);
        raw.instance_type = "m5".to_string();
        assert!(matches!(
            SweepConfig::resolve(raw),
            Err(BenchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_task_counts() {
        let same = SweepConfig::resolve(args("train", "NT", None)).unwrap();
        assert_eq!(same.total_tasks(), 12 * 8);
        let mixed = SweepConfig::resolve(args("inference", "NT", Some("TN"))).unwrap();
        assert_eq!(mixed.total_tasks(), 10 * 9);
    }

    #[test]
    fn test_empty_layout_strings() {
        let config = SweepConfig::resolve(args("train", "TN", Some(""))).unwrap();
        assert_eq!(config.compute_layout, "TN");
        assert_eq!(config.output_dir_name(), "train_float32_TN_TN");

        assert!(matches!(
            SweepConfig::resolve(args("train", "", None)),
            Err(BenchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_checkpoint_policy_parsing() {
        assert_eq!("every".parse::<CheckpointPolicy>().unwrap(), CheckpointPolicy::EveryTask);
        assert_eq!("end".parse::<CheckpointPolicy>().unwrap(), CheckpointPolicy::EndOfSweep);
        assert!("never".parse::<CheckpointPolicy>().is_err());
    }

    #[test]
    #[serial]
    fn test_collaborator_defaults() {
        clean_env();
        let settings = CollaboratorSettings::load(None).unwrap();
        assert_eq!(settings, CollaboratorSettings::default());
    }

    #[test]
    #[serial]
    fn test_collaborator_file_and_env_layers() {
        clean_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collaborator.toml");
        fs::write(
            &path,
            "program = \"/opt/bench/python\"\nargs = [\"run_backbone.py\"]\n\n[env]\nCUDA_VISIBLE_DEVICES = \"0\"\nOMP_NUM_THREADS = 4\n",
        )
        .unwrap();

        let settings = CollaboratorSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.program, "/opt/bench/python");
        assert_eq!(settings.args, vec!["run_backbone.py".to_string()]);
        assert_eq!(
            settings.env.get("CUDA_VISIBLE_DEVICES").map(String::as_str),
            Some("0")
        );

        assert_eq!(
            settings.env.get("OMP_NUM_THREADS").map(String::as_str),
            Some("4")
        );
        assert!(!settings.env.contains_key("cuda_visible_devices"));

        env::set_var("BACKBONE_BENCH_PROGRAM", "python3.8");
        env::set_var("BACKBONE_BENCH_ENV__OMP_NUM_THREADS", "16");
        env::set_var("BACKBONE_BENCH_ENV__MXNET_GPU_MEM_POOL_TYPE", "Round");
        let settings = CollaboratorSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.program, "python3.8");
        assert_eq!(
            settings.env.get("OMP_NUM_THREADS").map(String::as_str),
            Some("16")
        );
        assert_eq!(
            settings.env.get("MXNET_GPU_MEM_POOL_TYPE").map(String::as_str),
            Some("Round")
        );
        assert!(!settings.env.contains_key("omp_num_threads"));
        assert!(!settings.env.contains_key("mxnet_gpu_mem_pool_type"));
        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_collaborator_file_is_an_error() {
        clean_env();
        let dir = TempDir::new().unwrap();
        let result = CollaboratorSettings::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(BenchError::ConfigError(_))));
    }

    #[test]
    fn test_child_environment_merges_env_file() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join("bench.env");
        fs::write(&env_file, "# comment\nOMP_NUM_THREADS=4\nCUDA_VISIBLE_DEVICES=\"0\"\n").unwrap();

        let mut settings = CollaboratorSettings {
            env_file: Some(env_file),
            ..Default::default()
        };
        settings
            .env
            .insert("OMP_NUM_THREADS".to_string(), "8".to_string());

        let envs = settings.child_environment().unwrap();
        assert!(envs.contains(&("CUDA_VISIBLE_DEVICES".to_string(), "0".to_string())));
        // explicit entries come last so they win when applied in order
        let last_omp = envs
            .iter()
            .rev()
            .find(|(k, _)| k == "OMP_NUM_THREADS")
            .map(|(_, v)| v.as_str());
        assert_eq!(last_omp, Some("8"));
    }

    #[test]
    fn test_child_environment_missing_env_file() {
        let settings = CollaboratorSettings {
            env_file: Some(PathBuf::from("/nonexistent/bench.env")),
            ..Default::default()
        };
        assert!(matches!(
            settings.child_environment(),
            Err(BenchError::EnvironmentError(_))
        ));
    }
}
