//! Tuning file, environment overrides and run validation.
//!
//! Tuning values live in an optional TOML file; every field has a default.
//! The per-run paths and mode switches come from the command line as a
//! [`RunConfig`], which [`RunConfig::validate`] turns into a [`RunPlan`]
//! before any batch input is read.

use crate::defaults;
use crate::detection::detector::DetectorType;
use crate::error::{EntcorrectError, Result};
use crate::retrieval::retriever::RetrieverType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root tuning configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub retrieval: RetrievalConfig,
    pub rejection: RejectionConfig,
    pub output: OutputConfig,
}

/// Phonetic retrieval tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_score: f32,
    pub max_edit_distance: i64,
}

/// N-best rejection policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RejectionConfig {
    /// Share of hypotheses that must reproduce a mention to veto its correction.
    pub veto_ratio: f32,
    /// Keep the rank-1 hypothesis, which normally duplicates the transcript.
    pub include_top_hypothesis: bool,
}

/// Where run directories are created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: defaults::TOP_K,
            min_score: defaults::MIN_SCORE,
            max_edit_distance: defaults::MAX_EDIT_DISTANCE,
        }
    }
}

impl Default for RejectionConfig {
    fn default() -> Self {
        Self {
            veto_ratio: defaults::VETO_RATIO,
            include_top_hypothesis: defaults::INCLUDE_TOP_HYPOTHESIS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::OUTPUT_DIR),
        }
    }
}

/// A rejection policy file: only its `[rejection]` table is read.
#[derive(Debug, Deserialize)]
struct RejectionFile {
    rejection: Option<RejectionConfig>,
}

fn invalid(key: &str, message: impl Into<String>) -> EntcorrectError {
    EntcorrectError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults only when the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(EntcorrectError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - ENTCORRECT_OUTPUT_DIR → output.dir
    /// - ENTCORRECT_TOP_K → retrieval.top_k
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(defaults::ENV_OUTPUT_DIR)
            && !dir.is_empty()
        {
            self.output.dir = PathBuf::from(dir);
        }

        if let Ok(top_k) = std::env::var(defaults::ENV_TOP_K)
            && !top_k.is_empty()
        {
            match top_k.parse() {
                Ok(value) => self.retrieval.top_k = value,
                Err(_) => log::warn!("ignoring {}='{}': not a count", defaults::ENV_TOP_K, top_k),
            }
        }

        self
    }

    /// Replace the rejection policy with the `[rejection]` table of `path`.
    pub fn apply_rejection_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let file: RejectionFile = toml::from_str(&contents)?;
        let rejection = file.rejection.ok_or_else(|| {
            invalid(
                "rejection-model-path",
                format!("{} has no [rejection] table", path.display()),
            )
        })?;
        self.rejection = rejection;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(invalid("retrieval.top_k", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(invalid("retrieval.min_score", "must be within [0, 1]"));
        }
        if self.retrieval.max_edit_distance < 0 {
            return Err(invalid("retrieval.max_edit_distance", "must not be negative"));
        }
        if !(0.0..1.0).contains(&self.rejection.veto_ratio) {
            return Err(invalid("rejection.veto_ratio", "must be within [0, 1)"));
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/entcorrect/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("entcorrect").join("config.toml"))
    }
}

/// Per-run options as given on the command line, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunConfig {
    pub detection_model_type: String,
    pub detection_model_path: Option<PathBuf>,
    pub retrieval_model_type: String,
    pub entity_path: Option<PathBuf>,
    pub use_rejection: bool,
    pub transcription_path: Option<PathBuf>,
    pub manuscript_path: Option<PathBuf>,
    pub nbest_path: Option<PathBuf>,
    pub rejection_model_path: Option<PathBuf>,
}

/// A validated run: typed strategy tags and every path its mode needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub detector: DetectorType,
    /// Empty when the detector takes no model path.
    pub detection_model_path: PathBuf,
    pub retriever: RetrieverType,
    pub entity_path: PathBuf,
    pub transcription_path: PathBuf,
    /// Present exactly for the oracle detector.
    pub manuscript_path: Option<PathBuf>,
    /// Present exactly when rejection is enabled.
    pub nbest_path: Option<PathBuf>,
    pub tuning: Config,
}

fn required(path: &Option<PathBuf>, option: &str, reason: &str) -> Result<PathBuf> {
    match path {
        Some(p) if !p.as_os_str().is_empty() => Ok(p.clone()),
        _ => Err(EntcorrectError::MissingPath {
            option: option.to_string(),
            reason: reason.to_string(),
        }),
    }
}

impl RunConfig {
    /// Resolve tags and mode-conditional paths. Touches only the rejection
    /// policy file; batch inputs are not opened here.
    pub fn validate(&self, mut tuning: Config) -> Result<RunPlan> {
        let detector: DetectorType = self.detection_model_type.parse()?;
        let retriever: RetrieverType = self.retrieval_model_type.parse()?;

        let transcription_path = required(
            &self.transcription_path,
            "asr-transcription-path",
            "the transcript to correct",
        )?;
        let entity_path = required(
            &self.entity_path,
            "entity-path",
            "the retriever needs an entity dictionary",
        )?;

        let detection_model_path = match detector {
            DetectorType::Model => required(
                &self.detection_model_path,
                "detection-model-path",
                "the model detector needs a model directory or repo id",
            )?,
            _ => self.detection_model_path.clone().unwrap_or_default(),
        };

        let manuscript_path = match detector {
            DetectorType::Oracle => Some(required(
                &self.manuscript_path,
                "asr-manuscript-path",
                "oracle detection diffs against the reference manuscript",
            )?),
            _ => None,
        };

        let nbest_path = if self.use_rejection {
            if let Some(policy) = &self.rejection_model_path {
                tuning.apply_rejection_file(policy)?;
            }
            Some(required(
                &self.nbest_path,
                "asr-nbest-transcription-path",
                "rejection needs N-best hypotheses",
            )?)
        } else {
            None
        };

        tuning.validate()?;

        Ok(RunPlan {
            detector,
            detection_model_path,
            retriever,
            entity_path,
            transcription_path,
            manuscript_path,
            nbest_path,
            tuning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_env() {
        remove_env(defaults::ENV_OUTPUT_DIR);
        remove_env(defaults::ENV_TOP_K);
    }

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn lexical_run() -> RunConfig {
        RunConfig {
            detection_model_type: "lexical".to_string(),
            retrieval_model_type: "phonetic".to_string(),
            entity_path: Some(PathBuf::from("entities.txt")),
            transcription_path: Some(PathBuf::from("text")),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.min_score, 0.5);
        assert_eq!(config.retrieval.max_edit_distance, 2);
        assert_eq!(config.rejection.veto_ratio, 0.5);
        assert!(!config.rejection.include_top_hypothesis);
        assert_eq!(config.output.dir, PathBuf::from("./dump"));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = toml_file(
            r#"
            [retrieval]
            top_k = 3

            [rejection]
            include_top_hypothesis = true
        "#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.min_score, 0.5);
        assert!(config.rejection.include_top_hypothesis);
        assert_eq!(config.rejection.veto_ratio, 0.5);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let file = toml_file("[retrieval\ntop_k = ");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, EntcorrectError::Config(_)));
    }

    #[test]
    fn test_load_or_default_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_propagates_invalid_toml() {
        let file = toml_file("[output\n");
        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        set_env(defaults::ENV_OUTPUT_DIR, "/tmp/runs");
        set_env(defaults::ENV_TOP_K, "2");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.output.dir, PathBuf::from("/tmp/runs"));
        assert_eq!(config.retrieval.top_k, 2);

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_or_empty_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        set_env(defaults::ENV_TOP_K, "many");
        set_env(defaults::ENV_OUTPUT_DIR, "");
        let config = Config::default().with_env_overrides();
        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.retrieval.top_k = 0;
        assert!(config.validate().unwrap_err().to_string().contains("top_k"));

        let mut config = Config::default();
        config.rejection.veto_ratio = 1.0;
        assert!(config.validate().unwrap_err().to_string().contains("veto_ratio"));
    }

    #[test]
    fn test_rejection_file_overrides_policy() {
        let file = toml_file("[rejection]\nveto_ratio = 0.3\n");
        let mut config = Config::default();
        config.apply_rejection_file(file.path()).unwrap();
        assert_eq!(config.rejection.veto_ratio, 0.3);

        let file = toml_file("[retrieval]\ntop_k = 1\n");
        let err = config.apply_rejection_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("[rejection]"));
    }

    #[test]
    fn test_validate_lexical_run() {
        let plan = lexical_run().validate(Config::default()).unwrap();
        assert_eq!(plan.detector, DetectorType::Lexical);
        assert_eq!(plan.retriever, RetrieverType::Phonetic);
        assert_eq!(plan.manuscript_path, None);
        assert_eq!(plan.nbest_path, None);
        assert_eq!(plan.detection_model_path, PathBuf::new());
    }

    #[test]
    fn test_unknown_tags_fail() {
        let mut run = lexical_run();
        run.detection_model_type = "crf".to_string();
        let err = run.validate(Config::default()).unwrap_err();
        assert!(matches!(err, EntcorrectError::UnknownDetectorType { .. }));

        let mut run = lexical_run();
        run.retrieval_model_type = "dense".to_string();
        let err = run.validate(Config::default()).unwrap_err();
        assert!(matches!(err, EntcorrectError::UnknownRetrieverType { .. }));
    }

    #[test]
    fn test_oracle_requires_manuscript() {
        let mut run = lexical_run();
        run.detection_model_type = "oracle".to_string();
        let err = run.validate(Config::default()).unwrap_err();
        assert!(err.to_string().contains("asr-manuscript-path"));

        run.manuscript_path = Some(PathBuf::from("ref"));
        let plan = run.validate(Config::default()).unwrap();
        assert_eq!(plan.manuscript_path, Some(PathBuf::from("ref")));
    }

    #[test]
    fn test_rejection_requires_nbest() {
        let mut run = lexical_run();
        run.use_rejection = true;
        let err = run.validate(Config::default()).unwrap_err();
        assert!(err.to_string().contains("asr-nbest-transcription-path"));

        run.nbest_path = Some(PathBuf::from("nbest"));
        let plan = run.validate(Config::default()).unwrap();
        assert_eq!(plan.nbest_path, Some(PathBuf::from("nbest")));
    }

    #[test]
    fn test_nbest_ignored_without_rejection() {
        let mut run = lexical_run();
        run.nbest_path = Some(PathBuf::from("nbest"));
        let plan = run.validate(Config::default()).unwrap();
        assert_eq!(plan.nbest_path, None);
    }

    #[test]
    fn test_model_detector_requires_path() {
        let mut run = lexical_run();
        run.detection_model_type = "bert".to_string();
        let err = run.validate(Config::default()).unwrap_err();
        assert!(err.to_string().contains("detection-model-path"));
    }

    #[test]
    fn test_missing_transcript_and_entities() {
        let mut run = lexical_run();
        run.transcription_path = None;
        let err = run.validate(Config::default()).unwrap_err();
        assert!(err.to_string().contains("asr-transcription-path"));

        let mut run = lexical_run();
        run.entity_path = Some(PathBuf::new());
        let err = run.validate(Config::default()).unwrap_err();
        assert!(err.to_string().contains("entity-path"));
    }

    #[test]
    fn test_run_applies_rejection_policy_file() {
        let policy = toml_file("[rejection]\nveto_ratio = 0.75\n");
        let mut run = lexical_run();
        run.use_rejection = true;
        run.nbest_path = Some(PathBuf::from("nbest"));
        run.rejection_model_path = Some(policy.path().to_path_buf());
        let plan = run.validate(Config::default()).unwrap();
        assert_eq!(plan.tuning.rejection.veto_ratio, 0.75);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_default_path_ends_with_crate_dir() {
        if let Some(path) = Config::default_path() {
            assert!(path.ends_with("entcorrect/config.toml"));
        }
    }
}
