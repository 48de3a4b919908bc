//! Command-line interface for entcorrect
//!
//! Provides argument parsing using clap derive macros. Every option accepts
//! both its kebab-case name and the snake_case spelling.

use crate::config::RunConfig;
use clap::Parser;
use std::path::PathBuf;

/// Named-entity correction for ASR transcripts
#[derive(Parser, Debug)]
#[command(
    name = "entcorrect",
    version,
    about = "Correct named entities in ASR transcripts against an entity dictionary"
)]
pub struct Cli {
    /// Detector: model (bert), lexical (ckip), oracle (cheat)
    #[arg(long, alias = "detection_model_type", value_name = "TYPE")]
    pub detection_model_type: String,

    /// Model directory or repo id (model), optional lexicon file (lexical)
    #[arg(long, alias = "detection_model_path", value_name = "PATH")]
    pub detection_model_path: Option<PathBuf>,

    /// Retriever: phonetic (pinyin)
    #[arg(long, alias = "retrieval_model_type", value_name = "TYPE")]
    pub retrieval_model_type: String,

    /// Entity dictionary, one `surface [TYPE]` per line
    #[arg(long, alias = "entity_path", value_name = "PATH")]
    pub entity_path: Option<PathBuf>,

    /// Veto corrections the N-best list does not support (true/false)
    #[arg(
        long,
        alias = "use_rejection",
        value_name = "BOOL",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_bool_flag
    )]
    pub use_rejection: bool,

    /// Transcript to correct: `<id> <text>` per line
    #[arg(long, alias = "asr_transcription_path", value_name = "PATH")]
    pub asr_transcription_path: Option<PathBuf>,

    /// Reference transcript, required by the oracle detector
    #[arg(long, alias = "asr_manuscript_path", value_name = "PATH")]
    pub asr_manuscript_path: Option<PathBuf>,

    /// N-best hypotheses, required with rejection
    #[arg(long, alias = "asr_nbest_transcription_path", value_name = "PATH")]
    pub asr_nbest_transcription_path: Option<PathBuf>,

    /// TOML file whose [rejection] table overrides the rejection policy
    #[arg(long, alias = "rejection_model_path", value_name = "PATH")]
    pub rejection_model_path: Option<PathBuf>,

    /// Root directory for timestamped run directories
    #[arg(long, alias = "output_dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose output (-v: per-decision debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a boolean option value.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`, case-insensitively.
fn parse_bool_flag(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("expected true or false, got '{other}'")),
    }
}

impl Cli {
    /// Per-run options for validation.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            detection_model_type: self.detection_model_type.clone(),
            detection_model_path: self.detection_model_path.clone(),
            retrieval_model_type: self.retrieval_model_type.clone(),
            entity_path: self.entity_path.clone(),
            use_rejection: self.use_rejection,
            transcription_path: self.asr_transcription_path.clone(),
            manuscript_path: self.asr_manuscript_path.clone(),
            nbest_path: self.asr_nbest_transcription_path.clone(),
            rejection_model_path: self.rejection_model_path.clone(),
        }
    }

    /// Log filter implied by `-q` and `-v`.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
