//! Default configuration constants for entcorrect.
//!
//! Shared between the TOML config layer, the CLI, and the components that
//! take explicit tuning values, so every default lives in one place.

/// Number of candidates the retriever returns per mention.
pub const TOP_K: usize = 5;

/// Minimum similarity score for a dictionary entry to be returned as a candidate.
///
/// Score is `1 - distance / max_len` over phonetic keys, so 0.5 means at most
/// half of the longer key may differ.
pub const MIN_SCORE: f32 = 0.5;

/// Maximum edit distance searched in the phonetic index.
///
/// Entries further away than this are never candidates, regardless of score.
pub const MAX_EDIT_DISTANCE: i64 = 2;

/// Prefix length used when building the phonetic index.
pub const INDEX_PREFIX_LENGTH: i64 = 7;

/// Share of N-best hypotheses that must reproduce the original mention
/// (strictly more than this) before the rejector keeps the original text.
pub const VETO_RATIO: f32 = 0.5;

/// Whether the rank-1 N-best hypothesis takes part in confirmation.
///
/// Rank 1 normally repeats the transcript being corrected.
pub const INCLUDE_TOP_HYPOTHESIS: bool = false;

/// Entity type assigned when a lexicon line carries no explicit type.
pub const DEFAULT_ENTITY_TYPE: &str = "ENTITY";

/// Root directory that receives timestamped run directories.
pub const OUTPUT_DIR: &str = "./dump";

/// `chrono` format string for run directory names.
pub const RUN_DIR_FORMAT: &str = "%Y_%m_%d__%H_%M_%S";

/// File name of the corrected transcript inside a run directory.
pub const HYP_FILENAME: &str = "hyp";

/// File name of the per-utterance decision report inside a run directory.
pub const REPORT_FILENAME: &str = "decisions.jsonl";

/// Environment variable overriding the output root directory.
pub const ENV_OUTPUT_DIR: &str = "ENTCORRECT_OUTPUT_DIR";

/// Environment variable overriding the retriever's top-k.
pub const ENV_TOP_K: &str = "ENTCORRECT_TOP_K";
