use anyhow::{Context, Result};
use clap::Parser;
use entcorrect::cli::Cli;
use entcorrect::config::{Config, RunPlan};
use entcorrect::pipeline::Pipeline;
use entcorrect::run::{RunDirectory, timestamp_now};
use entcorrect::transcript::{
    align_nbest, align_references, read_entity_dictionary, read_nbest, read_transcript,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level().as_str()),
    )
    .init();
    log::debug!("entcorrect {}", entcorrect::version_string());

    // Everything that can be rejected up front is checked before the batch is read.
    let config = load_config(cli.config.as_deref())?;
    let plan = cli.run_config().validate(config)?;
    let output_root = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| plan.tuning.output.dir.clone());

    log::info!(
        "detector={} retriever={} rejection={} top_k={} veto_ratio={}",
        plan.detector.as_str(),
        plan.retriever.as_str(),
        plan.nbest_path.is_some(),
        plan.tuning.retrieval.top_k,
        plan.tuning.rejection.veto_ratio
    );

    let entities = read_entity_dictionary(&plan.entity_path)?;
    log::info!(
        "entity dictionary: {} entries from {}",
        entities.len(),
        plan.entity_path.display()
    );
    let pipeline = Pipeline::build(&plan, &entities)?;

    let records = run_batch(&pipeline, &plan, cli.quiet)?;

    let run = RunDirectory::create(&output_root, &timestamp_now())
        .with_context(|| format!("Failed to create run directory in {}", output_root.display()))?;
    let hyp_path = run.write(&records)?;
    log::info!("wrote {} utterances to {}", records.len(), hyp_path.display());
    println!("{}", run.path().display());

    Ok(())
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else if let Some(default_path) = Config::default_path() {
        // Try default path, fall back to defaults
        Config::load_or_default(&default_path)?
    } else {
        Config::default()
    };

    // Apply environment variable overrides
    Ok(config.with_env_overrides())
}

/// Read the batch inputs and correct every utterance.
fn run_batch(
    pipeline: &Pipeline,
    plan: &RunPlan,
    quiet: bool,
) -> Result<Vec<entcorrect::pipeline::CorrectionRecord>> {
    let utterances = read_transcript(&plan.transcription_path)?;
    log::info!(
        "{} utterances from {}",
        utterances.len(),
        plan.transcription_path.display()
    );

    let references = match &plan.manuscript_path {
        Some(path) => Some(align_references(
            &utterances,
            read_transcript(path)?,
            &path.display().to_string(),
        )?),
        None => None,
    };

    let nbests = match &plan.nbest_path {
        Some(path) => Some(align_nbest(
            &utterances,
            read_nbest(path)?,
            plan.tuning.rejection.include_top_hypothesis,
        )),
        None => None,
    };

    let pb = progress_bar(utterances.len() as u64, quiet);
    let records = pipeline.correct_batch(
        &utterances,
        references.as_deref(),
        nbests.as_deref(),
        &|| pb.inc(1),
    )?;
    pb.finish_and_clear();
    Ok(records)
}

fn progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
