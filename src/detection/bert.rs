//! BERT token-classification tagger using candle.
//!
//! Loads `config.json`, `tokenizer.json` and `model.safetensors` from a local
//! directory, or from the HuggingFace hub when the path is not a directory.
//! Labels come from the config's `id2label` table.

use crate::detection::model::{TaggedToken, TokenTagger};
use crate::error::{EntcorrectError, Result};

use candle_core::{D, DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::api::sync::Api;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

const CONFIG_FILENAME: &str = "config.json";
const TOKENIZER_FILENAME: &str = "tokenizer.json";
const WEIGHTS_FILENAME: &str = "model.safetensors";

/// Classification head fields that `BertConfig` does not carry.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    id2label: HashMap<String, String>,
}

pub struct BertTagger {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
    name: String,
}

fn load_err(path: &Path, message: impl std::fmt::Display) -> EntcorrectError {
    EntcorrectError::ModelLoad {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn infer_err(message: impl std::fmt::Display) -> EntcorrectError {
    EntcorrectError::ModelInference {
        message: message.to_string(),
    }
}

/// Resolve the three model files, downloading from the hub for non-directories.
fn resolve_files(model_path: &Path) -> Result<(PathBuf, PathBuf, PathBuf)> {
    if model_path.is_dir() {
        return Ok((
            model_path.join(CONFIG_FILENAME),
            model_path.join(TOKENIZER_FILENAME),
            model_path.join(WEIGHTS_FILENAME),
        ));
    }
    let api = Api::new().map_err(|e| load_err(model_path, format!("HF Hub API init: {e}")))?;
    let repo = api.model(model_path.to_string_lossy().to_string());
    let get = |name: &str| {
        repo.get(name)
            .map_err(|e| load_err(model_path, format!("download {name}: {e}")))
    };
    Ok((
        get(CONFIG_FILENAME)?,
        get(TOKENIZER_FILENAME)?,
        get(WEIGHTS_FILENAME)?,
    ))
}

impl BertTagger {
    pub fn load(model_path: &Path) -> Result<Self> {
        let device = Device::Cpu;
        let (config_path, tokenizer_path, weights_path) = resolve_files(model_path)?;

        let config_contents = std::fs::read_to_string(&config_path)
            .map_err(|e| load_err(&config_path, format!("read config: {e}")))?;
        let config: BertConfig = serde_json::from_str(&config_contents)
            .map_err(|e| load_err(&config_path, format!("parse config: {e}")))?;
        let head: HeadConfig = serde_json::from_str(&config_contents)
            .map_err(|e| load_err(&config_path, format!("parse id2label: {e}")))?;

        let mut labels = vec!["O".to_string(); head.id2label.len()];
        for (id, label) in head.id2label {
            let index: usize = id
                .parse()
                .map_err(|e| load_err(&config_path, format!("label id '{id}': {e}")))?;
            let slot = labels
                .get_mut(index)
                .ok_or_else(|| load_err(&config_path, format!("label id {index} out of range")))?;
            *slot = label;
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| load_err(&tokenizer_path, format!("tokenizer: {e}")))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: config.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(|e| load_err(&tokenizer_path, format!("truncation config: {e}")))?;

        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device)
                .map_err(|e| load_err(&weights_path, format!("weights: {e}")))?
        };
        let model = BertModel::load(vb.pp("bert"), &config)
            .map_err(|e| load_err(&weights_path, format!("encoder: {e}")))?;
        let classifier = candle_nn::linear(head.hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| load_err(&weights_path, format!("classifier: {e}")))?;

        log::info!(
            "loaded BERT tagger from {} ({} labels)",
            model_path.display(),
            labels.len()
        );

        Ok(Self {
            model,
            classifier,
            tokenizer,
            labels,
            device,
            name: model_path.display().to_string(),
        })
    }
}

impl TokenTagger for BertTagger {
    fn tag(&self, text: &str) -> Result<Vec<TaggedToken>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| infer_err(format!("tokenization: {e}")))?;

        let len = encoding.get_ids().len();
        let tensor = |values: &[u32]| {
            Tensor::new(values, &self.device)
                .and_then(|t| t.reshape((1, len)))
                .map_err(infer_err)
        };
        let input_ids = tensor(encoding.get_ids())?;
        let type_ids = tensor(encoding.get_type_ids())?;
        let attention_mask = tensor(encoding.get_attention_mask())?;

        let hidden = self
            .model
            .forward(&input_ids, &type_ids, Some(&attention_mask))
            .map_err(infer_err)?;
        let predictions: Vec<u32> = self
            .classifier
            .forward(&hidden)
            .and_then(|logits| logits.argmax(D::Minus1))
            .and_then(|ids| ids.squeeze(0))
            .and_then(|ids| ids.to_vec1::<u32>())
            .map_err(infer_err)?;

        Ok(encoding
            .get_offsets()
            .iter()
            .zip(predictions)
            .filter(|((start, end), _)| start < end)
            .map(|(&(start, end), id)| {
                let label = self
                    .labels
                    .get(id as usize)
                    .cloned()
                    .unwrap_or_else(|| "O".to_string());
                TaggedToken::new(start, end, label)
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
