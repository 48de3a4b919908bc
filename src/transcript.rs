//! Line-oriented transcript, N-best and entity dictionary files.
//!
//! Transcript and N-best lines are whitespace-delimited: the first token is
//! the utterance id, the remaining tokens joined by a single space are the
//! text. Output files are written through a temporary file in the target
//! directory and renamed into place, so readers never see a partial file.

use crate::defaults;
use crate::error::{EntcorrectError, Result};
use crate::types::{NBestHypotheses, Utterance};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

/// One known entity from the dictionary, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEntry {
    pub surface: String,
    pub entity_type: String,
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        EntcorrectError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read '{}': {}", path.display(), e),
        ))
    })
}

/// Split one line into `(id, text)`, or `None` for a blank line.
fn split_line(line: &str) -> Option<(&str, String)> {
    let mut tokens = line.split_whitespace();
    let id = tokens.next()?;
    Some((id, tokens.collect::<Vec<_>>().join(" ")))
}

/// Parse transcript content. `source` names the input in error messages.
pub fn parse_transcript(content: &str, source: &str) -> Result<Vec<Utterance>> {
    let mut seen = HashSet::new();
    let mut utterances = Vec::new();
    for line in content.lines() {
        let Some((id, text)) = split_line(line) else {
            continue;
        };
        if !seen.insert(id.to_string()) {
            return Err(EntcorrectError::DuplicateUtterance {
                id: id.to_string(),
                path: source.to_string(),
            });
        }
        utterances.push(Utterance::new(id, text));
    }
    Ok(utterances)
}

/// Read a transcript file (one utterance per line).
pub fn read_transcript(path: &Path) -> Result<Vec<Utterance>> {
    let content = read_to_string(path)?;
    parse_transcript(&content, &path.display().to_string())
}

/// Parse N-best content into hypotheses grouped by id, in rank order.
pub fn parse_nbest(content: &str) -> HashMap<String, NBestHypotheses> {
    let mut groups: HashMap<String, NBestHypotheses> = HashMap::new();
    for line in content.lines() {
        if let Some((id, text)) = split_line(line) {
            groups.entry(id.to_string()).or_default().push(text);
        }
    }
    groups
}

/// Read an N-best file (one hypothesis per line, grouped by id).
pub fn read_nbest(path: &Path) -> Result<HashMap<String, NBestHypotheses>> {
    let content = read_to_string(path)?;
    Ok(parse_nbest(&content))
}

/// Arrange N-best groups in utterance order.
///
/// The rank-1 hypothesis is dropped unless `include_top` is set. Utterances
/// without any N-best entry get an empty hypothesis set.
pub fn align_nbest(
    utterances: &[Utterance],
    mut groups: HashMap<String, NBestHypotheses>,
    include_top: bool,
) -> Vec<NBestHypotheses> {
    utterances
        .iter()
        .map(|utterance| match groups.remove(&utterance.id) {
            Some(mut hypotheses) => {
                if !include_top && !hypotheses.is_empty() {
                    hypotheses.remove(0);
                }
                hypotheses
            }
            None => {
                log::warn!("no N-best hypotheses for utterance '{}'", utterance.id);
                Vec::new()
            }
        })
        .collect()
}

/// Reference texts in utterance order, matched by id.
///
/// Every utterance must have a reference; `source` names the reference
/// file in the error.
pub fn align_references(
    utterances: &[Utterance],
    references: Vec<Utterance>,
    source: &str,
) -> Result<Vec<String>> {
    let mut by_id: HashMap<String, String> =
        references.into_iter().map(|u| (u.id, u.text)).collect();
    utterances
        .iter()
        .map(|utterance| {
            by_id
                .remove(&utterance.id)
                .ok_or_else(|| EntcorrectError::MissingReference {
                    id: utterance.id.clone(),
                    path: source.to_string(),
                })
        })
        .collect()
}

/// Parse entity dictionary content.
///
/// One entity per line: `surface [TYPE]`. Blank lines and `#` comments are
/// skipped; repeated surfaces keep their first occurrence. `source` names
/// the input in error messages.
pub fn parse_entity_dictionary(content: &str, source: &str) -> Result<Vec<EntityEntry>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(surface) = tokens.next() else {
            continue;
        };
        let entity_type = tokens.next().unwrap_or(defaults::DEFAULT_ENTITY_TYPE);
        if tokens.next().is_some() {
            return Err(EntcorrectError::TranscriptParse {
                path: source.to_string(),
                line: index + 1,
                message: "expected `surface [TYPE]`".to_string(),
            });
        }
        if seen.insert(surface.to_string()) {
            entries.push(EntityEntry {
                surface: surface.to_string(),
                entity_type: entity_type.to_string(),
            });
        }
    }
    Ok(entries)
}

/// Read an entity dictionary file. An empty dictionary is an error.
pub fn read_entity_dictionary(path: &Path) -> Result<Vec<EntityEntry>> {
    let content = read_to_string(path)?;
    let entries = parse_entity_dictionary(&content, &path.display().to_string())?;
    if entries.is_empty() {
        return Err(EntcorrectError::DictionaryEmpty {
            path: path.display().to_string(),
        });
    }
    Ok(entries)
}

/// Render `(id, text)` rows in the transcript line format.
pub fn format_rows<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (id, text) in rows {
        out.push_str(id);
        if !text.is_empty() {
            out.push(' ');
            out.push_str(text);
        }
        out.push('\n');
    }
    out
}

/// Write `contents` to `path` atomically (temp file in the same directory, then rename).
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_transcript_joins_tokens_with_single_space() {
        let utterances = parse_transcript("u1 我  要去\t北jing 出差\n", "text").unwrap();
        assert_eq!(utterances, vec![Utterance::new("u1", "我 要去 北jing 出差")]);
    }

    #[test]
    fn parse_transcript_skips_blank_lines_and_keeps_order() {
        let utterances = parse_transcript("u2 b\n\n   \nu1 a\n", "text").unwrap();
        let ids: Vec<_> = utterances.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u1"]);
    }

    #[test]
    fn parse_transcript_allows_empty_text() {
        let utterances = parse_transcript("u1\n", "text").unwrap();
        assert_eq!(utterances[0].text, "");
    }

    #[test]
    fn parse_transcript_rejects_duplicate_ids() {
        let err = parse_transcript("u1 a\nu1 b\n", "text").unwrap_err();
        assert!(matches!(err, EntcorrectError::DuplicateUtterance { ref id, .. } if id == "u1"));
    }

    #[test]
    fn parse_nbest_groups_by_id_in_rank_order() {
        let groups = parse_nbest("u1 first\nu2 other\nu1 second\nu1 third\n");
        assert_eq!(groups["u1"], vec!["first", "second", "third"]);
        assert_eq!(groups["u2"], vec!["other"]);
    }

    #[test]
    fn align_nbest_drops_rank_one_by_default() {
        let utterances = vec![Utterance::new("u1", "x"), Utterance::new("u2", "y")];
        let groups = parse_nbest("u1 top\nu1 alt\n");
        let aligned = align_nbest(&utterances, groups, false);
        assert_eq!(aligned, vec![vec!["alt".to_string()], Vec::new()]);
    }

    #[test]
    fn align_nbest_can_keep_rank_one() {
        let utterances = vec![Utterance::new("u1", "x")];
        let groups = parse_nbest("u1 top\nu1 alt\n");
        let aligned = align_nbest(&utterances, groups, true);
        assert_eq!(aligned[0], vec!["top", "alt"]);
    }

    #[test]
    fn align_references_matches_by_id() {
        let utterances = parse_transcript("u1 a\nu2 b\n", "text").unwrap();
        let references = parse_transcript("u2 B\nu1 A\n", "ref").unwrap();
        let aligned = align_references(&utterances, references, "ref").unwrap();
        assert_eq!(aligned, vec!["A", "B"]);
    }

    #[test]
    fn align_references_requires_every_id() {
        let utterances = parse_transcript("u1 a\nu2 b\n", "text").unwrap();
        let references = parse_transcript("u1 A\n", "ref").unwrap();
        let err = align_references(&utterances, references, "ref").unwrap_err();
        assert!(matches!(err, EntcorrectError::MissingReference { ref id, .. } if id == "u2"));
    }

    #[test]
    fn parse_entity_dictionary_reads_types_and_dedupes() {
        let entries =
            parse_entity_dictionary("# cities\n北京 GPE\n上海\n北京 ORG\n\n", "entities").unwrap();
        assert_eq!(
            entries,
            vec![
                EntityEntry {
                    surface: "北京".to_string(),
                    entity_type: "GPE".to_string()
                },
                EntityEntry {
                    surface: "上海".to_string(),
                    entity_type: defaults::DEFAULT_ENTITY_TYPE.to_string()
                },
            ]
        );
    }

    #[test]
    fn parse_entity_dictionary_rejects_extra_tokens() {
        let err = parse_entity_dictionary("北京 GPE\n上海 GPE city\n", "entities").unwrap_err();
        assert!(matches!(err, EntcorrectError::TranscriptParse { line: 2, .. }));
    }

    #[test]
    fn read_entity_dictionary_rejects_empty_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        file.flush().unwrap();
        let err = read_entity_dictionary(file.path()).unwrap_err();
        assert!(matches!(err, EntcorrectError::DictionaryEmpty { .. }));
    }

    #[test]
    fn read_transcript_missing_file_names_path() {
        let err = read_transcript(Path::new("/nonexistent/text")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/text"));
    }

    #[test]
    fn format_rows_matches_transcript_format() {
        let out = format_rows([("u1", "我 要去 北京 出差"), ("u2", "")]);
        assert_eq!(out, "u1 我 要去 北京 出差\nu2\n");
    }

    #[test]
    fn write_atomic_creates_file_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyp");
        write_atomic(&path, "u1 a\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "u1 a\n");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("hyp")]);
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyp");
        write_atomic(&path, "old\n").unwrap();
        write_atomic(&path, "new\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }
}
