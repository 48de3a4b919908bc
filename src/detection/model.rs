//! Model-based detection: decode per-token BIO tags into entity spans.
//!
//! The tagger itself is a backend behind [`TokenTagger`].

use crate::alignment::trim_span;
use crate::detection::detector::EntityDetector;
use crate::error::{EntcorrectError, Result};
use crate::types::{Detection, Span};

/// One tagged token: a byte span into the input text and its label
/// (`O`, `B-TYPE`, `I-TYPE`, `E-TYPE`, `S-TYPE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedToken {
    pub span: Span,
    pub label: String,
}

impl TaggedToken {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            span: Span::new(start, end),
            label: label.into(),
        }
    }
}

/// Trait for sequence tagging backends.
pub trait TokenTagger: Send + Sync {
    /// Tag `text`, returning tokens in text order with byte offsets.
    fn tag(&self, text: &str) -> Result<Vec<TaggedToken>>;

    /// Return the name of this tagger for logging.
    fn name(&self) -> &str;
}

/// Detector that wraps a [`TokenTagger`] and decodes its tags.
pub struct ModelDetector {
    tagger: Box<dyn TokenTagger>,
    name: String,
}

impl ModelDetector {
    pub fn new(tagger: Box<dyn TokenTagger>) -> Self {
        let name = format!("model:{}", tagger.name());
        Self { tagger, name }
    }
}

enum Tag<'a> {
    Outside,
    Begin(&'a str),
    Inside(&'a str),
    End(&'a str),
    Single(&'a str),
}

fn parse_tag(label: &str) -> Tag<'_> {
    match label.split_once('-') {
        Some(("B", ty)) => Tag::Begin(ty),
        Some(("I", ty)) => Tag::Inside(ty),
        Some(("E", ty)) => Tag::End(ty),
        Some(("S", ty)) => Tag::Single(ty),
        _ => Tag::Outside,
    }
}

fn close(open: &mut Option<(Span, String)>, spans: &mut Vec<(Span, String)>) {
    if let Some(entity) = open.take() {
        spans.push(entity);
    }
}

/// Continue the open entity when its type matches, otherwise start a new one.
fn extend_or_open(
    open: &mut Option<(Span, String)>,
    spans: &mut Vec<(Span, String)>,
    span: Span,
    ty: &str,
) {
    if let Some((current, open_ty)) = open.as_mut()
        && open_ty.as_str() == ty
    {
        current.end = span.end;
        return;
    }
    close(open, spans);
    *open = Some((span, ty.to_string()));
}

/// Decode BIO/BIOES tags into detections over `text`.
///
/// A stray `I-`/`E-` tag (no open entity of the same type) starts a new
/// entity. Empty-span tokens (special tokens) and tokens that overlap an
/// earlier one are ignored.
pub fn decode_tags(text: &str, tokens: &[TaggedToken]) -> Result<Vec<Detection>> {
    let mut spans: Vec<(Span, String)> = Vec::new();
    let mut open: Option<(Span, String)> = None;
    let mut cursor = 0usize;

    for token in tokens {
        if token.span.is_empty() || token.span.start < cursor {
            continue;
        }
        cursor = token.span.end;

        match parse_tag(&token.label) {
            Tag::Outside => close(&mut open, &mut spans),
            Tag::Begin(ty) => {
                close(&mut open, &mut spans);
                open = Some((token.span, ty.to_string()));
            }
            Tag::Single(ty) => {
                close(&mut open, &mut spans);
                spans.push((token.span, ty.to_string()));
            }
            Tag::Inside(ty) => extend_or_open(&mut open, &mut spans, token.span, ty),
            Tag::End(ty) => {
                extend_or_open(&mut open, &mut spans, token.span, ty);
                close(&mut open, &mut spans);
            }
        }
    }
    close(&mut open, &mut spans);

    spans
        .into_iter()
        .map(|(span, ty)| {
            let span = trim_span(text, span);
            Detection::from_text(text, span, ty)
        })
        .filter(|d| !matches!(d, Ok(d) if d.mention.is_empty()))
        .collect()
}

impl EntityDetector for ModelDetector {
    fn detect(&self, text: &str) -> Result<Vec<Detection>> {
        let tokens = self.tagger.tag(text)?;
        decode_tags(text, &tokens).map_err(|e| match e {
            EntcorrectError::ContractViolation { message, .. } => {
                EntcorrectError::ContractViolation {
                    detector: self.name.clone(),
                    message,
                }
            }
            other => other,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
