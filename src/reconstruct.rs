//! Cursor-based reconstruction of corrected text.
//!
//! Decisions must arrive in ascending, non-overlapping span order (the
//! detector contract guarantees this). Text between spans is copied
//! byte-for-byte.

use crate::types::Decision;

/// Splice each decision's replacement into `original`.
pub fn reconstruct(original: &str, decisions: &[Decision]) -> String {
    let extra: usize = decisions.iter().map(|d| d.replacement.len()).sum();
    let mut out = String::with_capacity(original.len() + extra);
    let mut cursor = 0;
    for decision in decisions {
        out.push_str(&original[cursor..decision.span.start]);
        out.push_str(&decision.replacement);
        cursor = decision.span.end;
    }
    out.push_str(&original[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, DecisionReason, Detection, Span};

    fn detection(text: &str, mention: &str) -> Detection {
        let start = text.find(mention).unwrap();
        Detection::from_text(text, Span::new(start, start + mention.len()), "GPE").unwrap()
    }

    #[test]
    fn empty_decisions_return_original() {
        let text = "我 要去 北jing 出差";
        assert_eq!(reconstruct(text, &[]), text);
        assert_eq!(reconstruct("", &[]), "");
    }

    #[test]
    fn single_substitution() {
        let text = "我 要去 北jing 出差";
        let decision = Decision::accept(&detection(text, "北jing"), "北京");
        assert_eq!(reconstruct(text, &[decision]), "我 要去 北京 出差");
    }

    #[test]
    fn kept_decision_is_identity() {
        let text = "我 要去 北jing 出差";
        let decision = Decision::keep(&detection(text, "北jing"), DecisionReason::NbestVeto);
        assert_eq!(reconstruct(text, &[decision]), text);
    }

    #[test]
    fn multiple_substitutions_do_not_drift() {
        let text = "从北jing到尚海再到shen圳";
        let decisions = vec![
            Decision::accept(&detection(text, "北jing"), "北京"),
            Decision::accept(&detection(text, "尚海"), "上海"),
            Decision::accept(&detection(text, "shen圳"), "深圳"),
        ];
        assert_eq!(reconstruct(text, &decisions), "从北京到上海再到深圳");
    }

    #[test]
    fn length_follows_replacement_formula() {
        let text = "ab 北jing cd 尚海 ef";
        let decisions = vec![
            Decision::accept(&detection(text, "北jing"), "北京"),
            Decision::accept(&detection(text, "尚海"), "上海市"),
        ];
        let out = reconstruct(text, &decisions);
        let removed: usize = decisions.iter().map(|d| d.mention.len()).sum();
        let added: usize = decisions.iter().map(|d| d.replacement.len()).sum();
        assert_eq!(out.len(), text.len() - removed + added);
        assert!(out.starts_with("ab "));
        assert!(out.ends_with(" ef"));
        assert!(out.contains(" cd "));
    }

    #[test]
    fn span_at_text_edges() {
        let text = "北jing";
        let decision = Decision::accept(&detection(text, "北jing"), "北京");
        assert_eq!(reconstruct(text, &[decision]), "北京");
    }

    #[test]
    fn empty_replacement_deletes_span() {
        let text = "a 北jing b";
        let decision = Decision::accept(&detection(text, "北jing"), "");
        assert_eq!(reconstruct(text, &[decision]), "a  b");
    }
}
