//! Utterance classification against a state's expected responses
//!
//! Matching is deliberately shallow: lowercase substring checks against the
//! expected labels and a small synonym table. Labels are checked in the order
//! the workflow spec lists them, so specs put the most specific labels first
//! ("not yet" before "no", "confused" before "understood").

/// Synonyms accepted for a canonical response label
fn synonyms_for(label: &str) -> &'static [&'static str] {
    match label {
        "yes" => &[
            "yeah",
            "yep",
            "sure",
            "correct",
            "right",
            "okay",
            "ok",
            "affirmative",
        ],
        "no" => &["nah", "nope", "incorrect", "wrong", "negative", "not yet"],
        "ready" => &["prepared", "set", "good to go", "let's do it"],
        // Confusion counts as having questions; in states that list a
        // dedicated "confused" label first, that label still wins.
        "questions" => &[
            "question",
            "ask",
            "confused",
            "unclear",
            "don't understand",
            "do not understand",
        ],
        "confused" => &["unclear", "don't understand", "do not understand", "not sure"],
        "understood" => &["got it", "makes sense", "understand", "comprehend"],
        _ => &[],
    }
}

/// Canonical key for a label: lowercase with spaces collapsed to underscores
fn canonical(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}

/// Classify a recognized utterance against the expected response labels.
///
/// Returns the canonical key of the first label whose text or synonyms appear
/// in the utterance, or `None` when nothing matches.
pub fn classify_response(user_text: &str, expected: &[&str]) -> Option<String> {
    let text = user_text.to_lowercase();

    for label in expected {
        let needle = label.to_lowercase();
        if text.contains(&needle) {
            return Some(canonical(label));
        }
        if synonyms_for(&needle)
            .iter()
            .any(|synonym| text.contains(synonym))
        {
            return Some(canonical(label));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_match() {
        let expected = ["not yet", "yes", "no"];
        assert_eq!(
            classify_response("Yes, I picked it up", &expected),
            Some("yes".to_string())
        );
        assert_eq!(
            classify_response("not yet, maybe tomorrow", &expected),
            Some("not_yet".to_string())
        );
    }

    #[test]
    fn test_synonym_match() {
        let expected = ["yes", "no"];
        assert_eq!(
            classify_response("yeah sure", &expected),
            Some("yes".to_string())
        );
        assert_eq!(
            classify_response("nope, haven't had time", &expected),
            Some("no".to_string())
        );
    }

    #[test]
    fn test_specific_labels_win_when_listed_first() {
        // "I don't understand" must land on confused, not understood, which
        // is why the dosage spec lists confused first.
        let expected = ["confused", "questions", "understood", "clear"];
        assert_eq!(
            classify_response("I don't understand the instructions", &expected),
            Some("confused".to_string())
        );
        assert_eq!(
            classify_response("got it, makes sense", &expected),
            Some("understood".to_string())
        );
    }

    #[test]
    fn test_confusion_counts_as_questions_without_a_confused_label() {
        // The closing exchange only offers thank you / questions / okay;
        // a confused patient still needs their questions addressed.
        let expected = ["thank you", "questions", "okay"];
        assert_eq!(
            classify_response("I'm confused about all this", &expected),
            Some("questions".to_string())
        );
        assert_eq!(
            classify_response("it's still unclear to me", &expected),
            Some("questions".to_string())
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(classify_response("purple monkey dishwasher", &["yes", "no"]), None);
        assert_eq!(classify_response("", &["yes", "no"]), None);
    }
}
