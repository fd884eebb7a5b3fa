// ── Compass: Message Intent Classifier ─────────────────────────────────────
//
// Decide, per inbound message, whether it is worth investing in long-term
// personalization. Example:
//   "hey"                                   → SimpleGreeting  (skip memory)
//   "I'm a sophomore studying neuroscience" → ProfileSharing  (process memory)
//   "any REU deadlines this spring?"        → OpportunityRequest
//
// Ordered rule evaluation, first match wins. Pure keyword heuristics —
// no ML model required, fast & deterministic, total over any input.

use crate::atoms::constants::MEMORY_CONFIDENCE_FLOOR;
use crate::atoms::types::{Classification, MessageKind};

// ── Lexicons ───────────────────────────────────────────────────────────────

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "yo", "howdy", "greetings", "good morning",
    "good afternoon", "good evening", "what's up", "whats up", "sup",
];

const ACKNOWLEDGMENTS: &[&str] = &[
    "ok", "okay", "thanks", "thank you", "got it", "cool", "nice", "great",
    "sure", "yes", "no", "yep", "yeah", "sounds good", "perfect", "awesome",
];

const PROFILE_KEYWORDS: &[&str] = &[
    "my name is", "i am a", "i'm a", "im a",
    "freshman", "sophomore", "junior", "senior",
    "first-year", "first year", "second-year", "second year",
    "third-year", "third year", "fourth-year", "fourth year",
    "graduate student", "grad student", "international student",
    "studying", "majoring", "my major", "interested in",
];

const GOAL_KEYWORDS: &[&str] = &[
    "want to", "plan to", "planning to", "looking for", "hope to",
    "hoping to", "my goal", "career", "future", "aspire", "dream",
];

const OPPORTUNITY_KEYWORDS: &[&str] = &[
    "research", "internship", "intern", "grant", "fellowship", "scholarship",
    "opportunity", "opportunities", "application", "apply", "deadline",
    "lab", "professor", "program", "position",
];

const COMPLEXITY_CONNECTIVES: &[&str] = &["because", "however", "although", "specifically"];

// ── Classification ─────────────────────────────────────────────────────────

/// Classify a user message. Deterministic and total: never fails, never
/// allocates beyond the lowercased copy, case-insensitive over trimmed input.
pub fn classify(text: &str) -> Classification {
    let t = text.trim().to_lowercase();
    let words = t.split_whitespace().count();

    // 1. Greeting — exact or leading-word prefix.
    if GREETINGS.iter().any(|g| matches_leading(&t, g)) {
        return outcome(MessageKind::SimpleGreeting, 0.95, false, "matched greeting lexicon");
    }

    // 2. Acknowledgment — exact or trailing suffix.
    if ACKNOWLEDGMENTS.iter().any(|a| matches_trailing(&t, a)) {
        return outcome(MessageKind::Acknowledgment, 0.90, false, "matched acknowledgment lexicon");
    }

    // 3. Profile sharing.
    if contains_any(&t, PROFILE_KEYWORDS) {
        return outcome(MessageKind::ProfileSharing, 0.85, true, "contains profile keyword");
    }

    // 4. Goal setting.
    if contains_any(&t, GOAL_KEYWORDS) {
        return outcome(MessageKind::GoalSetting, 0.80, true, "contains goal keyword");
    }

    // 5. Opportunity request.
    if contains_any(&t, OPPORTUNITY_KEYWORDS) {
        return outcome(MessageKind::OpportunityRequest, 0.75, true, "contains opportunity keyword");
    }

    // 6. Substantive question — long or explicitly reasoned.
    if words >= 10 || contains_any(&t, COMPLEXITY_CONNECTIVES) {
        return outcome(MessageKind::SubstantiveQuestion, 0.70, true, "long or uses a complexity connective");
    }

    // 7. Very short leftovers read as acknowledgments.
    if words <= 3 {
        return outcome(MessageKind::Acknowledgment, 0.60, false, "short message with no keyword match");
    }

    // 8. Everything else continues the thread.
    outcome(MessageKind::FollowUp, 0.65, true, "no rule matched; treating as follow-up")
}

/// Both conditions independently suppress memory work: the rule said skip,
/// or the classifier was not confident enough to justify the write.
pub fn skip_memory(c: &Classification) -> bool {
    !c.should_process_memory || c.confidence < MEMORY_CONFIDENCE_FLOOR
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn outcome(kind: MessageKind, confidence: f64, memory: bool, reasoning: &str) -> Classification {
    Classification {
        kind,
        confidence,
        should_process_memory: memory,
        reasoning: reasoning.to_string(),
    }
}

fn contains_any(s: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| s.contains(t))
}

/// Exact match, or `term` as the leading word followed by a non-alphanumeric
/// boundary — so "hi" matches "hi there!" but never "history question".
fn matches_leading(s: &str, term: &str) -> bool {
    if s == term {
        return true;
    }
    s.strip_prefix(term)
        .and_then(|rest| rest.chars().next())
        .map(|c| !c.is_alphanumeric())
        .unwrap_or(false)
}

/// Exact match, or `term` as the trailing word with a boundary before it —
/// so "sounds good, thanks" matches "thanks" but "networks" never matches "ok".
fn matches_trailing(s: &str, term: &str) -> bool {
    if s == term {
        return true;
    }
    if let Some(head) = s.strip_suffix(term) {
        return head
            .chars()
            .last()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(false);
    }
    false
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_fixture() {
        let c = classify("hey");
        assert_eq!(c.kind, MessageKind::SimpleGreeting);
        assert!((c.confidence - 0.95).abs() < 1e-9);
        assert!(!c.should_process_memory);
    }

    #[test]
    fn greeting_wins_over_opportunity() {
        // Rule priority: the greeting prefix rule fires before the
        // opportunity keyword rule ever gets a look.
        let c = classify("hey, any research opportunities?");
        assert_eq!(c.kind, MessageKind::SimpleGreeting);
    }

    #[test]
    fn greeting_prefix_needs_a_boundary() {
        let c = classify("history department research question because I'm stuck on my methods section");
        assert_ne!(c.kind, MessageKind::SimpleGreeting);
    }

    #[test]
    fn acknowledgment_skips_memory() {
        let c = classify("ok");
        assert_eq!(c.kind, MessageKind::Acknowledgment);
        assert!(skip_memory(&c));
    }

    #[test]
    fn profile_sharing_processes_memory() {
        let c = classify("I am a sophomore interested in neuroscience");
        assert_eq!(c.kind, MessageKind::ProfileSharing);
        assert!((c.confidence - 0.85).abs() < 1e-9);
        assert!(!skip_memory(&c));
    }

    #[test]
    fn goal_setting() {
        let c = classify("I want to get into a PhD pipeline");
        assert_eq!(c.kind, MessageKind::GoalSetting);
        assert!(c.should_process_memory);
    }

    #[test]
    fn opportunity_request() {
        let c = classify("any summer internship deadlines coming up?");
        assert_eq!(c.kind, MessageKind::OpportunityRequest);
        assert!((c.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn substantive_by_length() {
        let c = classify("could you compare the two paths we talked about and tell me which suits me");
        assert_eq!(c.kind, MessageKind::SubstantiveQuestion);
    }

    #[test]
    fn substantive_by_connective() {
        let c = classify("that matters because timing");
        assert_eq!(c.kind, MessageKind::SubstantiveQuestion);
    }

    #[test]
    fn short_leftover_is_acknowledgment() {
        let c = classify("hm maybe");
        assert_eq!(c.kind, MessageKind::Acknowledgment);
        assert!((c.confidence - 0.60).abs() < 1e-9);
        assert!(!c.should_process_memory);
    }

    #[test]
    fn default_follow_up() {
        // 4–9 words, no lexicon hit, no connective.
        let c = classify("could we revisit that earlier thread");
        assert_eq!(c.kind, MessageKind::FollowUp);
        assert!((c.confidence - 0.65).abs() < 1e-9);
        assert!(c.should_process_memory);
    }

    #[test]
    fn deterministic_and_total() {
        for input in ["", "   ", "💡", "hey", "ok!!", "a b c d e f g h i j"] {
            let a = classify(input);
            let b = classify(input);
            assert_eq!(a.kind, b.kind, "unstable for {input:?}");
            assert_eq!(a.confidence, b.confidence);
        }
    }

    #[test]
    fn empty_input_is_a_short_acknowledgment() {
        let c = classify("");
        assert_eq!(c.kind, MessageKind::Acknowledgment);
        assert!(skip_memory(&c));
    }
}
