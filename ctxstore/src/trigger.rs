//! `TriggerEvaluator` — word-boundary keyword matching against recent-turn
//! text with lookback windows (§4.3).

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;

use ctxcore::{ContextData, Turn};
use once_cell::sync::Lazy;
use regex::{escape, Regex};

/// Compiled per-keyword patterns are shared process-wide: the same keyword
/// recompiled on every candidate, every turn, is pure waste since the
/// pattern only depends on the keyword text.
static KEYWORD_PATTERN_CACHE: Lazy<Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// An entry that fired, alongside the distinct keywords that matched.
#[derive(Debug, Clone)]
pub struct TriggerFiring {
    pub item: ContextData,
    pub matched_keywords: Vec<String>,
}

pub struct TriggerEvaluator {
    additional_words: String,
}

impl TriggerEvaluator {
    pub fn new(additional_words: impl Into<String>) -> Self {
        Self {
            additional_words: additional_words.into(),
        }
    }

    /// §4.3 steps 2-5. `recent_turns_newest_first` must already be the
    /// caller's most-recent-first slice (loaded by the orchestrator from
    /// `TurnHistoryEnricher`'s output); this function takes only as many as
    /// `max_lookback` needs.
    pub fn evaluate(
        &self,
        candidates: Vec<ContextData>,
        current_input: &str,
        recent_turns_newest_first: &[Turn],
    ) -> Vec<TriggerFiring> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut firings = Vec::new();
        for candidate in candidates {
            let lookback = candidate.trigger_lookback_turns as usize;
            let scan_text = self.build_scan_text(current_input, recent_turns_newest_first, lookback);
            let keywords = candidate.trigger_keyword_list();
            let matched = self.count_distinct_matches(&scan_text, &keywords);
            if matched.len() as u32 >= candidate.trigger_min_match_count {
                firings.push(TriggerFiring {
                    item: candidate,
                    matched_keywords: matched,
                });
            }
        }
        firings
    }

    /// The default lookback when no candidate specifies one (§4.3 step 2).
    pub fn max_lookback(candidates: &[ContextData]) -> usize {
        candidates
            .iter()
            .map(|c| c.trigger_lookback_turns as usize)
            .max()
            .unwrap_or(3)
    }

    fn build_scan_text(
        &self,
        current_input: &str,
        recent_turns_newest_first: &[Turn],
        lookback: usize,
    ) -> String {
        let mut parts: Vec<String> = recent_turns_newest_first
            .iter()
            .take(lookback)
            .map(|t| format!("{} {}", t.input, t.response))
            .collect();
        parts.push(current_input.to_string());
        if !self.additional_words.is_empty() {
            parts.push(self.additional_words.clone());
        }
        parts.join(" ").to_lowercase()
    }

    /// Count each keyword at most once, regardless of how many times it
    /// occurs textually (§4.3 step 4). Returns the distinct keywords that
    /// matched, in input order.
    fn count_distinct_matches(&self, scan_text: &str, keywords: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for keyword in keywords {
            if seen.contains(keyword) {
                continue;
            }
            if Self::keyword_matches(keyword, scan_text) {
                seen.insert(keyword.clone());
                matched.push(keyword.clone());
            }
        }
        matched
    }

    /// Looks up (or compiles and caches) the word-boundary pattern for
    /// `keyword`, then tests it against `scan_text`.
    fn keyword_matches(keyword: &str, scan_text: &str) -> bool {
        let mut cache = KEYWORD_PATTERN_CACHE.lock().unwrap();
        if let Some(re) = cache.get(keyword) {
            return re.is_match(scan_text);
        }
        match Regex::new(&format!(r"(?i)\b{}\b", escape(keyword))) {
            Ok(re) => {
                let is_match = re.is_match(scan_text);
                cache.insert(keyword.to_string(), re);
                is_match
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxcore::{Availability, ContentType, ContextDataId, DisplayMode, EntityIdType, ProfileId, SessionId, Timestamp, TurnId};
    use std::collections::BTreeSet;

    fn now() -> Timestamp {
        Timestamp::from_timestamp(0, 0).unwrap()
    }

    fn memory_with_trigger(keywords: &str, lookback: u32, min_match: u32) -> ContextData {
        ContextData {
            id: ContextDataId::now_v7(),
            profile_id: ProfileId::nil(),
            name: "weather lore".into(),
            content: "it rains a lot here".into(),
            summary: None,
            core_facts: None,
            content_type: ContentType::Memory,
            availability: Availability::Trigger,
            display: DisplayMode::Content,
            is_user: false,
            is_enabled: true,
            is_archived: false,
            use_next_turn_only: false,
            use_every_turn: false,
            previous_availability: None,
            trigger_keywords: keywords.into(),
            trigger_lookback_turns: lookback,
            trigger_min_match_count: min_match,
            vector_id: None,
            embedding_updated_at: None,
            in_vector_db: false,
            source_session_id: None,
            speaker: None,
            subtype: None,
            nonverbal_behavior: None,
            relevance_score: 0,
            relevance_reason: None,
            cooldown_turns: 0,
            used_last_on_turn_id: None,
            tags: BTreeSet::new(),
            usage_count: 0,
            trigger_count: 0,
            last_used_at: None,
            last_triggered_at: None,
            created_at: now(),
            updated_at: now(),
            token_count: None,
        }
    }

    fn turn(input: &str, response: &str) -> Turn {
        Turn {
            id: TurnId::now_v7(),
            session_id: SessionId::nil(),
            sequence: 1,
            input: input.into(),
            response: response.into(),
            stripped_turn: None,
            accepted: true,
            created_at: now(),
        }
    }

    #[test]
    fn s1_trigger_activation() {
        let evaluator = TriggerEvaluator::new("");
        let candidate = memory_with_trigger("weather,temperature", 3, 1);
        let firings = evaluator.evaluate(
            vec![candidate],
            "What's the weather today?",
            &[],
        );
        assert_eq!(firings.len(), 1);
        assert_eq!(firings[0].matched_keywords, vec!["weather".to_string()]);
    }

    #[test]
    fn word_boundary_prevents_substring_false_positives() {
        let evaluator = TriggerEvaluator::new("");
        let candidate = memory_with_trigger("cat", 0, 1);
        let firings = evaluator.evaluate(vec![candidate], "concatenate this please", &[]);
        assert!(firings.is_empty());
    }

    #[test]
    fn each_keyword_counts_once_even_if_repeated() {
        let evaluator = TriggerEvaluator::new("");
        let candidate = memory_with_trigger("weather,weather", 0, 2);
        let firings = evaluator.evaluate(vec![candidate], "weather weather weather", &[]);
        // Only one distinct keyword ("weather") ever matches, so a
        // min_match_count of 2 can never fire no matter how many times the
        // word repeats in the text.
        assert!(firings.is_empty());
    }

    #[test]
    fn lookback_window_includes_recent_turns() {
        let evaluator = TriggerEvaluator::new("");
        let candidate = memory_with_trigger("umbrella", 2, 1);
        let recent = vec![turn("remember the umbrella", "sure"), turn("ok", "ok")];
        let firings = evaluator.evaluate(vec![candidate], "anything else?", &recent);
        assert_eq!(firings.len(), 1);
    }

    #[test]
    fn trigger_monotonicity_raising_min_match_never_gains_a_firing() {
        // Property 3.
        let evaluator = TriggerEvaluator::new("");
        let looser = memory_with_trigger("weather,rain", 0, 1);
        let stricter = memory_with_trigger("weather,rain", 0, 2);
        let text = "today there is rain";
        let looser_fires = !evaluator.evaluate(vec![looser], text, &[]).is_empty();
        let stricter_fires = !evaluator.evaluate(vec![stricter], text, &[]).is_empty();
        assert!(looser_fires);
        assert!(!stricter_fires || looser_fires);
    }

    #[test]
    fn max_lookback_defaults_to_three_with_no_candidates() {
        assert_eq!(TriggerEvaluator::max_lookback(&[]), 3);
    }
}
