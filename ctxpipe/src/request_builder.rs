//! `RequestBuilder` (§4.6) — turns a fully enriched state into a
//! provider-agnostic `ProviderRequest`, emitting messages in the exact
//! order the spec fixes so the builder is reproducible byte-for-byte given
//! the same inputs.

use std::collections::HashSet;

use ctxcore::{ContextData, Perception};

use crate::context::EnrichmentContext;
use ctxsem::{DialogueMessage, DialogueRole, ProviderRequest};

const DEFAULT_PERSONA: &str = "You are a helpful assistant.";

fn display_content(item: &ContextData) -> String {
    item.display_text().to_string()
}

/// `formatAsQuote` (§4.6): session prefix, speaker initial, flattened
/// nonverbal aside, flattened content — each part optional.
fn format_as_quote(item: &ContextData) -> String {
    let mut out = String::new();
    if let Some(session_id) = item.source_session_id {
        out.push_str(&format!("[s{session_id}] "));
    }
    let speaker = item.speaker.as_deref().unwrap_or("").trim();
    if !speaker.is_empty() && !speaker.eq_ignore_ascii_case("multiple") {
        if let Some(initial) = speaker.chars().next() {
            out.push_str(&format!("{initial}: "));
        }
    }
    if let Some(nonverbal) = item.nonverbal_behavior.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("({}) ", ctxcore::flatten_markdown(nonverbal)));
    }
    out.push_str(&ctxcore::flatten_markdown(display_content(item).as_str()));
    out
}

fn user_message(text: impl Into<String>) -> DialogueMessage {
    DialogueMessage {
        role: DialogueRole::User,
        text: text.into(),
        cache_breakpoint: false,
    }
}

fn assistant_message(text: impl Into<String>) -> DialogueMessage {
    DialogueMessage {
        role: DialogueRole::Assistant,
        text: text.into(),
        cache_breakpoint: false,
    }
}

/// §4.4.2's property-to-flag-line mapping, applied here since it's the
/// builder's job to turn perceptions into prompt text.
fn perception_derived_lines(perceptions: &[Perception], user_name: &str) -> Vec<String> {
    let mut lines = Vec::new();
    if perceptions.iter().any(|p| p.property == "understanding.complaint:true") {
        lines.push(format!("[direction] Exploration: You made a mistake about {user_name}"));
    }
    if perceptions.iter().any(|p| p.property == "exploration.desire:true") {
        for p in perceptions {
            if let Some(topic) = p.property.strip_prefix("exploration.topic:") {
                lines.push(format!("[direction] Explore ideas on topics: {topic}"));
            }
        }
    }
    lines
}

fn grouped_message(header: &str, items: &[ContextData], formatter: impl Fn(&ContextData) -> String) -> Option<(DialogueMessage, DialogueMessage)> {
    if items.is_empty() {
        return None;
    }
    let body = items.iter().map(&formatter).collect::<Vec<_>>().join("\n\n");
    let user = user_message(format!("[meta] {header}\n{body}"));
    let ack = assistant_message(format!("Received {} relevant {header} entries.", items.len()));
    Some((user, ack))
}

pub struct RequestBuilder;

impl RequestBuilder {
    pub async fn build(ctx: &EnrichmentContext<'_>) -> ProviderRequest {
        let mut messages = Vec::new();

        // 2a. The user's own CharacterProfile, if present.
        if let Some(profile) = ctx.state.user_profile.snapshot().into_iter().next() {
            messages.push(user_message(format!("[meta] {}\n{}", profile.name, display_content(&profile))));
            messages.push(assistant_message("Acknowledging user profile."));
        }

        // 2b. Generic items, one message each.
        for item in ctx.state.data.snapshot() {
            messages.push(user_message(format!("[meta] {}\n{}", item.name, display_content(&item))));
            messages.push(assistant_message("Received."));
        }

        // 2c. Non-user CharacterProfiles, one message each, no name in the title.
        for item in ctx.state.character_profiles.snapshot() {
            messages.push(user_message(format!("[meta]\n{}", display_content(&item))));
            messages.push(assistant_message("Received."));
        }

        // 2d-2g. Grouped messages.
        if let Some((user, ack)) = grouped_message("memories", &ctx.state.memories.snapshot(), |item| display_content(item)) {
            messages.push(user);
            messages.push(ack);
        }
        if let Some((user, ack)) = grouped_message("insights", &ctx.state.insights.snapshot(), |item| display_content(item)) {
            messages.push(user);
            messages.push(ack);
        }
        if let Some((user, ack)) = grouped_message("personavoicesamples", &ctx.state.persona_voice_samples.snapshot(), format_as_quote) {
            messages.push(user);
            messages.push(ack);
        }
        if let Some((user, ack)) = grouped_message("quotes", &ctx.state.quotes.snapshot(), format_as_quote) {
            messages.push(user);
            messages.push(ack);
        }

        // 3. Dialogue log.
        if let Some(log) = ctx.state.dialogue_log.lock().clone() {
            messages.push(user_message(format!(
                "[meta] Log: Older events this session - For Information Only, DO NOT USE THIS FORMAT\n{log}"
            )));
        }

        // 4. Recent turns (all but the current one, already excluded since
        // TurnHistoryEnricher loads only accepted prior turns).
        let user_name = ctx.state.user_name.lock().clone();
        let initial = user_name.chars().next().unwrap_or('U');
        for turn in ctx.state.recent_turns.lock().iter() {
            messages.push(user_message(format!("{initial}: {}", turn.input)));
            messages.push(assistant_message(turn.response.clone()));
        }

        // 5. Current input, with flags.
        messages.push(Self::build_current_input_message(ctx, &user_name, initial).await);

        let persona = ctx.state.persona_content.lock().clone().unwrap_or_else(|| DEFAULT_PERSONA.to_string());

        ProviderRequest {
            system_instruction: persona,
            messages,
            max_output_tokens: ctx.config.max_output_tokens,
            temperature: ctx.config.temperature,
            enable_prompt_caching: ctx.config.enable_prompt_caching,
            min_caching_content_length: ctx.config.min_caching_content_length,
        }
    }

    async fn build_current_input_message(ctx: &EnrichmentContext<'_>, user_name: &str, initial: char) -> DialogueMessage {
        let mut body = if ctx.state.is_ooc_request {
            format!("[ooc] {}", ctx.state.current_turn.input)
        } else {
            format!("{initial}: {}", ctx.state.current_turn.input)
        };

        let stored_flags = ctx.state.flags.lock().clone();
        let perception_lines = perception_derived_lines(&ctx.state.perceptions.lock(), user_name);

        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for flag in &stored_flags {
            if seen.insert(flag.value.clone()) {
                lines.push(flag.value.clone());
            }
        }
        for line in perception_lines {
            if seen.insert(line.clone()) {
                lines.push(line);
            }
        }

        if !lines.is_empty() {
            body.push_str("\n\nFlags:\n");
            body.push_str(&lines.join("\n"));
        }

        for flag in &stored_flags {
            if flag.active {
                let _ = ctx.conversation.deactivate_flag(flag.id, ctx.now).await;
            } else if flag.constant {
                let _ = ctx.conversation.stamp_flag_used(flag.id, ctx.now).await;
            }
        }

        user_message(body)
    }
}
