//! Host hook command.
//!
//! Reads the event payload as JSON from stdin and always answers with a JSON
//! response on stdout. Hosts treat a non-zero exit or garbage output as a
//! broken hook, so every failure here is logged to stderr and answered with
//! the empty response for the event.

use std::io::Read;

use anyhow::{Context, Result};
use memco_sdk::{HookAdapter, HookEvent, HookResponse};
use serde_json::Value;
use tracing::warn;

use crate::cli::HookEventKind;
use crate::config::Config;
use crate::database::open_coordinator;

/// Handle one hook event. Never fails.
pub async fn execute(kind: HookEventKind) -> Result<()> {
    let mut input = String::new();
    let response = match std::io::stdin().read_to_string(&mut input) {
        Ok(_) => match handle(kind, &input).await {
            Ok(response) => response,
            Err(err) => {
                warn!(event = kind.tag(), error = %format!("{err:#}"), "Hook failed, answering empty");
                empty_response(kind)
            }
        },
        Err(err) => {
            warn!(event = kind.tag(), error = %err, "Failed to read hook payload");
            empty_response(kind)
        }
    };

    let output = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
    println!("{output}");
    Ok(())
}

async fn handle(kind: HookEventKind, input: &str) -> Result<HookResponse> {
    let event = parse_event(kind, input)?;
    let config = Config::load()?;
    let coordinator = open_coordinator(&config)?;
    let adapter = HookAdapter::new(coordinator);
    Ok(adapter.on_event(event).await)
}

/// Build the event from the stdin payload, taking the event name from the command line.
fn parse_event(kind: HookEventKind, input: &str) -> Result<HookEvent> {
    let mut payload: Value = if input.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(input).context("Hook payload is not valid JSON")?
    };
    let object = payload
        .as_object_mut()
        .context("Hook payload must be a JSON object")?;
    object.insert("event".into(), Value::String(kind.tag().into()));

    serde_json::from_value(payload).with_context(|| format!("Invalid {} payload", kind.tag()))
}

fn empty_response(kind: HookEventKind) -> HookResponse {
    match kind {
        HookEventKind::PromptReceived => HookResponse::PromptReceived { entries: Vec::new() },
        HookEventKind::SessionEnd => HookResponse::SessionEnd { created: 0 },
        HookEventKind::TaskComplete => HookResponse::TaskComplete { id: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_uses_command_line_kind() {
        let event = parse_event(
            HookEventKind::PromptReceived,
            r#"{"event": "session_end", "prompt": "how do I build?", "sessionId": "s1"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            HookEvent::PromptReceived {
                prompt: "how do I build?".into(),
                session_id: "s1".into()
            }
        );
    }

    #[test]
    fn test_parse_event_errors() {
        assert!(parse_event(HookEventKind::SessionEnd, "not json").is_err());
        assert!(parse_event(HookEventKind::SessionEnd, "[1, 2]").is_err());
        assert!(parse_event(HookEventKind::SessionEnd, "").is_err());
        assert!(parse_event(HookEventKind::TaskComplete, r#"{"taskId": "t1"}"#).is_ok());
    }

    #[test]
    fn test_empty_responses() {
        let json = serde_json::to_value(empty_response(HookEventKind::PromptReceived)).unwrap();
        assert_eq!(json, serde_json::json!({"event": "prompt_received", "entries": []}));
        let json = serde_json::to_value(empty_response(HookEventKind::SessionEnd)).unwrap();
        assert_eq!(json, serde_json::json!({"event": "session_end", "created": 0}));
    }
}
