//! Server-Sent Events support

use super::types::{ConversationResponse, MessageView};
use crate::pipeline::PipelineEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert the pipeline's broadcast channel into an SSE stream that
/// starts with a full snapshot
pub fn sse_stream(
    init: ConversationResponse,
    broadcast_rx: tokio::sync::broadcast::Receiver<PipelineEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init_event = Event::default()
        .event("init")
        .data(json!({ "type": "init", "conversation": init }).to_string());
    let init = futures::stream::once(async move { Ok(init_event) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(pipeline_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn pipeline_event_to_axum(event: PipelineEvent) -> Event {
    let (event_type, data) = event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

/// SSE event name and JSON body for a pipeline event
fn event_payload(event: PipelineEvent) -> (&'static str, serde_json::Value) {
    match event {
        PipelineEvent::MessageAppended(message) => (
            "message",
            json!({
                "type": "message",
                "message": MessageView::from(&message)
            }),
        ),
        PipelineEvent::StatusChanged(status) => (
            "status",
            json!({
                "type": "status",
                "status": status
            }),
        ),
        PipelineEvent::TogglesChanged(toggles) => (
            "toggles",
            json!({
                "type": "toggles",
                "toggles": toggles
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Correction};
    use crate::pipeline::{PipelineStatus, Toggles};
    use axum::response::IntoResponse;
    use serde_json::Value;

    fn user_message() -> crate::conversation::Message {
        Conversation::new().push_user("is it raining?").clone()
    }

    /// Split an SSE body into `(event, data)` pairs, skipping comments
    fn parse_frames(body: &str) -> Vec<(String, Value)> {
        body.split("\n\n")
            .filter(|block| !block.trim().is_empty())
            .filter_map(|block| {
                let mut name = String::new();
                let mut data = String::new();
                for line in block.lines() {
                    if let Some(rest) = line.strip_prefix("event:") {
                        name = rest.trim().to_string();
                    } else if let Some(rest) = line.strip_prefix("data:") {
                        data.push_str(rest.trim());
                    }
                }
                // Keep-alive comments carry no data
                if data.is_empty() {
                    return None;
                }
                Some((name, serde_json::from_str(&data).unwrap()))
            })
            .collect()
    }

    #[test]
    fn test_event_payloads() {
        let (name, data) = event_payload(PipelineEvent::MessageAppended(user_message()));
        assert_eq!(name, "message");
        assert_eq!(data["type"], "message");
        assert_eq!(data["message"]["text"], "is it raining?");
        assert_eq!(data["message"]["sender"], "user");
        assert_eq!(data["message"]["correction"], Value::Null);

        let (name, data) = event_payload(PipelineEvent::StatusChanged(PipelineStatus::Sending));
        assert_eq!(name, "status");
        assert_eq!(data["type"], "status");
        assert_eq!(data["status"], "sending");

        let toggles = Toggles {
            context_enabled: false,
            fact_check_enabled: true,
        };
        let (name, data) = event_payload(PipelineEvent::TogglesChanged(toggles));
        assert_eq!(name, "toggles");
        assert_eq!(data["type"], "toggles");
        assert_eq!(data["toggles"]["context_enabled"], false);
        assert_eq!(data["toggles"]["fact_check_enabled"], true);
    }

    #[tokio::test]
    async fn test_stream_starts_with_init_then_events() {
        let (tx, rx) = tokio::sync::broadcast::channel(16);
        let mut bot = Conversation::new();
        bot.push_user("q?");
        let reply = bot
            .push_bot("It is sunny.", Correction::Corrected("It is raining.".into()))
            .clone();

        tx.send(PipelineEvent::StatusChanged(PipelineStatus::Sending))
            .unwrap();
        tx.send(PipelineEvent::MessageAppended(reply)).unwrap();
        tx.send(PipelineEvent::StatusChanged(PipelineStatus::Idle))
            .unwrap();

        let init = ConversationResponse {
            messages: vec![MessageView::from(&user_message())],
            status: PipelineStatus::Idle,
            toggles: Toggles::default(),
        };
        let response = sse_stream(init, rx).into_response();
        let mut body = response.into_body().into_data_stream();

        let mut text = String::new();
        while parse_frames(&text).len() < 4 {
            let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            text.push_str(std::str::from_utf8(&chunk).unwrap());
        }

        let frames = parse_frames(&text);
        let names: Vec<&str> = frames.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["init", "status", "message", "status"]);

        assert_eq!(frames[0].1["type"], "init");
        assert_eq!(frames[0].1["conversation"]["status"], "idle");
        assert_eq!(
            frames[0].1["conversation"]["messages"][0]["text"],
            "is it raining?"
        );
        assert_eq!(frames[1].1["status"], "sending");
        assert_eq!(frames[2].1["message"]["correction"], "It is raining.");
        assert_eq!(frames[2].1["message"]["correction_kind"], "corrected");
        assert_eq!(frames[3].1["status"], "idle");
    }
}
