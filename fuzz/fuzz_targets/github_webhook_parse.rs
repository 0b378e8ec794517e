#![no_main]

use libfuzzer_sys::fuzz_target;
use runbot_github::github_payloads::{parse_github_webhook_event, GithubWebhookEvent};

const EVENTS: [&str; 4] = ["ping", "issues", "pull_request", "push"];

fuzz_target!(|data: &[u8]| {
    let Some((selector, body)) = data.split_first() else {
        return;
    };
    let event_name = EVENTS[usize::from(*selector) % EVENTS.len()];
    let raw = String::from_utf8_lossy(body);
    let Ok(event) = parse_github_webhook_event(event_name, &raw) else {
        return;
    };
    match event {
        GithubWebhookEvent::Ping => assert_eq!(event_name, "ping"),
        GithubWebhookEvent::Ignored { event, .. } => assert_eq!(event, event_name),
        other => assert!(other.as_str().ends_with(".opened")),
    }
});
