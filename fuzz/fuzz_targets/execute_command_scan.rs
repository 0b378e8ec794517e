#![no_main]

use libfuzzer_sys::fuzz_target;
use runbot_github::execute_command::{detect_execute_command, scan_execute_token};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let token = scan_execute_token(&text);
    assert_eq!(token.is_some(), text.contains("/execute"));
    if let Some(tag) = token.and_then(|token| token.language_tag) {
        assert!(!tag.is_empty());
        assert_eq!(tag, tag.to_ascii_lowercase());
    }

    let command = detect_execute_command(None, [Some(&*text)], [None]);
    assert_eq!(command.requested, text.contains("/execute"));
});
