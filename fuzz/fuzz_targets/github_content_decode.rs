#![no_main]

use libfuzzer_sys::fuzz_target;
use runbot_github::github_content::{decode_base64_content, encode_base64_content};

fuzz_target!(|data: &[u8]| {
    let encoded = encode_base64_content(data);
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    let decoded = decode_base64_content(&wrapped).expect("wrapped base64 decodes");
    assert_eq!(decoded, data);

    let _ = decode_base64_content(&String::from_utf8_lossy(data));
});
