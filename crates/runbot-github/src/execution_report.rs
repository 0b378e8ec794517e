use crate::github_transport_helpers::truncate_for_error;

pub const EXECUTION_REPORT_HEADER: &str = "Execution Results:";
/// GitHub rejects comment bodies above 65_536 characters.
pub const GITHUB_COMMENT_MAX_CHARS: usize = 65_000;

/// Join non-empty per-file outputs into one comment body.
///
/// Returns `None` when no output survives, in which case nothing should be posted.
pub fn compose_execution_report<S: AsRef<str>>(results: &[S]) -> Option<String> {
    let sections = results
        .iter()
        .map(AsRef::as_ref)
        .filter(|result| !result.is_empty())
        .collect::<Vec<_>>();
    if sections.is_empty() {
        return None;
    }
    let body = format!("{EXECUTION_REPORT_HEADER}\n\n{}", sections.join("\n\n"));
    Some(clamp_comment_body(&body, GITHUB_COMMENT_MAX_CHARS))
}

pub fn clamp_comment_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    truncate_for_error(body, max_chars.saturating_sub(3))
}
