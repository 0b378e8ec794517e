pub const EXECUTE_COMMAND_TOKEN: &str = "/execute";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Outcome of scanning a pull request for the `/execute` command.
pub struct ExecuteCommand {
    pub requested: bool,
    pub language_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// First `/execute` occurrence in one text, with the first `-<tag>` seen in it.
pub struct ExecuteToken {
    pub language_tag: Option<String>,
}

fn is_tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '+' | '#' | '_')
}

/// Case-sensitive substring scan for `/execute` or `/execute-<tag>`.
pub fn scan_execute_token(text: &str) -> Option<ExecuteToken> {
    let mut found = false;
    for (index, _) in text.match_indices(EXECUTE_COMMAND_TOKEN) {
        found = true;
        let remainder = &text[index + EXECUTE_COMMAND_TOKEN.len()..];
        let Some(candidate) = remainder.strip_prefix('-') else {
            continue;
        };
        let tag = candidate
            .chars()
            .take_while(|ch| is_tag_char(*ch))
            .collect::<String>();
        if !tag.is_empty() {
            return Some(ExecuteToken {
                language_tag: Some(tag.to_ascii_lowercase()),
            });
        }
    }
    found.then_some(ExecuteToken { language_tag: None })
}

/// OR across the PR body, every comment body and every commit message. The
/// language tag comes from the first tagged source in that order.
pub fn detect_execute_command<'a, C, M>(
    body: Option<&'a str>,
    comments: C,
    commit_messages: M,
) -> ExecuteCommand
where
    C: IntoIterator<Item = Option<&'a str>>,
    M: IntoIterator<Item = Option<&'a str>>,
{
    let mut command = ExecuteCommand::default();
    let sources = std::iter::once(body)
        .chain(comments)
        .chain(commit_messages)
        .flatten();
    for text in sources {
        let Some(token) = scan_execute_token(text) else {
            continue;
        };
        command.requested = true;
        if command.language_tag.is_none() {
            command.language_tag = token.language_tag;
        }
    }
    command
}
