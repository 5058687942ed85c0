/// If `text` starts with `command`, return the argument that follows it.
///
/// Matching is a plain prefix test, so `/nax`, `/nax hello` and
/// `/nax@PorfiryBot hello` all match `/nax`. A leading `@bot_username`
/// mention is stripped when it names this bot.
pub fn command_argument<'a>(
    text: &'a str,
    command: &str,
    bot_username: Option<&str>,
) -> Option<&'a str> {
    let rest = text.strip_prefix(command)?;
    let rest = match (rest.strip_prefix('@'), bot_username) {
        (Some(mention), Some(username)) => {
            let end = mention
                .find(char::is_whitespace)
                .unwrap_or(mention.len());
            if mention[..end].eq_ignore_ascii_case(username) {
                &mention[end..]
            } else {
                rest
            }
        }
        _ => rest,
    };
    Some(rest.trim())
}

/// True if `text` is exactly `command`, optionally addressed to this bot and
/// followed by arguments. Unlike [`command_argument`], `/bindings` does not
/// count as `/bind`.
pub fn is_command(text: &str, command: &str, bot_username: Option<&str>) -> bool {
    let Some(rest) = text.strip_prefix(command) else {
        return false;
    };
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return true;
    }
    match (rest.strip_prefix('@'), bot_username) {
        (Some(mention), Some(username)) => {
            let end = mention
                .find(char::is_whitespace)
                .unwrap_or(mention.len());
            mention[..end].eq_ignore_ascii_case(username)
        }
        _ => false,
    }
}
