use crate::error::PorfiryError;
use crate::types::MessageRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far the bot's humour is allowed to go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumorMode {
    Soft,
    #[default]
    Hard,
    Insane,
}

impl HumorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HumorMode::Soft => "soft",
            HumorMode::Hard => "hard",
            HumorMode::Insane => "insane",
        }
    }

    fn style(self) -> &'static str {
        match self {
            HumorMode::Soft => "Light sarcasm, more irony than edge.",
            HumorMode::Hard => {
                "Dark humour, cynicism, hard punchlines, but no harassment over protected traits."
            }
            HumorMode::Insane => {
                "Full unhinged stand-up: absurd and on fire, but nothing illegal."
            }
        }
    }
}

impl fmt::Display for HumorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HumorMode {
    type Err = PorfiryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(HumorMode::Soft),
            "hard" => Ok(HumorMode::Hard),
            "insane" => Ok(HumorMode::Insane),
            other => Err(PorfiryError::Validation(format!(
                "unknown humor mode {other:?} (expected soft, hard or insane)"
            ))),
        }
    }
}

/// The bot's character: the system prompt plus the user-prompt templates.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    pub mode: HumorMode,
}

impl Default for Persona {
    fn default() -> Self {
        Self::new(HumorMode::default())
    }
}

impl Persona {
    pub fn new(mode: HumorMode) -> Self {
        Self {
            name: "Porfiry".to_string(),
            mode,
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are {name}, a cynical comedian living in a private group chat. \
             Mode: {style} \
             Keep it short, bold and funny. No calls to violence, no extremism, no doxxing.",
            name = self.name,
            style = self.mode.style()
        )
    }

    /// Prompt for an explicit command aimed at `target`.
    pub fn command_prompt(&self, context: &[MessageRecord], target: &str) -> String {
        format!(
            "{}Message from the chat:\n{}\n\nAnswer in {}'s style.",
            context_block(context),
            target,
            self.name
        )
    }

    /// Prompt for a user replying to one of the bot's own messages.
    pub fn follow_up_prompt(
        &self,
        context: &[MessageRecord],
        bot_message: &str,
        user_reply: &str,
    ) -> String {
        format!(
            "{ctx}{name}'s previous message:\n{bot_message}\n\n\
             The user replies:\n{user_reply}\n\n\
             Keep going in {name}'s style.",
            ctx = context_block(context),
            name = self.name,
        )
    }

    /// Prompt asking for the daily write-up of `rows`.
    pub fn digest_prompt(&self, rows: &[MessageRecord]) -> String {
        let sample = rows
            .iter()
            .map(|r| format!("- {}: {}", r.user, r.text))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Write the daily review of this chat: key topics, how everyone behaved, \
             funny and cynical remarks about the participants' personalities. \
             Format: 1) Day in review 2) Character portraits 3) Forecast for tomorrow.\n\n\
             Log for the last 24 hours:\n{sample}"
        )
    }

    pub fn digest_header(&self) -> String {
        format!("🕕 {}'s daily review", self.name)
    }
}

/// Recent chat lines rendered as a context preamble, or nothing at all.
fn context_block(context: &[MessageRecord]) -> String {
    if context.is_empty() {
        return String::new();
    }
    let lines = context
        .iter()
        .map(|r| format!("  {}: {}", r.user, r.text))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Latest messages in the chat:\n{lines}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("SOFT".parse::<HumorMode>().unwrap(), HumorMode::Soft);
        assert_eq!(" insane ".parse::<HumorMode>().unwrap(), HumorMode::Insane);
        assert!("medium".parse::<HumorMode>().is_err());
    }

    #[test]
    fn test_system_prompt_reflects_mode() {
        let soft = Persona::new(HumorMode::Soft).system_prompt();
        let hard = Persona::new(HumorMode::Hard).system_prompt();
        assert!(soft.contains("Light sarcasm"));
        assert!(hard.contains("Dark humour"));
    }

    #[test]
    fn test_command_prompt_includes_context_and_target() {
        let persona = Persona::default();
        let ctx = vec![MessageRecord::new(Utc::now(), -1, "Anna", "who ate my lunch")];
        let prompt = persona.command_prompt(&ctx, "roast Boris");

        assert!(prompt.starts_with("Latest messages in the chat:\n  Anna: who ate my lunch"));
        assert!(prompt.contains("Message from the chat:\nroast Boris"));
    }

    #[test]
    fn test_empty_context_adds_no_preamble() {
        let prompt = Persona::default().command_prompt(&[], "hello");
        assert!(prompt.starts_with("Message from the chat:"));
    }

    #[test]
    fn test_digest_prompt_lists_rows() {
        let rows = vec![
            MessageRecord::new(Utc::now(), -1, "a", "one"),
            MessageRecord::new(Utc::now(), -1, "b", "two"),
        ];
        let prompt = Persona::default().digest_prompt(&rows);
        assert!(prompt.ends_with("- a: one\n- b: two"));
    }
}
