#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BotCommand {
    Start,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelegramCommandSpec {
    pub command: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommandDef {
    command: BotCommand,
    patterns: &'static [&'static str],
    telegram_spec: TelegramCommandSpec,
}

const COMMAND_DEFS: &[CommandDef] = &[
    CommandDef {
        command: BotCommand::Start,
        patterns: &["/start", "/help"],
        telegram_spec: TelegramCommandSpec {
            command: "start",
            description: "How to merge a selfie with a background",
        },
    },
    CommandDef {
        command: BotCommand::Cancel,
        patterns: &["/cancel"],
        telegram_spec: TelegramCommandSpec {
            command: "cancel",
            description: "Forget the selfie you already sent",
        },
    },
];

pub(crate) fn telegram_command_specs() -> Vec<TelegramCommandSpec> {
    COMMAND_DEFS.iter().map(|def| def.telegram_spec).collect()
}

pub(crate) fn parse_command(text: &str) -> Option<BotCommand> {
    let trimmed = text.trim();

    COMMAND_DEFS.iter().find_map(|def| {
        def.patterns
            .iter()
            .any(|pattern| command_matches(trimmed, pattern))
            .then_some(def.command)
    })
}

/// Matches `/cmd`, `/cmd@botname` and `/cmd <args>`.
fn command_matches(trimmed_text: &str, command: &str) -> bool {
    let Some(rest) = trimmed_text.strip_prefix(command) else {
        return false;
    };
    rest.is_empty() || rest.starts_with('@') || rest.starts_with(char::is_whitespace)
}
