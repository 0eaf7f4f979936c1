//! Validated inbound commands.
//!
//! A `Command` is what remains of a client frame after structural parsing and
//! field validation. Anything that cannot be turned into a `Command` is dropped
//! before it reaches the coordinator.

use super::{
    artifact::ArtifactType,
    entity::MemoryKind,
    value_object::{ChatText, ClientId, DisplayName, MemoryText},
};

/// Where the content of a new artifact comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Content supplied verbatim by the client
    Manual { content: String },
    /// Content generated by the AI
    Ai,
}

/// Request to create an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub artifact_type: ArtifactType,
    /// `None` means "use the type's default title"
    pub title: Option<String>,
    pub source: ArtifactSource,
    /// Author name sent alongside the request, used when the socket never said hello
    pub user: Option<DisplayName>,
}

impl ArtifactRequest {
    pub fn title_or_default(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.artifact_type.default_title().to_string())
    }
}

/// Inbound command from one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Hello {
        client_id: ClientId,
        user: DisplayName,
    },
    Chat {
        user: DisplayName,
        text: ChatText,
    },
    MemoryAdd {
        kind: MemoryKind,
        text: MemoryText,
    },
    MemoryRemove {
        kind: MemoryKind,
        index: usize,
    },
    MemoryToggle {
        index: usize,
    },
    ArtifactCreate(ArtifactRequest),
    ArtifactDelete {
        id: String,
    },
    ArtifactGet {
        id: String,
    },
    ArtifactList,
}

/// Legacy slash command carried inside a chat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyCommand {
    Remember(MemoryText),
    Todo(MemoryText),
    ShowMemory,
    Export,
    Reset,
    Summarize,
    AskAi(String),
}

impl LegacyCommand {
    /// Interpret a chat line. Returns `None` for ordinary chat and for
    /// commands whose argument is missing or invalid.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(prompt) = text.strip_prefix("@ai ") {
            let prompt = prompt.trim();
            return (!prompt.is_empty()).then(|| LegacyCommand::AskAi(prompt.to_string()));
        }
        let rest = text.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let memory_arg = || MemoryText::new(arg.to_string()).ok();
        match name {
            "remember" => memory_arg().map(LegacyCommand::Remember),
            "todo" => memory_arg().map(LegacyCommand::Todo),
            "memory" => Some(LegacyCommand::ShowMemory),
            "export" => Some(LegacyCommand::Export),
            "reset" => Some(LegacyCommand::Reset),
            "summarize" => Some(LegacyCommand::Summarize),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remember_and_todo() {
        // テスト項目: /remember と /todo が引数付きで解釈される
        // given (前提条件):
        let remember = "/remember the venue is booked";
        let todo = "/todo  send invites ";

        // when (操作):
        let remember = LegacyCommand::parse(remember);
        let todo = LegacyCommand::parse(todo);

        // then (期待する結果):
        assert_eq!(
            remember,
            Some(LegacyCommand::Remember(
                MemoryText::new("the venue is booked".to_string()).unwrap()
            ))
        );
        assert_eq!(
            todo,
            Some(LegacyCommand::Todo(
                MemoryText::new("send invites".to_string()).unwrap()
            ))
        );
    }

    #[test]
    fn test_parse_commands_without_arguments() {
        // テスト項目: 引数なしのコマンドが解釈される
        // given (前提条件):
        let inputs = ["/memory", "/export", "/reset", "/summarize"];

        // when (操作):
        let parsed: Vec<Option<LegacyCommand>> =
            inputs.iter().map(|t| LegacyCommand::parse(t)).collect();

        // then (期待する結果):
        assert_eq!(
            parsed,
            vec![
                Some(LegacyCommand::ShowMemory),
                Some(LegacyCommand::Export),
                Some(LegacyCommand::Reset),
                Some(LegacyCommand::Summarize),
            ]
        );
    }

    #[test]
    fn test_parse_ai_mention() {
        // テスト項目: "@ai " で始まる行が AI への質問として解釈される
        // given (前提条件):
        let text = "@ai what did we decide?";

        // when (操作):
        let parsed = LegacyCommand::parse(text);

        // then (期待する結果):
        assert_eq!(
            parsed,
            Some(LegacyCommand::AskAi("what did we decide?".to_string()))
        );
    }

    #[test]
    fn test_parse_ignores_plain_chat_and_bad_commands() {
        // テスト項目: 通常のチャットや引数不足・未知のコマンドは無視される
        // given (前提条件):
        let inputs = ["hello", "/remember", "/unknown thing", "@ai", "@aiden hi"];

        // when (操作):
        let parsed: Vec<Option<LegacyCommand>> =
            inputs.iter().map(|t| LegacyCommand::parse(t)).collect();

        // then (期待する結果):
        assert!(parsed.iter().all(Option::is_none));
    }
}
