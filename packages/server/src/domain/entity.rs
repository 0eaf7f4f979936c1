//! Core domain models for a collaboration room: chat history and pinned memory.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{
    error::RoomError,
    value_object::{ChatText, DisplayName, MemoryText, Timestamp},
};

/// Default maximum number of chat entries kept in a room
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// A single chat line in the room history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Author display name
    pub user: String,
    /// Message body
    pub text: String,
    /// Server-assigned timestamp
    pub ts: Timestamp,
}

impl ChatEntry {
    /// Create a new chat entry
    pub fn new(user: DisplayName, text: ChatText, ts: Timestamp) -> Self {
        Self {
            user: user.into_string(),
            text: text.into_string(),
            ts,
        }
    }
}

/// Bounded, append-only chat log.
///
/// Appending beyond capacity drops the oldest entries, so the log always holds
/// the most recent `capacity` entries in arrival order.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl ChatHistory {
    /// Create an empty history with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild a history from persisted entries, keeping only the newest `capacity`
    pub fn from_entries(entries: Vec<ChatEntry>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Append an entry, trimming the oldest ones past capacity
    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// The `count` most recent entries, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ChatEntry> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Which pinned memory collection a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// Free-text notes
    Memories,
    /// Todo items
    Todos,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Memories => "memories",
            MemoryKind::Todos => "todos",
        }
    }
}

/// A todo entry in pinned memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub text: String,
    pub done: bool,
}

/// Small curated scratchpad of notes and todos, distinct from the chat log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedMemory {
    #[serde(default)]
    pub memories: Vec<String>,
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}

impl PinnedMemory {
    /// Append `text` to the collection named by `kind`
    pub fn add(&mut self, kind: MemoryKind, text: MemoryText) {
        match kind {
            MemoryKind::Memories => self.memories.push(text.into_string()),
            MemoryKind::Todos => self.todos.push(TodoItem {
                text: text.into_string(),
                done: false,
            }),
        }
    }

    /// Remove the entry at `index` from the collection named by `kind`
    ///
    /// # Errors
    ///
    /// Returns `RoomError::IndexOutOfRange` if `index` does not exist
    pub fn remove(&mut self, kind: MemoryKind, index: usize) -> Result<(), RoomError> {
        let len = match kind {
            MemoryKind::Memories => self.memories.len(),
            MemoryKind::Todos => self.todos.len(),
        };
        if index >= len {
            return Err(RoomError::IndexOutOfRange {
                kind: kind.as_str(),
                index,
                len,
            });
        }
        match kind {
            MemoryKind::Memories => {
                self.memories.remove(index);
            }
            MemoryKind::Todos => {
                self.todos.remove(index);
            }
        }
        Ok(())
    }

    /// Flip the completion flag of the todo at `index`, returning the new state
    ///
    /// # Errors
    ///
    /// Returns `RoomError::IndexOutOfRange` if `index` does not exist
    pub fn toggle(&mut self, index: usize) -> Result<bool, RoomError> {
        let len = self.todos.len();
        let todo = self
            .todos
            .get_mut(index)
            .ok_or(RoomError::IndexOutOfRange {
                kind: MemoryKind::Todos.as_str(),
                index,
                len,
            })?;
        todo.done = !todo.done;
        Ok(todo.done)
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty() && self.todos.is_empty()
    }

    pub fn clear(&mut self) {
        self.memories.clear();
        self.todos.clear();
    }

    /// Render as plain text for prompts and the `/memory` command
    pub fn format(&self) -> String {
        if self.is_empty() {
            return "(no pinned memory)".to_string();
        }
        let mut out = String::new();
        if !self.memories.is_empty() {
            out.push_str("Pinned memories:\n");
            for memory in &self.memories {
                out.push_str(&format!("- {memory}\n"));
            }
        }
        if !self.todos.is_empty() {
            out.push_str("Todos:\n");
            for todo in &self.todos {
                let mark = if todo.done { "x" } else { " " };
                out.push_str(&format!("- [{mark}] {}\n", todo.text));
            }
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> ChatEntry {
        ChatEntry::new(
            DisplayName::new("alice".to_string()).unwrap(),
            ChatText::new(format!("message {n}")).unwrap(),
            Timestamp::new(n as i64),
        )
    }

    fn text(value: &str) -> MemoryText {
        MemoryText::new(value.to_string()).unwrap()
    }

    #[test]
    fn test_history_keeps_most_recent_entries_in_order() {
        // テスト項目: 容量 N に N+k 件追加すると最新の N 件が到着順で残る
        // given (前提条件):
        let mut history = ChatHistory::new(DEFAULT_HISTORY_CAPACITY);

        // when (操作):
        for n in 0..DEFAULT_HISTORY_CAPACITY + 7 {
            history.push(entry(n));
        }

        // then (期待する結果):
        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
        let texts: Vec<String> = history.iter().map(|e| e.text.clone()).collect();
        let expected: Vec<String> = (7..DEFAULT_HISTORY_CAPACITY + 7)
            .map(|n| format!("message {n}"))
            .collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_history_from_entries_trims_to_capacity() {
        // テスト項目: 永続化された履歴が容量を超えていても読み込み時に切り詰められる
        // given (前提条件):
        let entries: Vec<ChatEntry> = (0..10).map(entry).collect();

        // when (操作):
        let history = ChatHistory::from_entries(entries, 3);

        // then (期待する結果):
        let ts: Vec<i64> = history.iter().map(|e| e.ts.value()).collect();
        assert_eq!(ts, vec![7, 8, 9]);
    }

    #[test]
    fn test_history_recent_returns_oldest_first() {
        // テスト項目: recent は直近 K 件を古い順で返す
        // given (前提条件):
        let mut history = ChatHistory::new(50);
        for n in 0..30 {
            history.push(entry(n));
        }

        // when (操作):
        let recent: Vec<i64> = history.recent(20).map(|e| e.ts.value()).collect();

        // then (期待する結果):
        assert_eq!(recent.len(), 20);
        assert_eq!(recent.first(), Some(&10));
        assert_eq!(recent.last(), Some(&29));
    }

    #[test]
    fn test_pinned_memory_add_remove_toggle() {
        // テスト項目: メモの追加・削除・トグルが正しく反映される
        // given (前提条件):
        let mut pinned = PinnedMemory::default();
        pinned.add(MemoryKind::Memories, text("ship friday"));
        pinned.add(MemoryKind::Todos, text("write tests"));
        pinned.add(MemoryKind::Todos, text("deploy"));

        // when (操作):
        let done = pinned.toggle(1).unwrap();
        pinned.remove(MemoryKind::Todos, 0).unwrap();

        // then (期待する結果):
        assert!(done);
        assert_eq!(pinned.memories, vec!["ship friday".to_string()]);
        assert_eq!(
            pinned.todos,
            vec![TodoItem {
                text: "deploy".to_string(),
                done: true
            }]
        );
    }

    #[test]
    fn test_pinned_memory_out_of_range_is_error() {
        // テスト項目: 範囲外のインデックス指定はエラーになり状態は変わらない
        // given (前提条件):
        let mut pinned = PinnedMemory::default();
        pinned.add(MemoryKind::Memories, text("only one"));

        // when (操作):
        let remove = pinned.remove(MemoryKind::Memories, 1);
        let toggle = pinned.toggle(0);

        // then (期待する結果):
        assert_eq!(
            remove,
            Err(RoomError::IndexOutOfRange {
                kind: "memories",
                index: 1,
                len: 1
            })
        );
        assert!(toggle.is_err());
        assert_eq!(pinned.memories.len(), 1);
    }

    #[test]
    fn test_pinned_memory_format() {
        // テスト項目: 固定メモがプロンプト用のテキストに整形される
        // given (前提条件):
        let mut pinned = PinnedMemory::default();
        pinned.add(MemoryKind::Memories, text("budget is 10k"));
        pinned.add(MemoryKind::Todos, text("book venue"));
        pinned.toggle(0).unwrap();

        // when (操作):
        let formatted = pinned.format();

        // then (期待する結果):
        assert_eq!(
            formatted,
            "Pinned memories:\n- budget is 10k\nTodos:\n- [x] book venue"
        );
        assert_eq!(PinnedMemory::default().format(), "(no pinned memory)");
    }

    #[test]
    fn test_pinned_memory_deserializes_missing_fields() {
        // テスト項目: 欠けたフィールドを持つ永続化データも空として読み込める
        // given (前提条件):
        let json = r#"{"memories":["a"]}"#;

        // when (操作):
        let pinned: PinnedMemory = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(pinned.memories, vec!["a".to_string()]);
        assert!(pinned.todos.is_empty());
    }
}
