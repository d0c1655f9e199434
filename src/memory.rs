//! Conversation memory
//!
//! A bounded, on-disk log of an agent's user/assistant turns. Persisted as
//! JSON at `<home>/.dana/chats/<agent_type>_conversation.json`; a corrupted
//! file is treated as empty with a logged warning rather than a fatal error.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single recorded exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
    pub turn_number: u64,
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConversationFile {
    turns: Vec<Turn>,
    max_turns: usize,
}

/// Bounded, persisted conversation history for one agent instance.
#[derive(Debug)]
pub struct ConversationMemory {
    path: PathBuf,
    max_turns: usize,
    turns: Vec<Turn>,
}

impl ConversationMemory {
    /// Load (or lazily initialize) the conversation file for `agent_type_name`
    /// under `conversation_dir`.
    pub fn load(conversation_dir: &Path, agent_type_name: &str, max_turns: usize) -> Self {
        let path = conversation_dir.join(format!("{agent_type_name}_conversation.json"));
        let turns = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<ConversationFile>(&contents) {
                Ok(file) => file.turns,
                Err(e) => {
                    warn!("conversation memory file {path:?} is corrupted ({e}); starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            path,
            max_turns,
            turns,
        }
    }

    /// Append a turn, evicting the oldest entries beyond `max_turns`, and
    /// persist the result.
    pub fn append(&mut self, user: impl Into<String>, assistant: impl Into<String>) -> Result<()> {
        let turn_number = self.turns.last().map(|t| t.turn_number + 1).unwrap_or(1);
        self.turns.push(Turn {
            user: user.into(),
            assistant: assistant.into(),
            turn_number,
            created_at: Utc::now().to_rfc3339(),
        });
        while self.turns.len() > self.max_turns {
            self.turns.remove(0);
        }
        self.persist()
    }

    /// The last `n` turns in chronological order.
    pub fn last(&self, n: usize) -> Vec<Turn> {
        let start = self.turns.len().saturating_sub(n);
        self.turns[start..].to_vec()
    }

    pub fn count(&self) -> usize {
        self.turns.len()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.turns.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = ConversationFile {
            turns: self.turns.clone(),
            max_turns: self.max_turns,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_persists_and_evicts() {
        let dir = tempdir().unwrap();
        let mut memory = ConversationMemory::load(dir.path(), "Support", 2);
        memory.append("hi", "hello").unwrap();
        memory.append("how are you", "fine").unwrap();
        memory.append("bye", "goodbye").unwrap();
        assert_eq!(memory.count(), 2);
        assert_eq!(memory.last(1)[0].user, "bye");
    }

    #[test]
    fn test_load_reads_persisted_turns() {
        let dir = tempdir().unwrap();
        {
            let mut memory = ConversationMemory::load(dir.path(), "Support", 20);
            memory.append("a", "b").unwrap();
        }
        let reloaded = ConversationMemory::load(dir.path(), "Support", 20);
        assert_eq!(reloaded.count(), 1);
    }

    #[test]
    fn test_corrupted_file_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Support_conversation.json");
        fs::write(&path, "not json").unwrap();
        let memory = ConversationMemory::load(dir.path(), "Support", 20);
        assert_eq!(memory.count(), 0);
    }

    #[test]
    fn test_clear_empties_and_persists() {
        let dir = tempdir().unwrap();
        let mut memory = ConversationMemory::load(dir.path(), "Support", 20);
        memory.append("a", "b").unwrap();
        memory.clear().unwrap();
        assert_eq!(memory.count(), 0);
        let reloaded = ConversationMemory::load(dir.path(), "Support", 20);
        assert_eq!(reloaded.count(), 0);
    }
}
