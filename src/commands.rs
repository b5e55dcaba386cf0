//! File commands issued by a code-generating assistant.
//!
//! Every command is a closed, tagged variant validated by serde before it
//! touches the store, so malformed input never reaches a mutation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::VfsError;
use crate::vfs::VirtualFileStore;

pub const EDITOR_TOOL: &str = "str_replace_editor";
pub const FILE_MANAGER_TOOL: &str = "file_manager";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid command input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error("No match for the search text in {path}")]
    NoMatch { path: String },

    #[error("Invalid view range [{start}, {end}] for {path}")]
    InvalidRange { path: String, start: i64, end: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case", deny_unknown_fields)]
pub enum EditorCommand {
    /// Numbered file contents, or a directory listing.
    View {
        path: String,
        /// Inclusive 1-based line range; `-1` as the end means end of file.
        #[serde(default)]
        view_range: Option<[i64; 2]>,
    },
    /// Writes a file, replacing any existing content.
    Create { path: String, file_text: String },
    StrReplace {
        path: String,
        old_str: String,
        #[serde(default)]
        new_str: String,
        /// Defaults to exactly one.
        #[serde(default)]
        expected_occurrences: Option<usize>,
    },
    /// Inserts text after line `insert_line` (0 inserts at the top).
    Insert {
        path: String,
        insert_line: usize,
        new_str: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case", deny_unknown_fields)]
pub enum FileManagerCommand {
    Rename { path: String, new_path: String },
    Delete { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Editor(EditorCommand),
    FileManager(FileManagerCommand),
}

impl ToolCall {
    /// Validates a tool invocation by name and JSON input.
    pub fn from_json(tool_name: &str, input: &serde_json::Value) -> Result<Self, CommandError> {
        match tool_name {
            EDITOR_TOOL => Ok(ToolCall::Editor(EditorCommand::deserialize(input)?)),
            FILE_MANAGER_TOOL => Ok(ToolCall::FileManager(FileManagerCommand::deserialize(input)?)),
            other => Err(CommandError::UnknownTool(other.to_string())),
        }
    }

    /// Applies the command and returns a human-readable result.
    pub fn apply(&self, store: &mut VirtualFileStore) -> Result<String, CommandError> {
        let result = match self {
            ToolCall::Editor(command) => apply_editor(command, store),
            ToolCall::FileManager(command) => apply_file_manager(command, store),
        };
        match &result {
            Ok(_) => debug!(command = ?self, "file command applied"),
            Err(err) => warn!(error = %err, "file command rejected"),
        }
        result
    }
}

/// Parses and applies one tool invocation.
pub fn execute_tool(
    store: &mut VirtualFileStore,
    tool_name: &str,
    input: &serde_json::Value,
) -> Result<String, CommandError> {
    ToolCall::from_json(tool_name, input)?.apply(store)
}

fn view(
    store: &VirtualFileStore,
    path: &str,
    range: Option<[i64; 2]>,
) -> Result<String, CommandError> {
    if let Some(node) = store.get(path).filter(|node| node.is_directory()) {
        let entries = store.list_directory(&node.path)?;
        if entries.is_empty() {
            return Ok(format!("{} is empty", node.path));
        }
        return Ok(entries
            .iter()
            .map(|entry| {
                let marker = if entry.is_directory() { "[DIR]" } else { "[FILE]" };
                format!("{} {}", marker, entry.name())
            })
            .collect::<Vec<_>>()
            .join("\n"));
    }

    let content = store.read_file(path)?;
    let lines: Vec<&str> = content.lines().collect();
    let (start, end) = match range {
        None => (1, lines.len()),
        Some([start, end]) => {
            let last = if end == -1 { lines.len() as i64 } else { end };
            if start < 1 || last < start || last > lines.len() as i64 {
                return Err(CommandError::InvalidRange {
                    path: path.to_string(),
                    start,
                    end,
                });
            }
            (start as usize, last as usize)
        }
    };

    Ok(lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| (start..=end).contains(&(idx + 1)))
        .map(|(idx, line)| format!("{}\t{}", idx + 1, line))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn apply_editor(
    command: &EditorCommand,
    store: &mut VirtualFileStore,
) -> Result<String, CommandError> {
    match command {
        EditorCommand::View { path, view_range } => view(store, path, *view_range),
        EditorCommand::Create { path, file_text } => {
            let existed = store.get(path).is_some_and(|node| node.is_file());
            store.write_file(path, file_text)?;
            Ok(if existed {
                format!("Overwrote {}", path)
            } else {
                format!("Created {}", path)
            })
        }
        EditorCommand::StrReplace {
            path,
            old_str,
            new_str,
            expected_occurrences,
        } => {
            let expected = expected_occurrences.unwrap_or(1);
            match store.replace_in_file(path, old_str, new_str, Some(expected)) {
                Ok(count) => Ok(format!("Replaced {} occurrence(s) in {}", count, path)),
                Err(VfsError::AmbiguousMatch { found: 0, .. }) => Err(CommandError::NoMatch {
                    path: path.to_string(),
                }),
                Err(err) => Err(err.into()),
            }
        }
        EditorCommand::Insert {
            path,
            insert_line,
            new_str,
        } => {
            store.insert_at_line(path, *insert_line, new_str)?;
            Ok(format!("Inserted text after line {} in {}", insert_line, path))
        }
    }
}

fn apply_file_manager(
    command: &FileManagerCommand,
    store: &mut VirtualFileStore,
) -> Result<String, CommandError> {
    match command {
        FileManagerCommand::Rename { path, new_path } => {
            store.rename(path, new_path)?;
            Ok(format!("Renamed {} to {}", path, new_path))
        }
        FileManagerCommand::Delete { path } => {
            store.delete(path)?;
            Ok(format!("Deleted {}", path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> VirtualFileStore {
        let mut store = VirtualFileStore::new();
        store
            .create_file("/App.jsx", "line one\nline two\nline three")
            .unwrap();
        store.create_file("/components/Button.jsx", "x").unwrap();
        store
    }

    #[test]
    fn test_unknown_tool_and_bad_input() {
        assert!(matches!(
            ToolCall::from_json("run_shell_command", &json!({})),
            Err(CommandError::UnknownTool(_))
        ));
        assert!(matches!(
            ToolCall::from_json(EDITOR_TOOL, &json!({ "command": "explode", "path": "/a" })),
            Err(CommandError::InvalidInput(_))
        ));
        assert!(matches!(
            ToolCall::from_json(
                EDITOR_TOOL,
                &json!({ "command": "view", "path": "/a", "extra": 1 })
            ),
            Err(CommandError::InvalidInput(_))
        ));
        assert!(matches!(
            ToolCall::from_json(EDITOR_TOOL, &json!({ "command": "create", "path": "/a" })),
            Err(CommandError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_view_file_and_directory() {
        let mut store = store();
        let out = execute_tool(
            &mut store,
            EDITOR_TOOL,
            &json!({ "command": "view", "path": "/App.jsx" }),
        )
        .unwrap();
        assert_eq!(out, "1\tline one\n2\tline two\n3\tline three");

        let out = execute_tool(
            &mut store,
            EDITOR_TOOL,
            &json!({ "command": "view", "path": "/App.jsx", "view_range": [2, -1] }),
        )
        .unwrap();
        assert_eq!(out, "2\tline two\n3\tline three");

        let out = execute_tool(
            &mut store,
            EDITOR_TOOL,
            &json!({ "command": "view", "path": "/" }),
        )
        .unwrap();
        assert_eq!(out, "[FILE] App.jsx\n[DIR] components");

        assert!(matches!(
            execute_tool(
                &mut store,
                EDITOR_TOOL,
                &json!({ "command": "view", "path": "/App.jsx", "view_range": [3, 9] })
            ),
            Err(CommandError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_create_and_str_replace() {
        let mut store = store();
        let out = execute_tool(
            &mut store,
            EDITOR_TOOL,
            &json!({
                "command": "create",
                "path": "/lib/util.js",
                "file_text": "export const a = 1;"
            }),
        )
        .unwrap();
        assert_eq!(out, "Created /lib/util.js");

        execute_tool(
            &mut store,
            EDITOR_TOOL,
            &json!({
                "command": "str_replace",
                "path": "/lib/util.js",
                "old_str": "1",
                "new_str": "2"
            }),
        )
        .unwrap();
        assert_eq!(store.read_file("/lib/util.js").unwrap(), "export const a = 2;");

        assert!(matches!(
            execute_tool(
                &mut store,
                EDITOR_TOOL,
                &json!({
                    "command": "str_replace",
                    "path": "/lib/util.js",
                    "old_str": "zzz",
                    "new_str": ""
                })
            ),
            Err(CommandError::NoMatch { .. })
        ));
        assert!(matches!(
            execute_tool(
                &mut store,
                EDITOR_TOOL,
                &json!({
                    "command": "str_replace",
                    "path": "/App.jsx",
                    "old_str": "line",
                    "new_str": "row"
                })
            ),
            Err(CommandError::Vfs(VfsError::AmbiguousMatch { found: 3, .. }))
        ));
    }

    #[test]
    fn test_insert_rename_delete() {
        let mut store = store();
        execute_tool(
            &mut store,
            EDITOR_TOOL,
            &json!({
                "command": "insert",
                "path": "/App.jsx",
                "insert_line": 1,
                "new_str": "inserted"
            }),
        )
        .unwrap();
        assert_eq!(
            store.read_file("/App.jsx").unwrap(),
            "line one\ninserted\nline two\nline three"
        );

        execute_tool(
            &mut store,
            FILE_MANAGER_TOOL,
            &json!({ "command": "rename", "path": "/components", "new_path": "/ui" }),
        )
        .unwrap();
        assert!(store.exists("/ui/Button.jsx"));
        assert!(!store.exists("/components"));

        execute_tool(
            &mut store,
            FILE_MANAGER_TOOL,
            &json!({ "command": "delete", "path": "/ui" }),
        )
        .unwrap();
        assert!(!store.exists("/ui/Button.jsx"));

        assert!(matches!(
            execute_tool(
                &mut store,
                FILE_MANAGER_TOOL,
                &json!({ "command": "delete", "path": "/nope" })
            ),
            Err(CommandError::Vfs(VfsError::NotFound { .. }))
        ));
    }
}
