use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_input, Tool, ToolOutput};
use crate::error::{Result, ToolError};
use crate::files::{self, FileError, WriteMode, SUPPORTED_ENCODING};
use crate::security::CommandValidator;

/// Reads a range of lines from a text file.
#[derive(Debug, Clone)]
pub struct ReadFileTool {
    validator: Arc<CommandValidator>,
}

#[derive(Debug, Deserialize)]
struct ReadFileInput {
    file_path: PathBuf,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    start: Option<i64>,
    #[serde(default)]
    end: Option<i64>,
}

impl ReadFileTool {
    pub fn new(validator: Arc<CommandValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read lines [start, end) of a UTF-8 text file. Negative indices count from the end."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Path of the file to read" },
                "encoding": { "type": "string", "enum": [SUPPORTED_ENCODING] },
                "start": { "type": "integer", "description": "First line index (default: 0)" },
                "end": { "type": "integer", "description": "Line index to stop before (default: end of file)" }
            },
            "required": ["file_path"]
        })
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: ReadFileInput = parse_input(self.name(), input)?;
        if let Err(e) = self.validator.validate_path(&input.file_path) {
            return Ok(ToolOutput::error(e.to_string()));
        }
        if let Some(encoding) = &input.encoding {
            if let Err(e) = files::check_encoding(encoding) {
                return Ok(ToolOutput::error(e.to_string()));
            }
        }

        let start = input.start.unwrap_or(0);
        let read = tokio::task::spawn_blocking(move || {
            files::read_file(&input.file_path, start, input.end)
        })
        .await
        .map_err(|e| ToolError::Join(e.to_string()))?;

        Ok(file_output(read))
    }
}

/// Writes, creates or appends to a text file.
#[derive(Debug, Clone)]
pub struct WriteFileTool {
    validator: Arc<CommandValidator>,
}

#[derive(Debug, Deserialize)]
struct WriteFileInput {
    file_path: PathBuf,
    mode: String,
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

impl WriteFileTool {
    pub fn new(validator: Arc<CommandValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write text to a file. Mode 'w' overwrites, 'x' creates a new file and fails if it \
         exists, 'a' appends on a new line."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Path of the file to write" },
                "mode": { "type": "string", "enum": ["w", "x", "a"] },
                "content": { "type": "string" },
                "encoding": { "type": "string", "enum": [SUPPORTED_ENCODING] }
            },
            "required": ["file_path", "mode", "content"]
        })
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: WriteFileInput = parse_input(self.name(), input)?;
        if let Err(e) = self.validator.validate_path(&input.file_path) {
            return Ok(ToolOutput::error(e.to_string()));
        }
        let checked = input
            .encoding
            .as_deref()
            .map(files::check_encoding)
            .transpose()
            .and_then(|_| input.mode.parse::<WriteMode>());
        let mode = match checked {
            Ok(mode) => mode,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        let written = tokio::task::spawn_blocking(move || {
            files::write_file(&input.file_path, mode, &input.content)
        })
        .await
        .map_err(|e| ToolError::Join(e.to_string()))?;

        Ok(file_output(written))
    }
}

/// Saves a numbered outline.
#[derive(Debug, Clone)]
pub struct CreateOutlineTool {
    validator: Arc<CommandValidator>,
}

#[derive(Debug, Deserialize)]
struct CreateOutlineInput {
    points: Vec<String>,
    file_path: PathBuf,
}

impl CreateOutlineTool {
    pub fn new(validator: Arc<CommandValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Tool for CreateOutlineTool {
    fn name(&self) -> &'static str {
        "create_outline"
    }

    fn description(&self) -> &'static str {
        "Write a list of points to a file as a numbered outline, replacing its contents."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "points": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Main points or sections, in order"
                },
                "file_path": { "type": "string", "description": "Path to save the outline to" }
            },
            "required": ["points", "file_path"]
        })
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: CreateOutlineInput = parse_input(self.name(), input)?;
        if let Err(e) = self.validator.validate_path(&input.file_path) {
            return Ok(ToolOutput::error(e.to_string()));
        }

        let saved = tokio::task::spawn_blocking(move || {
            files::create_outline(&input.file_path, &input.points)
        })
        .await
        .map_err(|e| ToolError::Join(e.to_string()))?;

        Ok(file_output(saved))
    }
}

/// Inserts lines into an existing document.
#[derive(Debug, Clone)]
pub struct EditDocumentTool {
    validator: Arc<CommandValidator>,
}

#[derive(Debug, Deserialize)]
struct EditDocumentInput {
    file_path: PathBuf,
    /// Keyed by 1-indexed line number; JSON object keys are numeric strings.
    inserts: BTreeMap<usize, String>,
}

impl EditDocumentTool {
    pub fn new(validator: Arc<CommandValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Tool for EditDocumentTool {
    fn name(&self) -> &'static str {
        "edit_document"
    }

    fn description(&self) -> &'static str {
        "Insert text before 1-indexed line numbers of a document. Inserts apply in ascending \
         line order; a line past the end plus one rejects the whole edit."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Path of the document to edit" },
                "inserts": {
                    "type": "object",
                    "additionalProperties": { "type": "string" },
                    "description": "Map of line number (1-indexed) to the text inserted at that line"
                }
            },
            "required": ["file_path", "inserts"]
        })
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: EditDocumentInput = parse_input(self.name(), input)?;
        if let Err(e) = self.validator.validate_path(&input.file_path) {
            return Ok(ToolOutput::error(e.to_string()));
        }

        let edited = tokio::task::spawn_blocking(move || {
            files::edit_document(&input.file_path, &input.inserts)
        })
        .await
        .map_err(|e| ToolError::Join(e.to_string()))?;

        Ok(file_output(edited))
    }
}

fn file_output(result: std::result::Result<String, FileError>) -> ToolOutput {
    match result {
        Ok(text) => ToolOutput::text(text),
        Err(e) => ToolOutput::error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn validator() -> Arc<CommandValidator> {
        Arc::new(CommandValidator::default())
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let path_str = path.to_str().unwrap();

        let writer = WriteFileTool::new(validator());
        let out = writer
            .call(json!({ "file_path": path_str, "mode": "w", "content": "alpha\nbeta" }))
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(
            out.as_text().unwrap(),
            format!("Content successfully written to {}", path.display())
        );

        writer
            .call(json!({ "file_path": path_str, "mode": "a", "content": "gamma" }))
            .await
            .unwrap();

        let reader = ReadFileTool::new(validator());
        let all = reader.call(json!({ "file_path": path_str })).await.unwrap();
        assert_eq!(all.as_text(), Some("alpha\nbeta\ngamma"));

        let tail = reader
            .call(json!({ "file_path": path_str, "start": -1 }))
            .await
            .unwrap();
        assert_eq!(tail.as_text(), Some("gamma"));
    }

    #[tokio::test]
    async fn test_read_missing_is_error_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.txt");

        let out = ReadFileTool::new(validator())
            .call(json!({ "file_path": path.to_str().unwrap() }))
            .await
            .unwrap();
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn test_bad_mode_and_encoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.txt");
        let path_str = path.to_str().unwrap();
        let writer = WriteFileTool::new(validator());

        let bad_mode = writer
            .call(json!({ "file_path": path_str, "mode": "rw", "content": "" }))
            .await
            .unwrap();
        assert!(bad_mode.is_error);

        let bad_encoding = writer
            .call(json!({ "file_path": path_str, "mode": "w", "content": "", "encoding": "utf-16" }))
            .await
            .unwrap();
        assert!(bad_encoding.is_error);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let out = ReadFileTool::new(validator())
            .call(json!({ "file_path": "../../etc/passwd" }))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.as_text().unwrap().contains("traversal"));
    }

    #[tokio::test]
    async fn test_outline_then_edit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.md");
        let path_str = path.to_str().unwrap();

        let outline = CreateOutlineTool::new(validator())
            .call(json!({ "points": ["Goals", "Risks"], "file_path": path_str }))
            .await
            .unwrap();
        assert!(!outline.is_error);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1. Goals\n2. Risks\n");

        let editor = EditDocumentTool::new(validator());
        let edited = editor
            .call(json!({ "file_path": path_str, "inserts": { "2": "   - ship on time" } }))
            .await
            .unwrap();
        assert!(!edited.is_error);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "1. Goals\n   - ship on time\n2. Risks\n"
        );

        let out_of_range = editor
            .call(json!({ "file_path": path_str, "inserts": { "9": "nope" } }))
            .await
            .unwrap();
        assert!(out_of_range.is_error);
        assert!(out_of_range.as_text().unwrap().contains("out of range"));
    }

    #[tokio::test]
    async fn test_edit_non_numeric_line_is_invalid_input() {
        let err = EditDocumentTool::new(validator())
            .call(json!({ "file_path": "doc.txt", "inserts": { "first": "x" } }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
