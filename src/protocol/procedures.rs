//! Procedure identifiers and payload builders for the notebook workflow.

use serde_json::{json, Value};

/// Tool selector for infographic generation; also the artifact type tag in listings.
pub const INFOGRAPHIC_TOOL_TYPE: u64 = 7;

/// Remote procedures used by the four-step workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureId {
    CreateNotebook,
    AddSource,
    ListNotebookContent,
    RunTool,
}

impl ProcedureId {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureId::CreateNotebook => "CCqFvf",
            ProcedureId::AddSource => "izAoDd",
            ProcedureId::ListNotebookContent => "gArtLc",
            ProcedureId::RunTool => "R7cb6c",
        }
    }
}

impl std::fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn client_context() -> Value {
    json!([1, null, null, null, null, null, null, null, null, null, [1]])
}

pub fn create_notebook(title: &str) -> Value {
    json!([title, null, null, [2], client_context()])
}

pub fn add_source(notebook_id: &str, url: &str) -> Value {
    let source = json!([null, null, null, null, null, null, null, [url], null, null, 1]);
    json!([[source], notebook_id, [2], client_context()])
}

/// Listing payload shared by source discovery and artifact polling.
pub fn list_content(notebook_id: &str) -> Value {
    json!([[2], notebook_id, null])
}

pub fn run_tool(notebook_id: &str, source_id: &str, tool_type: u64) -> Value {
    let tool = json!([
        null,
        null,
        tool_type,
        [[[source_id]]],
        null,
        null,
        null,
        null,
        null,
        null,
        null,
        null,
        null,
        null,
        [[null, null, null, 1, 2]]
    ]);
    json!([[2], notebook_id, tool])
}
