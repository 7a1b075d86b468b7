use serde::{Deserialize, Serialize};

/// Envelope a pooled shell wraps commands into.
///
/// Instead of a bare command line, a pipeline shell submits a structured
/// "create pipeline" request: a fresh pipeline id plus the script to run in
/// the remote execution pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    pub pipeline_id: String,
    pub script: String,
}

impl PipelineRequest {
    pub fn new(pipeline_id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            script: script.into(),
        }
    }
}
