use serde::{Deserialize, Serialize};

/// One ordered step of the load pipeline. Ordering follows execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    PrepareAssets,
    CreateDirectories,
    ParseConfig,
}

impl PipelineStage {
    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::PrepareAssets => "prepare-assets",
            PipelineStage::CreateDirectories => "create-directories",
            PipelineStage::ParseConfig => "parse-config",
        }
    }

    /// Progress text shown while the stage runs.
    pub fn status_text(self) -> &'static str {
        match self {
            PipelineStage::PrepareAssets => "Copying data…",
            PipelineStage::CreateDirectories => "Creating folders…",
            PipelineStage::ParseConfig => "Reading configuration…",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a stage ended within one pipeline attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Succeeded,
    Failed,
    /// Never started because the pipeline was cancelled or an earlier
    /// stage failed.
    Skipped,
}
