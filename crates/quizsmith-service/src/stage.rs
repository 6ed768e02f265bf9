use std::fmt;

/// Progress of a single quiz request through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Received,
    DocumentResolved,
    ChapterValidated,
    IndexBuilt,
    ContextRetrieved,
    Generated,
    Parsed,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received         => "received",
            PipelineStage::DocumentResolved => "document_resolved",
            PipelineStage::ChapterValidated => "chapter_validated",
            PipelineStage::IndexBuilt       => "index_built",
            PipelineStage::ContextRetrieved => "context_retrieved",
            PipelineStage::Generated        => "generated",
            PipelineStage::Parsed           => "parsed",
            PipelineStage::Done             => "done",
            PipelineStage::Failed           => "failed",
        }
    }

    /// The stage that follows on success; terminal stages have none.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Received         => Some(PipelineStage::DocumentResolved),
            PipelineStage::DocumentResolved => Some(PipelineStage::ChapterValidated),
            PipelineStage::ChapterValidated => Some(PipelineStage::IndexBuilt),
            PipelineStage::IndexBuilt       => Some(PipelineStage::ContextRetrieved),
            PipelineStage::ContextRetrieved => Some(PipelineStage::Generated),
            PipelineStage::Generated        => Some(PipelineStage::Parsed),
            PipelineStage::Parsed           => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
