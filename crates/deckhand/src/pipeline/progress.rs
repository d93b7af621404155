/// The fixed steps every job runs through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Convert,
    GatherContext,
    NameShapes,
    SaveResults,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 4] = [
        PipelineStep::Convert,
        PipelineStep::GatherContext,
        PipelineStep::NameShapes,
        PipelineStep::SaveResults,
    ];

    /// Label shown to clients as `current_step`.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStep::Convert => "Converting presentation",
            PipelineStep::GatherContext => "Gathering document context",
            PipelineStep::NameShapes => "Generating shape names",
            PipelineStep::SaveResults => "Saving results",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Steps recorded against every job.
pub const TOTAL_STEPS: u32 = PipelineStep::ALL.len() as u32;
