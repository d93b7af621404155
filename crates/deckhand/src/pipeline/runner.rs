use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::broadcast::{JobProgressBroadcaster, JobProgressTracker, JobStore};
use crate::config::Config;
use crate::error::{ConfigError, JobError};
use crate::processor::naming::semantic_tags;
use crate::processor::{DocumentReference, NamingContext, PresentationAnalysis};
use crate::retrieval::{load_directory, SearchHit};
use crate::worker::job::{Job, JobMutation};

use super::config::{PipelineConfig, ProcessingOptions};
use super::context::PipelineContext;
use super::error::PipelineError;
use super::progress::PipelineStep;
use super::services::PipelineServices;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Completed(Job),
    Failed(Job),
    /// The job disappeared or stopped accepting updates mid-run.
    Abandoned,
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    services: PipelineServices,
    store: Arc<JobStore>,
    broadcaster: JobProgressBroadcaster,
}

impl Pipeline {
    /// Production constructor, builds all collaborators from config.
    pub fn from_config(
        config: &Config,
        store: Arc<JobStore>,
        broadcaster: JobProgressBroadcaster,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            Arc::new(PipelineConfig::from_config(config)),
            PipelineServices::from_config(config)?,
            store,
            broadcaster,
        ))
    }

    pub fn new(
        config: Arc<PipelineConfig>,
        services: PipelineServices,
        store: Arc<JobStore>,
        broadcaster: JobProgressBroadcaster,
    ) -> Self {
        Self {
            config,
            services,
            store,
            broadcaster,
        }
    }

    pub fn services(&self) -> &PipelineServices {
        &self.services
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn broadcaster(&self) -> &JobProgressBroadcaster {
        &self.broadcaster
    }

    pub(crate) fn tracker(&self, job_id: &str) -> JobProgressTracker {
        self.broadcaster.track(job_id, Arc::clone(&self.store))
    }

    /// Runs every step for a job that has already been started.
    ///
    /// Each step is bracketed by `BeginStep` and `CompleteStep`, each committed
    /// to the store and then published. The first failing step records the
    /// error and ends the run.
    pub async fn run(&self, job_id: &str, options: ProcessingOptions) -> PipelineOutcome {
        let job = match self.store.get(job_id) {
            Ok(job) => job,
            Err(e) => return abandon(job_id, e),
        };
        let tracker = self.tracker(job_id);
        let mut ctx = PipelineContext::new(job, options);

        for step in PipelineStep::ALL {
            if let Err(e) = tracker.record(JobMutation::BeginStep {
                label: step.label().to_string(),
            }) {
                return self.abandon_run(&mut ctx, e).await;
            }

            let span = match step {
                PipelineStep::Convert => info_span!("convert"),
                PipelineStep::GatherContext => info_span!("gather_context"),
                PipelineStep::NameShapes => info_span!("name_shapes"),
                PipelineStep::SaveResults => info_span!("save_results"),
            };

            match self.run_step(step, &mut ctx).instrument(span).await {
                Ok(()) => {
                    if let Err(e) = tracker.record(JobMutation::CompleteStep) {
                        return self.abandon_run(&mut ctx, e).await;
                    }
                }
                Err(e) => {
                    let error = e.to_string();
                    warn!(job_id = %job_id, step = %step, error = %error, "Pipeline step failed");
                    // A failed job carries no results, so partial outputs go too.
                    self.discard_outputs(&mut ctx).await;
                    return match tracker.record(JobMutation::Fail { error }) {
                        Ok(job) => PipelineOutcome::Failed(job),
                        Err(e) => abandon(job_id, e),
                    };
                }
            }
        }

        let result_refs = ctx.result_refs.clone();
        match tracker.record(JobMutation::Complete { result_refs }) {
            Ok(job) => {
                info!(job_id = %job_id, "Job completed");
                PipelineOutcome::Completed(job)
            }
            Err(e) => self.abandon_run(&mut ctx, e).await,
        }
    }

    /// Stops a run whose job no longer accepts updates, removing any outputs
    /// it already wrote.
    async fn abandon_run(&self, ctx: &mut PipelineContext, e: JobError) -> PipelineOutcome {
        self.discard_outputs(ctx).await;
        abandon(&ctx.job.job_id, e)
    }

    async fn discard_outputs(&self, ctx: &mut PipelineContext) {
        for locator in ctx.result_refs.drain(..) {
            if let Err(e) = self.services.artifacts.remove(&locator).await {
                warn!(job_id = %ctx.job.job_id, "Failed to remove output {}: {}", locator, e);
            }
        }
    }

    async fn run_step(
        &self,
        step: PipelineStep,
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        match step {
            PipelineStep::Convert => self.step_convert(ctx).await,
            PipelineStep::GatherContext => self.step_gather_context(ctx).await,
            PipelineStep::NameShapes => self.step_name_shapes(ctx).await,
            PipelineStep::SaveResults => self.step_save_results(ctx).await,
        }
    }

    async fn step_convert(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let locator = ctx
            .job
            .source
            .clone()
            .ok_or(PipelineError::MissingInput("uploaded input"))?;

        let bytes = self.services.artifacts.read(&locator).await?;
        let presentation = self
            .services
            .converter
            .convert(bytes.clone(), &ctx.job.filename)
            .await?;

        debug!(
            slides = presentation.slides.len(),
            shapes = presentation.shape_count(),
            "Converted presentation"
        );
        ctx.source = Some(bytes);
        ctx.presentation = Some(presentation);
        Ok(())
    }

    async fn step_gather_context(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        if !ctx.options.use_rag {
            debug!("Retrieval disabled for this job");
            return Ok(());
        }

        let documents = load_directory(&self.config.documents_directory).await?;
        let report = self.services.index.ingest(documents).await?;
        debug!(
            ingested = report.ingested_count,
            chunks = report.chunk_count,
            "Reference documents indexed"
        );
        ctx.ingest = Some(report);
        Ok(())
    }

    async fn step_name_shapes(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let options = ctx.options;
        let namer = self.services.namers.select(options.naming_strategy);
        let presentation = ctx
            .presentation
            .as_mut()
            .ok_or(PipelineError::MissingInput("presentation"))?;

        let mut referenced: HashMap<String, f64> = HashMap::new();
        let mut named = 0usize;

        for slide in presentation.slides.iter_mut() {
            for shape in slide.shapes.iter_mut() {
                let mut context = NamingContext {
                    slide_index: slide.index,
                    related: Vec::new(),
                };

                if options.use_rag {
                    let query = if shape.text.is_empty() {
                        shape.name.as_str()
                    } else {
                        shape.text.as_str()
                    };
                    let hits = self
                        .services
                        .index
                        .search(query, self.config.context_results)
                        .await?;

                    for hit in &hits {
                        let best = referenced.entry(hit.source_file.clone()).or_insert(0.0);
                        if hit.similarity > *best {
                            *best = hit.similarity;
                        }
                    }
                    shape.context_analysis = context_analysis(&hits);
                    shape.document_references = hits
                        .iter()
                        .map(|hit| DocumentReference {
                            source_file: hit.source_file.clone(),
                            similarity: hit.similarity,
                        })
                        .collect();
                    context.related = hits.into_iter().map(|hit| hit.text).collect();
                }

                let naming = namer.name(shape, &context).await?;
                shape.descriptive_name = Some(naming.descriptive_name);
                named += 1;

                if options.include_analysis {
                    shape.semantic_tags = semantic_tags(&shape.text);
                }
            }
        }

        if options.use_rag {
            let mut references: Vec<DocumentReference> = referenced
                .into_iter()
                .map(|(source_file, similarity)| DocumentReference {
                    source_file,
                    similarity,
                })
                .collect();
            references.sort_by(|a, b| {
                b.similarity
                    .partial_cmp(&a.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.source_file.cmp(&b.source_file))
            });
            presentation.document_references = references;
        }

        if options.include_analysis {
            presentation.analysis = Some(PresentationAnalysis::from_presentation(presentation));
        }

        debug!(shapes = named, strategy = %options.naming_strategy, "Named shapes");
        Ok(())
    }

    async fn step_save_results(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let presentation = ctx
            .presentation
            .as_ref()
            .ok_or(PipelineError::MissingInput("presentation"))?;
        let source = ctx
            .source
            .clone()
            .ok_or(PipelineError::MissingInput("uploaded input"))?;

        let job_id = ctx.job.job_id.clone();

        // Each output is registered as soon as it exists so an abandoned run
        // can remove it.
        let json = serde_json::to_vec_pretty(presentation)?;
        let json_ref = self
            .services
            .artifacts
            .write_output(&format!("{}_enhanced.json", job_id), &json)
            .await?;
        ctx.result_refs.push(json_ref);

        let pptx = self.services.converter.rebuild(source, presentation).await?;
        let pptx_ref = self
            .services
            .artifacts
            .write_output(&format!("{}_enhanced.pptx", job_id), &pptx)
            .await?;
        ctx.result_refs.push(pptx_ref);
        Ok(())
    }
}

fn context_analysis(hits: &[SearchHit]) -> Option<String> {
    if hits.is_empty() {
        return None;
    }
    let mut sources: Vec<&str> = hits.iter().map(|hit| hit.source_file.as_str()).collect();
    sources.dedup();
    Some(format!(
        "Related to {} passage(s) from {}",
        hits.len(),
        sources.join(", ")
    ))
}

fn abandon(job_id: &str, e: JobError) -> PipelineOutcome {
    match e {
        JobError::NotFound(_) => debug!(job_id = %job_id, "Job was deleted, stopping pipeline"),
        other => warn!(job_id = %job_id, error = %other, "Job stopped accepting updates"),
    }
    PipelineOutcome::Abandoned
}
