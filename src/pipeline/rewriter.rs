// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Pipeline instrumentation
//!
//! Injects status reporting into a freshly built pipeline:
//!
//! 1. every notification target gets a resource type and a resource;
//! 2. steps following a task get a `<step> Started` event task in front of
//!    them, and tasks and docker builds get success/failure/ensure hooks;
//! 3. every job ends with a `Pipeline Completed` event task.
//!
//! Rewriting is not idempotent. Run it exactly once per built pipeline.

use crate::context::BuildContext;
use crate::images::{names, ImageResolver};
use crate::notifiers::{BuildStatus, ResolvedTarget, StatusEvent};
use crate::pipeline::builder::{
    chain, new_aggregate, new_event_task, new_put_resource, new_resource, new_resource_type,
    new_task_config, DOCKER_IMAGE,
};
use crate::pipeline::strategy::LOG_FILE;
use crate::pipeline::{Action, Hooks, Job, Params, Pipeline, PlanStep, TaskIo, TaskOrigin};

/// Entry point of the event reporter image
const REPORT_COMMAND: &str = "/opt/pipesmith/report";

/// Step name used for whole-pipeline events
const PIPELINE_STEP: &str = "Pipeline";

/// Events reported by synthetic tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Started,
    Succeeded,
    Failed,
    Finished,
    Completed,
}

impl Event {
    fn title(self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Finished => "Finished",
            Self::Completed => "Completed",
        }
    }
}

/// Tracks whether the current step should be annotated
///
/// Set by a task without an `ensure` hook, cleared by a get or an aggregate,
/// untouched by anything else. Annotating a step does not clear it.
#[derive(Debug, Default)]
struct AnnotationTracker {
    annotate: bool,
}

impl AnnotationTracker {
    fn observe(&mut self, step: &PlanStep) -> bool {
        match &step.action {
            Action::Task(_) if !step.hooks.has_ensure() => self.annotate = true,
            Action::Get(_) | Action::Aggregate(_) => self.annotate = false,
            _ => {}
        }
        self.annotate
    }
}

/// Counters reported after a rewrite
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteSummary {
    pub start_markers: usize,
    pub hooked_tasks: usize,
    pub hooked_builds: usize,
}

/// Instruments pipelines for one build
pub struct Rewriter<'a> {
    ctx: &'a BuildContext,
    targets: &'a [ResolvedTarget<'a>],
    status_url: &'a str,
    images: &'a dyn ImageResolver,
}

impl<'a> Rewriter<'a> {
    pub fn new(
        ctx: &'a BuildContext,
        targets: &'a [ResolvedTarget<'a>],
        status_url: &'a str,
        images: &'a dyn ImageResolver,
    ) -> Self {
        Self {
            ctx,
            targets,
            status_url,
            images,
        }
    }

    /// Instrument `pipeline` in place
    pub fn rewrite(&self, pipeline: &mut Pipeline) -> RewriteSummary {
        self.register_notifiers(pipeline);

        let mut summary = RewriteSummary::default();
        for job in &mut pipeline.jobs {
            summary.start_markers += self.insert_start_markers(job);
            let (tasks, builds) = self.attach_completion_hooks(job);
            summary.hooked_tasks += tasks;
            summary.hooked_builds += builds;
            job.plan.push(self.completion_task());
        }

        tracing::info!(
            jobs = pipeline.jobs.len(),
            targets = self.targets.len(),
            start_markers = summary.start_markers,
            hooked_tasks = summary.hooked_tasks,
            hooked_builds = summary.hooked_builds,
            "pipeline instrumented"
        );
        summary
    }

    fn register_notifiers(&self, pipeline: &mut Pipeline) {
        for resolved in self.targets {
            let type_name = resolved.resource_type_name();
            let image = self.images.resolve(resolved.notifier.resource_image());
            pipeline
                .resource_types
                .push(new_resource_type(&type_name, DOCKER_IMAGE, image.to_source()));
            pipeline.resources.push(new_resource(
                resolved.resource_name(),
                type_name,
                resolved.notifier.source_properties(resolved.target),
            ));
            tracing::debug!(target_id = %resolved.target.id, kind = %resolved.notifier.kind(), "registered notifier");
        }
    }

    /// First pass: put a `Started` marker in front of annotated steps
    fn insert_start_markers(&self, job: &mut Job) -> usize {
        let mut tracker = AnnotationTracker::default();
        let mut inserted = 0;
        let mut i = 0;

        while i < job.plan.len() {
            if tracker.observe(&job.plan[i]) {
                let name = job.plan[i].name().to_string();
                let marker = chain(
                    self.event_task(&name, Event::Started, None),
                    self.notifications(&name, BuildStatus::Started),
                );
                job.plan.insert(i, marker);
                inserted += 1;
                i += 2;
            } else {
                i += 1;
            }
        }
        inserted
    }

    /// Second pass: success/failure/ensure hooks on tasks and docker builds
    fn attach_completion_hooks(&self, job: &mut Job) -> (usize, usize) {
        let mut tracker = AnnotationTracker::default();
        let mut tasks = 0;
        let mut builds = 0;

        for step in &mut job.plan {
            let annotate = tracker.observe(step);

            if step.is_docker_build() {
                step.hooks = self.build_hooks(step.name());
                builds += 1;
                continue;
            }

            let qualifies = annotate
                && step.hooks.is_empty()
                && matches!(&step.action, Action::Task(task) if task.origin == TaskOrigin::Declared);
            if !qualifies {
                continue;
            }

            let name = step.name().to_string();
            let output = step
                .as_task()
                .and_then(|task| task.config.output_dir())
                .map(String::from);
            step.hooks = match output {
                Some(dir) => self.logged_hooks(&name, &dir),
                None => self.outcome_hooks(&name),
            };
            tasks += 1;
        }
        (tasks, builds)
    }

    /// Hooks of a docker build: notify, then report
    fn build_hooks(&self, name: &str) -> Hooks {
        let branch = |event: Event, status: BuildStatus| {
            let report = self.event_task(name, event, None);
            match self.notifications(name, status) {
                Some(aggregate) => chain(aggregate, Some(report)),
                None => report,
            }
        };
        Hooks::outcome(
            Some(branch(Event::Succeeded, BuildStatus::Succeeded)),
            Some(branch(Event::Failed, BuildStatus::Failed)),
        )
    }

    /// Hooks of a task with an output directory: one reporting `ensure`
    /// carrying the log, with both notification branches below it
    fn logged_hooks(&self, name: &str, output_dir: &str) -> Hooks {
        let mut report = self.event_task(name, Event::Finished, Some(output_dir));
        report.hooks = Hooks::outcome(
            self.notifications(name, BuildStatus::Succeeded),
            self.notifications(name, BuildStatus::Failed),
        );
        Hooks::ensure(report)
    }

    /// Hooks of a task without output: report, then notify
    fn outcome_hooks(&self, name: &str) -> Hooks {
        Hooks::outcome(
            Some(chain(
                self.event_task(name, Event::Succeeded, None),
                self.notifications(name, BuildStatus::Succeeded),
            )),
            Some(chain(
                self.event_task(name, Event::Failed, None),
                self.notifications(name, BuildStatus::Failed),
            )),
        )
    }

    fn completion_task(&self) -> PlanStep {
        let mut task = self.event_task(PIPELINE_STEP, Event::Completed, None);
        if let Some(aggregate) = self.notifications(PIPELINE_STEP, BuildStatus::Completed) {
            task.hooks = Hooks::ensure(aggregate);
        }
        task
    }

    /// Parallel puts to every notification target; none without targets
    fn notifications(&self, step: &str, status: BuildStatus) -> Option<PlanStep> {
        if self.targets.is_empty() {
            return None;
        }
        let event = StatusEvent {
            step,
            status,
            context: self.ctx,
            status_url: self.status_url,
        };
        let puts = self
            .targets
            .iter()
            .map(|t| new_put_resource(t.resource_name(), t.notifier.status_params(&event)))
            .collect();
        Some(new_aggregate(puts))
    }

    /// Synthetic task telling the control plane about `event`
    fn event_task(&self, step: &str, event: Event, log_dir: Option<&str>) -> PlanStep {
        let ctx = self.ctx;
        let mut config = new_task_config(
            &self.images.resolve(names::EVENT_REPORTER),
            REPORT_COMMAND,
            vec![],
        );

        let mut params = Params::new();
        params.insert("EVENT".into(), event.title().to_lowercase().into());
        params.insert("TASK".into(), step.into());
        params.insert("PROJECT_ID".into(), ctx.project.id.clone().into());
        params.insert("PROJECT_NAME".into(), ctx.project.name.clone().into());
        params.insert("BUILD_ID".into(), ctx.build.id.clone().into());
        params.insert("BUILD_NUMBER".into(), ctx.build.number.to_string().into());
        params.insert("COMMIT_SHA".into(), ctx.commit.commit_sha.clone().into());
        params.insert("BRANCH".into(), ctx.commit.repo_branch.clone().into());
        params.insert("STATUS_URL".into(), self.status_url.into());
        if let Some(dir) = log_dir {
            params.insert("LOG_PATH".into(), format!("{}/{}", dir, LOG_FILE).into());
            config.inputs = vec![TaskIo::new(dir)];
        }
        config.params = params;

        new_event_task(format!("{} {}", step, event.title()), config)
    }
}
