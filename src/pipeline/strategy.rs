// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Pipeline strategies
//!
//! Maps a build trigger to one of three pipeline shapes and builds the raw,
//! uninstrumented pipeline for it.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use crate::context::{BuildContext, PostDeployAction};
use crate::errors::{PipesmithError, PipesmithResult};
use crate::images::{names, ImageRef, ImageResolver};
use crate::pipeline::builder::{
    inputs, new_get_resource, new_job, new_pipeline, new_put_resource, new_resource,
    new_script_config, new_task, new_task_config, DOCKER_IMAGE, GIT,
};
use crate::pipeline::{Action, Params, Pipeline, PlanStep, TaskIo, DOCKER_BUILD_PARAM};

/// Resource holding the pushed commit
pub const SOURCE_RESOURCE: &str = "source";

/// Resource holding a pull request's base branch
pub const UPSTREAM_RESOURCE: &str = "upstream";

/// Output of the merge task
pub const MERGED_DIR: &str = "merged";

/// Output of the build task
pub const BUILD_OUTPUT_DIR: &str = "build-output";

/// Log file written into a task's output directory
pub const LOG_FILE: &str = "pipesmith.log";

/// Entry point of deploy tool images
const DEPLOY_COMMAND: &str = "/opt/pipesmith/deploy";

/// Entry point of the load test image
const LOAD_TEST_COMMAND: &str = "/opt/pipesmith/load-test";

/// The three pipeline shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// Build, test, push and deploy a branch head
    BuildHead,
    /// Merge a pull request onto its base, then build it into a preview
    BuildPullRequest,
    /// Tear down a pull request's preview environment
    ClosePullRequest,
}

impl PipelineKind {
    /// Pick the strategy for a build trigger
    pub fn select(trigger: &str) -> PipesmithResult<Self> {
        let kind = match trigger {
            "push" | "manual" | "build_repo_head" => Self::BuildHead,
            "pull_request" | "pr_opened" | "pr_synchronize" => Self::BuildPullRequest,
            "close_pull_request" => Self::ClosePullRequest,
            other => {
                return Err(PipesmithError::UnsupportedPipelineType {
                    kind: other.to_string(),
                })
            }
        };
        tracing::debug!(trigger, strategy = %kind, "selected pipeline strategy");
        Ok(kind)
    }

    /// Build the raw pipeline for `ctx`
    pub fn build(self, ctx: &BuildContext, images: &dyn ImageResolver) -> PipesmithResult<Pipeline> {
        match self {
            Self::BuildHead => Ok(build_head(ctx, images)),
            Self::BuildPullRequest => build_pull_request(ctx, images),
            Self::ClosePullRequest => close_pull_request(ctx, images),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildHead => write!(f, "build-head"),
            Self::BuildPullRequest => write!(f, "build-pull-request"),
            Self::ClosePullRequest => write!(f, "close-pull-request"),
        }
    }
}

fn build_head(ctx: &BuildContext, images: &dyn ImageResolver) -> Pipeline {
    let commit = &ctx.commit;
    let mut pipeline = new_pipeline();

    let mut source = Params::new();
    source.insert("uri".into(), commit.clone_url.clone().into());
    source.insert("branch".into(), commit.repo_branch.clone().into());
    pipeline
        .resources
        .push(new_resource(SOURCE_RESOURCE, GIT, source));

    let mut version = Params::new();
    version.insert("ref".into(), commit.commit_sha.clone().into());

    let mut job = new_job(format!("build-{}", commit.repo_branch), true, true);
    job.plan
        .push(new_get_resource(SOURCE_RESOURCE, vec![], Some(version)));

    let (resources, steps) = build_sequence(ctx, images, SOURCE_RESOURCE, &commit.repo_branch);
    pipeline.resources.extend(resources);
    job.plan.extend(steps);
    pipeline.jobs.push(job);
    pipeline
}

fn build_pull_request(ctx: &BuildContext, images: &dyn ImageResolver) -> PipesmithResult<Pipeline> {
    let commit = &ctx.commit;
    let (number, base) = match (commit.number, &commit.base) {
        (Some(number), Some(base)) => (number, base),
        _ => {
            return Err(PipesmithError::InvalidPipeline {
                reason: format!(
                    "commit {} does not describe a pull request",
                    commit.short_sha()
                ),
                help: Some("Pull request builds need a commit with 'number' and 'base'".into()),
            })
        }
    };

    let mut pipeline = new_pipeline();

    let mut source = Params::new();
    source.insert("uri".into(), base.clone_url.clone().into());
    source.insert("branch".into(), base.repo_branch.clone().into());
    pipeline
        .resources
        .push(new_resource(UPSTREAM_RESOURCE, GIT, source));

    let mut job = new_job(format!("pr-{}", number), true, true);
    job.plan
        .push(new_get_resource(UPSTREAM_RESOURCE, vec![], None));
    job.plan.push(merge_task(ctx, images, number));

    let environment = format!("pr-{}", number);
    let (resources, steps) = build_sequence(ctx, images, MERGED_DIR, &environment);
    pipeline.resources.extend(resources);
    job.plan.extend(steps);
    pipeline.jobs.push(job);
    Ok(pipeline)
}

fn close_pull_request(ctx: &BuildContext, images: &dyn ImageResolver) -> PipesmithResult<Pipeline> {
    let number = ctx.commit.number.ok_or_else(|| PipesmithError::InvalidPipeline {
        reason: "closing a pull request needs its number".into(),
        help: None,
    })?;
    let environment = format!("pr-{}", number);

    let target = &ctx.deployment_target;
    let mut config = new_task_config(
        &images.resolve(&target.kind),
        DEPLOY_COMMAND,
        vec!["delete".into()],
    );
    config.params = deploy_params(ctx, &environment);

    let mut pipeline = new_pipeline();
    let mut job = new_job(format!("close-pr-{}", number), false, true);
    job.plan.push(new_task("Delete Environment", config));
    pipeline.jobs.push(job);
    Ok(pipeline)
}

/// Build, test, push and deploy the checkout in `src`
///
/// Returns the image resources to register and the steps to append.
fn build_sequence(
    ctx: &BuildContext,
    images: &dyn ImageResolver,
    src: &str,
    environment: &str,
) -> (Vec<crate::pipeline::Resource>, Vec<PlanStep>) {
    let container = &ctx.build_container;
    let build_image = ImageRef::new(&container.repository, container.tag.as_deref());
    let mut resources = Vec::new();
    let mut steps = Vec::new();

    // Build: logs into the output directory so the log can be reported
    let script = logged_script(
        &format!("cd {} && {}", src, shell_commands(&container.build, "no build commands configured")),
        &format!("{}/{}", BUILD_OUTPUT_DIR, LOG_FILE),
    );
    let mut config = new_script_config(&build_image, script);
    config.inputs = inputs(&[src]);
    config.outputs = vec![TaskIo::new(BUILD_OUTPUT_DIR)];
    steps.push(privileged(new_task("Build", config), container.privileged));

    let mut config = new_script_config(
        &build_image,
        shell_commands(&container.test, "no test commands configured"),
    );
    config.inputs = inputs(&[src]);
    config.run.dir = Some(src.to_string());
    steps.push(privileged(new_task("Test", config), container.privileged));

    if let Some(image) = &ctx.application_image {
        let mut taken = HashSet::new();
        for tag in &image.tags {
            let name = unique_name(image_resource_name(tag), &mut taken);

            let mut source = Params::new();
            source.insert("repository".into(), image.repository.clone().into());
            source.insert("tag".into(), tag.clone().into());
            if let Some(username) = &image.username {
                source.insert("username".into(), username.clone().into());
            }
            if let Some(password) = &image.password {
                source.insert("password".into(), password.clone().into());
            }
            resources.push(new_resource(&name, DOCKER_IMAGE, source));

            let mut params = Params::new();
            params.insert(DOCKER_BUILD_PARAM.into(), src.into());
            if let Some(dockerfile) = &image.dockerfile {
                params.insert("dockerfile".into(), format!("{}/{}", src, dockerfile).into());
            }
            steps.push(new_put_resource(name, params));
        }
    }

    let target = &ctx.deployment_target;
    let mut config = new_task_config(
        &images.resolve(&target.kind),
        DEPLOY_COMMAND,
        vec!["deploy".into()],
    );
    config.inputs = inputs(&[src]);
    config.params = deploy_params(ctx, environment);
    steps.push(new_task("Deploy", config));

    for action in &ctx.post_deploy_actions {
        steps.push(post_deploy_task(action, images));
    }

    (resources, steps)
}

fn merge_task(ctx: &BuildContext, images: &dyn ImageResolver, number: u64) -> PlanStep {
    let commit = &ctx.commit;
    let script = logged_script(
        &format!(
            "git clone -q {up} {out} && cd {out} \
             && git config user.name pipesmith && git config user.email pipesmith@localhost \
             && git fetch -q \"$HEAD_URI\" \"$HEAD_BRANCH\" \
             && git merge --no-edit \"$HEAD_SHA\"",
            up = UPSTREAM_RESOURCE,
            out = MERGED_DIR
        ),
        &format!("{}/{}", MERGED_DIR, LOG_FILE),
    );

    let mut config = new_script_config(&images.resolve(names::GIT), script);
    config.inputs = inputs(&[UPSTREAM_RESOURCE]);
    config.outputs = vec![TaskIo::new(MERGED_DIR)];
    config
        .params
        .insert("HEAD_URI".into(), commit.clone_url.clone().into());
    config
        .params
        .insert("HEAD_BRANCH".into(), commit.repo_branch.clone().into());
    config
        .params
        .insert("HEAD_SHA".into(), commit.commit_sha.clone().into());
    config
        .params
        .insert("PR_NUMBER".into(), number.to_string().into());

    new_task("Merge Pull Request", config)
}

fn post_deploy_task(action: &PostDeployAction, images: &dyn ImageResolver) -> PlanStep {
    match action {
        PostDeployAction::LoadTest {
            url,
            duration_seconds,
            virtual_users,
        } => {
            let mut config =
                new_task_config(&images.resolve(names::LOAD_TEST), LOAD_TEST_COMMAND, vec![]);
            config.params.insert("TARGET_URL".into(), url.clone().into());
            config
                .params
                .insert("DURATION".into(), format!("{}s", duration_seconds).into());
            config
                .params
                .insert("VUS".into(), virtual_users.to_string().into());
            new_task("Load Test", config)
        }
    }
}

fn deploy_params(ctx: &BuildContext, environment: &str) -> Params {
    let target = &ctx.deployment_target;
    let mut params = target.params.clone();
    params.insert("ENVIRONMENT".into(), environment.into());
    params.insert("TARGET".into(), target.name.clone().into());
    params.insert("PROJECT".into(), ctx.project.name.clone().into());
    if let Some(image) = &ctx.application_image {
        if let Some(tag) = image.tags.first() {
            params.insert(
                "IMAGE".into(),
                format!("{}:{}", image.repository, tag).into(),
            );
        }
    }
    params
}

fn privileged(mut step: PlanStep, privileged: bool) -> PlanStep {
    if let Action::Task(task) = &mut step.action {
        task.privileged = privileged;
    }
    step
}

/// Resource name of the docker image pushed under `tag`
pub fn image_resource_name(tag: &str) -> String {
    static INVALID: OnceLock<Option<Regex>> = OnceLock::new();
    let sanitized = match INVALID.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]+").ok()) {
        Some(re) => re.replace_all(tag, "-").to_lowercase(),
        None => tag.to_lowercase(),
    };
    format!("image-{}", sanitized)
}

/// `name`, or `name-<n>` for the first `n` not yet in `taken`
fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}-{}", name, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn shell_commands(commands: &[String], fallback: &str) -> String {
    if commands.is_empty() {
        format!("echo '{}'", fallback)
    } else {
        commands.join(" && ")
    }
}

/// Run `body`, keep its output in `log`, echo it, and keep its exit status
fn logged_script(body: &str, log: &str) -> String {
    format!(
        "out=$(pwd)/{log}\n\
         ( {body} ) > /tmp/pipesmith.log 2>&1\n\
         status=$?\n\
         cp /tmp/pipesmith.log \"$out\"\n\
         cat /tmp/pipesmith.log\n\
         exit $status\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures;
    use crate::images::ImageTable;
    use crate::pipeline::PipelineValidator;

    fn puts(pipeline: &Pipeline) -> Vec<&str> {
        pipeline.jobs[0]
            .plan
            .iter()
            .filter(|s| matches!(s.action, Action::Put(_)))
            .map(|s| s.name())
            .collect()
    }

    #[test]
    fn test_select_strategy() {
        assert_eq!(PipelineKind::select("push").unwrap(), PipelineKind::BuildHead);
        assert_eq!(PipelineKind::select("manual").unwrap(), PipelineKind::BuildHead);
        assert_eq!(
            PipelineKind::select("pr_synchronize").unwrap(),
            PipelineKind::BuildPullRequest
        );
        assert_eq!(
            PipelineKind::select("close_pull_request").unwrap(),
            PipelineKind::ClosePullRequest
        );
        assert!(matches!(
            PipelineKind::select("tag"),
            Err(PipesmithError::UnsupportedPipelineType { ref kind }) if kind == "tag"
        ));
    }

    #[test]
    fn test_two_tags_yield_two_image_resources_and_puts() {
        let ctx = fixtures::context("push", &["latest", "v1.2.0"]);
        let pipeline = PipelineKind::BuildHead
            .build(&ctx, &ImageTable::with_defaults())
            .unwrap();

        let images: Vec<_> = pipeline
            .resources
            .iter()
            .filter(|r| r.kind == DOCKER_IMAGE)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(images, vec!["image-latest", "image-v1.2.0"]);
        assert_eq!(puts(&pipeline), vec!["image-latest", "image-v1.2.0"]);
    }

    #[test]
    fn test_build_head_plan_order() {
        let ctx = fixtures::context("push", &["latest"]);
        let pipeline = PipelineKind::BuildHead
            .build(&ctx, &ImageTable::with_defaults())
            .unwrap();

        let job = &pipeline.jobs[0];
        assert_eq!(job.name, "build-main");
        assert!(job.public && job.serial);
        let names: Vec<_> = job.plan.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["source", "Build", "Test", "image-latest", "Deploy"]);

        match &job.plan[0].action {
            Action::Get(get) => {
                assert_eq!(get.version.as_ref().unwrap()["ref"], "0123456789abcdef")
            }
            other => panic!("expected get, got {:?}", other),
        }
        let deploy = job.plan[4].as_task().unwrap();
        assert_eq!(deploy.config.image_resource.source["repository"], "bitnami/kubectl");
        assert_eq!(deploy.config.params["ENVIRONMENT"], "main");
        assert_eq!(
            job.plan[1].as_task().unwrap().config.output_dir(),
            Some(BUILD_OUTPUT_DIR)
        );
        assert!(job.plan[2].as_task().unwrap().config.output_dir().is_none());
    }

    #[test]
    fn test_no_application_image_means_no_puts() {
        let mut ctx = fixtures::context("push", &["latest"]);
        ctx.application_image = None;
        let pipeline = PipelineKind::BuildHead
            .build(&ctx, &ImageTable::new())
            .unwrap();
        assert!(puts(&pipeline).is_empty());
        assert_eq!(pipeline.resources.len(), 1);
    }

    #[test]
    fn test_load_test_follows_deploy() {
        let mut ctx = fixtures::context("push", &[]);
        ctx.post_deploy_actions.push(PostDeployAction::LoadTest {
            url: "https://staging.example".into(),
            duration_seconds: 30,
            virtual_users: 5,
        });
        let pipeline = PipelineKind::BuildHead
            .build(&ctx, &ImageTable::with_defaults())
            .unwrap();

        let last = pipeline.jobs[0].plan.last().unwrap().as_task().unwrap();
        assert_eq!(last.name, "Load Test");
        assert_eq!(last.config.params["DURATION"], "30s");
        assert_eq!(last.config.params["VUS"], "5");
    }

    #[test]
    fn test_pull_request_merges_then_builds() {
        let ctx = fixtures::context("pull_request", &["latest"]);
        let pipeline = PipelineKind::BuildPullRequest
            .build(&ctx, &ImageTable::with_defaults())
            .unwrap();

        let upstream = pipeline.resource(UPSTREAM_RESOURCE).unwrap();
        assert_eq!(upstream.source["uri"], "https://tok@github.com/acme/app.git");
        assert_eq!(upstream.source["branch"], "main");

        let job = &pipeline.jobs[0];
        assert_eq!(job.name, "pr-42");
        let merge = job.plan[1].as_task().unwrap();
        assert_eq!(merge.name, "Merge Pull Request");
        assert_eq!(merge.config.output_dir(), Some(MERGED_DIR));
        assert_eq!(merge.config.params["PR_NUMBER"], "42");

        let build = job.plan[2].as_task().unwrap();
        assert_eq!(build.config.inputs[0].name, MERGED_DIR);
        let deploy = job.plan.last().unwrap().as_task().unwrap();
        assert_eq!(deploy.config.params["ENVIRONMENT"], "pr-42");
    }

    #[test]
    fn test_pull_request_requires_pull_request_commit() {
        let ctx = fixtures::context("push", &[]);
        assert!(matches!(
            PipelineKind::BuildPullRequest.build(&ctx, &ImageTable::new()),
            Err(PipesmithError::InvalidPipeline { .. })
        ));
        assert!(matches!(
            PipelineKind::ClosePullRequest.build(&ctx, &ImageTable::new()),
            Err(PipesmithError::InvalidPipeline { .. })
        ));
    }

    #[test]
    fn test_close_pull_request_single_delete_task() {
        let ctx = fixtures::context("close_pull_request", &[]);
        let pipeline = PipelineKind::ClosePullRequest
            .build(&ctx, &ImageTable::with_defaults())
            .unwrap();

        assert!(pipeline.resources.is_empty());
        let job = &pipeline.jobs[0];
        assert_eq!(job.name, "close-pr-42");
        assert_eq!(job.plan.len(), 1);
        let task = job.plan[0].as_task().unwrap();
        assert_eq!(task.config.run.args, vec!["delete"]);
        assert_eq!(task.config.params["ENVIRONMENT"], "pr-42");
    }

    #[test]
    fn test_independent_builds_do_not_alias() {
        let ctx = fixtures::context("push", &["latest"]);
        let images = ImageTable::with_defaults();
        let mut first = PipelineKind::BuildHead.build(&ctx, &images).unwrap();
        let second = PipelineKind::BuildHead.build(&ctx, &images).unwrap();
        assert_eq!(first, second);

        first.jobs[0].plan.clear();
        first.resources[0].source.insert("branch".into(), "other".into());
        assert_eq!(second.jobs[0].plan.len(), 5);
        assert_eq!(second.resources[0].source["branch"], "main");
    }

    #[test]
    fn test_image_resource_name_sanitized() {
        assert_eq!(image_resource_name("Release/1.0"), "image-release-1.0");
        assert_eq!(image_resource_name("latest"), "image-latest");
    }

    #[test]
    fn test_colliding_tags_get_distinct_resources() {
        let ctx = fixtures::context("push", &["1.0", "1-0", "Latest", "latest"]);
        let pipeline = PipelineKind::BuildHead
            .build(&ctx, &ImageTable::with_defaults())
            .unwrap();

        let names = puts(&pipeline);
        assert_eq!(
            names,
            vec!["image-1.0", "image-1-0", "image-latest", "image-latest-2"]
        );
        for name in &names {
            assert!(pipeline.resource(name).is_some());
        }
        assert!(PipelineValidator::validate(&pipeline).is_valid());
    }
}
