// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! GitHub webhook payloads

use serde::Deserialize;

use super::{
    branch_from_ref, parse_payload, title_of, with_userinfo, BaseRef, BaseRepo, Commit, EventType,
    DEFAULT_AVATAR_URL, UNKNOWN_AUTHOR,
};
use crate::errors::PipesmithResult;

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

fn author_of(user: Option<User>) -> (String, String) {
    let (login, avatar_url) = match user {
        Some(user) => (user.login, user.avatar_url),
        None => (None, None),
    };
    (
        login
            .filter(|login| !login.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        avatar_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()),
    )
}

#[derive(Debug, Deserialize)]
struct Repository {
    clone_url: String,
}

// push

#[derive(Debug, Deserialize)]
struct PushEvent {
    #[serde(rename = "ref")]
    git_ref: String,
    compare: String,
    head_commit: HeadCommit,
    repository: Repository,
    #[serde(default)]
    sender: Option<User>,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    id: String,
    message: String,
    timestamp: String,
    url: String,
}

pub(super) fn push(payload: &serde_json::Value, token: &str) -> PipesmithResult<Commit> {
    let event: PushEvent = parse_payload(EventType::GitHubPush, payload)?;
    let (author, avatar_url) = author_of(event.sender);
    let branch = branch_from_ref(&event.git_ref).to_string();

    Ok(Commit {
        commit_sha: event.head_commit.id,
        author,
        avatar_url,
        timestamp: event.head_commit.timestamp,
        title: title_of(&event.head_commit.message),
        message: event.head_commit.message,
        compare_url: event.compare,
        commit_url: event.head_commit.url,
        base_branch: branch.clone(),
        repo_branch: branch,
        clone_url: with_userinfo(&event.repository.clone_url, token),
        number: None,
        base: None,
    })
}

// pull_request

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    number: u64,
    pull_request: PullRequest,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    title: String,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    updated_at: String,
    #[serde(default)]
    user: Option<User>,
    head: PullRequestHead,
    base: PullRequestBase,
}

#[derive(Debug, Deserialize)]
struct PullRequestHead {
    sha: String,
    #[serde(rename = "ref")]
    branch: String,
    repo: HeadRepository,
}

#[derive(Debug, Deserialize)]
struct HeadRepository {
    clone_url: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestBase {
    #[serde(rename = "ref")]
    branch: String,
    repo: BaseRepository,
}

#[derive(Debug, Deserialize)]
struct BaseRepository {
    full_name: String,
    clone_url: String,
}

pub(super) fn pull_request(payload: &serde_json::Value, token: &str) -> PipesmithResult<Commit> {
    let event: PullRequestEvent = parse_payload(EventType::GitHubPullRequest, payload)?;
    let pr = event.pull_request;
    let (author, avatar_url) = author_of(pr.user);
    let message = match pr.body {
        Some(body) if !body.trim().is_empty() => body,
        _ => pr.title.clone(),
    };

    Ok(Commit {
        commit_url: format!("{}/commit/{}", pr.head.repo.html_url, pr.head.sha),
        commit_sha: pr.head.sha,
        author,
        avatar_url,
        timestamp: pr.updated_at,
        title: title_of(&pr.title),
        message,
        compare_url: format!("{}/files", pr.html_url),
        repo_branch: pr.head.branch,
        base_branch: pr.base.branch.clone(),
        clone_url: with_userinfo(&pr.head.repo.clone_url, token),
        number: Some(event.number),
        base: Some(BaseRef {
            repo: BaseRepo {
                full_name: pr.base.repo.full_name,
            },
            repo_branch: pr.base.branch,
            clone_url: with_userinfo(&pr.base.repo.clone_url, token),
        }),
    })
}

// commit (repository head builds)

#[derive(Debug, Deserialize)]
struct CommitEvent {
    branch: String,
    repository: Repository,
    commit: ApiCommit,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    html_url: String,
    commit: GitCommit,
    #[serde(default)]
    author: Option<User>,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    message: String,
    author: GitAuthor,
}

#[derive(Debug, Deserialize)]
struct GitAuthor {
    date: String,
}

pub(super) fn commit(payload: &serde_json::Value, token: &str) -> PipesmithResult<Commit> {
    let event: CommitEvent = parse_payload(EventType::GitHubCommit, payload)?;
    let (author, avatar_url) = author_of(event.commit.author);
    let branch = branch_from_ref(&event.branch).to_string();
    let message = event.commit.commit.message;

    Ok(Commit {
        commit_sha: event.commit.sha,
        author,
        avatar_url,
        timestamp: event.commit.commit.author.date,
        title: title_of(&message),
        message,
        compare_url: event.commit.html_url.clone(),
        commit_url: event.commit.html_url,
        base_branch: branch.clone(),
        repo_branch: branch,
        clone_url: with_userinfo(&event.repository.clone_url, token),
        number: None,
        base: None,
    })
}
