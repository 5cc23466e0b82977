//! GitHub implementation of [`CodeHost`]
//!
//! Uses octocrab for the REST/GraphQL surfaces it covers well and a raw
//! reqwest client for the Actions and review endpoints it does not.

use crate::error::{Error, Result};
use crate::platform::CodeHost;
use crate::types::{
    CheckRun, MergeResult, Mergeability, PrComment, PrState, PullRequest, ReviewDecision,
    ReviewTeam, WorkflowRun,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const API_HOST: &str = "api.github.com";
const USER_AGENT: &str = "pr-pilot";

// GraphQL response envelope

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

// GraphQL node shapes shared by the single-PR and org-wide queries

#[derive(Deserialize)]
struct Actor {
    login: String,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoRef {
    name: String,
    owner: Actor,
}

#[derive(Deserialize)]
struct ReviewNode {
    state: String,
    author: Option<Actor>,
}

#[derive(Deserialize)]
struct HeadTarget {
    oid: String,
}

#[derive(Deserialize)]
struct HeadRef {
    name: String,
    target: Option<HeadTarget>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrNode {
    url: String,
    number: u64,
    title: String,
    state: String,
    is_draft: bool,
    mergeable: String,
    review_decision: Option<String>,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    author: Option<Actor>,
    repository: RepoRef,
    labels: Nodes<Named>,
    reviews: Nodes<ReviewNode>,
    head_ref: Option<HeadRef>,
}

/// Fields requested for every PR node; keeps the two org queries and the
/// single-PR query deserializing into the same shape.
const PR_NODE_FIELDS: &str = r"
    url
    number
    title
    state
    isDraft
    mergeable
    reviewDecision
    createdAt
    mergedAt
    author { login }
    repository { name owner { login } }
    labels(first: 10, orderBy: { field: NAME, direction: ASC }) { nodes { name } }
    reviews(first: 20, states: [APPROVED, CHANGES_REQUESTED]) {
        nodes { state author { login } }
    }
    headRef { name target { oid } }
";

impl From<PrNode> for PullRequest {
    fn from(node: PrNode) -> Self {
        let state = match node.state.as_str() {
            "OPEN" => PrState::Open,
            "MERGED" => PrState::Merged,
            _ => PrState::Closed,
        };
        let mergeable = match node.mergeable.as_str() {
            "MERGEABLE" => Mergeability::Mergeable,
            "CONFLICTING" => Mergeability::Conflicting,
            _ => Mergeability::Unknown,
        };
        let review_decision = node.review_decision.as_deref().map(|d| match d {
            "APPROVED" => ReviewDecision::Approved,
            "CHANGES_REQUESTED" => ReviewDecision::ChangesRequested,
            _ => ReviewDecision::ReviewRequired,
        });
        let approvers = node
            .reviews
            .nodes
            .iter()
            .filter(|review| review.state == "APPROVED")
            .filter_map(|review| review.author.as_ref().map(|a| a.login.clone()))
            .collect();

        Self {
            number: node.number,
            url: node.url,
            title: node.title,
            author: node.author.map(|a| a.login),
            owner: node.repository.owner.login,
            repo: node.repository.name,
            state,
            is_draft: node.is_draft,
            mergeable,
            review_decision,
            labels: node.labels.nodes.into_iter().map(|l| l.name).collect(),
            approvers,
            created_at: node.created_at,
            merged_at: node.merged_at,
            head_ref: node
                .head_ref
                .as_ref()
                .map(|h| h.name.clone())
                .unwrap_or_default(),
            head_oid: node
                .head_ref
                .and_then(|h| h.target)
                .map(|t| t.oid),
            checks: Vec::new(),
        }
    }
}

/// GitHub service
pub struct GitHubService {
    client: Octocrab,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for endpoints octocrab does not cover
    http_client: Client,
}

impl GitHubService {
    /// Create a new GitHub service from a personal token
    pub fn new(token: &str) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::GitHubApi(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.to_string(),
            http_client,
        })
    }

    fn rest_url(path: &str) -> String {
        format!("https://{API_HOST}{path}")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http_client
            .get(Self::rest_url(path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("GET {path} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::GitHubApi(format!(
                "GET {path} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("failed to parse {path}: {e}")))
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        let mut request = self
            .http_client
            .request(method.clone(), Self::rest_url(path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("{method} {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::GitHubApi(format!(
                "{method} {path} returned {status}: {detail}"
            )));
        }
        Ok(())
    }

    async fn graphql<T: DeserializeOwned>(&self, payload: &serde_json::Value) -> Result<T> {
        let response: GraphQlResponse<T> = self
            .client
            .graphql(payload)
            .await
            .map_err(|e| Error::GitHubApi(format!("GraphQL request failed: {e}")))?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::GitHubApi(format!(
                "GraphQL error: {}",
                messages.join(", ")
            )));
        }

        response
            .data
            .ok_or_else(|| Error::GitHubApi("no data in GraphQL response".to_string()))
    }

    /// Fetch the GraphQL node id of a PR, needed for mutations
    async fn pr_node_id(&self, owner: &str, repo: &str, number: u64) -> Result<String> {
        let pr = self.client.pulls(owner, repo).get(number).await?;
        pr.node_id
            .ok_or_else(|| Error::GitHubApi("PR missing node_id for GraphQL mutation".to_string()))
    }

    async fn runs(&self, path: &str) -> Result<Vec<WorkflowRun>> {
        #[derive(Deserialize)]
        struct Committer {
            email: Option<String>,
        }

        #[derive(Deserialize)]
        struct HeadCommit {
            committer: Option<Committer>,
        }

        #[derive(Deserialize)]
        struct Run {
            id: u64,
            html_url: String,
            status: String,
            conclusion: Option<String>,
            head_commit: Option<HeadCommit>,
        }

        #[derive(Deserialize)]
        struct RunsResponse {
            workflow_runs: Vec<Run>,
        }

        let response: RunsResponse = self.get_json(path).await?;
        Ok(response
            .workflow_runs
            .into_iter()
            .map(|run| WorkflowRun {
                id: run.id,
                url: run.html_url,
                status: run.status,
                conclusion: run.conclusion,
                committer_email: run
                    .head_commit
                    .and_then(|c| c.committer)
                    .and_then(|c| c.email),
            })
            .collect())
    }
}

#[async_trait]
impl CodeHost for GitHubService {
    async fn current_user(&self) -> Result<String> {
        let user = self.client.current().user().await?;
        Ok(user.login)
    }

    async fn pr_view(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        debug!(owner, repo, number, "fetching PR");

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            repository: RepoWithPr,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RepoWithPr {
            pull_request: Option<PrNode>,
        }

        let query = format!(
            r"
            query PrView($owner: String!, $repo: String!, $number: Int!) {{
                repository(owner: $owner, name: $repo) {{
                    pullRequest(number: $number) {{
                        {PR_NODE_FIELDS}
                    }}
                }}
            }}
            "
        );

        let data: Data = self
            .graphql(&serde_json::json!({
                "query": query,
                "variables": { "owner": owner, "repo": repo, "number": number }
            }))
            .await?;

        let node = data
            .repository
            .pull_request
            .ok_or_else(|| Error::NotFound(format!("PR {owner}/{repo}#{number}")))?;

        let mut pull: PullRequest = node.into();
        if let Some(oid) = pull.head_oid.clone() {
            pull.checks = self.check_runs(owner, repo, &oid).await?;
        }
        debug!(number = pull.number, state = %pull.state, "fetched PR");
        Ok(pull)
    }

    async fn pr_for_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<PullRequest>> {
        debug!(owner, repo, branch, "finding PR for branch");
        let head = format!("{owner}:{branch}");
        let prs = self
            .client
            .pulls(owner, repo)
            .list()
            .head(head)
            .state(octocrab::params::State::Open)
            .send()
            .await?;

        match prs.items.first() {
            Some(pr) => Ok(Some(self.pr_view(owner, repo, pr.number).await?)),
            None => {
                debug!(branch, "no PR found");
                Ok(None)
            }
        }
    }

    async fn list_open_prs(&self, org: &str, authors: &[String]) -> Result<Vec<PullRequest>> {
        debug!(org, "listing open PRs");

        #[derive(Deserialize)]
        struct Data {
            organization: OrgRepos,
        }

        #[derive(Deserialize)]
        struct OrgRepos {
            repositories: Nodes<RepoPrs>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RepoPrs {
            pull_requests: Nodes<PrNode>,
        }

        let query = format!(
            r"
            query ListOpenPrs($org: String!) {{
                organization(login: $org) {{
                    repositories(first: 50, isLocked: false, isFork: false,
                                 orderBy: {{ field: UPDATED_AT, direction: DESC }}) {{
                        nodes {{
                            pullRequests(first: 10, states: [OPEN],
                                         orderBy: {{ field: CREATED_AT, direction: ASC }}) {{
                                nodes {{ {PR_NODE_FIELDS} }}
                            }}
                        }}
                    }}
                }}
            }}
            "
        );

        let data: Data = self
            .graphql(&serde_json::json!({
                "query": query,
                "variables": { "org": org }
            }))
            .await?;

        let mut pulls: Vec<PullRequest> = data
            .organization
            .repositories
            .nodes
            .into_iter()
            .flat_map(|repo| repo.pull_requests.nodes)
            .map(PullRequest::from)
            .filter(|pull| {
                pull.author
                    .as_ref()
                    .is_some_and(|login| authors.contains(login))
            })
            .collect();

        for pull in &mut pulls {
            if let Some(oid) = pull.head_oid.clone() {
                pull.checks = self.check_runs(&pull.owner, &pull.repo, &oid).await?;
            }
        }

        debug!(count = pulls.len(), "listed open PRs");
        Ok(pulls)
    }

    async fn list_merged_prs(&self, org: &str, authors: &[String]) -> Result<Vec<PullRequest>> {
        debug!(org, "listing merged PRs");

        #[derive(Deserialize)]
        struct Data {
            organization: OrgRepos,
        }

        #[derive(Deserialize)]
        struct OrgRepos {
            repositories: Nodes<RepoPrs>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RepoPrs {
            pull_requests: Nodes<PrNode>,
        }

        let query = format!(
            r"
            query ListMergedPrs($org: String!) {{
                organization(login: $org) {{
                    repositories(first: 40, isLocked: false, isFork: false,
                                 orderBy: {{ field: UPDATED_AT, direction: DESC }}) {{
                        nodes {{
                            pullRequests(first: 5, states: [MERGED],
                                         orderBy: {{ field: UPDATED_AT, direction: DESC }}) {{
                                nodes {{ {PR_NODE_FIELDS} }}
                            }}
                        }}
                    }}
                }}
            }}
            "
        );

        let data: Data = self
            .graphql(&serde_json::json!({
                "query": query,
                "variables": { "org": org }
            }))
            .await?;

        let pulls: Vec<PullRequest> = data
            .organization
            .repositories
            .nodes
            .into_iter()
            .flat_map(|repo| repo.pull_requests.nodes)
            .map(PullRequest::from)
            .filter(|pull| {
                pull.author
                    .as_ref()
                    .is_some_and(|login| authors.contains(login))
            })
            .collect();

        debug!(count = pulls.len(), "listed merged PRs");
        Ok(pulls)
    }

    async fn check_runs(&self, owner: &str, repo: &str, git_ref: &str) -> Result<Vec<CheckRun>> {
        #[derive(Deserialize)]
        struct RawCheckRun {
            name: String,
            status: String,
            conclusion: Option<String>,
        }

        #[derive(Deserialize)]
        struct CheckRunsResponse {
            check_runs: Vec<RawCheckRun>,
        }

        let path =
            format!("/repos/{owner}/{repo}/commits/{git_ref}/check-runs?filter=latest&per_page=50");
        let response: CheckRunsResponse = self.get_json(&path).await?;

        Ok(response
            .check_runs
            .into_iter()
            .map(|run| CheckRun {
                name: run.name,
                status: run.status,
                conclusion: run.conclusion,
            })
            .collect())
    }

    async fn approve_pr(&self, owner: &str, repo: &str, number: u64) -> Result<()> {
        debug!(owner, repo, number, "approving PR");
        self.send_json(
            reqwest::Method::POST,
            &format!("/repos/{owner}/{repo}/pulls/{number}/reviews"),
            Some(serde_json::json!({ "event": "APPROVE" })),
        )
        .await
    }

    async fn merge_pr(&self, owner: &str, repo: &str, number: u64) -> Result<MergeResult> {
        debug!(owner, repo, number, "merging PR");
        let result = self
            .client
            .pulls(owner, repo)
            .merge(number)
            .method(octocrab::params::pulls::MergeMethod::Rebase)
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("merge failed: {e}")))?;

        let merge_result = MergeResult {
            merged: result.merged,
            sha: result.sha,
            message: result.message,
        };
        debug!(number, merged = merge_result.merged, "merge call complete");
        Ok(merge_result)
    }

    async fn enable_auto_merge(&self, owner: &str, repo: &str, number: u64) -> Result<()> {
        debug!(owner, repo, number, "enabling auto-merge");
        let node_id = self.pr_node_id(owner, repo, number).await?;

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            #[allow(dead_code)]
            enable_pull_request_auto_merge: serde_json::Value,
        }

        let _: Data = self
            .graphql(&serde_json::json!({
                "query": r"
                    mutation EnableAutoMerge($pullRequestId: ID!) {
                        enablePullRequestAutoMerge(
                            input: { pullRequestId: $pullRequestId, mergeMethod: REBASE }
                        ) {
                            pullRequest { number }
                        }
                    }
                ",
                "variables": { "pullRequestId": node_id }
            }))
            .await?;

        debug!(number, "auto-merge enabled");
        Ok(())
    }

    async fn update_pr_branch(&self, owner: &str, repo: &str, number: u64) -> Result<()> {
        debug!(owner, repo, number, "updating PR branch");
        self.send_json(
            reqwest::Method::PUT,
            &format!("/repos/{owner}/{repo}/pulls/{number}/update-branch"),
            None,
        )
        .await
    }

    async fn pr_comments(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<PrComment>> {
        debug!(owner, repo, number, "listing PR comments");
        let comments = self
            .client
            .issues(owner, repo)
            .list_comments(number)
            .send()
            .await?;

        Ok(comments
            .items
            .into_iter()
            .map(|c| PrComment {
                id: c.id.0,
                body: c.body.unwrap_or_default(),
            })
            .collect())
    }

    async fn comment_pr(&self, owner: &str, repo: &str, number: u64, body: &str) -> Result<()> {
        debug!(owner, repo, number, "commenting on PR");
        self.client
            .issues(owner, repo)
            .create_comment(number, body)
            .await?;
        Ok(())
    }

    async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest> {
        debug!(owner, repo, head, base, "creating PR");
        let pr = self
            .client
            .pulls(owner, repo)
            .create(title, head, base)
            .body(body)
            .send()
            .await?;

        // Assign to the author, the team convention
        let user = self.current_user().await?;
        self.send_json(
            reqwest::Method::POST,
            &format!("/repos/{owner}/{repo}/issues/{}/assignees", pr.number),
            Some(serde_json::json!({ "assignees": [user] })),
        )
        .await?;

        self.pr_view(owner, repo, pr.number).await
    }

    async fn request_reviewers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        reviewers: &[String],
        team_reviewers: &[String],
    ) -> Result<()> {
        debug!(owner, repo, number, "requesting reviewers");
        self.send_json(
            reqwest::Method::POST,
            &format!("/repos/{owner}/{repo}/pulls/{number}/requested_reviewers"),
            Some(serde_json::json!({
                "reviewers": reviewers,
                "team_reviewers": team_reviewers,
            })),
        )
        .await
    }

    async fn repo_description(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        let repository = self.client.repos(owner, repo).get().await?;
        Ok(repository.description)
    }

    async fn branch_runs(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>> {
        self.runs(&format!(
            "/repos/{owner}/{repo}/actions/runs?branch={branch}&event=push&per_page=5"
        ))
        .await
    }

    async fn commit_runs(&self, owner: &str, repo: &str, sha: &str) -> Result<Vec<WorkflowRun>> {
        self.runs(&format!(
            "/repos/{owner}/{repo}/actions/runs?head_sha={sha}&per_page=10"
        ))
        .await
    }

    async fn cancel_run(&self, owner: &str, repo: &str, run_id: u64) -> Result<()> {
        debug!(owner, repo, run_id, "cancelling workflow run");
        self.send_json(
            reqwest::Method::POST,
            &format!("/repos/{owner}/{repo}/actions/runs/{run_id}/cancel"),
            None,
        )
        .await
    }

    async fn review_teams(&self, org: &str, repo: &str) -> Result<Vec<ReviewTeam>> {
        debug!(org, repo, "fetching review teams");

        #[derive(Deserialize)]
        struct Data {
            organization: Org,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Org {
            my_teams: Nodes<TeamNode>,
            repo_teams: Nodes<TeamNode>,
        }

        #[derive(Deserialize)]
        struct TeamNode {
            slug: String,
            members: Nodes<Actor>,
            repositories: Option<Nodes<Named>>,
        }

        let data: Data = self
            .graphql(&serde_json::json!({
                "query": r"
                    query ReviewTeams($org: String!, $repo: String!) {
                        organization(login: $org) {
                            myTeams: teams(first: 10, role: MEMBER) {
                                nodes {
                                    slug
                                    members(first: 50) { nodes { login } }
                                }
                            }
                            repoTeams: teams(first: 10) {
                                nodes {
                                    slug
                                    members(first: 50) { nodes { login } }
                                    repositories(first: 10, query: $repo) { nodes { name } }
                                }
                            }
                        }
                    }
                ",
                "variables": { "org": org, "repo": repo }
            }))
            .await?;

        let to_team = |node: TeamNode, member_of: bool| ReviewTeam {
            slug: node.slug,
            members: node.members.nodes.into_iter().map(|a| a.login).collect(),
            has_repo: member_of
                || node
                    .repositories
                    .as_ref()
                    .is_some_and(|repos| !repos.nodes.is_empty()),
        };

        let mut teams: Vec<ReviewTeam> = data
            .organization
            .my_teams
            .nodes
            .into_iter()
            .map(|node| to_team(node, true))
            .collect();

        for node in data.organization.repo_teams.nodes {
            let team = to_team(node, false);
            if team.has_repo && !teams.iter().any(|t| t.slug == team.slug) {
                teams.push(team);
            }
        }

        debug!(count = teams.len(), "fetched review teams");
        Ok(teams)
    }
}
