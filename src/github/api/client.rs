use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use octocrab::models::pulls::FileDiff;
use octocrab::models::Installation;
use octocrab::Octocrab;

use crate::github::api::{create_github_client, GithubCredentials};
use crate::github::{GithubRepoName, PullRequestNumber};
use crate::labeler::TrackerClient;
use crate::utils::timing::perform_with_timeout;

enum GithubAuth {
    Token(Octocrab),
    App {
        client: Octocrab,
        // Installation clients cache their access token and refresh it once it expires.
        installations: Mutex<HashMap<GithubRepoName, Octocrab>>,
    },
}

/// Provides access to pull requests using the GitHub API.
/// Every API call is a single attempt bounded by `timeout`.
pub struct GithubTrackerClient {
    auth: GithubAuth,
    timeout: Duration,
}

impl GithubTrackerClient {
    pub fn new(credentials: &GithubCredentials, timeout: Duration) -> anyhow::Result<Self> {
        let client = create_github_client(credentials)?;
        let auth = match credentials {
            GithubCredentials::Token(_) => GithubAuth::Token(client),
            GithubCredentials::App { .. } => GithubAuth::App {
                client,
                installations: Mutex::new(HashMap::new()),
            },
        };
        Ok(Self { auth, timeout })
    }

    /// Returns a client authorized to access the given repository.
    async fn repo_client(&self, repo: &GithubRepoName) -> anyhow::Result<Octocrab> {
        let (client, installations) = match &self.auth {
            GithubAuth::Token(client) => return Ok(client.clone()),
            GithubAuth::App {
                client,
                installations,
            } => (client, installations),
        };

        let cached = installations
            .lock()
            .map_err(|_| anyhow::anyhow!("Installation cache is poisoned"))?
            .get(repo)
            .cloned();
        if let Some(installation_client) = cached {
            return Ok(installation_client);
        }

        // https://docs.github.com/en/rest/apps/apps?apiVersion=2022-11-28#get-a-repository-installation-for-the-authenticated-app
        let installation: Installation = perform_with_timeout(
            "get_repository_installation",
            self.timeout,
            async {
                client
                    .get(
                        format!("/repos/{}/{}/installation", repo.owner(), repo.name()),
                        None::<&()>,
                    )
                    .await
                    .with_context(|| format!("Cannot find app installation for {repo}"))
            },
        )
        .await?;
        tracing::info!("Found installation {} for {repo}", installation.id);

        let installation_client = client.installation(installation.id);
        installations
            .lock()
            .map_err(|_| anyhow::anyhow!("Installation cache is poisoned"))?
            .insert(repo.clone(), installation_client.clone());
        Ok(installation_client)
    }
}

/// Paths touched by a diff. A renamed file counts under both its new and its previous path.
fn diff_paths(files: Vec<FileDiff>) -> BTreeSet<String> {
    files
        .into_iter()
        .flat_map(|file| std::iter::once(file.filename).chain(file.previous_filename))
        .collect()
}

#[async_trait]
impl TrackerClient for GithubTrackerClient {
    async fn get_changed_paths(
        &self,
        repo: &GithubRepoName,
        pr: PullRequestNumber,
    ) -> anyhow::Result<BTreeSet<String>> {
        let client = self.repo_client(repo).await?;
        let files: Vec<FileDiff> = perform_with_timeout("list_files", self.timeout, async {
            let page = client
                .pulls(repo.owner(), repo.name())
                .list_files(pr.0)
                .await
                .with_context(|| format!("Cannot list files of PR {repo}/{pr}"))?;
            client
                .all_pages(page)
                .await
                .with_context(|| format!("Cannot list files of PR {repo}/{pr}"))
        })
        .await?;

        Ok(diff_paths(files))
    }

    async fn add_labels(
        &self,
        repo: &GithubRepoName,
        pr: PullRequestNumber,
        labels: &[String],
    ) -> anyhow::Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let client = self.repo_client(repo).await?;
        perform_with_timeout("add_labels", self.timeout, async {
            client
                .issues(repo.owner(), repo.name())
                .add_labels(pr.0, labels)
                .await
                .with_context(|| format!("Cannot add label(s) to PR {repo}/{pr}"))
        })
        .await?;
        Ok(())
    }
}
