use anyhow::Context;
use octocrab::models::AppId;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString, SecretVec};

pub mod client;

/// Credentials used to access the GitHub API.
pub enum GithubCredentials {
    /// A bearer token, e.g. the `GITHUB_TOKEN` of a workflow run.
    Token(SecretString),
    /// A GitHub App. Installation tokens are resolved per repository.
    App {
        app_id: AppId,
        private_key: SecretVec<u8>,
    },
}

impl GithubCredentials {
    /// Chooses the token if present, otherwise GitHub App credentials.
    pub fn from_parts(
        token: Option<String>,
        app_id: Option<u64>,
        private_key: Option<String>,
    ) -> anyhow::Result<Self> {
        match (token, app_id, private_key) {
            (Some(token), _, _) => Ok(Self::Token(token.into())),
            (None, Some(app_id), Some(private_key)) => Ok(Self::App {
                app_id: app_id.into(),
                private_key: private_key.into_bytes().into(),
            }),
            _ => Err(anyhow::anyhow!(
                "Either a GitHub token or a GitHub App ID together with its private key has to be provided"
            )),
        }
    }
}

/// Creates an octocrab client authenticated with the given credentials.
pub fn create_github_client(credentials: &GithubCredentials) -> anyhow::Result<Octocrab> {
    match credentials {
        GithubCredentials::Token(token) => Octocrab::builder()
            .personal_token(token.expose_secret().clone())
            .build()
            .context("Could not create octocrab builder"),
        GithubCredentials::App {
            app_id,
            private_key,
        } => {
            let key = jsonwebtoken::EncodingKey::from_rsa_pem(private_key.expose_secret().as_ref())
                .context("Could not encode private key")?;

            Octocrab::builder()
                .app(*app_id, key)
                .build()
                .context("Could not create octocrab builder")
        }
    }
}
