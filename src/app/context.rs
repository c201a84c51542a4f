//! State of one working-directory run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::fetch::{CollectionPeriod, CommentFetcher};
use crate::http::{RetryingClient, Transport};
use crate::nico::Endpoints;
use crate::session::SessionManager;
use crate::workspace::Workspace;

/// Everything a run needs, created at its start and dropped at its end.
///
/// The client and the session are separate fields so a [`CommentFetcher`]
/// can borrow both mutably.
#[derive(Debug)]
pub struct RunContext {
    /// Working directory as given on the command line.
    pub dir: PathBuf,
    /// Validated configuration.
    pub config: Config,
    /// Paths inside the working directory.
    pub workspace: Workspace,
    /// Endpoint URLs.
    pub endpoints: Endpoints,
    /// HTTP client with retry.
    pub client: RetryingClient,
    /// Login session.
    pub session: SessionManager,
}

impl RunContext {
    /// Builds the HTTP client and session for `config`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed or the cookie URL is invalid.
    pub fn new(
        dir: PathBuf,
        config: Config,
        workspace: Workspace,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let transport =
            Transport::new(config.http.interval).context("failed to create HTTP client")?;
        let client = RetryingClient::new(
            transport,
            config.http.retry,
            config.http.server_error_interval,
        );
        let scope = endpoints
            .cookie_scope()
            .with_context(|| format!("invalid cookie URL: {}", endpoints.cookie_url))?;
        let session = SessionManager::new(
            config.user.clone(),
            endpoints.login.clone(),
            scope,
            Arc::clone(client.jar()),
        );

        Ok(Self {
            dir,
            config,
            workspace,
            endpoints,
            client,
            session,
        })
    }

    /// Collection period in unix seconds.
    #[must_use]
    pub fn period(&self) -> CollectionPeriod {
        CollectionPeriod {
            start: self.config.counter.start_timestamp(),
            end: self.config.counter.end_timestamp(),
        }
    }

    /// A fetcher borrowing this run's client and session.
    pub fn fetcher(&mut self) -> CommentFetcher<'_> {
        let period = self.period();
        CommentFetcher::new(&mut self.client, &mut self.session, &self.endpoints, period)
    }
}
