//! CLI runner - executes commands

use crate::auth::CredentialManager;
use crate::catalog::Catalog;
use crate::cli::commands::{Cli, Commands};
use crate::config::{ConfigStore, TapConfig};
use crate::context::SyncContext;
use crate::engine::SyncStats;
use crate::error::{Error, Result};
use crate::http::{ClientConfig, RetryPolicy, XeroClient};
use crate::orchestrator;
use crate::output::{JsonLinesSink, MemorySink, Sink};
use crate::state::StateManager;
use std::path::Path;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
    retry: RetryPolicy,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy for API and token requests
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the CLI command, writing protocol output to stdout
    pub async fn run(&self) -> Result<()> {
        match self.cli.command {
            Commands::Discover => {
                let catalog = self.discover().await?;
                println!("{}", catalog.to_json_pretty()?);
                Ok(())
            }
            Commands::Sync => {
                self.sync(Box::new(JsonLinesSink::stdout())).await?;
                Ok(())
            }
        }
    }

    /// Validate credentials and build the catalog
    pub async fn discover(&self) -> Result<Catalog> {
        let mut ctx = self.context(Catalog::default(), Box::new(MemorySink::new()))?;
        orchestrator::discover(&mut ctx).await
    }

    /// Sync the selected streams into `sink`
    pub async fn sync(&self, sink: Box<dyn Sink>) -> Result<SyncStats> {
        let catalog = self.load_catalog()?;
        if catalog.selected_stream_ids().is_empty() {
            warn!("No streams selected in the catalog");
        }

        let mut ctx = self.context(catalog, sink)?;
        orchestrator::sync(&mut ctx).await
    }

    fn config_path(&self) -> Result<&Path> {
        self.cli
            .config
            .as_deref()
            .ok_or_else(|| Error::config("Config file not specified (use --config)"))
    }

    fn load_catalog(&self) -> Result<Catalog> {
        match &self.cli.catalog {
            Some(path) => {
                info!(path = %path.display(), "Loading catalog");
                Catalog::from_file(path)
            }
            None => Ok(Catalog::discover()),
        }
    }

    fn load_state(&self) -> Result<StateManager> {
        match &self.cli.state {
            Some(path) => StateManager::from_file(path),
            None => Ok(StateManager::in_memory()),
        }
    }

    fn context(&self, catalog: Catalog, sink: Box<dyn Sink>) -> Result<SyncContext> {
        let config_path = self.config_path()?;
        let config = TapConfig::from_file(config_path)?;
        let state = self.load_state()?;

        let client =
            XeroClient::new(ClientConfig::from_tap_config(&config).retry(self.retry.clone()))?;
        let credentials = CredentialManager::new(config.clone(), ConfigStore::new(config_path))?
            .with_retry(self.retry.clone());

        Ok(SyncContext::new(
            config,
            catalog,
            state,
            client,
            Box::new(credentials),
            sink,
        ))
    }
}
