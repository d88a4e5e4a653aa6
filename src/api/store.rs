use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::client::LotClient;
use super::demo::DemoStore;
use super::error::StoreError;
use super::types::*;
use crate::config::Config;

/// Where store commands are executed: the real backend or the demo store.
/// Cheap to clone into spawned tasks.
#[derive(Clone)]
pub enum Backend {
    Remote(Arc<LotClient>),
    Demo(Arc<Mutex<DemoStore>>),
}

impl Backend {
    pub fn from_config(config: &Config, demo: &Arc<Mutex<DemoStore>>) -> Result<Self, StoreError> {
        if config.demo_mode {
            return Ok(Backend::Demo(Arc::clone(demo)));
        }
        Ok(Backend::Remote(Arc::new(LotClient::new(config)?)))
    }

    fn demo(store: &Mutex<DemoStore>) -> MutexGuard<'_, DemoStore> {
        store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the lot snapshot and the company lookup table together
    pub async fn load(&self) -> Result<(Vec<Lot>, Vec<Company>), StoreError> {
        match self {
            Backend::Remote(client) => {
                let lots = client.list_lots().await?;
                let companies = match client.list_companies().await {
                    Ok(companies) => companies,
                    Err(e) => {
                        log::warn!("Company lookup unavailable: {}", e);
                        Vec::new()
                    }
                };
                Ok((lots, companies))
            }
            Backend::Demo(store) => {
                let store = Self::demo(store);
                Ok((store.lots(), store.companies()))
            }
        }
    }

    pub async fn execute(&self, command: StoreCommand) -> Result<CommandOutcome, StoreError> {
        match (self, command) {
            (Backend::Remote(client), StoreCommand::Update { id, patch }) => {
                client.update_lot(&id, &patch).await.map(CommandOutcome::Updated)
            }
            (Backend::Remote(client), StoreCommand::Create(new_lot)) => {
                client.create_lot(&new_lot).await.map(CommandOutcome::Created)
            }
            (Backend::Remote(client), StoreCommand::Delete { id }) => {
                client.delete_lot(&id).await?;
                Ok(CommandOutcome::Deleted(id))
            }
            (Backend::Demo(store), StoreCommand::Update { id, patch }) => {
                Self::demo(store).update_lot(&id, &patch).map(CommandOutcome::Updated)
            }
            (Backend::Demo(store), StoreCommand::Create(new_lot)) => {
                Ok(CommandOutcome::Created(Self::demo(store).create_lot(&new_lot)))
            }
            (Backend::Demo(store), StoreCommand::Delete { id }) => {
                Self::demo(store).delete_lot(&id)?;
                Ok(CommandOutcome::Deleted(id))
            }
        }
    }
}
