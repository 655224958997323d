//! # Solo-Machine Runtime
//!
//! Owns the home directory: configuration, the single protocol store and the
//! machine identity. Builds one [`HandshakeService`] per chain-link on demand.
//!
//! ## Home layout
//!
//! ```text
//! <home>/
//! ├── config.yaml
//! └── data/solo-machine.db   # default store path
//! ```

use crate::config::SoloMachineConfig;
use crate::gateway::GatewayChainClient;
use shared_types::{SoloMachineError, SoloResult};
use sm_01_protocol_store::{ProtocolStore, StoreBackend};
use sm_02_identity::{ChainLinkStore, IdentityKeeper};
use sm_04_light_client::{LightClientVerifier, LineageVerifier};
use sm_05_handshake::{ChainClient, HandshakeService};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// What `init` found or created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    /// Compressed public key, hex
    pub public_key: String,
    /// Next solo-machine sequence
    pub sequence: u64,
    /// A new identity was generated
    pub identity_created: bool,
    /// An example configuration was written
    pub config_written: bool,
}

/// Loaded home directory.
pub struct SoloRuntime {
    home: PathBuf,
    config: SoloMachineConfig,
    store: ProtocolStore,
    cancel: watch::Receiver<bool>,
}

impl SoloRuntime {
    /// Prepare `home`: write an example config if there is none, open the
    /// store and create the machine identity on first run.
    pub fn init(home: &Path) -> SoloResult<InitReport> {
        create_dir(home)?;
        let config_written = !SoloMachineConfig::path_in(home).exists();
        if config_written {
            SoloMachineConfig::example().save(home)?;
            info!(home = %home.display(), "wrote example configuration");
        }
        let config = SoloMachineConfig::load(home)?;
        let store = open_store(home, &config)?;

        let identity_created = !IdentityKeeper::is_initialized(&store)?;
        let keeper = IdentityKeeper::load_or_create(&store)?;
        Ok(InitReport {
            public_key: hex::encode(keeper.public_key().as_bytes()),
            sequence: keeper.current_sequence()?,
            identity_created,
            config_written,
        })
    }

    /// Load an initialized home directory. Confirmation waits are abandoned
    /// once `cancel` turns true.
    pub fn open(home: &Path, cancel: watch::Receiver<bool>) -> SoloResult<Self> {
        let config = SoloMachineConfig::load(home)?;
        let store = open_store(home, &config)?;
        Ok(Self::from_parts(home, config, store, cancel))
    }

    /// Runtime over an already-open store.
    pub fn from_parts(
        home: &Path,
        config: SoloMachineConfig,
        store: ProtocolStore,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            home: home.to_path_buf(),
            config,
            store,
            cancel,
        }
    }

    /// Home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Loaded configuration.
    pub fn config(&self) -> &SoloMachineConfig {
        &self.config
    }

    /// The machine's protocol store.
    pub fn store(&self) -> &ProtocolStore {
        &self.store
    }

    /// The persisted identity; a configuration error before `init`.
    pub fn keeper(&self) -> SoloResult<IdentityKeeper> {
        if !IdentityKeeper::is_initialized(&self.store)? {
            return Err(SoloMachineError::Configuration {
                message: format!(
                    "no machine identity in {} (run `solo-machine init` first)",
                    self.home.display()
                ),
            });
        }
        IdentityKeeper::load(&self.store)
    }

    /// Gateway client for `chain_name`.
    pub fn chain_client(&self, chain_name: &str) -> SoloResult<GatewayChainClient> {
        let chain = self.config.chain(chain_name)?;
        Ok(
            GatewayChainClient::connect(chain_name, chain, self.config.handshake.confirmation.clone())?
                .with_cancel(self.cancel.clone()),
        )
    }

    /// Orchestrator for `chain_name` against the configured gateway.
    ///
    /// With `create` false the link must already exist.
    pub fn service(
        &self,
        chain_name: &str,
        create: bool,
    ) -> SoloResult<HandshakeService<GatewayChainClient>> {
        let chain = Arc::new(self.chain_client(chain_name)?);
        self.service_with(chain_name, create, chain)
    }

    /// Orchestrator for `chain_name` against an explicit chain client.
    pub fn service_with<C: ChainClient>(
        &self,
        chain_name: &str,
        create: bool,
        chain: Arc<C>,
    ) -> SoloResult<HandshakeService<C>> {
        self.config.chain(chain_name)?;
        if !create && !ChainLinkStore::exists(&self.store, chain_name)? {
            return Err(SoloMachineError::protocol_state(
                chain_name,
                "open-link",
                "chain link does not exist (run `solo-machine link` first)",
            ));
        }
        let keeper = self.keeper()?;
        let link = ChainLinkStore::open(&self.store, chain_name)?;
        let verifier: Arc<dyn LightClientVerifier> = Arc::new(LineageVerifier::new());
        Ok(HandshakeService::new(
            self.config.handshake.clone(),
            keeper,
            link,
            chain,
            verifier,
        ))
    }
}

fn create_dir(dir: &Path) -> SoloResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| SoloMachineError::storage_io(format!("creating {}: {e}", dir.display())))
}

fn open_store(home: &Path, config: &SoloMachineConfig) -> SoloResult<ProtocolStore> {
    let store_config = config.store_in(home);
    if store_config.backend != StoreBackend::Memory {
        let dir = match store_config.backend {
            StoreBackend::File => store_config.path.parent().map(Path::to_path_buf),
            _ => Some(store_config.path.clone()),
        };
        if let Some(dir) = dir {
            create_dir(&dir)?;
        }
    }
    let store = ProtocolStore::open(&store_config)?;
    info!(
        backend = ?store_config.backend,
        path = %store_config.path.display(),
        version = store.version(),
        "opened protocol store"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::proto::ibc::ChannelState;
    use sm_05_handshake::{HandshakeApi, MockChainClient};

    fn open(home: &Path) -> SoloRuntime {
        let (_tx, rx) = watch::channel(false);
        SoloRuntime::open(home, rx).unwrap()
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = SoloRuntime::init(dir.path()).unwrap();
        assert!(first.identity_created);
        assert!(first.config_written);
        assert_eq!(first.sequence, 1);
        assert_eq!(first.public_key.len(), 66);
        assert!(dir.path().join("config.yaml").exists());
        assert!(dir.path().join("data/solo-machine.db").exists());

        let second = SoloRuntime::init(dir.path()).unwrap();
        assert!(!second.identity_created);
        assert!(!second.config_written);
        assert_eq!(second.public_key, first.public_key);
    }

    #[test]
    fn test_open_requires_config() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, rx) = watch::channel(false);
        let err = SoloRuntime::open(dir.path(), rx).err().unwrap();
        assert!(matches!(err, SoloMachineError::Configuration { .. }));
    }

    #[test]
    fn test_keeper_requires_identity() {
        let dir = tempfile::tempdir().unwrap();
        SoloMachineConfig::example().save(dir.path()).unwrap();
        let runtime = open(dir.path());
        assert!(matches!(
            runtime.keeper(),
            Err(SoloMachineError::Configuration { .. })
        ));
    }

    #[test]
    fn test_service_rejects_unknown_chain_and_missing_link() {
        let dir = tempfile::tempdir().unwrap();
        SoloRuntime::init(dir.path()).unwrap();
        let runtime = open(dir.path());
        let chain = Arc::new(MockChainClient::new("testchain-1"));

        let err = runtime.service_with("osmosis", true, chain.clone()).err().unwrap();
        assert!(matches!(err, SoloMachineError::Configuration { .. }));

        let err = runtime.service_with("testchain", false, chain.clone()).err().unwrap();
        assert!(matches!(err, SoloMachineError::ProtocolState { .. }));
        assert!(!ChainLinkStore::exists(runtime.store(), "testchain").unwrap());

        assert!(runtime.service_with("testchain", true, chain).is_ok());
        assert!(ChainLinkStore::exists(runtime.store(), "testchain").unwrap());
    }

    #[tokio::test]
    async fn test_link_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        SoloRuntime::init(dir.path()).unwrap();
        let chain = Arc::new(MockChainClient::new("testchain-1"));

        let linked = {
            let runtime = open(dir.path());
            let service = runtime.service_with("testchain", true, chain.clone()).unwrap();
            service.link().await.unwrap()
        };
        assert!(linked.channel_open());

        let runtime = open(dir.path());
        let service = runtime.service_with("testchain", false, chain.clone()).unwrap();
        let submissions = chain.submissions();
        let again = HandshakeApi::link(&service).await.unwrap();
        assert_eq!(again, linked);
        assert_eq!(chain.submissions(), submissions);

        let status = service.status().await.unwrap();
        assert_eq!(status.channel_id.as_deref(), Some("channel-0"));
        assert_eq!(
            chain
                .channel(linked.counterparty_channel_id.as_deref().unwrap())
                .unwrap()
                .channel_state()
                .unwrap(),
            ChannelState::Open
        );
    }
}
