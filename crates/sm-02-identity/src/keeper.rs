//! # Identity & Sequence Keeper
//!
//! Owns the machine keypair and the single sequence counter every signature
//! consumes. Both live in the store-global `solo-machine` namespace.
//!
//! A sequence value is committed before it is handed out: a crash before the
//! commit means the value was never used, a crash after it burns the value.
//! Either way no value is ever signed twice.

use parking_lot::Mutex;
use shared_crypto::{Secp256k1KeyPair, Secp256k1PublicKey};
use shared_types::proto::cosmos::PubKey;
use shared_types::proto::google::Any;
use shared_types::proto::to_any;
use shared_types::{SoloMachineError, SoloResult};
use sm_01_protocol_store::{Namespace, ProtocolStore};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Namespace holding the key and the counter.
pub const GLOBAL_NAMESPACE: &str = "solo-machine";
/// Key of the secp256k1 secret.
pub const PRIVATE_KEY: &str = "private-key";
/// Key of the sequence counter.
pub const SEQUENCE: &str = "sequence";
/// Sequence of a freshly created identity.
pub const INITIAL_SEQUENCE: u64 = 1;

/// Outcome of reconciling the local counter with the counterparty's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSync {
    /// Local and remote agree.
    InSync(u64),
    /// Local was behind and jumped forward.
    FastForwarded {
        /// Local value before
        from: u64,
        /// New local value
        to: u64,
    },
    /// Local was ahead (signatures issued but never accepted) and was
    /// brought back to the counterparty value.
    Rewound {
        /// Local value before
        from: u64,
        /// New local value
        to: u64,
    },
}

/// Handle to the machine identity. Clones share the key and the counter lock.
#[derive(Clone)]
pub struct IdentityKeeper {
    ns: Namespace,
    keypair: Arc<Secp256k1KeyPair>,
    sequence_lock: Arc<Mutex<()>>,
}

impl IdentityKeeper {
    /// True once a key has been persisted.
    pub fn is_initialized(store: &ProtocolStore) -> SoloResult<bool> {
        store.namespace(GLOBAL_NAMESPACE).has(PRIVATE_KEY)
    }

    /// Load the persisted identity, creating and committing a new one on
    /// first run.
    pub fn load_or_create(store: &ProtocolStore) -> SoloResult<Self> {
        if Self::is_initialized(store)? {
            return Self::load(store);
        }
        let ns = store.namespace(GLOBAL_NAMESPACE);
        let keypair = Secp256k1KeyPair::generate();
        ns.set(PRIVATE_KEY, keypair.secret_bytes().to_vec());
        ns.set_u64(SEQUENCE, INITIAL_SEQUENCE);
        store.commit()?;
        info!(sequence = INITIAL_SEQUENCE, "created machine identity");
        Ok(Self {
            ns,
            keypair: Arc::new(keypair),
            sequence_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Load the persisted identity; `NotFound` if there is none.
    pub fn load(store: &ProtocolStore) -> SoloResult<Self> {
        let ns = store.namespace(GLOBAL_NAMESPACE);
        let secret = Zeroizing::new(ns.require(PRIVATE_KEY)?);
        let keypair = Secp256k1KeyPair::from_slice(&secret).map_err(|e| SoloMachineError::Signing {
            message: format!("persisted key is unusable: {e}"),
        })?;
        if ns.get_u64(SEQUENCE)?.is_none() {
            return Err(SoloMachineError::not_found(format!("{GLOBAL_NAMESPACE}/{SEQUENCE}")));
        }
        Ok(Self {
            ns,
            keypair: Arc::new(keypair),
            sequence_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Compressed public key.
    pub fn public_key(&self) -> Secp256k1PublicKey {
        self.keypair.public_key()
    }

    /// Public key packed as `Any{/cosmos.crypto.secp256k1.PubKey}`.
    pub fn public_key_any(&self) -> Any {
        to_any(&PubKey {
            key: self.public_key().as_bytes().to_vec(),
        })
    }

    /// Sign `bytes`, returning the 64-byte compact signature.
    pub fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        self.keypair.sign(bytes).to_vec()
    }

    /// Committed counter value: the next sequence to be handed out.
    pub fn current_sequence(&self) -> SoloResult<u64> {
        self.ns
            .get_u64(SEQUENCE)?
            .ok_or_else(|| SoloMachineError::not_found(format!("{GLOBAL_NAMESPACE}/{SEQUENCE}")))
    }

    /// Hand out the next sequence. The incremented counter is committed
    /// before the value is returned.
    pub fn next_sequence(&self) -> SoloResult<u64> {
        let _guard = self.sequence_lock.lock();
        let sequence = self.current_sequence()?;
        let next = sequence.checked_add(1).ok_or_else(|| SoloMachineError::Signing {
            message: "sequence counter exhausted".to_string(),
        })?;
        self.ns.set_u64(SEQUENCE, next);
        self.ns.store().commit()?;
        debug!(sequence, "sequence consumed");
        Ok(sequence)
    }

    /// Reconcile with the sequence the counterparty's client expects next.
    ///
    /// The counterparty is authoritative before a proof bundle: a local
    /// counter that is behind is fast-forwarded, one that is ahead is rewound
    /// and the abandoned range is logged.
    pub fn sync_with_counterparty(&self, observed: u64) -> SoloResult<SequenceSync> {
        let _guard = self.sequence_lock.lock();
        let local = self.current_sequence()?;
        let outcome = match local.cmp(&observed) {
            std::cmp::Ordering::Equal => return Ok(SequenceSync::InSync(local)),
            std::cmp::Ordering::Less => SequenceSync::FastForwarded {
                from: local,
                to: observed,
            },
            std::cmp::Ordering::Greater => {
                warn!(
                    local,
                    observed,
                    burned = local - observed,
                    "local sequence ahead of counterparty, discarding unaccepted signatures"
                );
                SequenceSync::Rewound {
                    from: local,
                    to: observed,
                }
            }
        };
        self.ns.set_u64(SEQUENCE, observed);
        self.ns.store().commit()?;
        debug!(?outcome, "sequence synced with counterparty");
        Ok(outcome)
    }
}

impl std::fmt::Debug for IdentityKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeeper")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sm_01_protocol_store::StoreConfig;

    #[test]
    fn test_first_run_creates_identity_at_sequence_one() {
        let store = ProtocolStore::in_memory();
        assert!(!IdentityKeeper::is_initialized(&store).unwrap());
        let keeper = IdentityKeeper::load_or_create(&store).unwrap();
        assert_eq!(keeper.current_sequence().unwrap(), INITIAL_SEQUENCE);

        let again = IdentityKeeper::load_or_create(&store).unwrap();
        assert_eq!(again.public_key(), keeper.public_key());
    }

    #[test]
    fn test_load_without_identity_is_not_found() {
        let store = ProtocolStore::in_memory();
        assert!(IdentityKeeper::load(&store).unwrap_err().is_not_found());
    }

    #[test]
    fn test_next_sequence_returns_pre_increment_value() {
        let store = ProtocolStore::in_memory();
        let keeper = IdentityKeeper::load_or_create(&store).unwrap();
        assert_eq!(keeper.next_sequence().unwrap(), 1);
        assert_eq!(keeper.next_sequence().unwrap(), 2);
        assert_eq!(keeper.current_sequence().unwrap(), 3);
    }

    #[test]
    fn test_sequence_survives_restart_without_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::file(dir.path().join("store.db"));
        let mut seen = Vec::new();
        for _ in 0..3 {
            let store = ProtocolStore::open(&config).unwrap();
            let keeper = IdentityKeeper::load_or_create(&store).unwrap();
            for _ in 0..4 {
                seen.push(keeper.next_sequence().unwrap());
            }
        }
        assert_eq!(seen, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn test_sync_fast_forwards_and_rewinds() {
        let store = ProtocolStore::in_memory();
        let keeper = IdentityKeeper::load_or_create(&store).unwrap();

        assert_eq!(
            keeper.sync_with_counterparty(5).unwrap(),
            SequenceSync::FastForwarded { from: 1, to: 5 }
        );
        assert_eq!(keeper.next_sequence().unwrap(), 5);
        keeper.next_sequence().unwrap();
        assert_eq!(
            keeper.sync_with_counterparty(6).unwrap(),
            SequenceSync::Rewound { from: 7, to: 6 }
        );
        assert_eq!(keeper.sync_with_counterparty(6).unwrap(), SequenceSync::InSync(6));
        assert_eq!(keeper.next_sequence().unwrap(), 6);
    }

    #[test]
    fn test_signatures_verify_under_public_key() {
        let store = ProtocolStore::in_memory();
        let keeper = IdentityKeeper::load_or_create(&store).unwrap();
        let sig = keeper.sign(b"payload");
        let sig = shared_crypto::Secp256k1Signature::from_slice(&sig).unwrap();
        assert!(keeper.public_key().verify(b"payload", &sig).is_ok());
        assert_eq!(keeper.public_key_any().type_url, "/cosmos.crypto.secp256k1.PubKey");
    }

    proptest! {
        #[test]
        fn prop_next_sequence_strictly_increasing(n in 1usize..50) {
            let store = ProtocolStore::in_memory();
            let keeper = IdentityKeeper::load_or_create(&store).unwrap();
            let values: Vec<u64> = (0..n).map(|_| keeper.next_sequence().unwrap()).collect();
            prop_assert!(values.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }
}
