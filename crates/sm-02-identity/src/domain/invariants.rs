//! # Domain Invariants
//!
//! Rules every chain-link write is checked against before it is staged.

use super::entities::ChainLink;
use super::value_objects::LinkField;
use shared_types::{SoloMachineError, SoloResult};

/// Invariant: identifiers are set in handshake order.
///
/// A later-stage identifier is never set while an earlier one is empty, and
/// the counterparty channel id additionally requires an open connection.
pub fn invariant_prerequisites_set(link: &ChainLink, field: LinkField) -> SoloResult<()> {
    for pre in field.prerequisites() {
        if link.field(*pre).is_none() {
            return Err(SoloMachineError::protocol_state(
                &link.chain_name,
                field.key(),
                format!("{} is not set", pre.key()),
            ));
        }
    }
    if field == LinkField::CounterpartyChannelId && !link.connection_open() {
        return Err(SoloMachineError::protocol_state(
            &link.chain_name,
            field.key(),
            "connection is not open",
        ));
    }
    Ok(())
}

/// Invariant: an identifier, once set, is never changed.
///
/// Re-assigning the same value is accepted so that a resumed step is a no-op.
pub fn invariant_never_reassigned(link: &ChainLink, field: LinkField, value: &str) -> SoloResult<()> {
    match link.field(field) {
        Some(existing) if existing != value => Err(SoloMachineError::protocol_state(
            &link.chain_name,
            field.key(),
            format!("already set to {existing}, refusing {value}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::proto::ibc::ConnectionState;

    fn link() -> ChainLink {
        ChainLink {
            chain_name: "testchain".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_connection_requires_both_clients() {
        let mut l = link();
        l.counterparty_client_id = Some("06-solomachine-0".into());
        let err = invariant_prerequisites_set(&l, LinkField::CounterpartyConnectionId).unwrap_err();
        assert!(err.to_string().contains("client-id is not set"));
        l.client_id = Some("07-tendermint-0".into());
        assert!(invariant_prerequisites_set(&l, LinkField::CounterpartyConnectionId).is_ok());
    }

    #[test]
    fn test_channel_requires_open_connection() {
        let mut l = link();
        l.connection_id = Some("connection-0".into());
        assert!(invariant_prerequisites_set(&l, LinkField::CounterpartyChannelId).is_err());
        l.connection_state = Some(ConnectionState::Open);
        assert!(invariant_prerequisites_set(&l, LinkField::CounterpartyChannelId).is_ok());
    }

    #[test]
    fn test_never_reassigned() {
        let mut l = link();
        assert!(invariant_never_reassigned(&l, LinkField::ClientId, "07-tendermint-0").is_ok());
        l.client_id = Some("07-tendermint-0".into());
        assert!(invariant_never_reassigned(&l, LinkField::ClientId, "07-tendermint-0").is_ok());
        assert!(invariant_never_reassigned(&l, LinkField::ClientId, "07-tendermint-1").is_err());
    }
}
