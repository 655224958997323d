//! # Value Objects

use rand::Rng;
use shared_types::IdentifierKind;

/// Diversifier length.
pub const DIVERSIFIER_LEN: usize = 15;

/// Generate a diversifier: 15 random lowercase ASCII letters.
///
/// The diversifier lets one public key back several independent clients on
/// different chains without their signatures being interchangeable.
pub fn generate_diversifier() -> String {
    let mut rng = rand::thread_rng();
    (0..DIVERSIFIER_LEN)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

/// True if `s` looks like a generated diversifier.
pub fn is_valid_diversifier(s: &str) -> bool {
    s.len() == DIVERSIFIER_LEN && s.bytes().all(|b| b.is_ascii_lowercase())
}

/// Identifier fields of a chain link, in handshake order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkField {
    /// Solo-machine client id on the counterparty (`06-solomachine-<n>`).
    CounterpartyClientId,
    /// Mirrored Tendermint client id on the solo machine.
    ClientId,
    /// Connection id on the counterparty.
    CounterpartyConnectionId,
    /// Connection id on the solo machine.
    ConnectionId,
    /// ICS-20 channel id on the counterparty.
    CounterpartyChannelId,
    /// ICS-20 channel id on the solo machine.
    ChannelId,
}

impl LinkField {
    /// Every field, in handshake order.
    pub const ALL: [LinkField; 6] = [
        LinkField::CounterpartyClientId,
        LinkField::ClientId,
        LinkField::CounterpartyConnectionId,
        LinkField::ConnectionId,
        LinkField::CounterpartyChannelId,
        LinkField::ChannelId,
    ];

    /// Store key.
    pub fn key(&self) -> &'static str {
        match self {
            LinkField::CounterpartyClientId => "counterparty-client-id",
            LinkField::ClientId => "client-id",
            LinkField::CounterpartyConnectionId => "counterparty-connection-id",
            LinkField::ConnectionId => "connection-id",
            LinkField::CounterpartyChannelId => "counterparty-ics20-channel-id",
            LinkField::ChannelId => "ics20-channel-id",
        }
    }

    /// Fields that must already be set before this one may be.
    pub fn prerequisites(&self) -> &'static [LinkField] {
        match self {
            LinkField::CounterpartyClientId | LinkField::ClientId => &[],
            LinkField::CounterpartyConnectionId => {
                &[LinkField::CounterpartyClientId, LinkField::ClientId]
            }
            LinkField::ConnectionId => &[LinkField::CounterpartyConnectionId],
            LinkField::CounterpartyChannelId => &[LinkField::ConnectionId],
            LinkField::ChannelId => &[LinkField::CounterpartyChannelId],
        }
    }

    /// Kind of identifier allocated locally for this field, if any.
    pub fn local_kind(&self) -> Option<IdentifierKind> {
        match self {
            LinkField::ClientId => Some(IdentifierKind::TendermintClient),
            LinkField::ConnectionId => Some(IdentifierKind::Connection),
            LinkField::ChannelId => Some(IdentifierKind::Channel),
            _ => None,
        }
    }
}

/// Key of the per-link counter for `kind`.
pub fn counter_key(kind: IdentifierKind) -> &'static str {
    match kind {
        IdentifierKind::TendermintClient => "next-light-client-number",
        IdentifierKind::Connection => "next-connection-number",
        IdentifierKind::Channel => "next-channel-number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diversifier_shape() {
        for _ in 0..20 {
            let d = generate_diversifier();
            assert!(is_valid_diversifier(&d), "{d}");
        }
        assert!(!is_valid_diversifier("ABCDEFGHIJKLMNO"));
        assert!(!is_valid_diversifier("short"));
    }

    #[test]
    fn test_prerequisites_point_backwards() {
        for (i, field) in LinkField::ALL.iter().enumerate() {
            for pre in field.prerequisites() {
                let j = LinkField::ALL.iter().position(|f| f == pre).unwrap();
                assert!(j < i, "{field:?} depends on later {pre:?}");
            }
        }
    }
}
