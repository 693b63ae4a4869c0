//! Single-owner guard shared by both ledgers.
//!
//! The owner receives the escrow tax and is the only identity allowed to
//! set exchange rates. Ownership can be handed over; there is no renounce.

use serde::{Deserialize, Serialize};

use remit_protocol::PartyId;

use crate::error::LedgerError;

/// The privileged identity of a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    owner: PartyId,
}

impl Ownership {
    pub fn new(owner: PartyId) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &PartyId {
        &self.owner
    }

    pub fn is_owner(&self, party: &PartyId) -> bool {
        &self.owner == party
    }

    /// Fails with [`LedgerError::Unauthorized`] unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &PartyId, action: &'static str) -> Result<(), LedgerError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                party: caller.clone(),
                action,
            })
        }
    }

    /// Hands ownership to `new_owner`. Returns the previous owner.
    pub fn transfer(
        &mut self,
        caller: &PartyId,
        new_owner: PartyId,
    ) -> Result<PartyId, LedgerError> {
        self.ensure_owner(caller, "transfer ownership")?;
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(s: &str) -> PartyId {
        PartyId::new(s).unwrap()
    }

    #[test]
    fn only_owner_passes_the_guard() {
        let ownership = Ownership::new(party("owner"));
        assert!(ownership.ensure_owner(&party("owner"), "set rate").is_ok());

        let err = ownership.ensure_owner(&party("mallory"), "set rate").unwrap_err();
        assert_eq!(
            err,
            LedgerError::Unauthorized {
                party: party("mallory"),
                action: "set rate",
            }
        );
    }

    #[test]
    fn transfer_moves_the_privilege() {
        let mut ownership = Ownership::new(party("owner"));
        let previous = ownership.transfer(&party("owner"), party("heir")).unwrap();
        assert_eq!(previous, party("owner"));
        assert!(ownership.is_owner(&party("heir")));
        assert!(!ownership.is_owner(&party("owner")));
    }

    #[test]
    fn non_owner_cannot_transfer() {
        let mut ownership = Ownership::new(party("owner"));
        assert!(ownership.transfer(&party("mallory"), party("mallory")).is_err());
        assert_eq!(ownership.owner(), &party("owner"));
    }
}
