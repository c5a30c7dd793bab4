// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Seeker/provider connection edges.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::UserType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
            ConnectionStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConnectionStatus::Pending),
            "accepted" => Ok(ConnectionStatus::Accepted),
            "rejected" => Ok(ConnectionStatus::Rejected),
            "blocked" => Ok(ConnectionStatus::Blocked),
            other => Err(format!("unknown connection status '{}'", other)),
        }
    }
}

/// Connection between one seeker and one provider, unique per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub seeker: ObjectId,
    pub provider: ObjectId,
    pub status: ConnectionStatus,
    /// Which side sent the request
    pub initiated_by: UserType,
    pub message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Why a status change was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("only the receiving party can respond to a pending request")]
    NotRecipient,
    #[error("cannot change a {from} connection to {to}")]
    Invalid {
        from: &'static str,
        to: &'static str,
    },
}

impl Connection {
    /// Side of the connection `user` is on, if they participate.
    pub fn side_of(&self, user: ObjectId) -> Option<UserType> {
        if self.seeker == user {
            Some(UserType::Seeker)
        } else if self.provider == user {
            Some(UserType::Provider)
        } else {
            None
        }
    }

    /// Check whether the party on `actor` side may move this connection to `to`.
    ///
    /// Recipients accept or reject pending requests; either side may block.
    pub fn check_transition(
        &self,
        actor: UserType,
        to: ConnectionStatus,
    ) -> Result<(), TransitionError> {
        use ConnectionStatus::*;

        match (self.status, to) {
            (Pending, Accepted | Rejected) => {
                if actor == self.initiated_by {
                    Err(TransitionError::NotRecipient)
                } else {
                    Ok(())
                }
            }
            (Pending | Accepted | Rejected, Blocked) => Ok(()),
            (from, to) => Err(TransitionError::Invalid {
                from: from.as_str(),
                to: to.as_str(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_from_seeker() -> Connection {
        Connection {
            id: None,
            seeker: ObjectId::new(),
            provider: ObjectId::new(),
            status: ConnectionStatus::Pending,
            initiated_by: UserType::Seeker,
            message: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_recipient_can_accept() {
        let c = pending_from_seeker();
        assert!(c
            .check_transition(UserType::Provider, ConnectionStatus::Accepted)
            .is_ok());
        assert!(c
            .check_transition(UserType::Provider, ConnectionStatus::Rejected)
            .is_ok());
    }

    #[test]
    fn test_initiator_cannot_accept_own_request() {
        let c = pending_from_seeker();
        assert_eq!(
            c.check_transition(UserType::Seeker, ConnectionStatus::Accepted),
            Err(TransitionError::NotRecipient)
        );
    }

    #[test]
    fn test_either_side_can_block() {
        let mut c = pending_from_seeker();
        c.status = ConnectionStatus::Accepted;
        assert!(c
            .check_transition(UserType::Seeker, ConnectionStatus::Blocked)
            .is_ok());
        assert!(c
            .check_transition(UserType::Provider, ConnectionStatus::Blocked)
            .is_ok());
    }

    #[test]
    fn test_blocked_is_terminal() {
        let mut c = pending_from_seeker();
        c.status = ConnectionStatus::Blocked;
        for to in [
            ConnectionStatus::Pending,
            ConnectionStatus::Accepted,
            ConnectionStatus::Rejected,
            ConnectionStatus::Blocked,
        ] {
            assert!(c.check_transition(UserType::Provider, to).is_err());
        }
    }

    #[test]
    fn test_side_of() {
        let c = pending_from_seeker();
        assert_eq!(c.side_of(c.seeker), Some(UserType::Seeker));
        assert_eq!(c.side_of(c.provider), Some(UserType::Provider));
        assert_eq!(c.side_of(ObjectId::new()), None);
    }
}
