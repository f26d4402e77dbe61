//! The pickup request state machine.
//!
//! ```text
//! pending ──accept──▶ accepted ──start──▶ in-process ──submit items──▶ pending-approval
//!                        ▲                                                │       │
//!                        └─────────────────────reject─────────────────────┘       │
//!                                                                     approve ──▶ completed
//! ```
//!
//! Partners drive the request forward until approval; the owning customer
//! decides the last step. Edges are keyed by the operation requested, so two
//! operations that land on the same status (accept and reject) never stand in
//! for each other.

use thiserror::Error;

use crate::models::identity::Role;
use crate::models::pickup::RequestStatus;

/// An operation a user asks to perform on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Accept,
    Start,
    SubmitItems,
    Approve,
    Reject,
}

impl Trigger {
    pub const ALL: [Trigger; 5] = [
        Trigger::Accept,
        Trigger::Start,
        Trigger::SubmitItems,
        Trigger::Approve,
        Trigger::Reject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Accept => "accept",
            Trigger::Start => "start",
            Trigger::SubmitItems => "submit_items",
            Trigger::Approve => "approve",
            Trigger::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller must do alongside an allowed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Record the accepting partner. The store generates the pickup code.
    AssignPartner,
    /// The partner-supplied code must equal the stored pickup code.
    VerifyPickupCode,
    /// Attach the submitted items and their total.
    AttachItems,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: RequestStatus,
    pub effect: SideEffect,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {trigger} a request that is {from}")]
    NotAllowed {
        from: RequestStatus,
        trigger: Trigger,
    },

    #[error("cannot move request from {from} to {to}")]
    NoSuchEdge {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("a {actor} cannot {trigger} a request")]
    WrongActor { trigger: Trigger, actor: Role },
}

fn edge(from: RequestStatus, trigger: Trigger) -> Option<(Role, RequestStatus, SideEffect)> {
    use RequestStatus::*;

    match (trigger, from) {
        (Trigger::Accept, Pending) => Some((Role::Partner, Accepted, SideEffect::AssignPartner)),
        (Trigger::Start, Accepted) => Some((Role::Partner, InProcess, SideEffect::VerifyPickupCode)),
        (Trigger::SubmitItems, InProcess) => {
            Some((Role::Partner, PendingApproval, SideEffect::AttachItems))
        }
        (Trigger::Approve, PendingApproval) => Some((Role::Customer, Completed, SideEffect::None)),
        (Trigger::Reject, PendingApproval) => Some((Role::Customer, Accepted, SideEffect::None)),
        _ => None,
    }
}

/// Decides whether `actor` may perform `trigger` on a request in status `from`.
/// A missing edge is reported before a wrong actor.
pub fn evaluate(
    from: RequestStatus,
    trigger: Trigger,
    actor: Role,
) -> Result<Transition, TransitionError> {
    let (required, to, effect) =
        edge(from, trigger).ok_or(TransitionError::NotAllowed { from, trigger })?;

    if actor != required {
        return Err(TransitionError::WrongActor { trigger, actor });
    }

    Ok(Transition { to, effect })
}

/// The status-pair form of the rule: may `actor` move a request from `from`
/// to `to`, and with what side effect.
pub fn rule(
    from: RequestStatus,
    to: RequestStatus,
    actor: Role,
) -> Result<SideEffect, TransitionError> {
    let trigger = Trigger::ALL
        .into_iter()
        .find(|trigger| matches!(edge(from, *trigger), Some((_, target, _)) if target == to))
        .ok_or(TransitionError::NoSuchEdge { from, to })?;

    evaluate(from, trigger, actor).map(|transition| transition.effect)
}

#[cfg(test)]
mod tests {
    use super::{evaluate, rule, SideEffect, Transition, TransitionError, Trigger};
    use crate::models::identity::Role;
    use crate::models::pickup::RequestStatus::{self, *};

    const ALL: [RequestStatus; 5] = [Pending, Accepted, InProcess, PendingApproval, Completed];

    #[test]
    fn partner_triggers_carry_their_side_effects() {
        assert_eq!(
            evaluate(Pending, Trigger::Accept, Role::Partner),
            Ok(Transition {
                to: Accepted,
                effect: SideEffect::AssignPartner
            })
        );
        assert_eq!(
            evaluate(Accepted, Trigger::Start, Role::Partner),
            Ok(Transition {
                to: InProcess,
                effect: SideEffect::VerifyPickupCode
            })
        );
        assert_eq!(
            evaluate(InProcess, Trigger::SubmitItems, Role::Partner),
            Ok(Transition {
                to: PendingApproval,
                effect: SideEffect::AttachItems
            })
        );
    }

    #[test]
    fn customer_decides_approval() {
        assert_eq!(
            evaluate(PendingApproval, Trigger::Approve, Role::Customer).map(|t| t.to),
            Ok(Completed)
        );
        assert_eq!(
            evaluate(PendingApproval, Trigger::Reject, Role::Customer).map(|t| t.to),
            Ok(Accepted)
        );
    }

    #[test]
    fn accept_never_resolves_to_the_reject_edge() {
        for actor in [Role::Customer, Role::Partner] {
            assert_eq!(
                evaluate(PendingApproval, Trigger::Accept, actor),
                Err(TransitionError::NotAllowed {
                    from: PendingApproval,
                    trigger: Trigger::Accept
                })
            );
        }
    }

    #[test]
    fn missing_edge_is_reported_before_wrong_actor() {
        assert_eq!(
            evaluate(Pending, Trigger::Reject, Role::Customer),
            Err(TransitionError::NotAllowed {
                from: Pending,
                trigger: Trigger::Reject
            })
        );
        assert_eq!(
            evaluate(Pending, Trigger::Accept, Role::Customer),
            Err(TransitionError::WrongActor {
                trigger: Trigger::Accept,
                actor: Role::Customer
            })
        );
    }

    #[test]
    fn partner_cannot_approve_own_submission() {
        let err = evaluate(PendingApproval, Trigger::Approve, Role::Partner).unwrap_err();
        assert!(matches!(err, TransitionError::WrongActor { .. }));
    }

    #[test]
    fn completed_is_terminal() {
        for trigger in Trigger::ALL {
            for actor in [Role::Customer, Role::Partner] {
                assert!(evaluate(Completed, trigger, actor).is_err());
            }
        }
    }

    #[test]
    fn exactly_five_edges_exist() {
        let mut edges = 0;
        for from in ALL {
            for trigger in Trigger::ALL {
                let allowed = [Role::Customer, Role::Partner]
                    .iter()
                    .any(|actor| evaluate(from, trigger, *actor).is_ok());
                if allowed {
                    edges += 1;
                }
            }
        }
        assert_eq!(edges, 5);
    }

    #[test]
    fn status_pair_rule_matches_the_table() {
        assert_eq!(
            rule(Pending, Accepted, Role::Partner),
            Ok(SideEffect::AssignPartner)
        );
        assert_eq!(
            rule(PendingApproval, Accepted, Role::Customer),
            Ok(SideEffect::None)
        );
        assert!(matches!(
            rule(PendingApproval, Accepted, Role::Partner),
            Err(TransitionError::WrongActor {
                trigger: Trigger::Reject,
                ..
            })
        ));
        for from in ALL {
            assert_eq!(
                rule(from, Pending, Role::Partner),
                Err(TransitionError::NoSuchEdge { from, to: Pending })
            );
        }
    }
}
