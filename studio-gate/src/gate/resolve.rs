//! View resolution — pure decision over session, flags, and landing state
//!
//! ```text
//! loading? ──yes──▶ loading
//!    │
//! gated & !accepted & anonymous ──▶ landing | auth-signin
//!    │
//! anonymous ──▶ auth | auth-signin
//!    │
//! admin ──▶ admin
//!    │
//! !waiver ──▶ waiver
//!    │
//!    └──▶ dashboard
//! ```

use serde::{Deserialize, Serialize};

use super::types::{AccessFlags, ViewState};

/// Everything the decision depends on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateInputs {
    /// Session provider still resolving
    pub session_loading: bool,
    /// A user is present in the session
    pub signed_in: bool,
    /// `None` while the flag queries for the current user are in flight
    pub flags: Option<AccessFlags>,
    /// A passcode landing page is configured
    pub passcode_gate: bool,
    pub passcode_accepted: bool,
    /// Visitor asked for the sign-in form rather than sign-up
    pub sign_in_requested: bool,
}

/// Decide the view. First matching rule wins.
pub fn resolve_view(inputs: &GateInputs) -> ViewState {
    if inputs.session_loading || (inputs.signed_in && inputs.flags.is_none()) {
        return ViewState::Loading;
    }

    if !inputs.signed_in {
        if inputs.sign_in_requested {
            return ViewState::AuthSignIn;
        }
        if inputs.passcode_gate && !inputs.passcode_accepted {
            return ViewState::Landing;
        }
        return ViewState::Auth;
    }

    match inputs.flags {
        Some(AccessFlags { is_admin: true, .. }) => ViewState::Admin,
        Some(AccessFlags { has_waiver: false, .. }) => ViewState::Waiver,
        Some(_) => ViewState::Dashboard,
        None => ViewState::Loading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in(is_admin: bool, has_waiver: bool) -> GateInputs {
        GateInputs {
            signed_in: true,
            flags: Some(AccessFlags { is_admin, has_waiver }),
            ..GateInputs::default()
        }
    }

    #[test]
    fn test_exhaustive_grid() {
        for loading in [false, true] {
            for user in [false, true] {
                for is_admin in [false, true] {
                    for has_waiver in [false, true] {
                        for gate in [false, true] {
                            let inputs = GateInputs {
                                session_loading: loading,
                                signed_in: user,
                                flags: user.then_some(AccessFlags { is_admin, has_waiver }),
                                passcode_gate: gate,
                                passcode_accepted: false,
                                sign_in_requested: false,
                            };
                            let expected = if loading {
                                ViewState::Loading
                            } else if !user && gate {
                                ViewState::Landing
                            } else if !user {
                                ViewState::Auth
                            } else if is_admin {
                                ViewState::Admin
                            } else if !has_waiver {
                                ViewState::Waiver
                            } else {
                                ViewState::Dashboard
                            };
                            let view = resolve_view(&inputs);
                            assert_eq!(view, expected, "{inputs:?}");
                            // no flapping
                            assert_eq!(resolve_view(&inputs), view);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_loading_wins() {
        let mut inputs = signed_in(true, true);
        inputs.session_loading = true;
        assert_eq!(resolve_view(&inputs), ViewState::Loading);

        let anonymous = GateInputs {
            session_loading: true,
            passcode_gate: true,
            ..GateInputs::default()
        };
        assert_eq!(resolve_view(&anonymous), ViewState::Loading);
    }

    #[test]
    fn test_pending_flags_are_loading() {
        let inputs = GateInputs {
            signed_in: true,
            flags: None,
            ..GateInputs::default()
        };
        assert_eq!(resolve_view(&inputs), ViewState::Loading);
    }

    #[test]
    fn test_landing_until_accepted() {
        let mut inputs = GateInputs {
            passcode_gate: true,
            ..GateInputs::default()
        };
        assert_eq!(resolve_view(&inputs), ViewState::Landing);

        inputs.passcode_accepted = true;
        assert_eq!(resolve_view(&inputs), ViewState::Auth);
    }

    #[test]
    fn test_sign_in_request_leaves_landing() {
        let inputs = GateInputs {
            passcode_gate: true,
            sign_in_requested: true,
            ..GateInputs::default()
        };
        assert_eq!(resolve_view(&inputs), ViewState::AuthSignIn);

        let ungated = GateInputs {
            sign_in_requested: true,
            ..GateInputs::default()
        };
        assert_eq!(resolve_view(&ungated), ViewState::AuthSignIn);
    }

    #[test]
    fn test_admin_never_sees_waiver() {
        assert_eq!(resolve_view(&signed_in(true, false)), ViewState::Admin);
        assert_eq!(resolve_view(&signed_in(true, true)), ViewState::Admin);
    }

    #[test]
    fn test_member_paths() {
        assert_eq!(resolve_view(&signed_in(false, false)), ViewState::Waiver);
        assert_eq!(resolve_view(&signed_in(false, true)), ViewState::Dashboard);
    }

    #[test]
    fn test_session_beats_landing() {
        // a signed-in visitor never sees the landing page, accepted or not
        let mut inputs = signed_in(false, true);
        inputs.passcode_gate = true;
        inputs.passcode_accepted = false;
        assert_eq!(resolve_view(&inputs), ViewState::Dashboard);
    }

    #[test]
    fn test_fresh_gate_matches_initial_view() {
        for gate in [false, true] {
            let inputs = GateInputs {
                passcode_gate: gate,
                ..GateInputs::default()
            };
            assert_eq!(resolve_view(&inputs), ViewState::initial(gate));
        }
    }
}
