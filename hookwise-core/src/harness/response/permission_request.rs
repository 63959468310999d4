//! PermissionRequest fires when the agent is about to show a permission
//! dialog. Rules can answer on the user's behalf:
//!
//! ```json
//! {
//!   "hookSpecificOutput": {
//!     "hookEventName": "PermissionRequest",
//!     "decision": {
//!       "behavior": "allow",
//!       "updatedInput": {...},
//!       "message": "...",
//!       "interrupt": true
//!     }
//!   }
//! }
//! ```
//!
//! Without any decision the response stays empty and the dialog is shown.

use super::types::{HookResponse, HookSpecificOutput};
use super::{block_reason, effective_input};
use crate::engine::outputs::{PermissionBehavior, PermissionRequestDecision};
use crate::engine::HookOutcome;
use crate::harness::events::HookEvent;

pub(super) fn build(outcome: &HookOutcome, event: &HookEvent) -> HookResponse {
    let recorded = outcome.accumulator.permission_request_decision.clone();

    let decision = if let Some(reason) = block_reason(outcome) {
        match recorded {
            Some(decision) if decision.behavior == PermissionBehavior::Deny => decision,
            _ => PermissionRequestDecision::deny(reason, false),
        }
    } else {
        let updated_input = effective_input(outcome, event);
        match recorded {
            Some(mut decision) => {
                if decision.behavior == PermissionBehavior::Allow {
                    decision.updated_input = updated_input;
                }
                decision
            }
            None if updated_input.is_some() => PermissionRequestDecision {
                updated_input,
                ..PermissionRequestDecision::allow()
            },
            None => return HookResponse::empty(),
        }
    };

    HookResponse {
        hook_specific_output: Some(HookSpecificOutput::PermissionRequest { decision }),
        ..HookResponse::empty()
    }
}
