//! Role-based access control
//!
//! A fixed permission table maps each role to the set of actions it may
//! perform. Checks are pure membership tests; the table is never mutated
//! after process start. A role with no entry would deny everything, but the
//! table is total over [`UserRole`] by construction.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User identity class, fixed for the lifetime of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular staff member: chat plus own-document access
    Staff,
    /// Administrator: staff rights plus global uploads and user creation
    Admin,
    /// Master administrator: user management only, no chat or documents
    MasterAdmin,
}

/// Closed namespace of gated operations
///
/// Every orchestrator entry point names one of these before doing anything
/// else. Adding an action here forces the permission table below to take a
/// position on it for every role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StartChatSession,
    SubmitChatQuery,
    ViewOwnChatHistory,
    UploadPrivateDocument,
    ViewOwnPrivateDocuments,
    ViewGlobalDocuments,
    UploadGlobalDocument,
    CreateUser,
    UpdateUserRole,
    DeleteUser,
    /// Privileged view of retrieval scores and gate near-misses
    ViewRetrievalDebug,
}

static PERMISSIONS: Lazy<HashMap<UserRole, &'static [Action]>> = Lazy::new(|| {
    use Action::*;
    let mut map = HashMap::new();
    map.insert(
        UserRole::Staff,
        &[
            StartChatSession,
            SubmitChatQuery,
            ViewOwnChatHistory,
            UploadPrivateDocument,
            ViewOwnPrivateDocuments,
            ViewGlobalDocuments,
        ] as &[_],
    );
    map.insert(
        UserRole::Admin,
        &[
            StartChatSession,
            SubmitChatQuery,
            ViewOwnChatHistory,
            UploadPrivateDocument,
            ViewOwnPrivateDocuments,
            ViewGlobalDocuments,
            UploadGlobalDocument,
            CreateUser,
            ViewRetrievalDebug,
        ] as &[_],
    );
    // Master admin manages accounts only. No chat, no document access.
    map.insert(
        UserRole::MasterAdmin,
        &[CreateUser, UpdateUserRole, DeleteUser] as &[_],
    );
    map
});

/// Check whether `role` may perform `action`
///
/// Deterministic and side-effect free. Unknown combinations deny.
pub fn check_access(role: UserRole, action: Action) -> bool {
    PERMISSIONS
        .get(&role)
        .map(|actions| actions.contains(&action))
        .unwrap_or(false)
}
