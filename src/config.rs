// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

use std::time::Duration;

/// How long an unmatched leg waits for its peer before it is forgotten.
pub const DEFAULT_LEG_TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// How often expired legs are swept out of the correlation caches.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// SIP final response code that means the callee side answered normally.
pub const SIP_SUCCESS: &str = "200";

/// Collection names used by the record store.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TASK: &str = "task";
    pub const OBJECTIVE: &str = "objective";
    pub const ACTIVITY: &str = "activity";
}

/// Field names shared between the CDC processor, the call recorder and the audit hooks.
pub mod fields {
    pub const EXT_ID: &str = "ext_id";
    pub const OPEN: &str = "open";
    pub const TITLE: &str = "title";
    pub const INFO: &str = "info";
    pub const TASKS: &str = "tasks";
    pub const ACTIVITY: &str = "activity";
    pub const EMAIL: &str = "email";
    pub const RAWLOG: &str = "rawlog";
    pub const COMMENT: &str = "comment";
    pub const IS_CALL: &str = "isCall";
    pub const USER: &str = "user";
    pub const RECORD: &str = "record";
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const OWN: &str = "own";
    pub const CONTACT: &str = "contact";
    pub const CALLEE: &str = "callee";
    pub const DESC: &str = "desc";
    pub const NAME: &str = "name";
    pub const IS_ADMIN: &str = "isAdmin";
    pub const ACTIVE: &str = "active";
    pub const VERIFIED: &str = "verified";
    pub const EMAIL_VISIBILITY: &str = "emailVisibility";
}

/// Display name given to users provisioned from a CDC task owner.
pub const PROVISIONED_USER_NAME: &str = "New User";
