/// Prefix of the key a project's tracked state is stored under
pub const STATE_KEY_PREFIX: &str = "deployment:";

/// Default upstream API the deployments are read from
pub const API_URL_DEFAULT: &str = "https://api.cloudflare.com/client/v4";

/// Seconds between two poll passes
pub const POLL_INTERVAL_DEFAULT_SECS: u64 = 60;

/// Max length of a commit message shown in a notification
pub const COMMIT_MESSAGE_MAX_LENGTH: usize = 256;

/// Length of the abbreviated commit hash shown in a notification
pub const SHORT_HASH_LENGTH: usize = 7;

/// The key a project's tracked state lives under in the state store
pub fn state_key(project: &str) -> String {
    format!("{STATE_KEY_PREFIX}{project}")
}
