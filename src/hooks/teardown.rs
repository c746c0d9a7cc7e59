//! Teardown hooks, run after a response is received

use std::thread;
use std::time::Duration;

use tracing::debug;

use super::kwargs::HookResponse;
use super::HookError;

/// Pause applied by `teardown_hook_sleep_1_secs`
pub const SLEEP_1_SECS: Duration = Duration::from_secs(1);

/// Block the calling thread for one second
///
/// Used to space out dependent requests. The response is not inspected
/// and never replaced.
pub fn teardown_hook_sleep_1_secs(response: &HookResponse) -> Result<Option<HookResponse>, HookError> {
    debug!(url = %response.url, delay = ?SLEEP_1_SECS, "Sleeping after response");
    thread::sleep(SLEEP_1_SECS);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_sleep_blocks_for_a_second() {
        let response = HookResponse::new("http://example.com", 200).with_body("ok");
        let started = Instant::now();
        let replaced = teardown_hook_sleep_1_secs(&response).unwrap();

        assert!(started.elapsed() >= SLEEP_1_SECS);
        assert!(replaced.is_none());
    }
}
