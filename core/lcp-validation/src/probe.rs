//! Production-build detection.
//!
//! The native library ships different certificate chains in development and
//! production builds. A bundled test license with a known passphrase is run
//! through the client once at engine construction: only production builds
//! accept it. Development builds then enforce the basic profile at license
//! parse time, since they cannot open anything else.

use crate::contracts::LcpClient;
use std::sync::Arc;
use tracing::warn;

const PROBE_LICENSE_JSON: &str = include_str!("probe-license.json");

/// Hashed passphrase matching the bundled probe license.
const PROBE_PASSPHRASE: &str = "b0b54f9d0536f15d9e9e10bbefbdcc5d9cb4a89eacfefb92e6cc6b3ae7ba9e14";

/// Runs the probe on the blocking pool. A client that cannot complete the
/// probe is treated as a development build.
pub(crate) async fn is_production_build(client: Arc<dyn LcpClient>) -> bool {
    let result = tokio::task::spawn_blocking(move || {
        client.find_one_valid_passphrase(PROBE_LICENSE_JSON, &[PROBE_PASSPHRASE.to_string()])
    })
    .await;

    match result {
        Ok(Some(_)) => true,
        Ok(None) => false,
        Err(error) => {
            warn!(%error, "production probe did not complete");
            false
        }
    }
}
