//! Test fixtures: a wired-up host + bridge pair and small helpers.

use std::sync::{Arc, Mutex};

use satchel::{Bridge, BridgeConfig};
use satchel_core::{ChangeNotice, WireGeneration};

use crate::host::MemoryHost;

/// An in-memory host with a bridge connected to it.
pub struct TestFixture {
    /// The emulated host engine.
    pub host: Arc<MemoryHost>,
    /// A bridge speaking the host's generation.
    pub bridge: Bridge,
}

impl TestFixture {
    /// A current-generation (handle-addressed) fixture.
    pub fn new() -> Self {
        Self::with_generation(WireGeneration::HandleAddressed)
    }

    /// A legacy-generation (path-addressed) fixture.
    pub fn legacy() -> Self {
        Self::with_generation(WireGeneration::PathAddressed)
    }

    /// A fixture speaking the given generation on both channels.
    pub fn with_generation(generation: WireGeneration) -> Self {
        let host = MemoryHost::new(generation);
        let bridge = Bridge::new(
            host.clone_arc(),
            host.bus(),
            BridgeConfig {
                generation,
                ..BridgeConfig::default()
            },
        );
        Self { host, bridge }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A change callback that records every delivered notice.
///
/// Returns the callback and the shared log to assert on.
pub fn change_log() -> (
    impl Fn(&ChangeNotice) + Send + Sync + 'static,
    Arc<Mutex<Vec<ChangeNotice>>>,
) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (
        move |notice: &ChangeNotice| sink.lock().unwrap().push(notice.clone()),
        log,
    )
}
