//! Scripted call-channel doubles for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use satchel_channel::{CallChannel, ChannelError, Result as ChannelResult};
use satchel_core::{HostRequest, HostResponse};

/// A call channel that answers from a fixed script and records every
/// operation it sees.
pub struct ScriptedChannel {
    script: Mutex<VecDeque<ChannelResult<HostResponse>>>,
    log: Mutex<Vec<String>>,
    load_delay: Option<Duration>,
}

impl ScriptedChannel {
    /// Script of successful responses, answered in order.
    pub fn new(responses: Vec<HostResponse>) -> Arc<Self> {
        Self::with_script(responses.into_iter().map(Ok).collect())
    }

    /// Script mixing responses and channel errors.
    pub fn with_script(script: Vec<ChannelResult<HostResponse>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            log: Mutex::new(Vec::new()),
            load_delay: None,
        })
    }

    /// Delay every `load` response, so concurrent first-use can pile up.
    pub fn with_load_delay(responses: Vec<HostResponse>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            log: Mutex::new(Vec::new()),
            load_delay: Some(delay),
        })
    }

    /// The channel as the trait object the client layer wants.
    pub fn clone_arc(self: &Arc<Self>) -> Arc<dyn CallChannel> {
        Arc::clone(self) as Arc<dyn CallChannel>
    }

    /// Operation names, in call order.
    pub fn ops(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// How many calls of the given operation went out.
    pub fn count(&self, op: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|o| *o == op).count()
    }
}

#[async_trait]
impl CallChannel for ScriptedChannel {
    async fn call(&self, request: HostRequest) -> ChannelResult<HostResponse> {
        let op = request.op();
        self.log.lock().unwrap().push(op.to_string());

        if op == "load" {
            if let Some(delay) = self.load_delay {
                tokio::time::sleep(delay).await;
            }
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChannelError::Rejected("script exhausted".into())))
    }
}
