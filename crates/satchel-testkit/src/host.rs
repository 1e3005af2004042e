//! An in-memory host engine for testing.
//!
//! Implements [`CallChannel`] with the host's observable semantics in
//! either wire generation, publishing change notifications on an
//! internal [`MemoryBus`]:
//!
//! - `set` always publishes; `delete` publishes only when a key was
//!   removed; `clear` publishes one absent-notice per removed key
//! - `reset` publishes only for keys whose cached value differs from
//!   the default, then restores defaults; with no defaults it behaves
//!   exactly like `clear`
//! - `load`/`reload` and `save` never publish
//!
//! "Disk" is an in-memory snapshot: `save` copies the cache to it,
//! `reload` copies it back, and [`MemoryHost::write_disk`] simulates an
//! external edit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use satchel_channel::{memory::MemoryBus, CallChannel, ChannelError, Result};
use satchel_core::{
    ChangeNotice, HostRequest, HostResponse, Lookup, ResourceId, StoreId, StoreOptions,
    WireGeneration, WireLookup, CHANGE_TOPIC,
};

struct HostStore {
    cache: BTreeMap<String, JsonValue>,
    defaults: Option<BTreeMap<String, JsonValue>>,
    disk: Option<BTreeMap<String, JsonValue>>,
    /// The rid of the live instance, if one is attached.
    live_rid: Option<ResourceId>,
}

impl HostStore {
    fn create(options: &StoreOptions) -> Self {
        let defaults: Option<BTreeMap<String, JsonValue>> = options
            .defaults
            .as_ref()
            .map(|d| d.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        Self {
            cache: defaults.clone().unwrap_or_default(),
            defaults,
            disk: None,
            live_rid: None,
        }
    }
}

#[derive(Default)]
struct HostInner {
    stores: HashMap<String, HostStore>,
    /// rid -> path, for every rid ever issued.
    handles: HashMap<ResourceId, String>,
    /// rids whose slot was freed.
    released: Vec<ResourceId>,
    next_rid: u32,
}

/// In-memory host engine. One per test network.
pub struct MemoryHost {
    generation: WireGeneration,
    bus: Arc<MemoryBus>,
    inner: Mutex<HostInner>,
    unreachable: AtomicBool,
    log: Mutex<Vec<String>>,
}

impl MemoryHost {
    /// A host speaking the given wire generation, with its own bus.
    pub fn new(generation: WireGeneration) -> Arc<Self> {
        Arc::new(Self {
            generation,
            bus: MemoryBus::new(),
            inner: Mutex::new(HostInner::default()),
            unreachable: AtomicBool::new(false),
            log: Mutex::new(Vec::new()),
        })
    }

    /// The event bus this host publishes change notifications on.
    pub fn bus(&self) -> Arc<MemoryBus> {
        Arc::clone(&self.bus)
    }

    /// The host as the call-channel trait object.
    pub fn clone_arc(self: &Arc<Self>) -> Arc<dyn CallChannel> {
        Arc::clone(self) as Arc<dyn CallChannel>
    }

    /// Make every subsequent call fail with `Unreachable`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::Release);
    }

    /// Operation names, in call order.
    pub fn ops(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// How many calls of the given operation arrived.
    pub fn count(&self, op: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|o| *o == op).count()
    }

    /// Replace the persisted snapshot of `path`, as an external editor
    /// would.
    pub fn write_disk(
        &self,
        path: &str,
        entries: impl IntoIterator<Item = (String, JsonValue)>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(store) = inner.stores.get_mut(path) {
            store.disk = Some(entries.into_iter().collect());
        }
    }

    /// The identity change notifications carry for the store at `path`.
    fn publish_id(&self, path: &str, live_rid: Option<ResourceId>) -> StoreId {
        match self.generation {
            WireGeneration::PathAddressed => StoreId::path(path),
            WireGeneration::HandleAddressed => match live_rid {
                Some(rid) => StoreId::handle(rid),
                None => StoreId::path(path),
            },
        }
    }

    fn publish(&self, notices: Vec<ChangeNotice>) {
        for notice in notices {
            let payload = notice
                .to_payload(self.generation)
                .expect("host produced unencodable notice");
            self.bus.publish(CHANGE_TOPIC, &payload);
        }
    }

    fn handle(&self, request: HostRequest) -> Result<(HostResponse, Vec<ChangeNotice>)> {
        let mut inner = self.inner.lock().unwrap();
        let inner = &mut *inner;

        match request {
            HostRequest::Load { path, options } => {
                let existed = inner.stores.contains_key(&path);
                let store = inner
                    .stores
                    .entry(path.clone())
                    .or_insert_with(|| HostStore::create(&options));

                // A live instance wins: its state stays, the new options
                // are inert. Legacy stores stay resident once created.
                let attached = match self.generation {
                    WireGeneration::PathAddressed => existed,
                    WireGeneration::HandleAddressed => store.live_rid.is_some(),
                };

                if !attached {
                    if existed {
                        // Fresh instance over whatever was persisted.
                        let disk = store.disk.take();
                        *store = HostStore::create(&options);
                        store.disk = disk;
                    }
                    if !options.create_new {
                        if let Some(disk) = &store.disk {
                            // Defaults first, then persisted state on top.
                            let mut cache = store.defaults.clone().unwrap_or_default();
                            cache.extend(disk.clone());
                            store.cache = cache;
                        }
                    }
                }

                match self.generation {
                    WireGeneration::PathAddressed => Ok((HostResponse::Ok, Vec::new())),
                    WireGeneration::HandleAddressed => {
                        let rid = match store.live_rid {
                            Some(rid) => rid,
                            None => {
                                let rid = ResourceId::from_raw(inner.next_rid);
                                inner.next_rid += 1;
                                store.live_rid = Some(rid);
                                inner.handles.insert(rid, path);
                                rid
                            }
                        };
                        Ok((HostResponse::Handle(rid), Vec::new()))
                    }
                }
            }

            HostRequest::GetStore { path } => {
                if self.generation == WireGeneration::PathAddressed {
                    return Err(ChannelError::Rejected("unknown operation: get_store".into()));
                }
                let rid = inner.stores.get(&path).and_then(|s| s.live_rid);
                Ok((HostResponse::MaybeHandle(rid), Vec::new()))
            }

            HostRequest::Close { rid } => {
                if self.generation == WireGeneration::PathAddressed {
                    return Err(ChannelError::Rejected("unknown operation: close".into()));
                }
                if inner.released.contains(&rid) {
                    return Err(ChannelError::Rejected(format!(
                        "resource already released: {rid}"
                    )));
                }
                let path = inner
                    .handles
                    .get(&rid)
                    .cloned()
                    .ok_or_else(|| ChannelError::Rejected(format!("unknown resource: {rid}")))?;
                inner.released.push(rid);
                if let Some(store) = inner.stores.get_mut(&path) {
                    if store.live_rid == Some(rid) {
                        store.live_rid = None;
                    }
                }
                Ok((HostResponse::Ok, Vec::new()))
            }

            HostRequest::Set { store, key, value } => {
                let (path, host_store) = resolve(inner, &store, self.generation)?;
                host_store.cache.insert(key.clone(), value.clone());
                let id = self.publish_id(&path, host_store.live_rid);
                let notice = ChangeNotice {
                    store: id,
                    key,
                    lookup: Lookup::Present(value),
                };
                Ok((HostResponse::Ok, vec![notice]))
            }

            HostRequest::Get { store, key } => {
                let (_, host_store) = resolve(inner, &store, self.generation)?;
                let lookup = match host_store.cache.get(&key) {
                    Some(value) => Lookup::Present(value.clone()),
                    None => Lookup::Absent,
                };
                Ok((
                    HostResponse::Lookup(WireLookup::encode(&lookup, self.generation)),
                    Vec::new(),
                ))
            }

            HostRequest::Has { store, key } => {
                let (_, host_store) = resolve(inner, &store, self.generation)?;
                Ok((
                    HostResponse::Flag(host_store.cache.contains_key(&key)),
                    Vec::new(),
                ))
            }

            HostRequest::Delete { store, key } => {
                let (path, host_store) = resolve(inner, &store, self.generation)?;
                let removed = host_store.cache.remove(&key).is_some();
                let mut notices = Vec::new();
                if removed {
                    notices.push(ChangeNotice {
                        store: self.publish_id(&path, host_store.live_rid),
                        key,
                        lookup: Lookup::Absent,
                    });
                }
                Ok((HostResponse::Flag(removed), notices))
            }

            HostRequest::Clear { store } => {
                let (path, host_store) = resolve(inner, &store, self.generation)?;
                let id = self.publish_id(&path, host_store.live_rid);
                let keys: Vec<String> = host_store.cache.keys().cloned().collect();
                host_store.cache.clear();
                let notices = keys
                    .into_iter()
                    .map(|key| ChangeNotice {
                        store: id.clone(),
                        key,
                        lookup: Lookup::Absent,
                    })
                    .collect();
                Ok((HostResponse::Ok, notices))
            }

            HostRequest::Reset { store } => {
                let (path, host_store) = resolve(inner, &store, self.generation)?;
                let id = self.publish_id(&path, host_store.live_rid);
                match host_store.defaults.clone() {
                    Some(defaults) => {
                        let mut notices = Vec::new();
                        for (key, value) in &host_store.cache {
                            if defaults.get(key) != Some(value) {
                                notices.push(ChangeNotice {
                                    store: id.clone(),
                                    key: key.clone(),
                                    lookup: match defaults.get(key) {
                                        Some(default) => Lookup::Present(default.clone()),
                                        None => Lookup::Absent,
                                    },
                                });
                            }
                        }
                        host_store.cache = defaults;
                        Ok((HostResponse::Ok, notices))
                    }
                    None => {
                        // No defaults: behaves exactly like clear.
                        let keys: Vec<String> = host_store.cache.keys().cloned().collect();
                        host_store.cache.clear();
                        let notices = keys
                            .into_iter()
                            .map(|key| ChangeNotice {
                                store: id.clone(),
                                key,
                                lookup: Lookup::Absent,
                            })
                            .collect();
                        Ok((HostResponse::Ok, notices))
                    }
                }
            }

            HostRequest::Keys { store } => {
                let (_, host_store) = resolve(inner, &store, self.generation)?;
                Ok((
                    HostResponse::Keys(host_store.cache.keys().cloned().collect()),
                    Vec::new(),
                ))
            }

            HostRequest::Values { store } => {
                let (_, host_store) = resolve(inner, &store, self.generation)?;
                Ok((
                    HostResponse::Values(host_store.cache.values().cloned().collect()),
                    Vec::new(),
                ))
            }

            HostRequest::Entries { store } => {
                let (_, host_store) = resolve(inner, &store, self.generation)?;
                Ok((
                    HostResponse::Entries(
                        host_store
                            .cache
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    ),
                    Vec::new(),
                ))
            }

            HostRequest::Length { store } => {
                let (_, host_store) = resolve(inner, &store, self.generation)?;
                Ok((
                    HostResponse::Length(host_store.cache.len() as u64),
                    Vec::new(),
                ))
            }

            HostRequest::Reload { store } => {
                let (path, host_store) = resolve(inner, &store, self.generation)?;
                let disk = host_store.disk.clone().ok_or_else(|| {
                    ChannelError::Rejected(format!("nothing persisted for store: {path}"))
                })?;
                host_store.cache = disk;
                Ok((HostResponse::Ok, Vec::new()))
            }

            HostRequest::Save { store } => {
                let (_, host_store) = resolve(inner, &store, self.generation)?;
                host_store.disk = Some(host_store.cache.clone());
                Ok((HostResponse::Ok, Vec::new()))
            }
        }
    }
}

/// Find the store a request addresses, enforcing the active generation's
/// addressing scheme.
fn resolve<'a>(
    inner: &'a mut HostInner,
    store: &StoreId,
    generation: WireGeneration,
) -> Result<(String, &'a mut HostStore)> {
    let path = match store {
        StoreId::Path(path) => {
            if generation == WireGeneration::HandleAddressed {
                return Err(ChannelError::Rejected(
                    "stores are handle-addressed on this host".into(),
                ));
            }
            path.clone()
        }
        StoreId::Handle(rid) => {
            if generation == WireGeneration::PathAddressed {
                return Err(ChannelError::Rejected(
                    "stores are path-addressed on this host".into(),
                ));
            }
            if inner.released.contains(rid) {
                return Err(ChannelError::Rejected(format!(
                    "use of released resource: {rid}"
                )));
            }
            inner
                .handles
                .get(rid)
                .cloned()
                .ok_or_else(|| ChannelError::Rejected(format!("unknown resource: {rid}")))?
        }
    };

    let store = inner
        .stores
        .get_mut(&path)
        .ok_or_else(|| ChannelError::Rejected(format!("no such store: {path}")))?;
    Ok((path, store))
}

#[async_trait]
impl CallChannel for MemoryHost {
    async fn call(&self, request: HostRequest) -> Result<HostResponse> {
        if self.unreachable.load(Ordering::Acquire) {
            return Err(ChannelError::Unreachable("host marked unreachable".into()));
        }
        self.log.lock().unwrap().push(request.op().to_string());

        // Mutate under the lock, publish outside it, so a change
        // handler may issue its own calls.
        let (response, notices) = self.handle(request)?;
        self.publish(notices);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_roundtrip_current_generation() {
        let host = MemoryHost::new(WireGeneration::HandleAddressed);
        let channel = host.clone_arc();

        let rid = match channel
            .call(HostRequest::Load {
                path: "s.json".into(),
                options: StoreOptions::new(),
            })
            .await
            .unwrap()
        {
            HostResponse::Handle(rid) => rid,
            other => panic!("expected handle, got {other:?}"),
        };

        let store = StoreId::handle(rid);
        channel
            .call(HostRequest::Set {
                store: store.clone(),
                key: "x".into(),
                value: json!(1),
            })
            .await
            .unwrap();

        let response = channel
            .call(HostRequest::Get {
                store,
                key: "x".into(),
            })
            .await
            .unwrap();
        match response {
            HostResponse::Lookup(wire) => assert_eq!(wire.decode(), Lookup::Present(json!(1))),
            other => panic!("expected lookup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_released_rid_is_rejected() {
        let host = MemoryHost::new(WireGeneration::HandleAddressed);
        let channel = host.clone_arc();

        let rid = match channel
            .call(HostRequest::Load {
                path: "s.json".into(),
                options: StoreOptions::new(),
            })
            .await
            .unwrap()
        {
            HostResponse::Handle(rid) => rid,
            other => panic!("expected handle, got {other:?}"),
        };

        channel.call(HostRequest::Close { rid }).await.unwrap();

        let err = channel
            .call(HostRequest::Length {
                store: StoreId::handle(rid),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_legacy_host_rejects_handle_operations() {
        let host = MemoryHost::new(WireGeneration::PathAddressed);
        let channel = host.clone_arc();

        let err = channel
            .call(HostRequest::GetStore {
                path: "s.json".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let host = MemoryHost::new(WireGeneration::HandleAddressed);
        host.set_unreachable(true);

        let err = host
            .clone_arc()
            .call(HostRequest::GetStore {
                path: "s.json".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Unreachable(_)));
    }
}
