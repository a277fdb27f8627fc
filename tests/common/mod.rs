//! Shared fixtures: an in-memory resource kind with scriptable failures.

#![allow(dead_code)]

use async_trait::async_trait;
use klang_rs::engine::{BrokerConfig, DurableStore, GenerationBackend, Pipeline, ResourceKind};
use klang_rs::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// String in, string out.
pub struct Words;

impl ResourceKind for Words {
    const NAME: &'static str = "words";
    type Key = String;
    type Input = String;
    type Generated = String;
    type Record = String;
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
    pub persists: AtomicUsize,
    /// Accept persists without keeping them.
    forgetful: bool,
    fail_persist_next: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn forgetful() -> Self {
        Self {
            forgetful: true,
            ..Self::default()
        }
    }

    /// The next persist of `key` fails with a store error.
    pub fn fail_persist_once(self, key: &str) -> Self {
        self.fail_persist_next
            .lock()
            .unwrap()
            .insert(key.to_string());
        self
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn persists(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore<Words> for MemoryStore {
    async fn lookup(&self, key: &String) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn persist(&self, key: &String, generated: String) -> Result<()> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        if self.fail_persist_next.lock().unwrap().remove(key) {
            return Err(Error::Store(format!("disk full while writing {key}")));
        }
        if !self.forgetful {
            self.records.lock().unwrap().insert(key.clone(), generated);
        }
        Ok(())
    }
}

/// Backend that records what it was asked for.
///
/// With a gate, every call waits for a permit, so tests decide when
/// generation finishes. Keys in `fail_next` / `panic_next` misbehave once.
pub struct ScriptedBackend {
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
    delay: Duration,
    fail_next: Mutex<HashSet<String>>,
    panic_next: Mutex<HashSet<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            gate: None,
            delay: Duration::ZERO,
            fail_next: Mutex::new(HashSet::new()),
            panic_next: Mutex::new(HashSet::new()),
        }
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_once(self, key: &str) -> Self {
        self.fail_next.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn panic_once(self, key: &str) -> Self {
        self.panic_next.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationBackend<Words> for ScriptedBackend {
    async fn generate(&self, input: &String) -> Result<String> {
        self.calls.lock().unwrap().push(input.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let panics = self.panic_next.lock().unwrap().remove(input);
        if panics {
            panic!("backend blew up on {input}");
        }
        let fails = self.fail_next.lock().unwrap().remove(input);
        if fails {
            return Err(Error::Backend(format!("provider rejected {input}")));
        }
        Ok(format!("generated:{input}"))
    }
}

pub fn config(capacity: usize) -> BrokerConfig {
    BrokerConfig {
        queue_capacity: capacity,
        restart_cooldown: Duration::from_millis(10),
        offload_workers: 2,
    }
}

pub fn pipeline(
    store: &Arc<MemoryStore>,
    backend: &Arc<ScriptedBackend>,
    capacity: usize,
) -> Arc<Pipeline<Words>> {
    Arc::new(Pipeline::new(
        Arc::clone(store) as Arc<dyn DurableStore<Words>>,
        Arc::clone(backend) as Arc<dyn GenerationBackend<Words>>,
        &config(capacity),
    ))
}

/// Poll until `cond` holds, failing the test after a couple of seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
