//! Scripted RPC node for multi-call tests

use crate::infrastructure::rpc::RpcClient;
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Answers each method from a per-method queue and records every call.
///
/// The last queued answer for a method is sticky, so `on` scripts a constant.
#[derive(Default)]
pub struct ScriptedRpc {
    answers: Mutex<HashMap<String, VecDeque<WalletResult<Value>>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: &str, result: Value) -> Self {
        self.push(method, Ok(result));
        self
    }

    pub fn on_error(self, method: &str, message: &str) -> Self {
        self.push(method, Err(WalletError::rpc(method, message)));
        self
    }

    pub fn then(self, method: &str, result: Value) -> Self {
        self.on(method, result)
    }

    fn push(&self, method: &str, answer: WalletResult<Value>) {
        self.answers
            .lock()
            .expect("answers lock")
            .entry(method.to_string())
            .or_default()
            .push_back(answer);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub fn count_of(&self, method: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }
}

#[async_trait]
impl RpcClient for ScriptedRpc {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((method.to_string(), params));
        // Give concurrent callers a chance to interleave, as a real node would
        tokio::task::yield_now().await;
        let mut answers = self.answers.lock().expect("answers lock");
        let queue = answers
            .get_mut(method)
            .ok_or_else(|| WalletError::rpc(method, "unscripted method"))?;
        match queue.len() {
            0 => Err(WalletError::rpc(method, "unscripted method")),
            1 => queue.front().cloned().unwrap_or_else(|| Err(WalletError::rpc(method, "unscripted method"))),
            _ => queue.pop_front().unwrap_or_else(|| Err(WalletError::rpc(method, "unscripted method"))),
        }
    }
}
