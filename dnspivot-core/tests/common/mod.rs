// In-memory resolver for engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use dnspivot_resolver::{LookupError, Resolver};
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn addrs(list: &[&str]) -> BTreeSet<IpAddr> {
    list.iter().map(|a| ip(a)).collect()
}

type ForwardAnswer = Result<BTreeSet<IpAddr>, LookupError>;

/// Table-driven resolver. Unknown names are NXDOMAIN and unknown addresses
/// have no PTR. A name with several answers returns them in call order and
/// then keeps repeating the last one.
#[derive(Default)]
pub struct TableResolver {
    forward: HashMap<String, Vec<ForwardAnswer>>,
    reverse: HashMap<IpAddr, String>,
    delays: HashMap<String, Duration>,
    unreachable: bool,
    forward_calls: Mutex<HashMap<String, usize>>,
    reverse_calls: Mutex<HashMap<IpAddr, usize>>,
}

impl TableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, name: &str, ips: &[&str]) -> Self {
        self.forward
            .entry(name.to_string())
            .or_default()
            .push(Ok(addrs(ips)));
        self
    }

    pub fn failing(mut self, name: &str, error: LookupError) -> Self {
        self.forward
            .entry(name.to_string())
            .or_default()
            .push(Err(error));
        self
    }

    pub fn ptr(mut self, address: &str, name: &str) -> Self {
        self.reverse.insert(ip(address), name.to_string());
        self
    }

    pub fn slow(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Every query outside the table fails at the transport level.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn forward_calls(&self, name: &str) -> usize {
        self.forward_calls
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn reverse_calls(&self, address: &str) -> usize {
        self.reverse_calls
            .lock()
            .unwrap()
            .get(&ip(address))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_reverse_calls(&self) -> usize {
        self.reverse_calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Resolver for TableResolver {
    async fn resolve_forward(&self, name: &str) -> Result<BTreeSet<IpAddr>, LookupError> {
        let call = {
            let mut calls = self.forward_calls.lock().unwrap();
            let count = calls.entry(name.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };

        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
        if self.unreachable && !self.forward.contains_key(name) {
            return Err(LookupError::Transport("connection refused".to_string()));
        }

        match self.forward.get(name) {
            Some(answers) => answers[call.min(answers.len() - 1)].clone(),
            None => Err(LookupError::NotFound(name.to_string())),
        }
    }

    async fn resolve_reverse(&self, address: IpAddr) -> Result<String, LookupError> {
        *self
            .reverse_calls
            .lock()
            .unwrap()
            .entry(address)
            .or_insert(0) += 1;

        if self.unreachable && !self.reverse.contains_key(&address) {
            return Err(LookupError::Transport("connection refused".to_string()));
        }

        self.reverse
            .get(&address)
            .cloned()
            .ok_or(LookupError::NoPtrRecord(address))
    }
}
