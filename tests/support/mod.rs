//! Test support utilities for cfg-vault integration tests.
//!
//! Library tests build a [`Profiles`] over a temp store with a [`FakeAgent`].
//! CLI tests use [`Test`], which points the binary at a temp home and store
//! and hides any real SSH agent.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use cfg_vault::core::agent::{strip_comment, AgentKey, KeyAgent};
use cfg_vault::core::profiles::Profiles;
use cfg_vault::core::store::Store;
use cfg_vault::error::{CipherError, Result};
use tempfile::TempDir;

/// In-memory agent. Signatures are a pure function of key and namespace.
///
/// Clones share the key list, so a test can remove a key after handing the
/// agent to [`Profiles`].
#[derive(Clone, Default)]
pub struct FakeAgent {
    keys: Rc<RefCell<Vec<String>>>,
}

impl FakeAgent {
    pub fn with_keys(keys: &[&str]) -> Self {
        let agent = Self::default();
        agent
            .keys
            .borrow_mut()
            .extend(keys.iter().map(|k| k.to_string()));
        agent
    }

    pub fn add(&self, key: &str) {
        self.keys.borrow_mut().push(key.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.keys.borrow_mut().retain(|k| k != key);
    }
}

impl KeyAgent for FakeAgent {
    fn list_public_keys(&self) -> Result<Vec<String>> {
        Ok(self.keys.borrow().clone())
    }

    fn sign(&self, public_key: &str, namespace: &str) -> Result<Vec<u8>> {
        let wanted = strip_comment(public_key);
        if self
            .keys
            .borrow()
            .iter()
            .any(|k| strip_comment(k) == wanted)
        {
            Ok(format!("sig:{}:{}", wanted, namespace).into_bytes())
        } else {
            Err(CipherError::KeyDerivation(format!("key not in agent: {}", wanted)).into())
        }
    }
}

/// A store in a temp directory opened with a fake agent.
pub struct Vault {
    pub dir: TempDir,
    pub agent: FakeAgent,
    pub profiles: Profiles,
}

impl Vault {
    pub fn new(keys: &[&str]) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let agent = FakeAgent::with_keys(keys);
        let store = Store::new(dir.path().join("store"));
        let profiles = Profiles::new(store, Box::new(agent.clone()));
        Self {
            dir,
            agent,
            profiles,
        }
    }

    /// Same store, fresh process state (empty key cache).
    pub fn reopen(&mut self) {
        let store = Store::new(self.store_root());
        self.profiles = Profiles::new(store, Box::new(self.agent.clone()));
    }

    pub fn store_root(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    /// Directory used as `~` by runner tests.
    pub fn home(&self) -> PathBuf {
        let home = self.dir.path().join("home");
        std::fs::create_dir_all(&home).expect("failed to create home");
        home
    }
}

pub fn key(line: &str) -> AgentKey {
    AgentKey::parse(line).expect("fixture key must parse")
}

/// Test environment for the `cfg` binary.
///
/// Each test gets its own home directory; the store lives under it.
pub struct Test {
    pub home: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let home = TempDir::new().expect("failed to create temp home");
        Self { home }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.home.path().join("store")
    }
}
