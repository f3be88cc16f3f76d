use anyhow::Result;

#[cfg(any(test, feature = "mocks"))]
use std::collections::BTreeMap;

/// Ordered byte-keyed storage engine underneath a ledger.
///
/// `apply` must be atomic: either every change in the batch is visible afterwards or none is.
pub trait State {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    fn apply(&mut self, changes: Vec<(Vec<u8>, Status)>) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Update(Vec<u8>),
    Delete,
}

#[cfg(any(test, feature = "mocks"))]
#[derive(Clone, Default)]
pub struct Memory {
    state: BTreeMap<Vec<u8>, Vec<u8>>,
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.state.get(key).cloned())
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .state
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn apply(&mut self, changes: Vec<(Vec<u8>, Status)>) -> Result<()> {
        for (key, status) in changes {
            match status {
                Status::Update(value) => {
                    self.state.insert(key, value);
                }
                Status::Delete => {
                    self.state.remove(&key);
                }
            }
        }
        Ok(())
    }
}
