//! Cache abstraction shared by the rate lookup and anything else that wants
//! short-lived memoization of upstream answers.

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send + Sync,
{
    /// Returns the value for `key` unless it is absent or expired.
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores `value`; `None` ttl keeps it until overwritten.
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
}
