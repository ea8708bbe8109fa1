//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Correlation id generation for request-response matching.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generates unique, monotonically increasing request ids.
///
/// Ids start at 1; id 0 is reserved for non-correlated traffic (the HTTP
/// connector's reachability probe). The sequence spans the client's whole
/// lifetime rather than one connection, so a response straggling in from
/// a torn-down connection can never collide with a live call.
///
/// # Thread Safety
///
/// Lock-free; safe to share across tasks.
///
/// # Example
///
/// ```rust
/// use kodi_control::dispatch::RequestIdSequence;
///
/// let ids = RequestIdSequence::new();
/// let first = ids.next();
/// let second = ids.next();
/// assert_eq!(first, 1);
/// assert!(second > first);
/// ```
#[derive(Debug)]
pub struct RequestIdSequence {
    next_id: AtomicU64,
}

impl RequestIdSequence {
    /// Creates a sequence starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates the next id.
    #[must_use]
    pub fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RequestIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_one_and_increments() {
        let ids = RequestIdSequence::new();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_allocation_is_unique() {
        let ids = Arc::new(RequestIdSequence::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ids = Arc::clone(&ids);
            handles.push(tokio::spawn(async move {
                (0..250).map(|_| ids.next()).collect::<Vec<_>>()
            }));
        }

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}

// Made with Bob
