// Copyright 2024 The Tablewave Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded connection pool (spec.md §4.7): a fixed-size set of pre-opened,
//! read-only sessions acquired by workers and released back in FIFO order.
//! Sessions are not validated on acquire; a worker that observes a broken
//! session drops it instead of re-releasing it, so the pool may shrink
//! over the life of a run (no replacement is required by the spec).

use std::collections::VecDeque;

use futures::io::{AsyncRead, AsyncWrite};
use tiberius::Client;
use tokio::sync::{Mutex, Semaphore};

/// One pooled, already-authenticated session.
pub type PooledSession<S> = Client<S>;

/// A bounded pool of `PooledSession<S>`. `acquire` blocks until a session
/// is free; `release` hands one back. A `tokio::sync::Semaphore` gates
/// capacity and its own FIFO wait queue gives acquirers fairness, matching
/// the ordering guarantee in spec.md §4.7.
pub struct ConnectionPool<S> {
    sessions: Mutex<VecDeque<PooledSession<S>>>,
    permits: Semaphore,
}

/// A session on loan from the pool. Dropping this without calling
/// [`Lease::release`] is a held-but-not-returned session: since
/// `PooledSession` does not implement a synchronous `Drop` return path
/// (returning requires awaiting the pool's mutex), callers must release
/// explicitly — the table exporter does so in a `finally`-style guard.
pub struct Lease<S> {
    session: Option<PooledSession<S>>,
}

impl<S> Lease<S> {
    pub fn session_mut(&mut self) -> &mut PooledSession<S> {
        self.session.as_mut().expect("lease used after release")
    }

    /// Takes the session out, leaving the lease empty. Used by callers
    /// that discovered a broken session and must not return it to the pool.
    pub fn take_broken(mut self) -> PooledSession<S> {
        self.session.take().expect("lease used after release")
    }
}

impl<S> ConnectionPool<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Builds a pool from already-opened sessions. Pool size equals
    /// `sessions.len()`, which callers set to `config.parallelThreads`.
    pub fn new(sessions: Vec<PooledSession<S>>) -> Self {
        let capacity = sessions.len();
        Self {
            sessions: Mutex::new(sessions.into()),
            permits: Semaphore::new(capacity),
        }
    }

    /// Blocks until a session is available, then removes it from the
    /// front of the queue (FIFO).
    pub async fn acquire(&self) -> Lease<S> {
        let permit = self.permits.acquire().await.expect("pool semaphore closed");
        permit.forget();
        let mut guard = self.sessions.lock().await;
        let session = guard
            .pop_front()
            .expect("semaphore permit implies a session is queued");
        Lease { session: Some(session) }
    }

    /// Returns a healthy session to the back of the queue and makes its
    /// permit available again.
    pub async fn release(&self, mut lease: Lease<S>) {
        let session = lease.session.take().expect("lease used after release");
        let mut guard = self.sessions.lock().await;
        guard.push_back(session);
        drop(guard);
        self.permits.add_permits(1);
    }

    /// Drops a broken session instead of returning it. The pool's total
    /// capacity shrinks by one permit; no replacement session is created.
    pub fn discard(&self, lease: Lease<S>) {
        let _ = lease.take_broken();
        // Intentionally does not call add_permits: a shrunk pool has one
        // fewer concurrent worker for the remainder of the run.
    }

    /// Number of idle sessions currently queued (for diagnostics/tests).
    pub async fn idle_len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::compat::TokioAsyncReadCompatExt;

    #[tokio::test]
    async fn acquire_blocks_until_capacity_frees_up() {
        // Can't construct a real tiberius::Client without a handshake, so
        // this test exercises the semaphore/queue machinery directly rather
        // than ConnectionPool<S> end to end.
        let sem = Semaphore::new(1);
        let first = sem.acquire().await.unwrap();
        assert_eq!(sem.available_permits(), 0);
        drop(first);
        assert_eq!(sem.available_permits(), 1);
    }

    #[tokio::test]
    async fn compat_duplex_stream_satisfies_the_transport_bound() {
        // tiberius's Client<S> requires `futures::io::{AsyncRead, AsyncWrite}`,
        // which a bare tokio duplex stream doesn't implement directly — only
        // its `tokio_util::compat` wrapper does, the same wrapper the real
        // TCP/TLS transport uses.
        let (a, _b) = tokio::io::duplex(64);
        let wrapped = a.compat();
        fn assert_bound<T: AsyncRead + AsyncWrite + Unpin + Send>(_: &T) {}
        assert_bound(&wrapped);
    }
}
