// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use futures::{task::AtomicWaker, Future};

#[derive(Default, Debug)]
struct CancellationFlag {
    waker: AtomicWaker,
    set: AtomicBool,
}

impl CancellationFlag {
    fn signal(&self) {
        self.set.store(true, Ordering::SeqCst);
        self.waker.wake();
    }
}

/// A handle that stops a long running wallet operation, such as waiting for inclusion. Clones share the same flag.
///
/// Awaiting the handle completes once [`CancellationHandle::cancel`] was called on any of its clones.
#[derive(Clone, Default, Debug)]
pub struct CancellationHandle {
    flag: Arc<CancellationFlag>,
}

impl CancellationHandle {
    /// Creates a handle that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every operation listening to this handle.
    pub fn cancel(&self) {
        self.flag.signal()
    }

    /// Whether the handle was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.set.load(Ordering::SeqCst)
    }
}

impl Future for CancellationHandle {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.is_cancelled() {
            return Poll::Ready(());
        }

        self.flag.waker.register(cx.waker());

        // Check again after registering, otherwise a cancellation in between is lost.
        if self.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn clones_observe_cancellation() {
        let handle = CancellationHandle::new();
        let listener = handle.clone();
        assert!(!listener.is_cancelled());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });
        tokio::time::timeout(Duration::from_secs(5), listener.clone())
            .await
            .unwrap();
        assert!(listener.is_cancelled());
    }
}
