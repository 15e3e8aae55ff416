//! Reactive state cells.
//!
//! [`StateCell`] holds one value behind a [`tokio::sync::watch`] channel.
//! Writers go through [`set`](StateCell::set) or [`update`](StateCell::update);
//! a value structurally equal to the current one is discarded without waking
//! subscribers, so per-second timer pushes that change nothing cost no
//! re-render downstream.
//!
//! The session keeps its Room State in a `StateCell<Option<Room>>`.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

/// A versioned, observable value with deep-equality short-circuit.
///
/// # Example
///
/// ```
/// use matchday_client::store::StateCell;
///
/// let cell = StateCell::new(1);
/// let rx = cell.subscribe();
/// assert!(!cell.set(1));
/// assert!(!rx.has_changed().unwrap_or(true));
/// assert!(cell.update(|n| n + 1));
/// assert_eq!(cell.get(), 2);
/// assert_eq!(cell.version(), 1);
/// ```
#[derive(Debug)]
pub struct StateCell<T> {
    tx: watch::Sender<T>,
    version: AtomicU64,
}

impl<T: Clone + PartialEq> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            version: AtomicU64::new(0),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Replace the value. Returns `true` if it changed.
    pub fn set(&self, next: T) -> bool {
        self.update(move |_| next)
    }

    /// Compute the next value from the previous one. Returns `true` if it changed.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            let next = f(current);
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        changed
    }

    /// Number of accepted changes since creation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Receiver woken once per accepted change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq + Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::protocol::Room;

    #[test]
    fn equal_value_does_not_signal() {
        let mut room = Room::new("R1", 2);
        room.game_state = Some(serde_json::json!({"timer": 10}));
        let cell = StateCell::new(Some(room.clone()));
        let rx = cell.subscribe();

        assert!(!cell.set(Some(room.clone())));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(cell.version(), 0);

        assert!(cell.set(Some(room.with_timer(9))));
        assert!(rx.has_changed().unwrap());
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn update_sees_previous_value() {
        let cell = StateCell::new(vec![1, 2]);
        cell.update(|prev| {
            let mut next = prev.clone();
            next.push(3);
            next
        });
        assert_eq!(cell.get(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn subscriber_wakes_once_per_change() {
        let cell = StateCell::<Option<u32>>::default();
        let mut rx = cell.subscribe();

        cell.set(Some(1));
        cell.set(Some(1));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(1));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn with_borrows_in_place() {
        let cell = StateCell::new(String::from("lobby"));
        assert_eq!(cell.with(String::len), 5);
    }
}
