//! Reactive value container.
//!
//! A [`Store`] holds one value and broadcasts every replacement to its
//! observers synchronously, in subscription order. New observers receive the
//! current value immediately. Handles are cheap to clone and share the same
//! underlying value.
//!
//! Replacements and their notifications are serialized across threads, so
//! observers see values in the order they were stored and the last value
//! delivered always matches [`Store::get`]. Calling `set`, `update` or
//! `subscribe` on a store from inside one of its own observers deadlocks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
}

pub struct Store<T> {
    inner: Arc<Mutex<Inner<T>>>,
    /// Held from a replacement until its last observer returns.
    notify: Arc<Mutex<()>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for Store<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Store")
            .field("value", &inner.value)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
    // Observers run outside the lock, so a poisoned guard still holds a whole value.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn serialize(notify: &Mutex<()>) -> MutexGuard<'_, ()> {
    notify.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value,
                next_id: 0,
                observers: Vec::new(),
            })),
            notify: Arc::new(Mutex::new(())),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Register an observer. It is called right away with the current value
    /// and then after every `set`/`update` until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Observer<T> = Arc::new(observer);
        let _delivering = serialize(&self.notify);

        let (id, current) = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, Arc::clone(&observer)));
            (id, inner.value.clone())
        };

        observer(&current);

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).observers.retain(|(other, _)| *other != id);
                }
            })),
        }
    }

    /// Replace the value and notify every observer.
    pub fn set(&self, value: T) {
        self.replace_with(|_| value);
    }

    /// Replace the value with `f(current)` and notify every observer.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.replace_with(f);
    }

    /// Bridge the store into a [`watch`] channel for async consumers.
    ///
    /// Unlike direct observers, a watch receiver only sees the latest value.
    /// The channel stays fed for as long as the returned subscription lives.
    pub fn watch(&self) -> (watch::Receiver<T>, Subscription) {
        let (tx, rx) = watch::channel(self.get());
        let subscription = self.subscribe(move |value| {
            tx.send_replace(value.clone());
        });
        (rx, subscription)
    }

    fn replace_with<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let _delivering = serialize(&self.notify);

        let (snapshot, observers) = {
            let mut inner = lock(&self.inner);
            let next = f(&inner.value);
            inner.value = next;
            let observers: Vec<Observer<T>> = inner
                .observers
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect();
            (inner.value.clone(), observers)
        };

        for observer in &observers {
            observer(&snapshot);
        }
    }
}

/// Handle returned by [`Store::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes the observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
