//! Single-threaded reactive value slot.
//!
//! A [`Signal`] owns one value and a list of subscriber callbacks. Writing a
//! value that is equal to the current one (under the signal's equality
//! function) is a no-op: no version bump, no notifications.
//!
//! Subscribers are notified in registration order after the new value has
//! been stored. A callback may read the signal it is subscribed to but must
//! not write to it.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Equality used to decide whether a write changes the value.
pub type Equality<T> = fn(&T, &T) -> bool;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Subscribers<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

pub struct Signal<T> {
    value: RefCell<T>,
    equals: Equality<T>,
    version: Cell<u64>,
    subscribers: Rc<RefCell<Subscribers<T>>>,
}

impl<T: PartialEq + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self::with_equality(value, T::eq)
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal with a custom equality function.
    pub fn with_equality(value: T, equals: Equality<T>) -> Self {
        Self {
            value: RefCell::new(value),
            equals,
            version: Cell::new(0),
            subscribers: Rc::new(RefCell::new(Subscribers {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Borrow the current value without cloning it.
    pub fn peek(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Number of writes that actually changed the value.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Store `value` and notify subscribers if it differs from the current one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.borrow_mut();
            if (self.equals)(&current, &value) {
                return false;
            }
            *current = value;
        }

        self.version.set(self.version.get() + 1);
        self.notify();
        true
    }

    /// Register a callback invoked with the new value after every change.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let mut subs = self.subscribers.borrow_mut();
        let id = subs.next_id;
        subs.next_id += 1;
        subs.entries.push((id, Rc::new(callback)));

        let weak: Weak<RefCell<Subscribers<T>>> = Rc::downgrade(&self.subscribers);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(subs) = weak.upgrade() {
                    subs.borrow_mut().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().entries.len()
    }

    fn notify(&self) {
        // Snapshot so callbacks may subscribe or unsubscribe while we iterate.
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .borrow()
            .entries
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();

        if callbacks.is_empty() {
            return;
        }

        let value = self.value.borrow();
        for cb in callbacks {
            cb(&value);
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.value.borrow())
            .field("version", &self.version.get())
            .finish()
    }
}

/// RAII guard returned by [`Signal::subscribe`].
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Equality for slots holding shared entities: same instance, not same content.
pub fn same_rc<U>(a: &Option<Rc<U>>, b: &Option<Rc<U>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Element-wise [`Rc::ptr_eq`] over two lists of shared entities.
pub fn same_rcs<U>(a: &Vec<Rc<U>>, b: &Vec<Rc<U>>) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Rc::ptr_eq(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(signal: &Signal<i32>) -> (Rc<Cell<usize>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let sub = signal.subscribe({
            let hits = Rc::clone(&hits);
            move |_| hits.set(hits.get() + 1)
        });
        (hits, sub)
    }

    #[test]
    fn test_set_equal_value_is_silent() {
        let signal = Signal::new(1);
        let (hits, _sub) = counter(&signal);

        assert!(!signal.set(1));
        assert_eq!(hits.get(), 0);
        assert_eq!(signal.version(), 0);

        assert!(signal.set(2));
        assert_eq!(hits.get(), 1);
        assert_eq!(signal.version(), 1);
        assert_eq!(signal.get(), 2);
    }

    #[test]
    fn test_custom_equality() {
        // Never equal: every write notifies.
        let signal = Signal::with_equality(5, |_, _| false);
        let (hits, _sub) = counter(&signal);

        signal.set(5);
        signal.set(5);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let signal = Signal::new(0);
        let (hits, sub) = counter(&signal);
        assert_eq!(signal.subscriber_count(), 1);

        drop(sub);
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(3);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_callback_sees_new_value() {
        let signal = Signal::new(String::from("a"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = signal.subscribe({
            let seen = Rc::clone(&seen);
            move |v: &String| seen.borrow_mut().push(v.clone())
        });

        signal.set("b".into());
        signal.set("c".into());
        assert_eq!(*seen.borrow(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(*signal.peek(), "c");
    }

    #[test]
    fn test_same_rc() {
        let a = Rc::new(1);
        let b = Rc::new(1);
        assert!(same_rc(&Some(Rc::clone(&a)), &Some(Rc::clone(&a))));
        assert!(!same_rc(&Some(a), &Some(b)));
        assert!(same_rc::<i32>(&None, &None));
    }
}
