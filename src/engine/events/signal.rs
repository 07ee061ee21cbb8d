// Observable signal with disposable subscriptions

use std::fmt;

/// Handle returned by [`Signal::subscribe`], used to detach the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Listener<T> {
    id: Subscription,
    once: bool,
    callback: Box<dyn FnMut(&T)>,
}

/// A named event that listeners can subscribe to
///
/// Listeners are called in subscription order. A listener registered with
/// [`Signal::subscribe_once`] is detached right after its first call.
pub struct Signal<T> {
    listeners: Vec<Listener<T>>,
    next_id: u64,
    dispatch_count: u64,
}

impl<T> Signal<T> {
    /// Create a signal with no listeners
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
            dispatch_count: 0,
        }
    }

    /// Attach a listener that stays until unsubscribed
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> Subscription {
        self.attach(callback, false)
    }

    /// Attach a listener that is removed after it fires once
    pub fn subscribe_once(&mut self, callback: impl FnMut(&T) + 'static) -> Subscription {
        self.attach(callback, true)
    }

    fn attach(&mut self, callback: impl FnMut(&T) + 'static, once: bool) -> Subscription {
        let id = Subscription(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            once,
            callback: Box::new(callback),
        });
        id
    }

    /// Detach a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != subscription);
        self.listeners.len() != before
    }

    /// Detach every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Call every listener with the payload
    pub fn dispatch(&mut self, payload: &T) {
        self.dispatch_count += 1;
        for listener in self.listeners.iter_mut() {
            (listener.callback)(payload);
        }
        self.listeners.retain(|l| !l.once);
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// How many times this signal has been dispatched
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .field("dispatch_count", &self.dispatch_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_dispatch_reaches_listeners_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::<u32>::new();

        let a = seen.clone();
        signal.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let b = seen.clone();
        signal.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        signal.dispatch(&7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
        assert_eq!(signal.dispatch_count(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let hits = Rc::new(RefCell::new(0));
        let mut signal = Signal::<()>::new();

        let h = hits.clone();
        let sub = signal.subscribe(move |_| *h.borrow_mut() += 1);
        signal.dispatch(&());
        assert!(signal.unsubscribe(sub));
        assert!(!signal.unsubscribe(sub), "Second unsubscribe should be a no-op");
        signal.dispatch(&());

        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_subscribe_once() {
        let hits = Rc::new(RefCell::new(0));
        let mut signal = Signal::<()>::new();

        let h = hits.clone();
        signal.subscribe_once(move |_| *h.borrow_mut() += 1);
        signal.dispatch(&());
        signal.dispatch(&());

        assert_eq!(*hits.borrow(), 1);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_clear() {
        let mut signal = Signal::<()>::new();
        signal.subscribe(|_| {});
        signal.subscribe(|_| {});
        assert_eq!(signal.listener_count(), 2);

        signal.clear();
        assert_eq!(signal.listener_count(), 0);
    }
}
