//! The explicit update channel between the core and whatever renders it.
//!
//! The controller and the refresher share one [`Surface`]. It owns the displayed count and pushes
//! every change to registered listeners. Updates are queued and then delivered with no borrow held,
//! so a listener is free to call back into the surface.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use slotmap::SlotMap;

use crate::controller::Outcome;

slotmap::new_key_type! {
    pub struct ListenerKey;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// New value for the displayed RSVP total.
    Count(u64),
    /// A submission finished.
    Outcome(Outcome),
    /// A submission was refused before anything was saved.
    Rejected(String),
    /// Clear the form for the next guest.
    FormReset,
}

type Listener = Rc<dyn Fn(&ViewUpdate)>;

pub struct Surface {
    displayed_count: Cell<u64>,
    listeners: RefCell<SlotMap<ListenerKey, Listener>>,
    pending: RefCell<Vec<ViewUpdate>>,
}

impl Surface {
    pub fn new(initial_count: u64) -> Rc<Self> {
        Rc::new(Self {
            displayed_count: Cell::new(initial_count),
            listeners: RefCell::new(SlotMap::with_key()),
            pending: RefCell::new(Vec::new()),
        })
    }

    pub fn displayed_count(&self) -> u64 {
        self.displayed_count.get()
    }

    pub fn register_listener(&self, listener: impl Fn(&ViewUpdate) + 'static) -> ListenerKey {
        self.listeners.borrow_mut().insert(Rc::new(listener))
    }

    pub fn unregister_listener(&self, key: ListenerKey) {
        self.listeners.borrow_mut().remove(key);
    }

    pub fn set_count(&self, count: u64) {
        self.displayed_count.set(count);
        self.push(ViewUpdate::Count(count));
    }

    pub fn show_outcome(&self, outcome: Outcome) {
        self.push(ViewUpdate::Outcome(outcome));
    }

    pub fn reject(&self, message: impl Into<String>) {
        self.push(ViewUpdate::Rejected(message.into()));
    }

    pub fn reset_form(&self) {
        self.push(ViewUpdate::FormReset);
    }

    fn push(&self, update: ViewUpdate) {
        self.pending.borrow_mut().push(update);
        self.flush();
    }

    fn flush(&self) {
        loop {
            // take everything out first; listeners may push more while we call them
            let updates = std::mem::take(&mut *self.pending.borrow_mut());
            if updates.is_empty() {
                return;
            }
            let listeners: Vec<Listener> = self.listeners.borrow().values().cloned().collect();
            for update in &updates {
                for listener in &listeners {
                    listener(update);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_see_updates_until_unregistered() {
        let surface = Surface::new(3);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let key = surface.register_listener({
            let seen = seen.clone();
            move |update| seen.borrow_mut().push(update.clone())
        });

        surface.set_count(4);
        surface.reset_form();
        surface.unregister_listener(key);
        surface.set_count(5);

        assert_eq!(
            *seen.borrow(),
            vec![ViewUpdate::Count(4), ViewUpdate::FormReset]
        );
        assert_eq!(surface.displayed_count(), 5);
    }

    #[test]
    fn listener_may_call_back_into_surface() {
        let surface = Surface::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        surface.register_listener({
            let surface = Rc::downgrade(&surface);
            let seen = seen.clone();
            move |update| {
                seen.borrow_mut().push(update.clone());
                if let (ViewUpdate::Rejected(_), Some(surface)) = (update, surface.upgrade()) {
                    surface.reset_form();
                }
            }
        });

        surface.reject("nope");

        assert_eq!(
            *seen.borrow(),
            vec![ViewUpdate::Rejected("nope".to_string()), ViewUpdate::FormReset]
        );
    }
}
