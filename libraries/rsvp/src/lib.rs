//! Local-first RSVP collection for an event page.
//!
//! Guests answer a form. Each answer is saved on the guest's device first and then forwarded to a
//! remote aggregator, which keeps the host-side list and a running total.
//!
//! Syncing strategy:
//! 1. Every answer gets an identity key: its phone number, else its email, else its name.
//! 2. The device keeps one record per key. Answering again overwrites the earlier answer.
//! 3. The full set of records is written to durable storage after every answer, before anything
//!    touches the network. That local write is the point after which the answer counts as saved.
//! 4. The answer is then sent to the aggregator, one-way. Nothing is read back except the total,
//!    which is polled on a timer and shown to the guest.
//!
//! Delivery to the aggregator is at-least-once at best. It may see the same answer more than once
//! and it is up to the aggregator to deduplicate if it cares.
//!
//! Everything here is single-threaded: shared state lives in `Rc<RefCell<_>>` and background work
//! is spawned onto a [`tokio::task::LocalSet`].

pub mod controller;
pub mod data_model;
pub mod refresher;
pub mod remote;
pub mod store;
pub mod surface;

pub use controller::{Outcome, PendingPublish, RsvpController, SubmitError};
pub use data_model::{Attendance, RsvpForm, RsvpRecord};
pub use refresher::{CountRefresher, RefresherHandle};
pub use remote::{Aggregator, HttpAggregator};
pub use store::{FileStorage, MemoryStorage, RecordStore, StorageBackend, StorageError};
pub use surface::{ListenerKey, Surface, ViewUpdate};
