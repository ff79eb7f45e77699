//! # Submission flow
//!
//! ```text
//! Idle -> validate -> resolve key -> upsert locally -> refresh count -> publish -> Done
//! ```
//!
//! [`RsvpController::commit`] runs everything up to and including the count refresh, synchronously.
//! Once it returns `Ok`, the record is saved on this device no matter what the network does. The
//! returned [`PendingPublish`] holds the remote half: sending the record, reporting the outcome and
//! clearing the form. [`RsvpController::submit`] does both, spawning the remote half on the local
//! task set so the caller is never blocked on the network.

use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use tokio::task::JoinHandle;

use crate::{
    data_model::{Attendance, RsvpForm, RsvpRecord, key},
    remote::Aggregator,
    store::{RecordStore, StorageBackend, StorageError},
    surface::Surface,
};

pub const VALIDATION_MESSAGE: &str = "Please provide at least a name or contact";
pub const ATTENDING_MESSAGE: &str = "We're thrilled you can make it! Bring your dancing shoes!";
pub const NOT_ATTENDING_MESSAGE: &str =
    "We'll miss your sparkle but understand. Check out the Gallery & celebrate with us virtually!";
pub const UNDECIDED_MESSAGE: &str =
    "Maybe means 'You need more time to practice your dance moves' right?";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{}", VALIDATION_MESSAGE)]
    Validation,

    #[error("Your RSVP could not be saved on this device: {0}")]
    Storage(#[from] StorageError),
}

/// What the guest is told once a submission has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub attendance: Attendance,
    /// Keyed purely by attendance. Present whether or not the publish went through.
    pub message: &'static str,
    /// Only set when the record could not be sent to the aggregator.
    pub trouble_notice: Option<String>,
}

impl Outcome {
    pub fn new(attendance: Attendance, publish_failed: bool, contact: Option<&str>) -> Self {
        let message = match attendance {
            Attendance::Yes => ATTENDING_MESSAGE,
            Attendance::No => NOT_ATTENDING_MESSAGE,
            Attendance::Maybe | Attendance::Unset => UNDECIDED_MESSAGE,
        };
        Self {
            attendance,
            message,
            trouble_notice: publish_failed.then(|| trouble_notice(contact)),
        }
    }

    /// The message to put in front of the guest: the trouble notice if there is one.
    pub fn headline(&self) -> &str {
        self.trouble_notice.as_deref().unwrap_or(self.message)
    }

    pub fn published(&self) -> bool {
        self.trouble_notice.is_none()
    }
}

pub fn trouble_notice(contact: Option<&str>) -> String {
    match contact {
        Some(contact) => format!(
            "We're having trouble with your RSVP submission. Please try again or contact us at {contact}."
        ),
        None => {
            "We're having trouble with your RSVP submission. Please try again or contact us."
                .to_string()
        }
    }
}

pub struct RsvpController<B: StorageBackend, A: Aggregator> {
    store: Rc<RefCell<RecordStore<B>>>,
    aggregator: Rc<A>,
    surface: Rc<Surface>,
    contact: Option<String>,
}

impl<B: StorageBackend, A: Aggregator> RsvpController<B, A> {
    /// The displayed count starts out as the number of records already on this device.
    pub fn new(store: RecordStore<B>, aggregator: Rc<A>) -> Self {
        let surface = Surface::new(store.count() as u64);
        Self {
            store: Rc::new(RefCell::new(store)),
            aggregator,
            surface,
            contact: None,
        }
    }

    /// Contact detail appended to the trouble notice.
    pub fn with_contact(self, contact: Option<String>) -> Self {
        Self { contact, ..self }
    }

    pub fn surface(&self) -> Rc<Surface> {
        self.surface.clone()
    }

    pub fn store(&self) -> Ref<'_, RecordStore<B>> {
        self.store.borrow()
    }

    /// Validate, resolve the identity key, save locally and refresh the displayed count.
    ///
    /// Nothing is mutated unless this returns `Ok`.
    pub fn commit(&self, form: RsvpForm) -> Result<PendingPublish<A>, SubmitError> {
        let record = RsvpRecord::from_form(form);

        let has_identity =
            !record.name.is_empty() || record.phone.is_some() || record.email.is_some();
        if !has_identity {
            self.surface.reject(VALIDATION_MESSAGE);
            return Err(SubmitError::Validation);
        }

        let key = match key::resolve(&record) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Submission passed validation but has no identity: {e}");
                self.surface.reject(VALIDATION_MESSAGE);
                return Err(SubmitError::Validation);
            }
        };

        let count = {
            let mut store = self.store.borrow_mut();
            if let Err(e) = store.upsert(key.clone(), record.clone()) {
                drop(store);
                let err = SubmitError::Storage(e);
                self.surface.reject(err.to_string());
                return Err(err);
            }
            store.count()
        };
        log::info!("Saved RSVP for `{key}` locally ({count} on this device)");

        self.surface.set_count(count as u64);

        Ok(PendingPublish {
            record: record.with_key(key),
            aggregator: self.aggregator.clone(),
            surface: self.surface.clone(),
            contact: self.contact.clone(),
        })
    }
}

impl<B: StorageBackend, A: Aggregator + 'static> RsvpController<B, A> {
    /// Commit locally, then publish in the background.
    ///
    /// Must be called from within a [`tokio::task::LocalSet`]. The handle can be ignored; it is
    /// there for callers that want to wait for the outcome (e.g. before exiting).
    pub fn submit(&self, form: RsvpForm) -> Result<JoinHandle<Outcome>, SubmitError> {
        let pending = self.commit(form)?;
        Ok(tokio::task::spawn_local(pending.publish()))
    }
}

/// A submission that is saved locally and not yet sent.
pub struct PendingPublish<A: Aggregator> {
    record: RsvpRecord,
    aggregator: Rc<A>,
    surface: Rc<Surface>,
    contact: Option<String>,
}

impl<A: Aggregator> PendingPublish<A> {
    pub fn record(&self) -> &RsvpRecord {
        &self.record
    }

    /// Send the record, report the outcome and reset the form.
    ///
    /// A failed send never undoes the local commit; it only adds the trouble notice.
    pub async fn publish(self) -> Outcome {
        let publish_failed = match self.aggregator.publish(&self.record).await {
            Ok(_) => false,
            Err(e) => {
                log::warn!("Error submitting RSVP for `{}`: {e}", self.record.key);
                true
            }
        };

        let outcome = Outcome::new(
            self.record.attendance,
            publish_failed,
            self.contact.as_deref(),
        );
        self.surface.show_outcome(outcome.clone());
        self.surface.reset_form();
        outcome
    }
}
