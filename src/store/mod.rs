//! Ticket store.
//!
//! Owns the ticket collection, enforces the redemption state machine and
//! persists the whole collection to a single JSON file.
//!
//! The backing file is loaded lazily on first access and then kept as an
//! in-memory mirror. Every mutation updates the mirror and synchronously
//! writes the full document back before returning (write-through). A failed
//! write is logged but the in-memory result is still returned, so changes can
//! be lost on restart if the file is not writable.
//!
//! Mutations through one `TicketStore` are applied one at a time. Separate
//! stores (or processes) sharing the same file are not coordinated: whichever
//! write lands last wins.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::model::{Ticket, TicketId};

mod error;
pub use error::{PersistenceError, StoreError, ValidationError};

mod file;
use file::Document;

/// Outcome of a [`TicketStore::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// This call moved the ticket to `Redeemed`.
    Redeemed(Ticket),
    /// The ticket had already been redeemed; it is returned unchanged.
    AlreadyRedeemed(Ticket),
}

impl Redemption {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Redemption::Redeemed(ticket) | Redemption::AlreadyRedeemed(ticket) => ticket,
        }
    }

    pub fn into_ticket(self) -> Ticket {
        match self {
            Redemption::Redeemed(ticket) | Redemption::AlreadyRedeemed(ticket) => ticket,
        }
    }
}

/// File-backed ticket collection.
pub struct TicketStore {
    path: PathBuf,
    /// `None` until the backing file has been loaded.
    mirror: Mutex<Option<Document>>,
}

/// Public API
impl TicketStore {
    /// Create a store backed by `path`. No I/O happens until first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mirror: Mutex::new(None),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return all tickets in storage order.
    pub fn list(&self) -> Result<Vec<Ticket>, StoreError> {
        let mut guard = self.lock();
        let document = self.loaded(&mut guard)?;
        Ok(document.tickets.clone())
    }

    /// Look up a ticket by id.
    pub fn get_by_id(&self, id: &str) -> Result<Option<Ticket>, StoreError> {
        let mut guard = self.lock();
        let document = self.loaded(&mut guard)?;
        Ok(document.tickets.iter().find(|t| t.id == id).cloned())
    }

    /// Issue a new ticket for `name`.
    ///
    /// The name is trimmed and must not be empty.
    pub fn create(&self, name: &str) -> Result<Ticket, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName.into());
        }

        let mut guard = self.lock();
        let document = self.loaded(&mut guard)?;

        let ticket = Ticket::new(Self::fresh_id(document), name.to_string(), Utc::now());
        document.tickets.push(ticket.clone());
        self.persist(document);

        info!(id = %ticket.id, name = %ticket.name, "ticket created");
        Ok(ticket)
    }

    /// Redeem a ticket.
    ///
    /// Redeeming an already redeemed ticket is a no-op that returns the
    /// ticket unchanged. Use [`scan`](Self::scan) to tell the two cases apart.
    pub fn redeem(&self, id: &str) -> Result<Ticket, StoreError> {
        self.scan(id).map(Redemption::into_ticket)
    }

    /// Redeem a ticket, reporting whether this call performed the transition.
    pub fn scan(&self, id: &str) -> Result<Redemption, StoreError> {
        let mut guard = self.lock();
        let document = self.loaded(&mut guard)?;

        let ticket = document
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !ticket.redeem(Utc::now()) {
            info!(id = %ticket.id, name = %ticket.name, "ticket already redeemed");
            return Ok(Redemption::AlreadyRedeemed(ticket.clone()));
        }

        let ticket = ticket.clone();
        self.persist(document);

        info!(id = %ticket.id, name = %ticket.name, "ticket redeemed");
        Ok(Redemption::Redeemed(ticket))
    }

    /// Remove a ticket. Returns whether a ticket was actually removed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.lock();
        let document = self.loaded(&mut guard)?;

        let Some(index) = document.tickets.iter().position(|t| t.id == id) else {
            return Ok(false);
        };

        let ticket = document.tickets.remove(index);
        self.persist(document);

        info!(id = %ticket.id, name = %ticket.name, "ticket deleted");
        Ok(true)
    }
}

/// Private API
impl TicketStore {
    fn lock(&self) -> MutexGuard<'_, Option<Document>> {
        // Mutations run after every fallible step, so a poisoned mirror is consistent.
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the mirror, loading the backing file on first access.
    ///
    /// A missing file is initialized with an empty document. A file that
    /// exists but cannot be read is an error and is retried on next access.
    fn loaded<'a>(
        &self,
        guard: &'a mut MutexGuard<'_, Option<Document>>,
    ) -> Result<&'a mut Document, StoreError> {
        if guard.is_none() {
            let document = match file::read_document(&self.path)? {
                Some(document) => {
                    info!(
                        path = %self.path.display(),
                        tickets = document.tickets.len(),
                        "ticket store loaded"
                    );
                    document
                }
                None => {
                    let document = Document::default();
                    warn!(path = %self.path.display(), "ticket store missing, initializing");
                    self.persist(&document);
                    document
                }
            };
            **guard = Some(document);
        }

        Ok(guard.get_or_insert_with(Document::default))
    }

    /// Write the full document, logging rather than propagating failures.
    fn persist(&self, document: &Document) {
        if let Err(e) = file::write_document(&self.path, document) {
            error!(
                path = %self.path.display(),
                reason = %e,
                "failed to persist tickets, changes will be lost on restart"
            );
        }
    }

    /// Draw a random id not used by any ticket in `document`.
    fn fresh_id(document: &Document) -> TicketId {
        loop {
            let id = Uuid::new_v4().to_string();
            if !document.tickets.iter().any(|t| t.id == id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TicketStatus;
    use std::collections::HashSet;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    fn store() -> (TempDir, TicketStore) {
        let dir = TempDir::new().unwrap();
        let store = TicketStore::new(dir.path().join("data").join("db.json"));
        (dir, store)
    }

    #[test]
    fn new_store_is_empty_and_creates_file() {
        let (_dir, store) = store();
        assert!(!store.path().exists());

        assert!(store.list().unwrap().is_empty());
        assert!(store.path().exists());
    }

    // Create

    #[test]
    fn create_issues_unredeemed_ticket() {
        let (_dir, store) = store();
        let ticket = store.create("Alice").unwrap();

        assert_eq!(ticket.name, "Alice");
        assert_eq!(ticket.status, TicketStatus::Unredeemed);
        assert!(ticket.redeemed_at.is_none());
        assert_eq!(store.get_by_id(&ticket.id).unwrap(), Some(ticket));
    }

    #[test]
    fn create_trims_name() {
        let (_dir, store) = store();
        let ticket = store.create("  Bob  ").unwrap();
        assert_eq!(ticket.name, "Bob");
    }

    #[test]
    fn create_assigns_unique_ids() {
        let (_dir, store) = store();
        let ids: HashSet<_> = (0..50)
            .map(|i| store.create(&format!("guest {i}")).unwrap().id)
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn create_blank_name_fails() {
        let (_dir, store) = store();

        for name in ["", "   ", "\t\n"] {
            let result = store.create(name);
            assert!(matches!(
                result,
                Err(StoreError::Validation(ValidationError::BlankName))
            ));
        }
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn list_keeps_storage_order() {
        let (_dir, store) = store();
        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    // Redeem

    #[test]
    fn redeem_transitions_to_redeemed() {
        let (_dir, store) = store();
        let ticket = store.create("Alice").unwrap();

        let redeemed = store.redeem(&ticket.id).unwrap();
        assert_eq!(redeemed.status, TicketStatus::Redeemed);
        assert!(redeemed.redeemed_at.is_some());
        assert_eq!(redeemed.created_at, ticket.created_at);
    }

    #[test]
    fn redeem_twice_is_idempotent() {
        let (_dir, store) = store();
        let ticket = store.create("Alice").unwrap();

        let first = store.redeem(&ticket.id).unwrap();
        let second = store.redeem(&ticket.id).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.redeemed_at, second.redeemed_at);
    }

    #[test]
    fn scan_distinguishes_repeat_redemption() {
        let (_dir, store) = store();
        let ticket = store.create("Alice").unwrap();

        let first = store.scan(&ticket.id).unwrap();
        assert!(matches!(first, Redemption::Redeemed(_)));

        let second = store.scan(&ticket.id).unwrap();
        assert!(matches!(second, Redemption::AlreadyRedeemed(_)));
        assert_eq!(first.ticket(), second.ticket());
    }

    #[test]
    fn concurrent_scans_redeem_exactly_once() {
        let (_dir, store) = store();
        let ticket = store.create("Alice").unwrap();

        let outcomes: Vec<Redemption> = thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| store.scan(&ticket.id).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let redeemed: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o, Redemption::Redeemed(_)))
            .collect();
        assert_eq!(redeemed.len(), 1);

        // Every caller sees the same redemption timestamp.
        let stamp = redeemed[0].ticket().redeemed_at;
        assert!(stamp.is_some());
        assert!(outcomes.iter().all(|o| o.ticket().redeemed_at == stamp));
    }

    #[test]
    fn redeem_unknown_id_fails() {
        let (_dir, store) = store();
        store.create("Alice").unwrap();

        let result = store.redeem("missing");
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == "missing"));
        assert_eq!(store.get_by_id("missing").unwrap(), None);
    }

    // Delete

    #[test]
    fn delete_removes_ticket() {
        let (_dir, store) = store();
        let ticket = store.create("Alice").unwrap();

        assert!(store.delete(&ticket.id).unwrap());
        assert_eq!(store.get_by_id(&ticket.id).unwrap(), None);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn delete_unknown_id_returns_false() {
        let (_dir, store) = store();
        let ticket = store.create("Alice").unwrap();

        assert!(!store.delete("missing").unwrap());
        assert_eq!(store.list().unwrap(), vec![ticket]);
    }

    // Persistence

    #[test]
    fn mutations_survive_reload() {
        let (dir, store) = store();
        let alice = store.create("Alice").unwrap();
        let bob = store.create("Bob").unwrap();
        let carol = store.create("Carol").unwrap();
        let alice = store.redeem(&alice.id).unwrap();
        store.delete(&carol.id).unwrap();

        let reloaded = TicketStore::new(dir.path().join("data").join("db.json"));
        assert_eq!(reloaded.list().unwrap(), vec![alice, bob]);
    }

    #[test]
    fn loads_existing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        fs::write(
            &path,
            r#"{"tickets":[{"id":"t-1","name":"Alice","status":"UNREDEEMED","createdAt":"2025-03-01T18:30:00.000Z","redeemedAt":null}]}"#,
        )
        .unwrap();

        let store = TicketStore::new(&path);
        let ticket = store.redeem("t-1").unwrap();
        assert_eq!(ticket.name, "Alice");
        assert!(ticket.is_redeemed());
    }

    #[test]
    fn malformed_document_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "not json").unwrap();

        let store = TicketStore::new(&path);
        assert!(matches!(
            store.list(),
            Err(StoreError::Persistence(PersistenceError::Json { .. }))
        ));

        // Not cached: fixing the file makes the store usable again.
        fs::write(&path, r#"{"tickets":[]}"#).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn unreadable_path_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        fs::create_dir(&path).unwrap();
        let store = TicketStore::new(&path);

        assert!(matches!(
            store.list(),
            Err(StoreError::Persistence(PersistenceError::Io { .. }))
        ));
    }

    #[test]
    fn write_failure_after_load_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        let store = TicketStore::new(&path);
        assert!(store.list().unwrap().is_empty());

        // Replace the file with a directory so subsequent writes fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let ticket = store.create("Alice").unwrap();
        assert_eq!(store.get_by_id(&ticket.id).unwrap(), Some(ticket.clone()));
        assert!(store.redeem(&ticket.id).unwrap().is_redeemed());
        assert!(store.delete(&ticket.id).unwrap());
    }
}
