//! Supersession bookkeeping for in-flight store operations.
//!
//! Every supersedable operation claims a slot. A newer claim on the same slot
//! cancels the older one, and a result is only committed while its claim is
//! still the current one for the slot.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::models::DocumentId;

/// Logical lane in which only the newest operation's result matters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Chat,
    Summary,
    Compare,
    Search,
    LegalCheck,
    Upload(DocumentId),
}

/// Claim an operation holds on its slot
#[derive(Debug)]
pub(crate) struct Claim {
    pub slot: Slot,
    pub generation: u64,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct Ticket {
    generation: u64,
    documents: Vec<DocumentId>,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub(crate) struct SlotTable {
    next_generation: u64,
    tickets: HashMap<Slot, Ticket>,
}

impl SlotTable {
    /// Claim `slot` for an operation touching `documents`, cancelling whatever
    /// held it before.
    pub fn issue(&mut self, slot: Slot, documents: Vec<DocumentId>) -> Claim {
        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();

        let previous = self.tickets.insert(
            slot.clone(),
            Ticket {
                generation,
                documents,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        Claim {
            slot,
            generation,
            cancel,
        }
    }

    pub fn is_current(&self, claim: &Claim) -> bool {
        self.tickets
            .get(&claim.slot)
            .is_some_and(|t| t.generation == claim.generation)
    }

    /// Give up a claim. Returns whether it was still current.
    pub fn release(&mut self, claim: &Claim) -> bool {
        if self.is_current(claim) {
            self.tickets.remove(&claim.slot);
            true
        } else {
            false
        }
    }

    /// Cancel whatever currently holds `slot`
    pub fn cancel(&mut self, slot: &Slot) -> bool {
        match self.tickets.remove(slot) {
            Some(ticket) => {
                ticket.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every operation issued against `document_id`
    pub fn cancel_document(&mut self, document_id: &DocumentId) -> usize {
        let stale: Vec<Slot> = self
            .tickets
            .iter()
            .filter(|(_, t)| t.documents.contains(document_id))
            .map(|(slot, _)| slot.clone())
            .collect();

        for slot in &stale {
            self.cancel(slot);
        }
        stale.len()
    }

    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.tickets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_claim_cancels_older() {
        let mut table = SlotTable::default();
        let doc = DocumentId::from("doc");

        let first = table.issue(Slot::Summary, vec![doc.clone()]);
        let second = table.issue(Slot::Summary, vec![doc]);

        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert!(!table.is_current(&first));
        assert!(table.is_current(&second));

        assert!(!table.release(&first));
        assert!(table.release(&second));
        assert_eq!(table.active(), 0);
    }

    #[test]
    fn test_slots_are_independent() {
        let mut table = SlotTable::default();
        let doc = DocumentId::from("doc");

        let chat = table.issue(Slot::Chat, vec![doc.clone()]);
        let summary = table.issue(Slot::Summary, vec![doc]);

        assert!(table.is_current(&chat));
        assert!(table.is_current(&summary));
        assert!(table.cancel(&Slot::Chat));
        assert!(chat.cancel.is_cancelled());
        assert!(!summary.cancel.is_cancelled());
        assert!(!table.cancel(&Slot::Chat));
    }

    #[test]
    fn test_cancel_document_only_touches_that_document() {
        let mut table = SlotTable::default();
        let a = DocumentId::from("a");
        let b = DocumentId::from("b");

        let upload = table.issue(Slot::Upload(a.clone()), vec![a.clone()]);
        let compare = table.issue(Slot::Compare, vec![a.clone(), b.clone()]);
        let chat = table.issue(Slot::Chat, vec![b]);

        assert_eq!(table.cancel_document(&a), 2);
        assert!(upload.cancel.is_cancelled());
        assert!(compare.cancel.is_cancelled());
        assert!(!chat.cancel.is_cancelled());
        assert_eq!(table.active(), 1);
    }
}
