use tracing::warn;
use uuid::Uuid;

use super::Store;
use crate::models::courier::Reservation;

#[derive(Debug, Clone)]
enum Undo {
    RemoveOrder(Uuid),
    ReleaseCode { code_id: Uuid, order_id: Uuid },
    ReleaseCourier(Reservation),
    RemovePayment(Uuid),
}

pub struct UnitOfWork<'a> {
    store: &'a Store,
    journal: Vec<Undo>,
    claims: Vec<Uuid>,
    committed: bool,
}

impl<'a> UnitOfWork<'a> {
    pub fn begin(store: &'a Store) -> Self {
        Self {
            store,
            journal: Vec::new(),
            claims: Vec::new(),
            committed: false,
        }
    }

    /// Hide `order_id` from the scheduler until this unit of work ends.
    pub fn claim_order(&mut self, order_id: Uuid) {
        self.store.claim_checkout(order_id);
        self.claims.push(order_id);
    }

    pub fn order_inserted(&mut self, order_id: Uuid) {
        self.journal.push(Undo::RemoveOrder(order_id));
    }

    pub fn code_redeemed(&mut self, code_id: Uuid, order_id: Uuid) {
        self.journal.push(Undo::ReleaseCode { code_id, order_id });
    }

    pub fn courier_reserved(&mut self, reservation: Reservation) {
        self.journal.push(Undo::ReleaseCourier(reservation));
    }

    pub fn payment_recorded(&mut self, payment_id: Uuid) {
        self.journal.push(Undo::RemovePayment(payment_id));
    }

    pub fn commit(mut self) {
        self.committed = true;
        self.journal.clear();
    }

    pub fn rollback(mut self) {
        self.undo_all();
    }

    fn undo_all(&mut self) {
        if !self.journal.is_empty() {
            warn!(steps = self.journal.len(), "rolling back checkout");
        }

        while let Some(step) = self.journal.pop() {
            match step {
                Undo::RemoveOrder(order_id) => self.store.remove_order(order_id),
                Undo::ReleaseCode { code_id, order_id } => self.store.release_code(code_id, order_id),
                Undo::ReleaseCourier(reservation) => self.store.release_courier(&reservation),
                Undo::RemovePayment(payment_id) => self.store.remove_payment(payment_id),
            }
        }
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.undo_all();
        }
        for order_id in self.claims.drain(..) {
            self.store.release_checkout(order_id);
        }
    }
}
