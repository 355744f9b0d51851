use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::discount::{CodeIssue, DiscountCode};

impl Store {
    pub fn add_discount_code(&self, code: DiscountCode) -> Result<(), StoreError> {
        if code.percentage <= Decimal::ZERO || code.percentage > Decimal::ONE_HUNDRED {
            return Err(invalid_percentage(&code));
        }

        match self.code_index.entry(code.code.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                entity: "discount code",
                key: code.code,
            }),
            Entry::Vacant(slot) => {
                slot.insert(code.id);
                self.discount_codes.insert(code.id, code);
                Ok(())
            }
        }
    }

    pub fn find_code(&self, code: &str) -> Option<DiscountCode> {
        let id = *self.code_index.get(code.trim())?;
        self.discount_codes.get(&id).map(|entry| entry.value().clone())
    }

    /// Mark the code used by `order_id` if it is still redeemable at `now`.
    pub fn redeem_code(
        &self,
        code_id: Uuid,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DiscountCode, CodeIssue> {
        let mut code = self
            .discount_codes
            .get_mut(&code_id)
            .ok_or(CodeIssue::NotFound)?;

        if let Some(issue) = code.issue_at(now) {
            return Err(issue);
        }

        code.is_used = true;
        code.redeemed_by = Some(order_id);
        Ok(code.clone())
    }

    pub(crate) fn release_code(&self, code_id: Uuid, order_id: Uuid) {
        if let Some(mut code) = self.discount_codes.get_mut(&code_id) {
            if code.redeemed_by == Some(order_id) {
                code.is_used = false;
                code.redeemed_by = None;
            }
        }
    }

    pub fn list_codes(&self) -> Vec<DiscountCode> {
        let mut codes: Vec<DiscountCode> = self
            .discount_codes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        codes.sort_by(|a, b| a.code.cmp(&b.code));
        codes
    }
}

fn invalid_percentage(code: &DiscountCode) -> StoreError {
    StoreError::Invalid(format!(
        "discount percentage must be in (0, 100], got {}",
        code.percentage
    ))
}
