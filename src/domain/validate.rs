use super::Order;

// ============================================================================
// Order Validation
// ============================================================================
//
// Checks run in a fixed order and stop at the first violation, so the error
// a caller sees is deterministic for a given document: identity fields
// first, then delivery, payment, and finally the item list.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("order_uid is required")]
    MissingOrderUid,
    #[error("track_number is required")]
    MissingTrackNumber,
    #[error("entry is required")]
    MissingEntry,
    #[error("delivery name is required")]
    MissingDeliveryName,
    #[error("delivery phone is required")]
    MissingDeliveryPhone,
    #[error("delivery address is required")]
    MissingDeliveryAddress,
    #[error("payment transaction is required")]
    MissingPaymentTransaction,
    #[error("payment amount cannot be negative")]
    NegativePaymentAmount,
    #[error("payment goods_total cannot be negative")]
    NegativeGoodsTotal,
    #[error("items cannot be empty")]
    NoItems,
    #[error("items[{0}].chrt_id is required")]
    MissingChrtId(usize),
    #[error("items[{0}].price cannot be negative")]
    NegativeItemPrice(usize),
}

impl Order {
    /// Checks the aggregate against its admission rules, reporting the first
    /// violation found. A valid order is safe to persist.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.order_uid.is_empty() {
            return Err(ValidationError::MissingOrderUid);
        }
        if self.track_number.is_empty() {
            return Err(ValidationError::MissingTrackNumber);
        }
        if self.entry.is_empty() {
            return Err(ValidationError::MissingEntry);
        }

        if self.delivery.name.is_empty() {
            return Err(ValidationError::MissingDeliveryName);
        }
        if self.delivery.phone.is_empty() {
            return Err(ValidationError::MissingDeliveryPhone);
        }
        if self.delivery.address.is_empty() {
            return Err(ValidationError::MissingDeliveryAddress);
        }

        if self.payment.transaction.is_empty() {
            return Err(ValidationError::MissingPaymentTransaction);
        }
        if self.payment.amount < 0 {
            return Err(ValidationError::NegativePaymentAmount);
        }
        if self.payment.goods_total < 0 {
            return Err(ValidationError::NegativeGoodsTotal);
        }

        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.chrt_id == 0 {
                return Err(ValidationError::MissingChrtId(i));
            }
            if item.price < 0 {
                return Err(ValidationError::NegativeItemPrice(i));
            }
        }

        Ok(())
    }
}
