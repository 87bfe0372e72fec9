//! # Validation Module
//!
//! Input validation for ledger requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (outside this workspace)                           │
//! │  └── Deserialization into request types                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Ranges, required fields, lengths                                  │
//! │  └── Runs before the ledger opens a database transaction               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE / CHECK / foreign key constraints                          │
//! │  └── Triggers keeping history append-only                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Existence checks (does this product exist?) need the database and happen
//! in the ledger, inside the unit of work.
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("RICE-5KG").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Rate;
use crate::request::{
    DiscountSpec, LineItem, NewCategory, NewClient, NewPayment, NewProduct, StockAdjustment,
    TransactionRequest, TransactionUpdate,
};
use crate::types::{StockDirection, TransactionStatus};
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS, MAX_MONEY_CENTS, MAX_NOTE_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, digits, hyphens and underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("RICE-5KG").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, client, category).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an optional free-text field against [`MAX_NOTE_LENGTH`].
pub fn validate_note(field: &str, note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(text) if text.len() > MAX_NOTE_LENGTH => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LENGTH,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_ITEM_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::out_of_range("quantity", 1, MAX_ITEM_QUANTITY));
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - Must not exceed [`MAX_MONEY_CENTS`]
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("price", 1099).is_ok());
/// assert!(validate_price_cents("price", 0).is_ok());
/// assert!(validate_price_cents("price", -100).is_err());
/// assert!(validate_price_cents("price", i64::MAX).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_MONEY_CENTS).contains(&cents) {
        return Err(ValidationError::out_of_range(field, 0, MAX_MONEY_CENTS));
    }

    Ok(())
}

/// Validates a rate in basis points: 0 to 10000 (0% to 100%).
pub fn validate_rate_bps(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate > Rate::FULL {
        return Err(ValidationError::out_of_range(field, 0, Rate::FULL.bps() as i64));
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("product_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("product_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates the line items of a transaction request.
///
/// ## Rules
/// - At least one item, at most [`MAX_LINE_ITEMS`]
/// - Every product id is a UUID
/// - Every quantity is positive, every unit price within [`validate_price_cents`]
pub fn validate_line_items(items: &[LineItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    if items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::out_of_range("items", 1, MAX_LINE_ITEMS as i64));
    }

    for item in items {
        validate_uuid("product_id", &item.product_id)?;
        validate_quantity(item.quantity)?;
        validate_price_cents("unit_price", item.unit_price.cents())?;
    }

    Ok(())
}

/// Validates a discount spec: percentages up to 100%, fixed amounts >= 0.
pub fn validate_discount(discount: &DiscountSpec) -> ValidationResult<()> {
    match discount {
        DiscountSpec::Percentage(rate) => validate_rate_bps("discount_value", *rate),
        DiscountSpec::Fixed(amount) => validate_price_cents("discount_value", amount.cents()),
    }
}

/// Validates a transaction request before posting.
///
/// A request may not be created as `cancelled`: cancellation is its own
/// operation so it can write compensating entries.
pub fn validate_transaction_request(req: &TransactionRequest) -> ValidationResult<()> {
    if let Some(client_id) = &req.client_id {
        validate_uuid("client_id", client_id)?;
    }

    if req.status == TransactionStatus::Cancelled {
        return Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["pending".to_string(), "completed".to_string()],
        });
    }

    validate_note("notes", req.notes.as_deref())?;
    validate_line_items(&req.items)?;

    if let Some(discount) = &req.discount {
        validate_discount(discount)?;
    }
    if let Some(vat) = &req.vat {
        validate_rate_bps("vat_rate", vat.rate)?;
    }

    for (field, amount) in [
        ("discount_amount", req.discount_amount),
        ("vat_amount", req.vat_amount),
        ("total_amount", req.total_amount),
    ] {
        if let Some(amount) = amount {
            validate_price_cents(field, amount.cents())?;
        }
    }

    Ok(())
}

/// Validates a transaction update. Cancelling goes through its own operation.
pub fn validate_transaction_update(update: &TransactionUpdate) -> ValidationResult<()> {
    if update.status == Some(TransactionStatus::Cancelled) {
        return Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["pending".to_string(), "completed".to_string()],
        });
    }

    validate_note("notes", update.notes.as_deref())
}

/// Validates a manual stock change.
///
/// `in`/`out` need a positive quantity; an `adjustment` is a counted level
/// and may be zero.
pub fn validate_stock_adjustment(adj: &StockAdjustment) -> ValidationResult<()> {
    match adj.direction {
        StockDirection::In | StockDirection::Out => validate_quantity(adj.quantity)?,
        StockDirection::Adjustment => {
            if !(0..=MAX_ITEM_QUANTITY).contains(&adj.quantity) {
                return Err(ValidationError::out_of_range("quantity", 0, MAX_ITEM_QUANTITY));
            }
        }
    }

    validate_note("reason", adj.reason.as_deref())
}

/// Validates a payment: positive amount up to [`MAX_MONEY_CENTS`], method given.
pub fn validate_payment(payment: &NewPayment) -> ValidationResult<()> {
    if !payment.amount.is_positive() {
        return Err(ValidationError::must_be_positive("amount"));
    }
    if payment.amount.cents() > MAX_MONEY_CENTS {
        return Err(ValidationError::out_of_range("amount", 1, MAX_MONEY_CENTS));
    }

    if payment.method.trim().is_empty() {
        return Err(ValidationError::required("method"));
    }

    validate_note("notes", payment.notes.as_deref())
}

pub fn validate_new_category(category: &NewCategory) -> ValidationResult<()> {
    validate_name("name", &category.name)?;
    validate_note("description", category.description.as_deref())
}

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_uuid("category_id", &product.category_id)?;
    validate_name("name", &product.name)?;
    validate_sku(&product.sku)?;
    validate_price_cents("price", product.price.cents())?;
    validate_price_cents("cost", product.cost.cents())?;

    if !(0..=MAX_ITEM_QUANTITY).contains(&product.stock_quantity) {
        return Err(ValidationError::out_of_range("stock_quantity", 0, MAX_ITEM_QUANTITY));
    }
    if product.min_stock_level < 0 {
        return Err(ValidationError::out_of_range("min_stock_level", 0, i64::MAX));
    }

    Ok(())
}

pub fn validate_new_client(client: &NewClient) -> ValidationResult<()> {
    validate_name("name", &client.name)?;
    validate_price_cents("credit_limit", client.credit_limit.cents())?;

    if let Some(email) = &client.email {
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must be an email address".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
