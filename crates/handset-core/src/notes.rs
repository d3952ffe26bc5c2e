//! # Note Tags
//!
//! Some facts needed to undo an operation are only recorded in free-text
//! notes: the store credit a sale consumed, and which swap registered a
//! trade-in unit. Both the writer and the reader of those tags live here so
//! the format cannot drift.
//!
//! ```text
//! Sale.notes           "Paid partly in credit\nCredit: NLe 150.00"
//!                                              └──── parse_applied_credit ─► 150.00
//!
//! InventoryItem.notes  "Swap trade-in: SWP-240101-101500-0042"
//!                                      └──── is_trade_in_from(.., "SWP-...0042") ─► true
//! ```

use crate::money::Money;
use crate::types::{PaymentMethod, Sale, SaleItem};

const CREDIT_LABEL: &str = "credit:";
const TRADE_IN_LABEL: &str = "Swap trade-in:";
const EXCHANGE_LABEL: &str = "Exchange:";

// =============================================================================
// Credit Note
// =============================================================================

/// Formats the credit tag appended to a sale's notes.
pub fn format_credit_note(currency: &str, amount: Money) -> String {
    format!("Credit: {} {}", currency, amount)
}

/// Reads the store credit recorded by [`format_credit_note`].
///
/// The label match is case-insensitive and the currency token is optional,
/// so `"credit: 12.50"` and `"Credit: NLe 1,200.00"` both parse. The first
/// tag carrying a readable amount wins.
pub fn parse_applied_credit(notes: &str) -> Option<Money> {
    let lowered = notes.to_ascii_lowercase();

    lowered.match_indices(CREDIT_LABEL).find_map(|(pos, _)| {
        let rest = notes[pos + CREDIT_LABEL.len()..].trim_start();
        let rest = match rest.chars().next() {
            Some(c) if c.is_alphabetic() => rest
                .trim_start_matches(|c: char| c.is_alphabetic())
                .trim_start(),
            _ => rest,
        };
        let amount: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
            .collect();
        Money::parse(amount.trim_end_matches(&['.', ','][..]))
    })
}

/// Store credit to give back when a sale is undone.
///
/// The note wins over the sale total: the total may have been edited since,
/// and only part of it may have been paid in credit.
pub fn credit_to_restore(sale: &Sale) -> Option<Money> {
    let from_note = sale.notes.as_deref().and_then(parse_applied_credit);
    let amount = match from_note {
        Some(amount) => amount,
        None if sale.payment_method == PaymentMethod::Credit => sale.total(),
        None => return None,
    };
    Some(amount).filter(Money::is_positive)
}

/// Drops every line [`parse_applied_credit`] would read, leaving the rest.
///
/// Returns `None` when nothing but the tag was there.
pub fn strip_credit_note(notes: Option<&str>) -> Option<String> {
    let kept: Vec<&str> = notes?
        .lines()
        .filter(|line| parse_applied_credit(line).is_none())
        .collect();
    Some(kept.join("\n")).filter(|s| !s.trim().is_empty())
}

/// Appends a line to existing notes.
pub fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing.map(str::trim_end).filter(|s| !s.is_empty()) {
        Some(existing) => format!("{}\n{}", existing, line),
        None => line.to_string(),
    }
}

// =============================================================================
// Swap Trade-In Tag
// =============================================================================

/// Tag written into the notes of a unit registered by a swap.
pub fn trade_in_tag(swap_number: &str) -> String {
    format!("{} {}", TRADE_IN_LABEL, swap_number)
}

/// Whether `notes` carry the trade-in tag of exactly this swap.
///
/// Token match, so `SWP-1` does not claim a unit tagged `SWP-12`.
pub fn is_trade_in_from(notes: &str, swap_number: &str) -> bool {
    if swap_number.is_empty() {
        return false;
    }
    notes.match_indices(TRADE_IN_LABEL).any(|(pos, _)| {
        notes[pos + TRADE_IN_LABEL.len()..]
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '|'))
            .find(|token| !token.is_empty())
            == Some(swap_number)
    })
}

// =============================================================================
// Exchange Note
// =============================================================================

/// Describes exchange goods for manual reconciliation.
///
/// ```rust
/// use handset_core::notes::exchange_note;
/// use handset_core::{Money, SaleItem};
///
/// let mut item = SaleItem::new("p-7", 1, Money::zero()).with_imeis(["123456789012345"]);
/// item.product_name = "iPhone 12".to_string();
/// assert_eq!(exchange_note(&[item]), "Exchange: iPhone 12 x1 [IMEI 123456789012345]");
/// ```
pub fn exchange_note(items: &[SaleItem]) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|item| {
            let name = if item.product_name.trim().is_empty() {
                item.product_id.as_str()
            } else {
                item.product_name.trim()
            };
            if item.imeis.is_empty() {
                format!("{} x{}", name, item.quantity)
            } else {
                format!("{} x{} [IMEI {}]", name, item.quantity, item.imeis.join(", "))
            }
        })
        .collect();
    format!("{} {}", EXCHANGE_LABEL, parts.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sale(total: i64, method: PaymentMethod, notes: Option<&str>) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s-1".to_string(),
            sale_number: "INV-1".to_string(),
            customer_id: Some("c-1".to_string()),
            cashier_id: None,
            items: vec![],
            subtotal_cents: total,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: total,
            status: Default::default(),
            payment_method: method,
            notes: notes.map(str::to_string),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_credit_note_format_and_parse() {
        let note = format_credit_note("NLe", Money::from_cents(15_000));
        assert_eq!(note, "Credit: NLe 150.00");
        assert_eq!(parse_applied_credit(&note), Some(Money::from_cents(15_000)));
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(
            parse_applied_credit("walk-in\ncredit: 12.5"),
            Some(Money::from_cents(1_250))
        );
        assert_eq!(
            parse_applied_credit("Credit: NLe 1,200.00."),
            Some(Money::from_cents(120_000))
        );
        assert_eq!(parse_applied_credit("Credit: NLe soon"), None);
        assert_eq!(parse_applied_credit("no tag here"), None);
    }

    #[test]
    fn test_restore_prefers_note_over_total() {
        let s = sale(40_000, PaymentMethod::Credit, Some("Credit: NLe 150.00"));
        assert_eq!(credit_to_restore(&s), Some(Money::from_cents(15_000)));
    }

    #[test]
    fn test_restore_falls_back_to_total_for_credit_sales() {
        let s = sale(40_000, PaymentMethod::Credit, Some("thanks"));
        assert_eq!(credit_to_restore(&s), Some(Money::from_cents(40_000)));

        let cash = sale(40_000, PaymentMethod::Cash, None);
        assert_eq!(credit_to_restore(&cash), None);
    }

    #[test]
    fn test_restore_never_negative() {
        let s = sale(0, PaymentMethod::Cash, Some("Credit: NLe -5.00"));
        assert_eq!(credit_to_restore(&s), None);
    }

    #[test]
    fn test_append_note() {
        assert_eq!(append_note(None, "a"), "a");
        assert_eq!(append_note(Some("  "), "a"), "a");
        assert_eq!(append_note(Some("x\n"), "a"), "x\na");
    }

    #[test]
    fn test_strip_credit_note_keeps_other_lines() {
        let notes = append_note(Some("walk-in\nbox damaged"), "Credit: NLe 40.00");
        assert_eq!(
            strip_credit_note(Some(&notes)).as_deref(),
            Some("walk-in\nbox damaged")
        );
        assert_eq!(strip_credit_note(Some("Credit: NLe 40.00")), None);
        assert_eq!(strip_credit_note(None), None);
        assert_eq!(strip_credit_note(Some("thanks")).as_deref(), Some("thanks"));
    }

    #[test]
    fn test_trade_in_tag_exact_match() {
        let notes = append_note(Some("scratched"), &trade_in_tag("SWP-12"));
        assert!(is_trade_in_from(&notes, "SWP-12"));
        assert!(!is_trade_in_from(&notes, "SWP-1"));
        assert!(!is_trade_in_from(&notes, "SWP-123"));
        assert!(!is_trade_in_from("bought from SWP-12", "SWP-12"));
        assert!(!is_trade_in_from(&notes, ""));
    }

    #[test]
    fn test_exchange_note_without_names() {
        let item = SaleItem::new("p-9", 2, Money::zero());
        assert_eq!(exchange_note(&[item]), "Exchange: p-9 x2");
    }
}
