//! Shared monetary helpers.
//!
//! Amounts are whole currency units held as [`Decimal`]. Anything derived
//! from a percentage is rounded back to whole units here so that sums of
//! components always reproduce the totals exactly.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept on every currency amount.
pub const CURRENCY_DECIMAL_PLACES: u32 = 0;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Largest amount accepted on any single monetary input (10^15).
///
/// Sums of bounded amounts stay far below `Decimal::MAX`, so arithmetic on
/// validated input cannot overflow.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Rounds an amount to whole currency units, halves away from zero.
///
/// # Examples
///
/// ```
/// use clinic_billing::money::round_currency;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_currency(Decimal::new(12345, 1)), Decimal::new(1235, 0));
/// ```
pub fn round_currency(amount: Decimal) -> Decimal {
    amount
        .round_dp_with_strategy(CURRENCY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Returns `percentage`% of `amount`, rounded to whole currency units.
///
/// # Examples
///
/// ```
/// use clinic_billing::money::percent_of;
/// use rust_decimal::Decimal;
///
/// let fee = percent_of(Decimal::new(1_000_000, 0), Decimal::new(40, 0));
/// assert_eq!(fee, Decimal::new(400_000, 0));
/// ```
pub fn percent_of(amount: Decimal, percentage: Decimal) -> Decimal {
    let share = match amount.checked_mul(percentage) {
        Some(product) => product / ONE_HUNDRED,
        // Divide first when the product would overflow.
        None => (amount / ONE_HUNDRED).saturating_mul(percentage),
    };
    round_currency(share)
}

/// True if `amount` is no larger than [`MAX_AMOUNT`].
pub fn within_limit(amount: Decimal) -> bool {
    amount <= MAX_AMOUNT
}

/// Clamps `value` into `[min, max]`.
pub fn clamp(value: Decimal, min: Decimal, max: Decimal) -> Decimal {
    value.max(min).min(max)
}

/// Clamps a percentage into `[0, 100]`.
pub fn clamp_percentage(value: Decimal) -> Decimal {
    clamp(value, Decimal::ZERO, ONE_HUNDRED)
}

/// Floors negative amounts at zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Formats an amount with comma-grouped thousands for display.
///
/// # Examples
///
/// ```
/// use clinic_billing::money::format_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_amount(Decimal::new(1_175_000, 0)), "1,175,000");
/// assert_eq!(format_amount(Decimal::new(-2500, 0)), "-2,500");
/// ```
pub fn format_amount(amount: Decimal) -> String {
    let rounded = round_currency(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
