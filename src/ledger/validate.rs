use rust_decimal::Decimal;

/// Decides whether `balance` covers a debit of `amount`.
///
/// Pure precondition gate with no side effects. The caller must reject
/// non-positive amounts first; this comparison only checks magnitude.
pub fn can_debit(balance: Decimal, amount: Decimal) -> bool {
    balance >= amount
}

#[cfg(test)]
mod tests {
    use super::can_debit;
    use rust_decimal::Decimal;

    fn dec(raw: &str) -> Decimal {
        raw.parse().expect("decimal literal")
    }

    #[test]
    fn allows_amount_below_balance() {
        assert!(can_debit(dec("100.00"), dec("40.00")));
    }

    #[test]
    fn allows_amount_equal_to_balance() {
        assert!(can_debit(dec("50.00"), dec("50.00")));
    }

    #[test]
    fn rejects_amount_above_balance() {
        assert!(!can_debit(dec("10.00"), dec("20.00")));
    }

    #[test]
    fn compares_values_regardless_of_scale() {
        assert!(can_debit(dec("10.0"), dec("10.00")));
    }
}
