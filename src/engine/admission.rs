use crate::engine::types::ReasonCode;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub admitted: bool,
    pub reason: Option<ReasonCode>,
}

impl Admission {
    pub fn denied(reason: ReasonCode) -> Self {
        Self {
            admitted: false,
            reason: Some(reason),
        }
    }
}

/// Pre-flight solvency check gating every simulation.
pub fn admit(balance: Decimal, minimum_threshold: Decimal) -> Admission {
    if balance >= minimum_threshold {
        Admission {
            admitted: true,
            reason: None,
        }
    } else {
        Admission::denied(ReasonCode::InsufficientFunds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold() -> Decimal {
        Decimal::new(1, 2)
    }

    #[test]
    fn below_threshold_is_insufficient() {
        for raw in [0i64, 1, 50, 99] {
            let bal = Decimal::new(raw, 4);
            let a = admit(bal, threshold());
            assert!(!a.admitted, "balance {bal} should be denied");
            assert_eq!(a.reason, Some(ReasonCode::InsufficientFunds));
        }
    }

    #[test]
    fn at_or_above_threshold_is_admitted() {
        for bal in [threshold(), Decimal::new(2, 2), Decimal::ONE, Decimal::new(12345, 1)] {
            let a = admit(bal, threshold());
            assert!(a.admitted, "balance {bal} should be admitted");
            assert_eq!(a.reason, None);
        }
    }

    #[test]
    fn zero_threshold_admits_empty_wallet() {
        assert!(admit(Decimal::ZERO, Decimal::ZERO).admitted);
    }
}
