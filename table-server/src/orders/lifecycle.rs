//! Fulfillment transition rules
//!
//! The fulfillment axis moves strictly forward: PENDING, PREPARING, READY,
//! FINISHED. CANCELLED is reachable from any non-terminal state. Terminal
//! states admit nothing.

use shared::order::OrderStatus;

use super::OrderError;

/// Whether `from -> to` is a legal fulfillment transition
pub fn is_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (Pending, Preparing) => true,
        (Preparing, Ready) => true,
        (Ready, Finished) => true,
        (from, Cancelled) => !from.is_terminal(),
        _ => false,
    }
}

pub fn validate(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if is_allowed(from, to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn forward_chain_is_strict() {
        assert!(is_allowed(Pending, Preparing));
        assert!(is_allowed(Preparing, Ready));
        assert!(is_allowed(Ready, Finished));

        // No skipping
        assert!(!is_allowed(Pending, Ready));
        assert!(!is_allowed(Pending, Finished));
        assert!(!is_allowed(Preparing, Finished));
        // No going back
        assert!(!is_allowed(Ready, Preparing));
        assert!(!is_allowed(Preparing, Pending));
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        assert!(is_allowed(Pending, Cancelled));
        assert!(is_allowed(Preparing, Cancelled));
        assert!(is_allowed(Ready, Cancelled));
        assert!(!is_allowed(Finished, Cancelled));
        assert!(!is_allowed(Cancelled, Cancelled));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for to in [Pending, Preparing, Ready, Finished, Cancelled] {
            assert!(!is_allowed(Finished, to));
            assert!(!is_allowed(Cancelled, to));
        }
    }
}
