//! Runtime invariant checks with a per-thread record of what was checked.
//!
//! Production code states its structural invariants with [`assert_invariant!`].
//! Each check is recorded, so contract tests can prove that a given code path
//! really exercised the invariant instead of silently skipping it.
//!
//! ```rust,ignore
//! assert_invariant!(
//!     written == declared,
//!     "Box length must equal header + payload",
//!     "atom::write_to"
//! );
//!
//! #[test]
//! fn contract_layout() {
//!     clear_invariant_log();
//!     // ... run a remux ...
//!     contract_test("layout", &["Placeholder and final moov lengths must match"]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread_local;

thread_local! {
    static INVARIANT_LOG: RefCell<HashMap<&'static str, u64>> = RefCell::new(HashMap::new());
}

/// Assert an invariant and record that it was checked.
///
/// Panics with `INVARIANT VIOLATION` when the condition is false. Invariants
/// guard internal consistency only; bad input is reported through
/// [`crate::RemuxError`] instead.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &'static str, context: Option<&str>) {
    INVARIANT_LOG.with(|log| {
        *log.borrow_mut().entry(message).or_insert(0) += 1;
    });

    if !condition {
        let ctx = context.unwrap_or("unknown");
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// Panics unless every invariant in `required` was checked at least once
/// since the last [`clear_invariant_log`].
pub fn contract_test(test_name: &str, required: &[&str]) {
    let missing: Vec<&str> = INVARIANT_LOG.with(|log| {
        let log = log.borrow();
        required
            .iter()
            .copied()
            .filter(|invariant| !log.contains_key(invariant))
            .collect()
    });

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

/// Number of times `message` was checked on this thread.
pub fn invariant_hits(message: &str) -> u64 {
    INVARIANT_LOG.with(|log| log.borrow().get(message).copied().unwrap_or(0))
}

pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| log.borrow_mut().clear());
}
