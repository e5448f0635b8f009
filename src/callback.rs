//! Safe invocation of user callbacks.
//!
//! User callbacks run on SDK tasks (the reader task's continuation), so a
//! panicking callback must never take the SDK down with it. Every
//! user-visible callback invocation goes through this barrier: the panic
//! is caught, logged with the moment it happened, and swallowed.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::types::{NavigationResult, NavigationResultCallback};

/// Invoke a navigation result callback inside a panic barrier.
pub(crate) fn invoke_nav_callback(callback: NavigationResultCallback, result: NavigationResult) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(move || callback(result))) {
        let reason = panic_message(&payload);
        tracing::error!(%reason, "navigation result callback panicked");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCode;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn callback_runs_normally() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_cb = Arc::clone(&ran);

        invoke_nav_callback(
            Box::new(move |result| {
                assert_eq!(result.error_code, ErrorCode::Success);
                ran_cb.store(true, Ordering::SeqCst);
            }),
            NavigationResult::default(),
        );

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn panicking_callback_is_contained() {
        invoke_nav_callback(
            Box::new(|_| panic!("user bug")),
            NavigationResult::default(),
        );
        // Reaching this line is the assertion.
    }

    #[test]
    fn panic_with_string_payload_is_contained() {
        invoke_nav_callback(
            Box::new(|_| panic!("{}", String::from("formatted"))),
            NavigationResult::default(),
        );
    }
}
