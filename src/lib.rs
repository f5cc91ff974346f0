#![doc(test(attr(deny(warnings))))]

//! Transfer Core provides a transactional fund-transfer engine: atomic
//! movement of currency between ledger accounts with an immutable audit
//! trail of every committed movement.

pub mod engine;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Transfer Core tracing initialized.");
    });
}
