pub mod check;
pub mod clean;

/// Whether any error in the chain is an invariant violation.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<mgc_core::Error>())
        .any(mgc_core::Error::is_fatal)
}
