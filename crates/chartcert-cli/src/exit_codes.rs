//! Exit codes for `chartcert`.
//! These codes are part of the public contract; scripts branch on them.

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_NOT_CERTIFIED: i32 = 1; // At least one check failed
pub const EXIT_INPUT_ERROR: i32 = 2; // Chart not found, bad identifier, unknown check
pub const EXIT_LOAD_ERROR: i32 = 3; // Chart could not be fetched, parsed or linted
pub const EXIT_INTERNAL_ERROR: i32 = 4;

/// Map an error from the certification pipeline to an exit code.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<chartcert_core::CertifyError>() {
        Some(e) => e.exit_code(),
        None => EXIT_INTERNAL_ERROR,
    }
}
