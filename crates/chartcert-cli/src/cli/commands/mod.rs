pub(crate) mod certify;
pub(crate) mod checks;
mod dispatch;

pub use dispatch::dispatch;
