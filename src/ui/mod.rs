//! Terminal output helpers
//!
//! Styled with `console` in interactive terminals, plain bracketed markers
//! otherwise so output stays greppable in CI.

mod context;
mod output;

pub use context::UiContext;
pub use output::{key_value, section, step_info, step_ok, step_ok_detail, step_warn_hint};
