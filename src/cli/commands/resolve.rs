//! Resolve command - show where a module identifier points

use crate::cli::args::ResolveArgs;
use crate::error::{HearthError, HearthResult};
use crate::script::resolve;

/// Execute the resolve command
pub fn execute(args: ResolveArgs) -> HearthResult<()> {
    if args.requested.is_empty() || args.caller.is_empty() {
        return Err(HearthError::User(
            "Both the requested identifier and the caller must be non-empty".to_string(),
        ));
    }

    println!("{}", resolve(&args.requested, &args.caller)?);
    Ok(())
}
