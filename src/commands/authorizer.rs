//! Access control for private commands.

use log::warn;

use crate::commands::{CommandRegistry, Sender, Slug, category};

/// Returns whether `caller` may run `slug`.
///
/// Public and unknown commands are open to everyone, private ones only to the
/// operator. A refusal is logged; the notice to the caller is left to the
/// dispatcher.
pub fn is_authorized(registry: &CommandRegistry, slug: &Slug, caller: &Sender) -> bool {
    if registry.is_private(slug) && !caller.is_operator() {
        warn!(
            target: category::UNAUTHORIZED,
            "unauthorized operation slug={} caller=@{}",
            slug, caller.handle
        );
        return false;
    }

    true
}
