//! Global string interner for log-sourced names.
//!
//! Entity, ability and effect names repeat millions of times across a log
//! file; interning them makes events cheap to copy and compare.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

/// Interned string handle. Copy, Eq and Hash are all O(1).
pub type IStr = Spur;

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Intern a string, returning a stable handle.
pub fn intern(s: &str) -> IStr {
    INTERNER.get_or_intern(s)
}

/// Resolve a handle back to its string.
pub fn resolve(key: IStr) -> &'static str {
    INTERNER.resolve(&key)
}

/// Handle for the empty string, used as the default for optional names.
pub fn empty_istr() -> IStr {
    INTERNER.get_or_intern_static("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let a = intern("Dread Master Bestia");
        let b = intern("Dread Master Bestia");
        assert_eq!(a, b);
        assert_eq!(resolve(a), "Dread Master Bestia");
    }

    #[test]
    fn empty_istr_resolves_to_empty() {
        assert_eq!(resolve(empty_istr()), "");
    }
}
