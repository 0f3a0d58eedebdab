//! Stack growth for deep recursion.
//!
//! Cloning recurses once per edge of the graph; a long linked chain would
//! otherwise overflow the thread stack.

/// Run `f`, growing the stack by `growth` bytes first if less than
/// `red_zone` bytes remain.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(red_zone: usize, growth: usize, f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(red_zone, growth, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(_red_zone: usize, _growth: usize, f: impl FnOnce() -> R) -> R {
    f()
}
