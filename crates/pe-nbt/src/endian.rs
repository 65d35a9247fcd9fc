//! Byte order for tagged-value encode/decode, plus a scoped little-endian switch.
//!
//! Call sites that already know which byte order they want (the chunk codec, the
//! level.dat reader) pass [`Endianness`] explicitly. [`with_little_endian`] exists for
//! code that wants to match the "ambient mode" calling convention instead: everything
//! run inside the closure sees little-endian as the session default via [`current`].

use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Endianness>> = const { RefCell::new(Vec::new()) };
}

/// The endianness in effect for the current thread, outside any explicit argument.
/// Defaults to big-endian with no scope active.
pub fn current() -> Endianness {
    SCOPE_STACK.with(|s| s.borrow().last().copied().unwrap_or(Endianness::Big))
}

/// Run `f` with little-endian as the ambient endianness for this thread. Nested scopes
/// stack correctly, and the prior endianness is restored on every exit path, including
/// a panic unwinding through `f`.
pub fn with_little_endian<R>(f: impl FnOnce() -> R) -> R {
    with_endian(Endianness::Little, f)
}

/// Run `f` with `endian` as the ambient endianness for this thread.
pub fn with_endian<R>(endian: Endianness, f: impl FnOnce() -> R) -> R {
    SCOPE_STACK.with(|s| s.borrow_mut().push(endian));

    struct PopGuard;
    impl Drop for PopGuard {
        fn drop(&mut self) {
            SCOPE_STACK.with(|s| {
                s.borrow_mut().pop();
            });
        }
    }
    let _guard = PopGuard;

    f()
}
