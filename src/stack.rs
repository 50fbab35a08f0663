//! Stack growth for the recursive parser and evaluator.
//!
//! Each nested expression and each Basp call costs several Rust frames, so a program
//! recursing to the call depth limit would overflow an ordinary thread stack. Wrapping
//! the recursive entry points keeps the depth limit reachable on any thread.

/// Minimum stack space to keep available before recursing further.
const RED_ZONE: usize = 128 * 1024;

/// Size of each extra stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Runs `f`, first moving to a fresh stack segment if less than the red zone remains.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_recursion_grows_the_stack() {
        fn depth(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
        }

        assert_eq!(depth(100_000), 100_000);
    }
}
