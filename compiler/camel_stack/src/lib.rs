//! Stack growth for deep recursion in the evaluator.
//!
//! A tree-walking evaluator recurses once per nested expression and once per
//! subroutine call, so a recursive user sub (`fib(30)`, a deep linked list
//! walk) can exhaust the native stack long before the program is wrong.
//! Wrapping the recursive entry points in [`ensure_sufficient_stack`] moves
//! evaluation onto a freshly allocated segment whenever the red zone is hit.
//!
//! - **Native targets**: `stacker::maybe_grow`.
//! - **WASM targets**: plain call.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated segment (2MB).
///
/// Sub calls stack several evaluator frames, so segments are larger than
/// what a parser would need.
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone remains.
///
/// ```text
/// fn eval_expr(&mut self, expr: &Expr, want: Want) -> EvalResult {
///     ensure_sufficient_stack(|| self.eval_expr_inner(expr, want))
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
