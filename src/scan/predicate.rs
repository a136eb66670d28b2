//! Narcissistic (Armstrong) number test

/// Per-number match test applied by every worker
///
/// A plain function pointer so it can be copied into threads and survives
/// `fork` without any shared state.
pub type Predicate = fn(u64) -> bool;

/// True if `n` equals the sum of its digits each raised to the digit count
///
/// Zero is not considered narcissistic; scanned ranges start at 1.
pub fn is_narcissistic(n: u64) -> bool {
    if n == 0 {
        return false;
    }

    let digits = n.ilog10() + 1;
    let mut rest = n;
    let mut sum: u128 = 0;

    while rest != 0 {
        let d = (rest % 10) as u128;
        sum += d.pow(digits);
        rest /= 10;
    }

    sum == n as u128
}
