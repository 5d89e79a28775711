/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use qlearn::assert_interval;
/// let alpha = 2.0;
/// assert_interval!(alpha, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`alpha\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Asserts that an index addresses one of `len` slots, naming the index kind in the panic message
#[macro_export]
macro_rules! assert_index {
    ($kind:literal, $index:expr, $len:expr) => {
        assert!(
            $index < $len,
            "Invalid {} index {}. Must be less than {}.",
            $kind,
            $index,
            $len,
        );
    };
}
