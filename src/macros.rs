/// Lazily compiled, process-wide static regex.
///
/// Patterns are literals checked by the tests that exercise them, so a failed
/// compile is a programming error rather than an input error.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}
