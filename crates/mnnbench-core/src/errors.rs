use std::fmt;

/// Fatal configuration problem: bad YAML, unknown model alias, unsupported
/// shape. Aborts the run before anything is spawned.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError(pub String);

/// A variable sweep that cannot be expanded (neither `values` nor a
/// `start/end/step` range, zero step, or a range pointing the wrong way).
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidSweepError(pub String);

/// Timeout that is zero or otherwise unusable. Checked before spawning.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidTimeoutError(pub String);

/// A task whose suites expand to zero concrete cases. A batch run must not
/// silently do nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct NoCasesGeneratedError(pub String);

macro_rules! display_error {
    ($ty:ident, $prefix:expr) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ": {}"), self.0)
            }
        }
        impl std::error::Error for $ty {}
    };
}

display_error!(ConfigError, "config error");
display_error!(InvalidSweepError, "invalid sweep");
display_error!(InvalidTimeoutError, "invalid timeout");
display_error!(NoCasesGeneratedError, "no cases generated");
