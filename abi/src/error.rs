//! Error types for the interrupt abstraction layer.

use core::ffi::c_int;

/// Implement common methods for kernel error enums.
///
/// Generates `as_c_int()`, `from_c_int()`, `is_success()`, and `is_error()` methods
/// for `#[repr(i32)]` error enums that follow the kernel's error convention.
macro_rules! impl_kernel_error {
    ($ty:ty, fallback: $fallback:ident, variants: { $($val:literal => $variant:ident),* $(,)? }) => {
        impl $ty {
            /// Convert to C-style integer for the assembly glue.
            #[inline]
            pub fn as_c_int(self) -> c_int {
                self as c_int
            }

            /// Convert from C-style integer.
            #[inline]
            pub fn from_c_int(val: c_int) -> Self {
                match val {
                    $($val => Self::$variant,)*
                    _ => Self::$fallback,
                }
            }

            /// Check if this is a success result.
            #[inline]
            pub fn is_success(self) -> bool {
                matches!(self, Self::Success)
            }

            /// Check if this is an error result.
            #[inline]
            pub fn is_error(self) -> bool {
                !self.is_success()
            }
        }
    };
}

/// Result type for fallible interrupt-layer steps.
pub type IalResult<T> = Result<T, IalError>;

/// Errors raised while preparing interrupt delivery.
///
/// None of these cross the bring-up orchestrator: it logs them at the highest
/// severity and halts the core.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IalError {
    /// Operation succeeded
    #[default]
    Success = 0,
    /// The external handler table has no entry point for a vector
    MissingHandler = -1,
    /// A raw vector number fell outside the range a gate kind accepts
    InvalidVector = -2,
    /// The CPU has no local APIC
    ApicUnsupported = -3,
    /// The local APIC register window is not mapped yet
    ApicDisabled = -4,
}

impl_kernel_error!(IalError, fallback: MissingHandler, variants: {
    0 => Success,
    -1 => MissingHandler,
    -2 => InvalidVector,
    -3 => ApicUnsupported,
    -4 => ApicDisabled,
});

impl IalError {
    /// Short human-readable description for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::MissingHandler => "missing handler entry point",
            Self::InvalidVector => "vector outside gate range",
            Self::ApicUnsupported => "local APIC unsupported",
            Self::ApicDisabled => "local APIC not enabled",
        }
    }
}

impl core::fmt::Display for IalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_int_round_trip_and_fallback() {
        assert_eq!(IalError::from_c_int(-2), IalError::InvalidVector);
        assert_eq!(IalError::ApicUnsupported.as_c_int(), -3);
        assert_eq!(IalError::from_c_int(-4), IalError::ApicDisabled);
        assert_eq!(IalError::from_c_int(42), IalError::MissingHandler);
        assert!(IalError::Success.is_success());
        assert!(IalError::MissingHandler.is_error());
    }
}
