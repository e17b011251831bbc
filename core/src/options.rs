//! Configuration options for decoding and encoding.

/// Configuration options for [`Decoder`](crate::Decoder).
///
/// # Example
///
/// ```
/// use bytepatch_core::DecodeOptions;
///
/// let options = DecodeOptions {
///     validate_operands: false,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Reject constant, name, local and free-variable operands that index
    /// past the end of their table.
    ///
    /// Default: true
    pub validate_operands: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            validate_operands: true,
        }
    }
}

/// Configuration options for [`Encoder`](crate::Encoder).
///
/// # Example
///
/// ```
/// use bytepatch_core::EncodeOptions;
///
/// let options = EncodeOptions {
///     recompute_stack_size: false,
///     ..EncodeOptions::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Replace the declared stack size with the analyzed maximum depth.
    ///
    /// When false the artifact's `stack_size` is written unchanged and the
    /// analyzer does not run.
    ///
    /// Default: true
    pub recompute_stack_size: bool,

    /// Upper bound on layout passes while sizing `EXTENDED_ARG` prefixes.
    ///
    /// Prefix counts only grow, so the layout settles well before this in
    /// practice.
    ///
    /// Default: 32
    pub max_iterations: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            recompute_stack_size: true,
            max_iterations: 32,
        }
    }
}
