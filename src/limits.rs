//! Configurable resource limits for archive decoding.

/// Configurable resource limits applied by [`TarDecoder`](crate::TarDecoder).
///
/// These bound the size of what a single header may carry once GNU long names and PAX
/// records have been resolved. Exceeding a limit is reported as
/// [`Error::LimitExceeded`](crate::Error::LimitExceeded), which is terminal for the stream.
///
/// The default imposes no limits, so every archive the `tar` reader accepts is described
/// in full. Use [`Limits::strict`] or set the fields when the input is untrusted.
///
/// # Example
///
/// ```
/// use tar2headers::Limits;
///
/// let limits = Limits {
///     max_path_len: 1024,
///     ..Default::default()
/// };
/// assert_eq!(limits.max_pax_records, usize::MAX);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length in bytes of an entry name or link target.
    ///
    /// Default: unlimited.
    pub max_path_len: usize,

    /// Maximum number of PAX records attached to a single entry.
    ///
    /// Default: unlimited.
    pub max_pax_records: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_path_len: usize::MAX,
            max_pax_records: usize::MAX,
        }
    }
}

impl Limits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Conservative limits for untrusted archives.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_path_len: 4096,
            max_pax_records: 64,
        }
    }
}
