//! Runtime configuration.

/// Tunables passed to [`crate::RuntimeBuilder`].
///
/// # Examples
///
/// ```
/// use interpreter::VmConfig;
///
/// let config = VmConfig {
///     quantum: 50,
///     ..VmConfig::default()
/// };
/// assert!(config.install_builtin_natives);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Instructions a thread runs before the scheduler moves on
    pub quantum: usize,
    /// Frames a thread may hold before invocations raise `StackOverflowError`
    pub max_call_depth: usize,
    /// Register the built-in natives and intrinsics
    pub install_builtin_natives: bool,
    /// Register the `java/lang` skeleton with the default loader
    pub preload_core_classes: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            quantum: 1000,
            max_call_depth: 1024,
            install_builtin_natives: true,
            preload_core_classes: true,
        }
    }
}
