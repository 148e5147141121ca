/*!
 * Core Types
 * Common types used across the kernel
 */

/// Process ID type
pub type Pid = u32;

/// User namespace an application instance lives in
pub type UserId = u32;

/// Host priority score (smaller is more important)
pub type Score = i32;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;
