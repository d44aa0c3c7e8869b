//! Command execution inside the WSL subsystem

mod executor;
mod resolve;

pub use executor::{
    ExecutionResult, Executor, ProcessLauncher, RawOutput, RetryPolicy, ShellExecutor,
    SystemLauncher, STATUS_CONTROL_C_EXIT, WINDOWS_CREATION_FLAGS,
};
pub use resolve::{resolve_entry_executable, resolve_with, HostPlatform};
