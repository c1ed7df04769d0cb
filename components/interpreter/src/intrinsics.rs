//! Built-in intrinsics: host replacements consulted before a method's own
//! bytecode or native binding.

use crate::registry::IntrinsicRegistry;
use crate::thread::Thread;
use core_types::{Value, VmError};
use tracing::warn;

/// Install the built-in intrinsics into `registry`
pub fn register_builtins(registry: &mut IntrinsicRegistry) {
    registry.register("java/lang/System", "loadLibrary(Ljava/lang/String;)V", load_library);
}

/// Native libraries cannot be loaded; the call is acknowledged and ignored
fn load_library(thread: &mut Thread, args: &[Value]) -> Result<(), VmError> {
    let library = match args.first().map(|v| v.as_reference()).transpose()?.flatten() {
        Some(name) => thread.runtime().string_value(name)?,
        None => String::new(),
    };
    warn!(library = %library, "System.loadLibrary ignored");
    thread.return_frame(None)
}
