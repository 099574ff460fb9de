use thiserror::Error;

use crate::ir::BlockId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Two families of errors exist. Construction errors are reported by
/// [`crate::ir::FunctionBuilder::finish`] when the IR handed to it is not valid SSA.
/// Contract violations are reported by the divergence analysis itself when the
/// function body contains something the analysis is not defined for. The analysis is
/// deterministic, so none of these errors is worth retrying.
///
/// # Error Categories
///
/// ## Construction Errors
/// - [`Error::Malformed`] - Broken SSA or control flow structure
///
/// ## Analysis Contract Violations
/// - [`Error::UnsupportedInstruction`] - An instruction kind without a transfer function
/// - [`Error::UnexpectedCfShape`] - A merge point in an impossible structural position
///
/// ## Shader Errors
/// - [`Error::InvalidEntrypoint`] - The shader's entrypoint index names no function
///
/// # Examples
///
/// ```rust
/// use lanescope::{ir::FunctionBuilder, Error};
///
/// let mut b = FunctionBuilder::new("main");
/// b.begin_loop();
///
/// match b.finish() {
///     Ok(_) => println!("built"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed IR: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The IR is not well-formed.
    ///
    /// This error includes the source location where the malformation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An instruction has no divergence transfer function.
    ///
    /// Function calls must be inlined before the analysis runs. Finding one in a
    /// body means an earlier pass did not do its job.
    #[error("Unsupported {kind} instruction #{index} in {block}")]
    UnsupportedInstruction {
        /// The block holding the instruction
        block: BlockId,
        /// The position of the instruction inside the block
        index: usize,
        /// Name of the instruction kind
        kind: &'static str,
    },

    /// A merge instruction sits in a control flow position that structured IR
    /// cannot produce.
    ///
    /// Examples are a loop header phi that does not see exactly two unconditional
    /// edges, or a loop exit phi with an edge that does not come from inside an `if`.
    #[error("Unexpected control flow shape at {block}: {message}")]
    UnexpectedCfShape {
        /// The block holding the merge instruction
        block: BlockId,
        /// What was expected and what was found
        message: String,
    },

    /// The shader's entrypoint does not refer to one of its functions.
    #[error("Shader entrypoint {0} does not name a function")]
    InvalidEntrypoint(usize),
}
