//! API dumps and the checks run over them.

pub mod check;
pub mod compiler;
pub mod dump;
pub mod errors;
pub mod hash;

pub use compiler::{CheckLevel, CheckOutcome, CheckRequest, DumpRequest, IdlCompiler, ProcessCompiler};
pub use dump::Dump;
pub use errors::{ApiCheckError, IntegrityError};
pub use hash::HashChain;
