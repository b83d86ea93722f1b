//! Running installed packages behind a capability boundary

mod executor;
pub mod script;

pub use executor::{Capabilities, ExecError, Executor, RunReport};
pub use script::{Op, Script, ScriptError};
