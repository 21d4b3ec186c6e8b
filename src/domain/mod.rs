mod balance;
mod error;
mod expense;
mod money;
mod settlement;
mod trip;

pub use balance::*;
pub use error::*;
pub use expense::*;
pub use money::*;
pub use settlement::*;
pub use trip::*;
