//! All the database models live here.

pub use account::*;
pub use competition::*;
pub use friend::*;
pub use matches::*;

mod account;
mod competition;
mod friend;
mod matches;
