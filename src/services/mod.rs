//! Background services used by the progress server.

pub mod retention;
