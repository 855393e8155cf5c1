mod connection;

pub use connection::{ConnectionInfo, with_deadline};
