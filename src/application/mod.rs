//! Application services: read-through queries and write-then-invalidate
//! mutations over the repository traits.

pub mod cached;
pub mod error;
pub mod news;
pub mod repos;
pub mod tags;
