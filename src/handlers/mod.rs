//! Request handling: the query feature builder, the generic CRUD handler
//! factory, and the success envelope

pub mod factory;
pub mod query;
pub mod response;
