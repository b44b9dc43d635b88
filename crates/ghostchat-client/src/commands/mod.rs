//! Client operations.
//!
//! Each sub-module extends [`ChatClient`](crate::ChatClient) with the reads
//! and mutations of one domain. Reads go through the query cache; writes go
//! through [`run_mutation`](crate::mutation::run_mutation) so invalidation
//! and notifications are handled uniformly.

pub mod admin;
pub mod direct_messages;
pub mod messages;
pub mod profile;
pub mod session;
pub mod site_logo;
