//! Shared pieces of the `vspd` and `vspadmin` binaries.

pub mod admin;
