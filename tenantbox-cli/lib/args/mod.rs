//! Command line arguments of the tenantbox binaries.

mod tenantboxd;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use tenantboxd::*;
