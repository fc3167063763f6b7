pub mod constants;
pub mod domain_utils;

pub use constants::*;
pub use domain_utils::{base_domain, host_of, is_subdomain, is_www, same_base_domain, strip_www};
