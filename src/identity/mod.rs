//! Client-side identity: credential claims, the role -> capability policy, and the
//! session store. Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod policy;
mod session;

pub use claims::{decode_claims, ClaimedIdentity, ClaimsError, Credential, RoleCode};
pub use policy::{capabilities_for, Capabilities};
pub use session::SessionStore;
