/// Router Module Index
///
/// Routes are split by access level so each group gets its middleware applied once,
/// at the group level, rather than per handler.

/// Routes open to anonymous clients.
pub mod public;

/// Routes behind the session verifier.
pub mod authenticated;

/// Routes behind the session verifier and the admin role gate.
pub mod admin;
