//! Presentation-only state keyed by application identity. Nothing here touches usage data; it
//! survives refetches and day navigation as long as the identity stays the same.

pub mod disclosure;
pub mod hover;
