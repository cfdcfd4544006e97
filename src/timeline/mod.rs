//! Day-scoped time handling: the navigable [window::DayWindow] and the projection of timestamps
//! onto chart fractions.

pub mod projector;
pub mod window;
