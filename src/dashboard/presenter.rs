use std::sync::Arc;

use super::layout::LayoutModel;

/// The drawing side of the dashboard.
///
/// `request_measurement` starts the second half of a disclosure change: once the presenter has
/// laid out the new state it reports the natural height of each listed identity's detail content
/// back as [Command::HeightsMeasured](super::Command::HeightsMeasured).
pub trait Presenter {
    fn render(&mut self, layout: &LayoutModel);

    fn request_measurement(&mut self, identities: &[Arc<str>]);
}
