pub mod drawing;
pub mod gallery;
pub mod header;
pub mod menu;
pub mod writing;

use crate::session::{DownloadFile, IdeaTicket, View};

/// Requests a view hands back to the app for the current frame.
#[derive(Debug)]
pub enum UiAction {
    Navigate(View),
    /// Blocking message the user has to acknowledge.
    Alert(String),
    Download(DownloadFile),
    /// Run the idea request on a worker thread.
    StartIdea(IdeaTicket),
}

/// `Rgb` → egui color.
pub fn to_color32(c: crate::context::Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(c.r, c.g, c.b)
}

/// User-facing text for a failed session operation.
pub fn alert_for(err: &crate::session::SessionError) -> String {
    use crate::session::SessionError;
    match err {
        SessionError::InvalidInput(invalid) => invalid.message(),
        SessionError::Export(e) => {
            log_err!("UI: export failed: {}", e);
            t!("alert.export_failed")
        }
        SessionError::ExternalServiceFailure(_) => t!("writing.idea_failed"),
        SessionError::IdeaPending => t!("writing.thinking"),
    }
}
