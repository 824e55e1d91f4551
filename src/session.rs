// ============================================================================
// SESSION — views, forms and the gallery for one run of the app
// ============================================================================
//
// The session validates form input, turns surface exports into plans or
// download files, and tracks the single in-flight idea request.

use thiserror::Error;
use uuid::Uuid;

use crate::context::DrawContext;
use crate::export::{ExportError, Exporter, ImageFormat, DOWNLOAD_JPEG_QUALITY};
use crate::idea::{append_idea, IdeaError, IdeaGenerator};
use crate::plan::{Gallery, NewPlan, PlanKind};
use crate::surface::SurfaceManager;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    MainMenu,
    Drawing,
    Writing,
    Gallery,
}

/// A required field was empty (or whitespace only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("drawing title is required")]
    DrawingTitleRequired,
    #[error("title is required before downloading")]
    DownloadTitleRequired,
    #[error("title and content are required")]
    TitleAndContentRequired,
    #[error("title and content are required before downloading")]
    DownloadContentRequired,
    #[error("heritage name is required for an idea")]
    HeritageNameRequired,
}

impl InvalidInput {
    /// Prompt shown to the user.
    pub fn message(self) -> String {
        match self {
            InvalidInput::DrawingTitleRequired => t!("alert.drawing_title_required"),
            InvalidInput::DownloadTitleRequired => t!("alert.download_title_required"),
            InvalidInput::TitleAndContentRequired => t!("alert.title_and_content_required"),
            InvalidInput::DownloadContentRequired => t!("alert.download_content_required"),
            InvalidInput::HeritageNameRequired => t!("alert.heritage_name_required"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("idea generation failed: {0}")]
    ExternalServiceFailure(#[from] IdeaError),
    #[error("an idea request is already in flight")]
    IdeaPending,
}

/// A file ready to be written by the caller (save dialog or CLI).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawingForm {
    pub title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WritingForm {
    pub title: String,
    pub content: String,
    idea_in_flight: bool,
    /// Inline error from the last idea request.
    pub error: Option<String>,
    /// Bumped whenever the form is reset so late idea results are dropped.
    epoch: u64,
}

impl WritingForm {
    pub fn idea_in_flight(&self) -> bool {
        self.idea_in_flight
    }
}

/// Handle for an idea request started with [`Session::begin_idea_request`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdeaTicket {
    pub heritage_name: String,
    epoch: u64,
}

#[derive(Default)]
pub struct Session {
    view: View,
    gallery: Gallery,
    pub drawing: DrawingForm,
    pub writing: WritingForm,
    notice: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// One-shot message shown after a save.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Switch views.  Entering the drawing or writing view starts a fresh form.
    pub fn navigate(&mut self, view: View) {
        if view == self.view {
            return;
        }
        match view {
            View::Drawing => self.drawing = DrawingForm::default(),
            View::Writing => {
                let epoch = self.writing.epoch + 1;
                self.writing = WritingForm { epoch, ..WritingForm::default() };
            }
            View::MainMenu | View::Gallery => {}
        }
        if view != View::Gallery {
            self.notice = None;
        }
        self.view = view;
    }

    // ---- drawing ----------------------------------------------------------

    /// Store the current drawing as a PNG plan and open the gallery.
    pub fn save_drawing<C: DrawContext>(
        &mut self,
        surface: &SurfaceManager<C>,
        exporter: &Exporter,
    ) -> Result<Uuid, SessionError> {
        let title = required(&self.drawing.title).ok_or(InvalidInput::DrawingTitleRequired)?;
        let image = exporter.export_image(surface, ImageFormat::Png, None)?;
        let plan = NewPlan { kind: PlanKind::Drawing, title, content: image.to_data_uri() };
        Ok(self.store(plan))
    }

    /// JPEG of the drawing with its title as a caption.
    pub fn download_drawing<C: DrawContext>(
        &self,
        surface: &SurfaceManager<C>,
        exporter: &Exporter,
    ) -> Result<DownloadFile, SessionError> {
        let title = required(&self.drawing.title).ok_or(InvalidInput::DownloadTitleRequired)?;
        let image = exporter.export_with_caption(surface, &title, ImageFormat::Jpeg, Some(DOWNLOAD_JPEG_QUALITY))?;
        log_info!("Session: prepared drawing download {:?} ({} bytes)", title, image.bytes.len());
        Ok(DownloadFile {
            file_name: format!("{title}.{}", ImageFormat::Jpeg.extension()),
            mime: ImageFormat::Jpeg.mime(),
            bytes: image.bytes,
        })
    }

    // ---- writing ----------------------------------------------------------

    pub fn save_text(&mut self) -> Result<Uuid, SessionError> {
        let (title, content) = self.text_fields().ok_or(InvalidInput::TitleAndContentRequired)?;
        let plan = NewPlan { kind: PlanKind::Text, title, content };
        Ok(self.store(plan))
    }

    pub fn download_text(&self) -> Result<DownloadFile, SessionError> {
        let (title, content) = self.text_fields().ok_or(InvalidInput::DownloadContentRequired)?;
        Ok(DownloadFile {
            file_name: format!("{title}.txt"),
            mime: "text/plain;charset=utf-8",
            bytes: text_document(&title, &content).into_bytes(),
        })
    }

    /// Validate the heritage name and mark a request in flight.
    pub fn begin_idea_request(&mut self) -> Result<IdeaTicket, SessionError> {
        if self.writing.idea_in_flight {
            return Err(SessionError::IdeaPending);
        }
        let heritage_name = required(&self.writing.title).ok_or(InvalidInput::HeritageNameRequired)?;
        self.writing.idea_in_flight = true;
        self.writing.error = None;
        Ok(IdeaTicket { heritage_name, epoch: self.writing.epoch })
    }

    /// Apply a finished request.  Results for a form that has since been
    /// reset are discarded.
    pub fn finish_idea_request(&mut self, ticket: &IdeaTicket, result: Result<String, IdeaError>) -> Result<(), SessionError> {
        if ticket.epoch != self.writing.epoch {
            log_info!("Session: dropping idea for {:?}, form was reset", ticket.heritage_name);
            return Ok(());
        }
        self.writing.idea_in_flight = false;
        match result {
            Ok(idea) => {
                self.writing.content = append_idea(&self.writing.content, &idea);
                Ok(())
            }
            Err(e) => {
                log_err!("Session: idea request for {:?} failed: {}", ticket.heritage_name, e);
                self.writing.error = Some(t!("writing.idea_failed"));
                Err(SessionError::ExternalServiceFailure(e))
            }
        }
    }

    /// Run an idea request to completion on the calling thread.
    pub fn request_idea(&mut self, generator: &dyn IdeaGenerator) -> Result<(), SessionError> {
        let ticket = self.begin_idea_request()?;
        let result = generator.generate(&ticket.heritage_name);
        self.finish_idea_request(&ticket, result)
    }

    fn text_fields(&self) -> Option<(String, String)> {
        let title = required(&self.writing.title)?;
        required(&self.writing.content)?;
        Some((title, self.writing.content.clone()))
    }

    fn store(&mut self, plan: NewPlan) -> Uuid {
        let id = self.gallery.add(plan).id;
        self.navigate(View::Gallery);
        self.notice = Some(t!("notice.saved"));
        id
    }
}

/// Trimmed value, or `None` when blank.
fn required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Body of a text-plan download.
pub fn text_document(title: &str, content: &str) -> String {
    format!("제목: {title}\n\n---\n\n{content}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PixelContext;
    use crate::idea::Unconfigured;
    use crate::surface::StaticHost;

    struct FixedIdea(&'static str);

    impl IdeaGenerator for FixedIdea {
        fn generate(&self, _heritage_name: &str) -> Result<String, IdeaError> {
            Ok(self.0.to_string())
        }
    }

    fn surface() -> SurfaceManager<PixelContext> {
        let mut surface = SurfaceManager::pixel();
        surface.initialize(&StaticHost::new(120.0, 90.0, 2.0)).unwrap();
        surface
    }

    fn writing_session(title: &str, content: &str) -> Session {
        let mut session = Session::new();
        session.navigate(View::Writing);
        session.writing.title = title.into();
        session.writing.content = content.into();
        session
    }

    #[test]
    fn blank_drawing_title_is_rejected_and_gallery_unchanged() {
        let mut session = Session::new();
        session.navigate(View::Drawing);
        session.drawing.title = "   ".into();

        let err = session.save_drawing(&surface(), &Exporter::new(None)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(InvalidInput::DrawingTitleRequired)));
        assert!(session.gallery().is_empty());
        assert_eq!(session.view(), View::Drawing);
    }

    #[test]
    fn saved_drawing_is_png_data_uri_and_opens_gallery() {
        let mut session = Session::new();
        session.navigate(View::Drawing);
        session.drawing.title = " 경복궁 ".into();

        let id = session.save_drawing(&surface(), &Exporter::new(None)).unwrap();
        let plan = session.gallery().get(id).unwrap();
        assert_eq!(plan.title, "경복궁");
        assert_eq!(plan.kind, PlanKind::Drawing);
        assert!(plan.content.starts_with("data:image/png;base64,"));
        assert_eq!(session.view(), View::Gallery);
        assert!(session.notice().is_some());
    }

    #[test]
    fn drawing_download_is_named_jpeg() {
        let mut session = Session::new();
        session.drawing.title = "  첨성대 ".into();
        let file = session.download_drawing(&surface(), &Exporter::new(None)).unwrap();
        assert_eq!(file.file_name, "첨성대.jpg");
        assert_eq!(file.mime, "image/jpeg");
        assert_eq!(&file.bytes[..2], &[0xFF, 0xD8]);

        session.drawing.title.clear();
        let err = session.download_drawing(&surface(), &Exporter::new(None)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(InvalidInput::DownloadTitleRequired)));
    }

    #[test]
    fn drawing_on_unavailable_surface_reports_export_error() {
        let mut session = Session::new();
        session.drawing.title = "탑".into();
        let surface: SurfaceManager<PixelContext> = SurfaceManager::new(None);
        let err = session.save_drawing(&surface, &Exporter::new(None)).unwrap_err();
        assert!(matches!(err, SessionError::Export(_)));
        assert!(session.gallery().is_empty());
    }

    #[test]
    fn text_plan_requires_title_and_content() {
        let mut session = writing_session("종묘", "  ");
        assert!(matches!(
            session.save_text(),
            Err(SessionError::InvalidInput(InvalidInput::TitleAndContentRequired))
        ));
        assert!(session.gallery().is_empty());

        session.writing.content = "왕의 사당".into();
        let id = session.save_text().unwrap();
        assert_eq!(session.gallery().get(id).map(|p| p.content.as_str()), Some("왕의 사당"));
    }

    #[test]
    fn text_download_formats_title_header() {
        let session = writing_session("수원 화성", "성곽 둘레길 걷기");
        let file = session.download_text().unwrap();
        assert_eq!(file.file_name, "수원 화성.txt");
        assert_eq!(String::from_utf8(file.bytes).unwrap(), "제목: 수원 화성\n\n---\n\n성곽 둘레길 걷기");

        let empty = writing_session("", "x");
        assert!(matches!(
            empty.download_text(),
            Err(SessionError::InvalidInput(InvalidInput::DownloadContentRequired))
        ));
    }

    #[test]
    fn idea_without_credential_sets_message_and_keeps_content() {
        let mut session = writing_session("불국사", "처음 내용");
        let generator = Unconfigured::for_variable("API_KEY");

        let err = session.request_idea(&generator).unwrap_err();
        assert!(matches!(err, SessionError::ExternalServiceFailure(IdeaError::MissingApiKey { .. })));
        assert_eq!(session.writing.content, "처음 내용");
        assert!(session.writing.error.is_some());
        assert!(!session.writing.idea_in_flight());
    }

    #[test]
    fn idea_requires_heritage_name() {
        let mut session = writing_session(" ", "");
        let err = session.request_idea(&FixedIdea("x")).unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(InvalidInput::HeritageNameRequired)));
        assert_eq!(session.writing.content, "");
    }

    #[test]
    fn idea_is_appended_and_second_request_waits() {
        let mut session = writing_session("석굴암", "");
        let ticket = session.begin_idea_request().unwrap();
        assert!(session.writing.idea_in_flight());
        assert!(matches!(session.begin_idea_request(), Err(SessionError::IdeaPending)));

        session.finish_idea_request(&ticket, Ok("부처님 그리기".into())).unwrap();
        assert_eq!(session.writing.content, "[AI 추천 아이디어💡]\n부처님 그리기");

        session.request_idea(&FixedIdea("퀴즈")).unwrap();
        assert_eq!(
            session.writing.content,
            "[AI 추천 아이디어💡]\n부처님 그리기\n\n[AI 추천 아이디어💡]\n퀴즈"
        );
    }

    #[test]
    fn late_idea_for_reset_form_is_dropped() {
        let mut session = writing_session("해인사", "");
        let ticket = session.begin_idea_request().unwrap();
        session.navigate(View::MainMenu);
        session.navigate(View::Writing);

        session.finish_idea_request(&ticket, Ok("late".into())).unwrap();
        assert_eq!(session.writing.content, "");
        assert!(!session.writing.idea_in_flight());
    }

    #[test]
    fn entering_a_form_view_resets_it() {
        let mut session = Session::new();
        session.navigate(View::Drawing);
        session.drawing.title = "draft".into();
        session.navigate(View::Gallery);
        session.navigate(View::Drawing);
        assert_eq!(session.drawing.title, "");
    }
}
