//! Top-level editing session.
//!
//! Owns the loaded video, the description, the current caption script and
//! the user's presentation choices. Captions are replaced wholesale on each
//! generation and cleared on a new upload; placement and cosmetic settings
//! persist across regeneration.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::caption::Caption;
use crate::error::{SessionError, SourceError};
use crate::media::{VideoFile, VideoMetadata};
use crate::placement::{PlacementController, Size};
use crate::source::CaptionSource;
use crate::style::{AnimationStyle, CosmeticSettings};
use crate::timing::TimingState;

/// Tri-state generation status, with the failure message kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Loading,
    Failed(String),
    Ready,
}

/// One row of the results list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub time_range: String,
    pub text: String,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    video: Option<VideoFile>,
    video_size: Option<Size>,
    description: String,
    captions: Option<Vec<Caption>>,
    status: GenerationStatus,
    pub style: AnimationStyle,
    pub settings: CosmeticSettings,
    pub placement: PlacementController,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CosmeticSettings::default())
    }
}

impl Session {
    #[must_use]
    pub fn new(settings: CosmeticSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            video: None,
            video_size: None,
            description: String::new(),
            captions: None,
            status: GenerationStatus::Idle,
            style: AnimationStyle::default(),
            settings,
            placement: PlacementController::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn video(&self) -> Option<&VideoFile> {
        self.video.as_ref()
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    #[must_use]
    pub fn captions(&self) -> Option<&[Caption]> {
        self.captions.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> &GenerationStatus {
        &self.status
    }

    /// Message to show to the user, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            GenerationStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Accept a new video. Clears captions and any error.
    pub fn load_video(&mut self, video: VideoFile, metadata: Option<VideoMetadata>) {
        info!(session = %self.id, video = %video.name(), "video loaded");
        self.video = Some(video);
        self.video_size = metadata.map(|m| m.size());
        self.captions = None;
        self.status = GenerationStatus::Idle;
        let container = self.placement.container();
        if container.width > 0.0 {
            self.relayout(container);
        }
    }

    /// The rendered container changed size; reset the caption box layout.
    pub fn relayout(&mut self, container: Size) -> bool {
        match self.video_size {
            Some(video) => self.placement.relayout(video, container),
            None => false,
        }
    }

    /// Follow the timing engine: the caption box is mounted only while a
    /// caption is active. Unmounting ends any drag or resize in progress.
    pub fn sync_caption_box(&mut self, state: &TimingState) {
        self.placement.set_mounted(!state.is_idle());
    }

    /// Whether the generate action is enabled.
    #[must_use]
    pub fn can_generate(&self) -> bool {
        self.video.is_some()
            && !self.description.trim().is_empty()
            && self.status != GenerationStatus::Loading
    }

    /// Validate inputs and enter the loading state.
    ///
    /// An empty description records a user-visible message and no request
    /// should be issued.
    pub fn begin_generation(&mut self) -> Result<(), SessionError> {
        if self.status == GenerationStatus::Loading {
            return Err(SessionError::AlreadyGenerating);
        }
        if self.description.trim().is_empty() {
            let err = SessionError::EmptyDescription;
            self.status = GenerationStatus::Failed(err.to_string());
            return Err(err);
        }
        if self.video.is_none() {
            return Err(SessionError::NoVideo);
        }

        self.status = GenerationStatus::Loading;
        self.captions = None;
        Ok(())
    }

    /// Store the outcome of a generation request.
    ///
    /// Failures are normalised into one message and leave no captions.
    pub fn finish_generation(
        &mut self,
        result: Result<Vec<Caption>, SourceError>,
    ) -> Result<&[Caption], SessionError> {
        match result {
            Ok(captions) => {
                info!(session = %self.id, count = captions.len(), "captions ready");
                self.status = GenerationStatus::Ready;
                Ok(self.captions.insert(captions).as_slice())
            }
            Err(err) => {
                let message = format!("Failed to generate captions: {err}");
                warn!(session = %self.id, error = %err, "caption generation failed");
                self.captions = None;
                self.status = GenerationStatus::Failed(message.clone());
                Err(SessionError::Generation(message))
            }
        }
    }

    /// Run one generation against `source`.
    pub async fn generate(
        &mut self,
        source: &dyn CaptionSource,
    ) -> Result<&[Caption], SessionError> {
        self.begin_generation()?;
        info!(session = %self.id, source = source.name(), "generating captions");
        let result = source.generate(&self.description).await;
        self.finish_generation(result)
    }

    /// Rows for the results list: time range and joined word text.
    #[must_use]
    pub fn results(&self) -> Vec<ResultRow> {
        self.captions()
            .unwrap_or_default()
            .iter()
            .map(|c| ResultRow {
                time_range: c.time_range(),
                text: c.text(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::caption::{parse_captions, Word};
    use crate::placement::{AnchorMode, Gesture, Point};
    use crate::timing::TimingEngine;

    struct StubSource {
        json: &'static str,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(json: &'static str) -> Self {
            Self {
                json,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CaptionSource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn generate(&self, _description: &str) -> Result<Vec<Caption>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(parse_captions(self.json)?)
        }
    }

    const GOOD: &str = r#"[{"start": 0.5, "end": 3.0, "words": [
        {"text": "Assalam", "start": 0.5, "end": 1.1},
        {"text": "o", "start": 1.1, "end": 1.3}
    ]}]"#;

    fn session_with_video() -> Session {
        let mut session = Session::default();
        session.load_video(VideoFile::from_path("vlog.mp4").unwrap(), None);
        session
    }

    #[test]
    fn empty_description_issues_no_call() {
        let mut session = session_with_video();
        session.set_description("   \n");
        let source = StubSource::new(GOOD);

        let err = tokio_test::block_on(session.generate(&source)).unwrap_err();
        assert_eq!(err, SessionError::EmptyDescription);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            session.error(),
            Some("Please describe the video content first.")
        );
        assert!(session.captions().is_none());
    }

    #[test]
    fn missing_video_blocks_generation() {
        let mut session = Session::default();
        session.set_description("Lahore food tour");
        assert!(!session.can_generate());
        assert_eq!(session.begin_generation(), Err(SessionError::NoVideo));
    }

    #[test]
    fn successful_generation_stores_captions() {
        let mut session = session_with_video();
        session.set_description("Greeting the audience");
        assert!(session.can_generate());
        let source = StubSource::new(GOOD);

        let captions = tokio_test::block_on(session.generate(&source)).unwrap();
        assert_eq!(captions.len(), 1);
        assert_eq!(session.status(), &GenerationStatus::Ready);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            session.results(),
            vec![ResultRow {
                time_range: "0.50s - 3.00s".to_string(),
                text: "Assalam o".to_string(),
            }]
        );
    }

    #[test]
    fn malformed_script_sets_no_captions() {
        let mut session = session_with_video();
        session.set_description("Anything");
        let source = StubSource::new(
            r#"[{"start": 0, "end": 1, "words": [{"text": "a", "end": 1}]}]"#,
        );

        let err = tokio_test::block_on(session.generate(&source)).unwrap_err();
        let SessionError::Generation(message) = err else {
            panic!("expected generation error");
        };
        assert!(message.starts_with("Failed to generate captions: Invalid caption format"));
        assert!(session.captions().is_none());
        assert!(session.results().is_empty());
        assert_eq!(session.error(), Some(message.as_str()));
    }

    #[test]
    fn failure_clears_previous_captions() {
        let mut session = session_with_video();
        session.set_description("Anything");
        tokio_test::block_on(session.generate(&StubSource::new(GOOD))).unwrap();
        assert!(session.captions().is_some());

        let result = tokio_test::block_on(session.generate(&StubSource::new("{}")));
        assert!(result.is_err());
        assert!(session.captions().is_none());
    }

    #[test]
    fn loading_blocks_second_request() {
        let mut session = session_with_video();
        session.set_description("Anything");
        session.begin_generation().unwrap();
        assert!(!session.can_generate());
        assert_eq!(
            session.begin_generation(),
            Err(SessionError::AlreadyGenerating)
        );
        session
            .finish_generation(Ok(vec![Caption::new(0.0, 1.0, vec![Word::new("a", 0.0, 1.0)])]))
            .unwrap();
        assert!(session.can_generate());
    }

    #[test]
    fn new_video_clears_captions_and_error() {
        let mut session = session_with_video();
        session.set_description("Anything");
        tokio_test::block_on(session.generate(&StubSource::new(GOOD))).unwrap();

        session.load_video(VideoFile::from_path("other.webm").unwrap(), None);
        assert!(session.captions().is_none());
        assert_eq!(session.status(), &GenerationStatus::Idle);
        assert_eq!(session.description(), "Anything");
    }

    #[test]
    fn placement_and_settings_survive_regeneration() {
        let mut session = Session::default();
        let meta = VideoMetadata {
            width: 1920,
            height: 1080,
            duration: 10.0,
        };
        session.load_video(VideoFile::from_path("vlog.mp4").unwrap(), Some(meta));
        assert!(session.relayout(Size::new(800.0, 450.0)));
        session.placement.begin_drag(Point::new(400.0, 400.0), 40.0);
        session.placement.pointer_move(Point::new(420.0, 400.0));
        session.placement.end_gesture();
        session.settings.color = "#FF0000".to_string();
        session.set_description("Anything");

        tokio_test::block_on(session.generate(&StubSource::new(GOOD))).unwrap();
        tokio_test::block_on(session.generate(&StubSource::new(GOOD))).unwrap();

        assert_eq!(session.placement.placement().anchor, AnchorMode::Absolute);
        assert_eq!(session.settings.color, "#FF0000");
    }

    #[test]
    fn caption_box_unmount_ends_drag() {
        let mut session = Session::default();
        let meta = VideoMetadata {
            width: 1920,
            height: 1080,
            duration: 10.0,
        };
        session.load_video(VideoFile::from_path("vlog.mp4").unwrap(), Some(meta));
        assert!(session.relayout(Size::new(800.0, 450.0)));
        session.set_description("Anything");
        tokio_test::block_on(session.generate(&StubSource::new(GOOD))).unwrap();

        let captions = session.captions().unwrap().to_vec();
        let mut engine = TimingEngine::new();
        engine.tick(0.5, &captions, session.style);
        session.sync_caption_box(engine.state());
        assert!(session.placement.begin_drag(Point::new(400.0, 400.0), 40.0));
        let before = session.placement.placement();

        engine.tick(4.0, &captions, session.style);
        session.sync_caption_box(engine.state());
        session.placement.pointer_move(Point::new(300.0, 300.0));

        assert_eq!(session.placement.gesture(), Gesture::Idle);
        assert_eq!(session.placement.placement(), before);
    }
}
