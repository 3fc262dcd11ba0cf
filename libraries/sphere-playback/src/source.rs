//! Source controller
//!
//! Binds one camera URL at a time to the session's decode element, either
//! natively or through an adaptive-streaming client, and turns the element's
//! and client's events into [`SourceSignal`]s for the session.
//!
//! Switching sources always destroys the previous client before a new one is
//! created, so no two decoders ever feed the same element.

use crate::element::{BindingId, MediaElement, MediaEvent, StreamEvent, StreamingBackend, StreamingClient};
use crate::error::{PlayerError, Result, StreamErrorKind};
use crate::platform::StreamingPath;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Options of one load request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    /// Media time to restore before signalling readiness (seconds)
    pub start_time: f64,

    /// Attempt playback once ready
    pub autoplay: bool,
}

/// Outcome the session has to react to
#[derive(Debug)]
pub enum SourceSignal {
    /// The element can seek and play; `start_time` has been restored
    Ready {
        /// Whether a `play()` request was issued
        autoplay: bool,
    },

    /// A `play()` request resolved
    PlaybackStarted,

    /// The platform refused unprompted playback; wait for a user gesture
    PlaybackBlocked,

    /// The binding is gone; a reload is needed
    FatalError(PlayerError),
}

/// Lifecycle of the current binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Nothing bound
    Idle,

    /// Bound, waiting for the element to become ready
    Loading,

    /// Ready to seek and play
    Ready,

    /// A fatal error tore the binding down
    NeedsReload,
}

/// Local recovery already spent on the current binding
#[derive(Debug, Default, Clone, Copy)]
struct RecoveryBudget {
    network_retry_used: bool,
    decode_recovery_used: bool,
}

enum Binding {
    Unbound,
    Native {
        url: String,
    },
    Client {
        url: String,
        id: BindingId,
        client: Box<dyn StreamingClient>,
        budget: RecoveryBudget,
    },
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Unbound => f.write_str("Unbound"),
            Binding::Native { url } => f.debug_struct("Native").field("url", url).finish(),
            Binding::Client { url, id, .. } => f
                .debug_struct("Client")
                .field("url", url)
                .field("id", id)
                .finish_non_exhaustive(),
        }
    }
}

/// Binds camera URLs to the decode element
pub struct SourceController {
    element: Rc<dyn MediaElement>,
    backend: Option<Rc<dyn StreamingBackend>>,
    path: StreamingPath,
    binding: Binding,
    pending: Option<LoadOptions>,
    status: SourceStatus,
    next_binding: u64,
    last_url: Option<String>,
}

impl fmt::Debug for SourceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceController")
            .field("path", &self.path)
            .field("binding", &self.binding)
            .field("pending", &self.pending)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl SourceController {
    pub fn new(
        element: Rc<dyn MediaElement>,
        backend: Option<Rc<dyn StreamingBackend>>,
        path: StreamingPath,
    ) -> Self {
        Self {
            element,
            backend,
            path,
            binding: Binding::Unbound,
            pending: None,
            status: SourceStatus::Idle,
            next_binding: 0,
            last_url: None,
        }
    }

    /// Bind `url`, replacing any previous binding
    ///
    /// Readiness, blocked autoplay and fatal errors are reported later through
    /// [`SourceController::handle_media_event`] and
    /// [`SourceController::handle_stream_event`].
    pub fn load(&mut self, url: &str, options: LoadOptions) -> Result<()> {
        if self.path == StreamingPath::Unsupported {
            return Err(PlayerError::UnsupportedPlatform);
        }

        self.teardown();

        match self.path {
            StreamingPath::Native => {
                debug!(url, "Binding source natively");
                self.element.set_src(Some(url));
                self.element.load();
                self.binding = Binding::Native {
                    url: url.to_string(),
                };
            }
            StreamingPath::Client => {
                let backend = self
                    .backend
                    .clone()
                    .ok_or(PlayerError::UnsupportedPlatform)?;
                self.next_binding += 1;
                let id = BindingId(self.next_binding);
                debug!(url, binding = id.0, "Binding source through streaming client");

                let mut client = backend.create_client(id);
                client.attach_media();
                client.load_source(url);
                self.binding = Binding::Client {
                    url: url.to_string(),
                    id,
                    client,
                    budget: RecoveryBudget::default(),
                };
            }
            StreamingPath::Unsupported => return Err(PlayerError::UnsupportedPlatform),
        }

        self.pending = Some(options);
        self.status = SourceStatus::Loading;
        self.last_url = Some(url.to_string());
        Ok(())
    }

    /// Reload the last URL after a fatal error
    pub fn reload(&mut self, options: LoadOptions) -> Result<()> {
        let url = self
            .last_url
            .clone()
            .ok_or_else(|| PlayerError::Recovery("no source to reload".to_string()))?;
        self.load(&url, options)
    }

    /// Detach and release the current binding
    pub fn teardown(&mut self) {
        match std::mem::replace(&mut self.binding, Binding::Unbound) {
            Binding::Unbound => {}
            Binding::Native { url } => {
                debug!(url = url.as_str(), "Releasing native source");
                self.element.pause();
                self.element.set_src(None);
                self.element.load();
            }
            Binding::Client { url, id, mut client, .. } => {
                debug!(url = url.as_str(), binding = id.0, "Destroying streaming client");
                client.detach_media();
                client.destroy();
            }
        }
        self.pending = None;
        if self.status != SourceStatus::NeedsReload {
            self.status = SourceStatus::Idle;
        }
    }

    /// Force the decoder to start over at `resume_at` and resume playback
    ///
    /// Client path: detach and reattach the client, then restart loading.
    /// Native path: re-assign the source and reload. Time is restored and
    /// playback resumed once the element reports readiness again.
    pub fn hard_reload(&mut self, resume_at: f64) -> Result<()> {
        match &mut self.binding {
            Binding::Unbound => {
                return Err(PlayerError::Recovery("no source bound".to_string()));
            }
            Binding::Native { url } => {
                info!(url = url.as_str(), resume_at, "Hard reload of native source");
                self.element.set_src(Some(url));
                self.element.load();
            }
            Binding::Client { url, client, budget, .. } => {
                info!(url = url.as_str(), resume_at, "Hard reload of streaming client");
                client.detach_media();
                client.attach_media();
                client.start_load(resume_at);
                *budget = RecoveryBudget::default();
            }
        }
        self.pending = Some(LoadOptions {
            start_time: resume_at,
            autoplay: true,
        });
        self.status = SourceStatus::Loading;
        Ok(())
    }

    /// Change whether playback starts once the pending load is ready
    ///
    /// Returns `false` when no load is pending.
    pub fn set_autoplay(&mut self, autoplay: bool) -> bool {
        match &mut self.pending {
            Some(options) => {
                options.autoplay = autoplay;
                true
            }
            None => false,
        }
    }

    /// React to a decode-element event
    pub fn handle_media_event(&mut self, event: &MediaEvent) -> Vec<SourceSignal> {
        let mut signals = Vec::new();
        match event {
            MediaEvent::LoadedMetadata | MediaEvent::CanPlay => {
                if let Some(options) = self.pending.take() {
                    if let Binding::Client { budget, .. } = &mut self.binding {
                        *budget = RecoveryBudget::default();
                    }
                    if options.start_time > 0.0 {
                        self.element.set_current_time(options.start_time);
                    }
                    self.status = SourceStatus::Ready;
                    signals.push(SourceSignal::Ready {
                        autoplay: options.autoplay,
                    });
                    if options.autoplay {
                        self.element.play();
                    }
                }
            }
            MediaEvent::PlayStarted => signals.push(SourceSignal::PlaybackStarted),
            MediaEvent::PlayRejected => {
                info!("Playback request rejected by platform");
                signals.push(SourceSignal::PlaybackBlocked);
            }
            MediaEvent::Waiting => debug!("Decode element waiting for data"),
            MediaEvent::Error(message) => match self.binding {
                Binding::Native { .. } => {
                    warn!(message = message.as_str(), "Native playback failed");
                    self.fail(&mut signals, StreamErrorKind::Other, message);
                }
                // The client reports its own classified errors
                _ => debug!(message = message.as_str(), "Media element error"),
            },
        }
        signals
    }

    /// React to a streaming-client event
    ///
    /// Events tagged with a binding other than the current one are stale and
    /// ignored.
    pub fn handle_stream_event(&mut self, binding: BindingId, event: &StreamEvent) -> Vec<SourceSignal> {
        let mut signals = Vec::new();
        let current_time = self.element.current_time();
        let start_time = self.pending.map(|options| options.start_time);

        let Binding::Client { id, client, budget, .. } = &mut self.binding else {
            debug!(binding = binding.0, "Stream event without client binding");
            return signals;
        };
        if *id != binding {
            debug!(binding = binding.0, current = id.0, "Ignoring stale stream event");
            return signals;
        }

        match event {
            StreamEvent::ManifestParsed => {
                client.start_load(start_time.unwrap_or(current_time));
            }
            StreamEvent::FragmentLoaded => {
                *budget = RecoveryBudget::default();
            }
            StreamEvent::Error { kind, fatal: false, details } => {
                debug!(?kind, details = details.as_str(), "Non-fatal stream error");
            }
            StreamEvent::Error {
                kind: StreamErrorKind::Network,
                details,
                ..
            } if !budget.network_retry_used => {
                warn!(details = details.as_str(), "Network error, restarting load");
                budget.network_retry_used = true;
                client.start_load(current_time);
            }
            StreamEvent::Error {
                kind: StreamErrorKind::Decode,
                details,
                ..
            } if !budget.decode_recovery_used => {
                warn!(details = details.as_str(), "Decode error, recovering decoder");
                budget.decode_recovery_used = true;
                if let Err(reason) = client.recover_media_error() {
                    self.fail(&mut signals, StreamErrorKind::Decode, &reason);
                }
            }
            StreamEvent::Error { kind, details, .. } => {
                let kind = *kind;
                let details = details.clone();
                self.fail(&mut signals, kind, &details);
            }
        }
        signals
    }

    fn fail(&mut self, signals: &mut Vec<SourceSignal>, kind: StreamErrorKind, details: &str) {
        warn!(?kind, details, "Fatal streaming error, tearing down binding");
        self.status = SourceStatus::NeedsReload;
        self.teardown();
        signals.push(SourceSignal::FatalError(PlayerError::Stream(
            kind,
            details.to_string(),
        )));
    }

    pub fn status(&self) -> SourceStatus {
        self.status
    }

    pub fn path(&self) -> StreamingPath {
        self.path
    }

    /// URL currently bound, if any
    pub fn url(&self) -> Option<&str> {
        match &self.binding {
            Binding::Unbound => None,
            Binding::Native { url } | Binding::Client { url, .. } => Some(url),
        }
    }

    /// Id of the current streaming-client binding
    pub fn binding_id(&self) -> Option<BindingId> {
        match &self.binding {
            Binding::Client { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.binding, Binding::Unbound)
    }

    pub fn element(&self) -> &Rc<dyn MediaElement> {
        &self.element
    }
}
