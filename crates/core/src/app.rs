//! Screen routing driven by session transitions
//!
//! Entering the authenticated state always lands on the dashboard;
//! leaving it always lands on the auth screen and forgets the open board.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Error;
use crate::remote::{AuthApi, Credentials};
use crate::session::{
    CallbackOutcome, Credential, Location, SessionHandle, SessionSignal, SessionState, SessionStore,
};
use crate::Result;

pub const OAUTH_FAILED_MESSAGE: &str = "Google authentication failed. Please try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const SIGNUP_SUCCESS_NOTICE: &str = "Signup successful! Please log in.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Dashboard,
    Board { board_id: String },
}

pub struct AppShell {
    session: SessionStore,
    auth: Arc<dyn AuthApi>,
    screen: Screen,
    auth_error: Option<String>,
    notice: Option<String>,
}

impl AppShell {
    pub fn new(session: SessionStore, auth: Arc<dyn AuthApi>) -> Self {
        Self {
            session,
            auth,
            screen: Screen::Auth,
            auth_error: None,
            notice: None,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Error shown on the auth screen
    pub fn auth_error(&self) -> Option<&str> {
        self.auth_error.as_deref()
    }

    /// Informational message shown on the auth screen
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn session_handle(&self) -> SessionHandle {
        self.session.handle()
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    /// Decide the first screen.
    ///
    /// An OAuth callback location is consumed and reset to `/` before its
    /// outcome is acted on. Otherwise the persisted session is restored.
    pub async fn boot(&mut self, location: &mut Location) -> &Screen {
        match location.take_callback() {
            Some(CallbackOutcome::Token(credential)) => {
                info!("OAuth callback carried a credential");
                self.authenticate(credential).await;
            }
            Some(CallbackOutcome::Error(code)) => {
                warn!("OAuth callback error: {}", code);
                self.enter_anonymous(Some(OAUTH_FAILED_MESSAGE)).await;
            }
            Some(CallbackOutcome::Empty) => {
                warn!("OAuth callback carried neither token nor error");
                self.enter_anonymous(None).await;
            }
            None => match self.session.restore().await {
                Ok(Some(_)) => self.screen = Screen::Dashboard,
                Ok(None) => self.screen = Screen::Auth,
                Err(e) => {
                    warn!("Could not restore session: {}", e);
                    self.screen = Screen::Auth;
                }
            },
        }
        &self.screen
    }

    fn validate_credentials(email: &str, password: &str) -> Result<Credentials> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation("Email and password are required.".into()));
        }
        Ok(Credentials::new(email.trim(), password))
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        self.auth_error = None;
        self.notice = None;

        let result = match Self::validate_credentials(email, password) {
            Ok(credentials) => self.auth.login(&credentials).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(credential) => {
                self.authenticate(credential).await;
                Ok(())
            }
            Err(e) => {
                self.auth_error = Some(e.display_message("An error occurred during login."));
                Err(e)
            }
        }
    }

    /// Create an account. Stays on the auth screen; the user logs in next.
    pub async fn signup(&mut self, email: &str, password: &str, confirm: &str) -> Result<()> {
        self.auth_error = None;
        self.notice = None;

        let result = if password != confirm {
            Err(Error::Validation("Passwords do not match.".into()))
        } else {
            match Self::validate_credentials(email, password) {
                Ok(credentials) => self.auth.signup(&credentials).await,
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(()) => {
                info!("Signup succeeded for {}", email.trim());
                self.notice = Some(SIGNUP_SUCCESS_NOTICE.to_string());
                Ok(())
            }
            Err(e) => {
                self.auth_error = Some(e.display_message("An error occurred during signup."));
                Err(e)
            }
        }
    }

    pub fn google_auth_url(&self) -> String {
        self.auth.google_auth_url()
    }

    pub async fn logout(&mut self) {
        info!("Logging out");
        self.enter_anonymous(None).await;
    }

    pub fn open_board(&mut self, board_id: impl Into<String>) -> Result<()> {
        if self.screen == Screen::Auth {
            return Err(Error::Validation("Log in to open a board.".into()));
        }
        self.screen = Screen::Board {
            board_id: board_id.into(),
        };
        Ok(())
    }

    pub fn back_to_dashboard(&mut self) {
        if matches!(self.screen, Screen::Board { .. }) {
            self.screen = Screen::Dashboard;
        }
    }

    /// Act on signals from the remote client. A rejected credential logs
    /// the user out. Returns whether the session was ended.
    pub async fn process_signals(&mut self) -> bool {
        let mut unauthorized = false;
        while let Some(signal) = self.session.try_next_signal() {
            match signal {
                SessionSignal::Unauthorized => unauthorized = true,
            }
        }

        if unauthorized && self.session.state().await == SessionState::Authenticated {
            warn!("Server rejected the session credential");
            self.enter_anonymous(Some(SESSION_EXPIRED_MESSAGE)).await;
            return true;
        }
        false
    }

    async fn authenticate(&mut self, credential: Credential) {
        if let Err(e) = self.session.set(credential).await {
            warn!("Continuing with an unpersisted session: {}", e);
        }
        self.auth_error = None;
        self.notice = None;
        self.screen = Screen::Dashboard;
    }

    async fn enter_anonymous(&mut self, error: Option<&str>) {
        if let Err(e) = self.session.clear().await {
            warn!("Failed to clear persisted session: {}", e);
        }
        self.auth_error = error.map(str::to_string);
        self.notice = None;
        self.screen = Screen::Auth;
    }
}
