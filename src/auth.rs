//! Session authorization for outbound requests.
//!
//! [`AuthCoordinator`] is the one piece of shared mutable state in the
//! client: it hands out the bearer credential for each request and runs the
//! 401 sequence (clear persisted keys, redirect to the login surface) at most
//! once at a time, however many requests fail together.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_REDIRECT_DELAY, HOME_ROUTE, LOGIN_ROUTE};
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::session::{TokenStore, ADMIN_TOKEN_KEY};

/// Backend endpoint that exchanges credentials for a token.
pub const LOGIN_ENDPOINT: &str = "auth/login";

/// Where the operator currently is, and how to move them around.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;

    /// Ordinary navigation, e.g. leaving the login surface after sign-in.
    fn navigate(&self, route: &str);

    /// Forced move to the login surface after the session was rejected.
    fn redirect(&self, route: &str);
}

/// Navigator that tracks the route in memory and logs redirects.
#[derive(Debug)]
pub struct LoggingNavigator {
    route: Mutex<String>,
    redirects: Mutex<Vec<String>>,
}

impl LoggingNavigator {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: Mutex::new(route.into()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Every route redirected to so far, oldest first.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for LoggingNavigator {
    fn current_route(&self) -> String {
        self.route
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, route: &str) {
        debug!("Navigating to {}", route);
        *self.route.lock().unwrap_or_else(PoisonError::into_inner) = route.to_string();
    }

    fn redirect(&self, route: &str) {
        warn!("Session expired, redirecting to {}", route);
        *self.route.lock().unwrap_or_else(PoisonError::into_inner) = route.to_string();
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.to_string());
    }
}

/// Token captured when a request is built, tagged with the session generation
/// it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: Option<String>,
    generation: u64,
}

impl Credential {
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[derive(Default)]
struct FlightState {
    in_flight: bool,
    /// Bumped every time the persisted session is cleared.
    generation: u64,
    waiters: Vec<oneshot::Sender<ApiError>>,
}

enum Unauthorized {
    Wait(oneshot::Receiver<ApiError>),
    RedirectNow,
    AlreadyHandled,
    Lead,
}

pub struct AuthCoordinator {
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    home_route: String,
    redirect_delay: Duration,
    state: Mutex<FlightState>,
}

impl AuthCoordinator {
    pub fn new(store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            navigator,
            login_route: LOGIN_ROUTE.to_string(),
            home_route: HOME_ROUTE.to_string(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            state: Mutex::new(FlightState::default()),
        }
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    fn lock(&self) -> MutexGuard<'_, FlightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credential to attach to the next request. Reading has no side effects.
    pub fn credential(&self) -> Credential {
        let state = self.lock();
        Credential {
            token: self.store.token(),
            generation: state.generation,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.token().is_some()
    }

    /// Persist a freshly issued token and leave the login surface, so a 401
    /// on the new session runs the full clear-and-redirect sequence again.
    pub fn sign_in(&self, token: &str) -> Result<(), ApiError> {
        {
            let _state = self.lock();
            self.store.set(ADMIN_TOKEN_KEY, token)?;
        }
        info!("Session token stored");
        if self.navigator.current_route() == self.login_route {
            self.navigator.navigate(&self.home_route);
        }
        Ok(())
    }

    /// Explicit logout: clear every persisted key and start a new session
    /// generation. Callers parked on an in-flight sequence are released.
    pub fn logout(&self) -> Result<(), ApiError> {
        let waiters = {
            let mut state = self.lock();
            state.generation += 1;
            state.in_flight = false;
            self.store.clear()?;
            std::mem::take(&mut state.waiters)
        };
        let err = ApiError::Unauthorized {
            body: "logged out".to_string(),
        };
        for waiter in waiters {
            let _ = waiter.send(err.clone());
        }
        info!("Logged out, session cleared");
        Ok(())
    }

    /// Run `send` with the current credential and route a 401 it returns
    /// through [`on_unauthorized`](Self::on_unauthorized).
    pub async fn guarded_request<T, F, Fut>(&self, send: F) -> Result<T, ApiError>
    where
        F: FnOnce(Credential) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let credential = self.credential();
        match send(credential.clone()).await {
            Err(err) if err.is_unauthorized() => Err(self.on_unauthorized(&credential, err).await),
            other => other,
        }
    }

    /// Handle a 401 for a request sent with `credential`.
    ///
    /// Returns the error the caller should see. Only the first caller of a
    /// session generation clears state and redirects; callers arriving while
    /// that sequence runs are parked and settled with its outcome, and
    /// callers holding an already-cleared token get the error back untouched.
    pub async fn on_unauthorized(&self, credential: &Credential, err: ApiError) -> ApiError {
        if self.navigator.current_route() == self.login_route {
            debug!("401 on the login route, propagating");
            return err;
        }

        let action = {
            let mut state = self.lock();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Unauthorized::Wait(rx)
            } else if credential.token.is_none() {
                Unauthorized::RedirectNow
            } else if credential.generation != state.generation {
                Unauthorized::AlreadyHandled
            } else {
                state.in_flight = true;
                state.generation += 1;
                if let Err(e) = self.store.clear() {
                    warn!("Failed to clear session after 401: {}", e);
                }
                for waiter in state.waiters.drain(..) {
                    let _ = waiter.send(err.clone());
                }
                Unauthorized::Lead
            }
        };

        match action {
            Unauthorized::Wait(rx) => {
                debug!("401 while a redirect is in flight, waiting");
                rx.await.unwrap_or(err)
            }
            Unauthorized::RedirectNow => {
                self.navigator.redirect(&self.login_route);
                err
            }
            Unauthorized::AlreadyHandled => {
                debug!("401 for an already cleared session, ignoring");
                err
            }
            Unauthorized::Lead => {
                warn!("401 received, session cleared");
                // Let the other requests failing right now land on the waiters list
                tokio::time::sleep(self.redirect_delay).await;
                self.navigator.redirect(&self.login_route);

                let waiters = {
                    let mut state = self.lock();
                    state.in_flight = false;
                    std::mem::take(&mut state.waiters)
                };
                for waiter in waiters {
                    let _ = waiter.send(err.clone());
                }
                err
            }
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "token")]
    access_token: String,
}

/// Exchange credentials for a token at [`LOGIN_ENDPOINT`] and persist it.
pub async fn login(http: &HttpClient, username: &str, password: &str) -> Result<(), ApiError> {
    let body: LoginResponse = http
        .post(LOGIN_ENDPOINT, &LoginRequest { username, password })
        .await?;
    http.auth().sign_in(&body.access_token)
}
