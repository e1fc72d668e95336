//! Interactive authorization against Numista.
//!
//! The user grants access on a Numista web page; Numista then redirects to
//! `.../api/<redirect_uri>?code=...`. The [`AuthorizationSession`] builds
//! the page URL and watches the URLs the host reports. It ends in one of
//! two terminal states:
//!
//! - [`AuthOutcome::Succeeded`] carrying the one-time authorization code
//! - [`AuthOutcome::Cancelled`] when the user denies or closes the page
//!
//! Rendering the page is the job of an [`AuthorizationSurface`]: a host web
//! view, the terminal ([`ConsoleSurface`]), or a fixed list of redirect URLs
//! ([`ReplaySurface`]).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::NumistaConfig;

/// Terminal state of an authorization session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Succeeded(String),
    Cancelled,
}

/// How a navigation was triggered inside the authorization page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// The user clicked a link (help pages, sign-up, terms).
    LinkClicked,
    /// Form submissions, redirects and anything else.
    Other,
}

/// What the host should do with a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Let the embedded page follow it.
    Load,
    /// Hand the URL to the user's default browser and stay put.
    OpenExternally,
}

/// State of one authorization attempt.
#[derive(Debug)]
pub struct AuthorizationSession {
    authorization_url: Url,
    redirect_marker: String,
    accept_invalid_certs: bool,
    outcome: Option<AuthOutcome>,
}

impl AuthorizationSession {
    pub fn new(config: &NumistaConfig) -> Result<Self> {
        let language = config.language();
        let page = config.authorize_url.replace("{language}", language);
        let authorization_url = Url::parse_with_params(
            &page,
            &[
                ("response_type", "code"),
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("scope", config.scope.as_str()),
            ],
        )
        .with_context(|| format!("invalid authorization URL: {}", page))?;

        if config.auth.accept_invalid_certs {
            tracing::warn!(
                "TLS certificate errors will be accepted while loading the authorization page"
            );
        }

        Ok(Self {
            authorization_url,
            redirect_marker: format!("api/{}?", config.redirect_uri),
            accept_invalid_certs: config.auth.accept_invalid_certs,
            outcome: None,
        })
    }

    pub fn authorization_url(&self) -> &str {
        self.authorization_url.as_str()
    }

    /// Whether the host may ignore certificate errors on the authorization page.
    ///
    /// Token and data requests always verify certificates.
    pub fn accept_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    pub fn outcome(&self) -> Option<&AuthOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Feed a URL the page has moved to.
    ///
    /// Returns the terminal outcome once reached. Later URLs are ignored so
    /// a code cannot be replaced after the session finished.
    pub fn on_url_changed(&mut self, url: &str) -> Option<&AuthOutcome> {
        if self.outcome.is_none() {
            self.outcome = parse_redirect(url, &self.redirect_marker);
            if let Some(outcome) = &self.outcome {
                match outcome {
                    AuthOutcome::Succeeded(_) => tracing::info!("authorization granted"),
                    AuthOutcome::Cancelled => tracing::info!("authorization cancelled"),
                }
            }
        }
        self.outcome.as_ref()
    }

    /// Decide whether a navigation stays in the embedded page.
    ///
    /// Clicked links open in the default browser unless they are the
    /// redirect itself.
    pub fn on_navigation(&self, url: &str, kind: NavigationKind) -> NavigationDecision {
        match kind {
            NavigationKind::LinkClicked if !url.contains(&self.redirect_marker) => {
                NavigationDecision::OpenExternally
            }
            _ => NavigationDecision::Load,
        }
    }

    /// Redirect URL Numista would produce for `query`, on the page's host.
    pub fn redirect_url(&self, query: &str) -> String {
        format!(
            "{}/{}{}",
            self.authorization_url.origin().ascii_serialization(),
            self.redirect_marker,
            query
        )
    }

    /// Consume the session, treating an unfinished one as cancelled.
    pub fn finish(self) -> AuthOutcome {
        self.outcome.unwrap_or(AuthOutcome::Cancelled)
    }
}

/// Interpret a URL reached during authorization.
///
/// Only URLs containing the redirect marker (`api/<redirect_uri>?`) are
/// terminal. A non-empty `code` parameter means success; a `state` or
/// `error` parameter without a code means the user backed out. Parameter
/// values are percent-decoded exactly once.
pub fn parse_redirect(url: &str, redirect_marker: &str) -> Option<AuthOutcome> {
    if !url.contains(redirect_marker) {
        return None;
    }
    let parsed = Url::parse(url).ok()?;

    let mut cancelled = false;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => return Some(AuthOutcome::Succeeded(value.into_owned())),
            "state" | "error" => cancelled = true,
            _ => {}
        }
    }

    if cancelled {
        Some(AuthOutcome::Cancelled)
    } else {
        None
    }
}

/// Something that shows the authorization page and reports where it goes.
///
/// Implementations call [`AuthorizationSession::on_url_changed`] for every
/// URL the page reaches and return once the session is finished or the
/// user gave up. Returning with an unfinished session counts as
/// cancellation.
#[async_trait]
pub trait AuthorizationSurface: Send {
    async fn run(&mut self, session: &mut AuthorizationSession) -> Result<()>;
}

/// Drive `surface` until the session reaches a terminal state.
pub async fn authorize(
    config: &NumistaConfig,
    surface: &mut dyn AuthorizationSurface,
) -> Result<AuthOutcome> {
    let mut session = AuthorizationSession::new(config)?;
    tracing::debug!(url = %session.authorization_url(), "starting authorization");
    surface.run(&mut session).await?;
    Ok(session.finish())
}

/// Terminal-based surface.
///
/// Prints the authorization URL and reads the URLs the browser landed on,
/// one per line. An empty line or end of input cancels.
pub struct ConsoleSurface<R, W> {
    input: R,
    output: W,
}

impl ConsoleSurface<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stderr(),
        )
    }
}

impl<R, W> ConsoleSurface<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

#[async_trait]
impl<R, W> AuthorizationSurface for ConsoleSurface<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn run(&mut self, session: &mut AuthorizationSession) -> Result<()> {
        let prompt = format!(
            "Open this URL in your browser and grant access:\n\n  {}\n\n\
             Then paste the address the browser ended on (empty line to cancel):\n",
            session.authorization_url()
        );
        self.output.write_all(prompt.as_bytes()).await?;
        self.output.flush().await?;

        let mut lines = (&mut self.input).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            if session.on_url_changed(line).is_some() {
                break;
            }
            self.output
                .write_all(b"That is not the redirect address, try again:\n")
                .await?;
            self.output.flush().await?;
        }
        Ok(())
    }
}

/// Surface that replays a fixed sequence of page URLs.
///
/// Used when the code was obtained out of band (`coins import --code`).
pub struct ReplaySurface {
    urls: Vec<String>,
    code: Option<String>,
}

impl ReplaySurface {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls, code: None }
    }

    /// Replay a successful redirect for an already known code.
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            urls: Vec::new(),
            code: Some(code.into()),
        }
    }
}

#[async_trait]
impl AuthorizationSurface for ReplaySurface {
    async fn run(&mut self, session: &mut AuthorizationSession) -> Result<()> {
        if let Some(code) = self.code.take() {
            let mut url = Url::parse(&session.redirect_url(""))
                .context("invalid redirect URL")?;
            url.query_pairs_mut().append_pair("code", &code);
            session.on_url_changed(url.as_str());
            return Ok(());
        }
        for url in self.urls.drain(..) {
            if session.on_url_changed(&url).is_some() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "api/local?";

    fn config(locale: &str) -> NumistaConfig {
        NumistaConfig {
            locale: locale.to_string(),
            ..NumistaConfig::default()
        }
    }

    #[test]
    fn authorization_url_uses_language_and_fixed_params() {
        let session = AuthorizationSession::new(&config("fr")).unwrap();
        assert_eq!(
            session.authorization_url(),
            "https://fr.numista.com/api/oauth_authorize.php?response_type=code\
             &client_id=opennumismat&redirect_uri=local&scope=view_collection"
        );
    }

    #[test]
    fn unsupported_locale_uses_fallback_host() {
        let session = AuthorizationSession::new(&config("de")).unwrap();
        assert!(session
            .authorization_url()
            .starts_with("https://en.numista.com/"));
    }

    #[test]
    fn code_extracted_up_to_next_param() {
        assert_eq!(
            parse_redirect("https://en.numista.com/api/local?code=abc123&state=x", MARKER),
            Some(AuthOutcome::Succeeded("abc123".into()))
        );
    }

    #[test]
    fn code_extracted_to_end_of_url() {
        assert_eq!(
            parse_redirect("https://en.numista.com/api/local?code=abc123", MARKER),
            Some(AuthOutcome::Succeeded("abc123".into()))
        );
    }

    #[test]
    fn code_is_percent_decoded_once() {
        assert_eq!(
            parse_redirect("https://en.numista.com/api/local?code=a%26b%23c%2520&state=x", MARKER),
            Some(AuthOutcome::Succeeded("a&b#c%20".into()))
        );
    }

    #[test]
    fn fragment_is_not_part_of_code() {
        assert_eq!(
            parse_redirect("https://en.numista.com/api/local?code=abc#section", MARKER),
            Some(AuthOutcome::Succeeded("abc".into()))
        );
    }

    #[test]
    fn state_without_code_is_cancelled() {
        assert_eq!(
            parse_redirect("https://en.numista.com/api/local?state=denied", MARKER),
            Some(AuthOutcome::Cancelled)
        );
        assert_eq!(
            parse_redirect("https://en.numista.com/api/local?error=access_denied", MARKER),
            Some(AuthOutcome::Cancelled)
        );
    }

    #[test]
    fn unrelated_urls_are_not_terminal() {
        assert_eq!(
            parse_redirect("https://en.numista.com/api/oauth_authorize.php?code=zzz", MARKER),
            None
        );
        assert_eq!(parse_redirect("https://en.numista.com/api/local?", MARKER), None);
    }

    #[test]
    fn first_terminal_state_wins() {
        let mut session = AuthorizationSession::new(&config("en")).unwrap();
        assert!(session.on_url_changed("https://en.numista.com/login").is_none());
        session.on_url_changed("https://en.numista.com/api/local?code=first");
        session.on_url_changed("https://en.numista.com/api/local?code=second");
        assert_eq!(session.finish(), AuthOutcome::Succeeded("first".into()));
    }

    #[test]
    fn unfinished_session_is_cancelled() {
        let session = AuthorizationSession::new(&config("en")).unwrap();
        assert_eq!(session.finish(), AuthOutcome::Cancelled);
    }

    #[test]
    fn clicked_links_open_externally() {
        let session = AuthorizationSession::new(&config("en")).unwrap();
        assert_eq!(
            session.on_navigation("https://en.numista.com/help", NavigationKind::LinkClicked),
            NavigationDecision::OpenExternally
        );
        assert_eq!(
            session.on_navigation("https://en.numista.com/help", NavigationKind::Other),
            NavigationDecision::Load
        );
        assert_eq!(
            session.on_navigation(
                "https://en.numista.com/api/local?code=1",
                NavigationKind::LinkClicked
            ),
            NavigationDecision::Load
        );
    }

    #[test]
    fn certificate_relaxation_is_opt_in() {
        let session = AuthorizationSession::new(&config("en")).unwrap();
        assert!(!session.accept_invalid_certs());

        let mut relaxed = config("en");
        relaxed.auth.accept_invalid_certs = true;
        let session = AuthorizationSession::new(&relaxed).unwrap();
        assert!(session.accept_invalid_certs());
    }

    #[tokio::test]
    async fn replay_with_code_succeeds() {
        let mut surface = ReplaySurface::with_code("xyz");
        let outcome = authorize(&config("fr"), &mut surface).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Succeeded("xyz".into()));
    }

    #[tokio::test]
    async fn replay_keeps_reserved_characters_in_code() {
        let mut surface = ReplaySurface::with_code("a&b#c d");
        let outcome = authorize(&config("en"), &mut surface).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Succeeded("a&b#c d".into()));
    }

    #[tokio::test]
    async fn replay_without_redirect_is_cancelled() {
        let mut surface = ReplaySurface::new(vec!["https://en.numista.com/login".into()]);
        let outcome = authorize(&config("en"), &mut surface).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Cancelled);
    }

    #[tokio::test]
    async fn console_reads_until_redirect() {
        let input: &[u8] = b"https://en.numista.com/login\nhttps://en.numista.com/api/local?code=c0de\n";
        let mut output = Vec::new();
        let mut surface = ConsoleSurface::new(input, &mut output);
        let outcome = authorize(&config("en"), &mut surface).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Succeeded("c0de".into()));
        drop(surface);
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("oauth_authorize.php"));
        assert!(shown.contains("try again"));
    }

    #[tokio::test]
    async fn console_empty_line_cancels() {
        let input: &[u8] = b"\n";
        let mut surface = ConsoleSurface::new(input, Vec::new());
        let outcome = authorize(&config("en"), &mut surface).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Cancelled);
    }
}
