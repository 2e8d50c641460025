// MIT License

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ModuleConfig;
use crate::constants::{
    INIT_STAGE_READY, MARKER_INIT_STAGE_PREFIX, MARKER_INIT_STAGE_SUFFIX,
    MARKER_LOGGED_USER_PREFIX, MARKER_LOGGED_USER_SUFFIX, MARKER_SESSION_TOKEN_PREFIX,
    MARKER_SESSION_TOKEN_SUFFIX, MSG_ATTEMPT_CEILING, PAGE_AUTH, PAGE_INDEX, PAGE_LOGIN,
    PAGE_LOGOUT, PAGE_STATUS, PAGE_WAIT, SESSION_TOKEN_LEN,
};
use crate::crypto::derive_credentials;
use crate::error::{ParadoxError, Result};
use crate::queue::{ArmMode, CommandItem, CommandQueue};
use crate::scrape::extract_between;
use crate::status::StatusSnapshot;
use crate::terminology::TerminologyCache;
use crate::transport::Transport;

/// Opaque per-cycle session identifier issued by the module's login page.
///
/// Valid tokens are always exactly 16 characters; anything else means the
/// page was scraped wrong or the module refused a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() != SESSION_TOKEN_LEN {
            return Err(ParadoxError::InvalidToken { length: raw.len() });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where the session currently stands in the multi-step login protocol.
///
/// Strictly forward-progressing; any failure resets to `LoggedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    LoggedOut,
    SessionIdRetrieved,
    Authenticated,
    LoggedIn,
}

/// Session and protocol engine for one Paradox IP module.
///
/// Single-threaded cooperative: the caller invokes [`process`](Self::process)
/// on a regular cadence and each call advances the session by at most one
/// protocol step. The engine owns the login phase, the terminology cache and
/// the command queue exclusively; nothing else mutates them.
///
/// # Example
///
/// ```no_run
/// use paradox_web_bridge::{CommandItem, HttpTransport, ModuleConfig, ParadoxPanel};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ModuleConfig::builder()
///         .hostname("192.168.1.123")
///         .module_password("paradox")
///         .user_pin("1234")
///         .build();
///
///     let transport = HttpTransport::new(&config)?;
///     let mut panel = ParadoxPanel::new(config, transport);
///
///     panel.enqueue(CommandItem::RefreshStatus);
///     loop {
///         if let Err(e) = panel.process().await {
///             eprintln!("step failed: {e}");
///         }
///         if let Some(snapshot) = panel.take_latest_snapshot() {
///             println!("{}", serde_json::to_string(&snapshot)?);
///             break;
///         }
///         tokio::time::sleep(std::time::Duration::from_secs(1)).await;
///     }
///     Ok(())
/// }
/// ```
pub struct ParadoxPanel<T: Transport> {
    config: ModuleConfig,
    transport: T,
    phase: LoginPhase,
    session_token: Option<SessionToken>,
    terminology: TerminologyCache,
    queue: CommandQueue,
    latest_snapshot: Option<StatusSnapshot>,
    snapshot_consumed: bool,
    last_path: Option<String>,
    init_deadline: Option<Instant>,
    init_polled: bool,
    init_last_stage: u32,
}

impl<T: Transport> ParadoxPanel<T> {
    pub fn new(config: ModuleConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            phase: LoginPhase::LoggedOut,
            session_token: None,
            terminology: TerminologyCache::new(),
            queue: CommandQueue::new(),
            latest_snapshot: None,
            snapshot_consumed: true,
            last_path: None,
            init_deadline: None,
            init_polled: false,
            init_last_stage: 0,
        }
    }

    /// Queue a command for execution. Duplicate kinds are ignored.
    pub fn enqueue(&mut self, item: CommandItem) {
        self.queue.enqueue(item);
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn terminology(&self) -> &TerminologyCache {
        &self.terminology
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Hand off the most recent snapshot, once.
    ///
    /// After a successful status refresh this returns the snapshot exactly
    /// one time; further calls return `None` until the next refresh. The
    /// engine keeps the snapshot internally (see
    /// [`last_snapshot`](Self::last_snapshot)) so one-shot consumption
    /// never loses diagnostics.
    pub fn take_latest_snapshot(&mut self) -> Option<StatusSnapshot> {
        if self.snapshot_consumed {
            return None;
        }
        self.snapshot_consumed = true;
        self.latest_snapshot.clone()
    }

    /// The last snapshot scraped this process lifetime, consumed or not.
    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        self.latest_snapshot.as_ref()
    }

    /// Advance the session by one step: at most one protocol transition,
    /// driven by the head of the command queue.
    ///
    /// With an empty queue the only work is tearing down a lingering
    /// session. Any step failure resets the engine to `LoggedOut` (caches
    /// cleared, best-effort logout issued) and surfaces the originating
    /// error; the next call starts a fresh login cycle.
    pub async fn process(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            if self.phase != LoginPhase::LoggedOut {
                self.logout().await;
            }
            return Ok(());
        }

        let step = match self.phase {
            LoginPhase::LoggedOut => self.step_get_session_id().await,
            LoginPhase::SessionIdRetrieved => self.step_authenticate().await,
            LoginPhase::Authenticated => self.step_wait_module_init().await,
            LoginPhase::LoggedIn => return self.step_execute_queued().await,
        };

        match step {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail_session(e).await),
        }
    }

    /// Fetch the login page and extract the session token.
    async fn step_get_session_id(&mut self) -> Result<()> {
        info!("Logging in: requesting session id");
        let body = self.get(PAGE_LOGIN).await?;

        if body.contains(MSG_ATTEMPT_CEILING) {
            return Err(ParadoxError::AttemptCeilingReached);
        }

        if let Some(user) =
            extract_between(&body, MARKER_LOGGED_USER_PREFIX, MARKER_LOGGED_USER_SUFFIX)
            && !user.is_empty()
        {
            return Err(ParadoxError::AlreadyLoggedIn {
                user: user.to_string(),
            });
        }

        let raw = extract_between(&body, MARKER_SESSION_TOKEN_PREFIX, MARKER_SESSION_TOKEN_SUFFIX)
            .unwrap_or("")
            .trim();
        let token = SessionToken::parse(raw)?;
        debug!("Session id retrieved");
        self.session_token = Some(token);
        self.phase = LoginPhase::SessionIdRetrieved;
        Ok(())
    }

    /// Derive credentials from the current token and request the
    /// authenticated page. The response body is encoded and not inspected;
    /// real verification happens during module-init polling.
    async fn step_authenticate(&mut self) -> Result<()> {
        info!("Logging in: authenticating");
        let token = self
            .session_token
            .clone()
            .ok_or(ParadoxError::InvalidToken { length: 0 })?;
        let creds = derive_credentials(
            &self.config.user_pin,
            &self.config.module_password,
            token.as_str(),
        );

        let path = format!("{}?u={}&p={}", PAGE_AUTH, creds.user, creds.pass);
        self.get(&path).await?;

        self.phase = LoginPhase::Authenticated;
        self.init_deadline = Some(
            Instant::now() + Duration::from_millis(self.config.init_timeout_ms),
        );
        self.init_polled = false;
        self.init_last_stage = 0;
        Ok(())
    }

    /// Poll the wait page once. Stage 4 means the module finished loading
    /// panel data and the session is usable; any other stage leaves the
    /// phase unchanged until the deadline armed at authentication expires.
    async fn step_wait_module_init(&mut self) -> Result<()> {
        let pre_delay = if self.init_polled {
            Duration::from_millis(self.config.init_poll_delay_ms)
        } else {
            Duration::ZERO
        };
        let body = self.get_with_delay(PAGE_WAIT, pre_delay).await?;
        self.init_polled = true;

        let stage = extract_between(&body, MARKER_INIT_STAGE_PREFIX, MARKER_INIT_STAGE_SUFFIX)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(0);
        self.init_last_stage = stage;
        debug!("Module init stage: {stage}");

        if stage == INIT_STAGE_READY {
            info!("Logged in: module ready");
            self.phase = LoginPhase::LoggedIn;
            self.init_deadline = None;
            return Ok(());
        }

        match self.init_deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(ParadoxError::ModuleInitTimeout { last_stage: stage })
            }
            _ => Ok(()),
        }
    }

    /// Execute the head command. Actively executed commands are popped
    /// whether they succeed or fail, so a poison command cannot wedge the
    /// queue; failures still tear the session down.
    async fn step_execute_queued(&mut self) -> Result<()> {
        let Some(item) = self.queue.peek_front().cloned() else {
            return Ok(());
        };

        let result = match &item {
            CommandItem::RefreshStatus => self.refresh_status().await,
            CommandItem::ArmArea { area, mode } => self.arm_area(area, *mode).await,
            CommandItem::KeepAlive => self.keep_alive().await,
        };

        self.queue.pop_front();
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail_session(e).await),
        }
    }

    /// Fetch the landing page's name tables once per session.
    async fn ensure_terminology(&mut self) -> Result<()> {
        if self.terminology.is_loaded() {
            return Ok(());
        }
        debug!("Fetching control panel terminology");
        let body = self.get(PAGE_INDEX).await?;
        self.terminology.load_from_body(&body)
    }

    async fn refresh_status(&mut self) -> Result<()> {
        info!("Refreshing control panel status");
        self.ensure_terminology().await?;
        let body = self.get(PAGE_STATUS).await?;
        let snapshot = StatusSnapshot::scrape(&body, &self.terminology)?;
        self.latest_snapshot = Some(snapshot);
        self.snapshot_consumed = false;
        Ok(())
    }

    async fn arm_area(&mut self, area: &str, mode: ArmMode) -> Result<()> {
        info!("Arming area '{area}' ({mode:?})");
        self.ensure_terminology().await?;

        let index = self
            .terminology
            .area_index(area)
            .ok_or_else(|| ParadoxError::UnknownArea {
                name: area.to_string(),
            })?;

        // The module wants the zero-based declared index, zero-padded to
        // two digits.
        let path = format!("{}?area={:02}&value={}", PAGE_STATUS, index, mode.code());
        // The response is encoded; HTTP 200 is the only success signal.
        self.get(&path).await?;
        Ok(())
    }

    /// Keep-alive step.
    ///
    /// Browser captures show the page involved:
    ///
    /// ```text
    /// GET /keep_alive.html?msgid=1&7886282355404697 HTTP/1.1
    /// Referer: http://192.168.1.123/menu.html
    ///
    /// { "ack":[{ "msgtype":"1", "action":"keepalive"}]}
    /// ```
    ///
    /// The trailing numeric parameter's derivation is unconfirmed, so until
    /// it is this step succeeds without touching the network; the periodic
    /// status refresh keeps the session warm in practice.
    async fn keep_alive(&mut self) -> Result<()> {
        info!("Keeping session alive");
        Ok(())
    }

    /// Tear the session down: one best-effort logout request (its own
    /// failure is ignored), then clear every per-cycle cache.
    async fn logout(&mut self) {
        info!("Logging out");
        if let Err(e) = self.get(PAGE_LOGOUT).await {
            debug!("Logout request failed (ignored): {e}");
        }
        self.phase = LoginPhase::LoggedOut;
        self.session_token = None;
        self.terminology.clear();
        self.init_deadline = None;
        self.init_polled = false;
        self.last_path = None;
    }

    async fn fail_session(&mut self, err: ParadoxError) -> ParadoxError {
        warn!("Session step failed: {err}; resetting session");
        self.logout().await;
        err
    }

    async fn get(&mut self, path: &str) -> Result<String> {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        self.get_with_delay(path, delay).await
    }

    /// Issue one GET, passing the previous request's path as referer (the
    /// module's firmware checks it on some pages).
    async fn get_with_delay(&mut self, path: &str, pre_delay: Duration) -> Result<String> {
        let referer = self.last_path.take();
        let body = self
            .transport
            .get(path, referer.as_deref(), pre_delay)
            .await?;
        self.last_path = Some(path.to_string());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport fed from a script of canned responses; records every
    /// requested path.
    struct MockTransport {
        responses: Mutex<VecDeque<Result<String>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn push_ok(&self, body: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(body.to_string()));
        }

        fn push_err(&self) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(ParadoxError::TransportFailure {
                    details: "injected".to_string(),
                }));
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for &MockTransport {
        async fn get(
            &self,
            path: &str,
            _referer: Option<&str>,
            _pre_delay: Duration,
        ) -> Result<String> {
            self.requests.lock().unwrap().push(path.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ParadoxError::TransportFailure {
                        details: "script exhausted".to_string(),
                    })
                })
        }
    }

    const TOKEN: &str = "ABCDEFGHIJKLMNOP";

    fn login_page(token: &str) -> String {
        format!("<html><script>loginaff(\"{token}\",\"x\");</script></html>")
    }

    fn landing_page() -> String {
        concat!(
            "tbl_areanam = new Array(\"House\",\"Garage\");\n",
            "tbl_zone = new Array(\"1\",\"Front door\",\"2\",\"Garage door\");\n"
        )
        .to_string()
    }

    fn status_page() -> String {
        concat!(
            "tbl_useraccess = new Array(\"2\",\"1\");\n",
            "tbl_statuszone = new Array(\"0\",\"1\");\n"
        )
        .to_string()
    }

    fn panel(mock: &MockTransport) -> ParadoxPanel<&MockTransport> {
        let config = ModuleConfig::builder()
            .hostname("mock")
            .module_password("pw")
            .user_pin("1234")
            .init_poll_delay_ms(0)
            .build();
        ParadoxPanel::new(config, mock)
    }

    #[tokio::test]
    async fn test_end_to_end_login_and_refresh() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        // 1: session id
        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        assert_eq!(panel.phase(), LoginPhase::SessionIdRetrieved);

        // 2: authenticate
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        assert_eq!(panel.phase(), LoginPhase::Authenticated);

        // 3: module ready
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();
        assert_eq!(panel.phase(), LoginPhase::LoggedIn);

        // 4: refresh status (terminology + status pages)
        mock.push_ok(&landing_page());
        mock.push_ok(&status_page());
        panel.process().await.unwrap();
        assert_eq!(panel.phase(), LoginPhase::LoggedIn);
        assert_eq!(panel.queue_len(), 0);

        let snapshot = panel.take_latest_snapshot().unwrap();
        assert_eq!(snapshot.areas.len(), 2);
        assert_eq!(snapshot.areas[0].status_name, "armed");

        let requests = mock.requests();
        assert_eq!(requests[0], PAGE_LOGIN);
        assert!(requests[1].starts_with("default.html?u="));
        assert_eq!(requests[2], PAGE_WAIT);
        assert_eq!(requests[3], PAGE_INDEX);
        assert_eq!(requests[4], PAGE_STATUS);
    }

    #[tokio::test]
    async fn test_snapshot_is_one_shot() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();
        mock.push_ok(&landing_page());
        mock.push_ok(&status_page());
        panel.process().await.unwrap();

        assert!(panel.take_latest_snapshot().is_some());
        assert!(panel.take_latest_snapshot().is_none());
        // Still retained for diagnostics
        assert!(panel.last_snapshot().is_some());
    }

    #[tokio::test]
    async fn test_short_token_is_invalid() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok(&login_page("TOOSHORT"));
        let err = panel.process().await.unwrap_err();
        assert!(matches!(err, ParadoxError::InvalidToken { length: 8 }));
        assert_eq!(panel.phase(), LoginPhase::LoggedOut);
        // Login-phase failure: the command stays queued
        assert_eq!(panel.queue_len(), 1);
    }

    #[test]
    fn test_token_length_check_is_content_independent() {
        assert!(SessionToken::parse("ABCDEFGHIJKLMNOP").is_ok());
        assert!(SessionToken::parse("0123456789abcdef").is_ok());
        for bad in ["", "short", "ABCDEFGHIJKLMNOPQ"] {
            assert!(matches!(
                SessionToken::parse(bad),
                Err(ParadoxError::InvalidToken { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_attempt_ceiling_is_reported() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok("<html>Maximum number of attempts reached.</html>");
        let err = panel.process().await.unwrap_err();
        assert!(matches!(err, ParadoxError::AttemptCeilingReached));
        assert!(err.is_terminal());
        assert_eq!(panel.phase(), LoginPhase::LoggedOut);
    }

    #[tokio::test]
    async fn test_other_user_logged_in() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok("<script>top.cant('installer');</script>");
        let err = panel.process().await.unwrap_err();
        match err {
            ParadoxError::AlreadyLoggedIn { user } => assert_eq!(user, "installer"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failure_at_authenticate_resets() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();

        mock.push_err();
        let err = panel.process().await.unwrap_err();
        assert!(matches!(err, ParadoxError::TransportFailure { .. }));
        assert_eq!(panel.phase(), LoginPhase::LoggedOut);
        assert!(!panel.terminology().is_loaded());
        assert_eq!(panel.queue_len(), 1);
    }

    #[tokio::test]
    async fn test_failure_at_module_init_resets() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();

        mock.push_err();
        panel.process().await.unwrap_err();
        assert_eq!(panel.phase(), LoginPhase::LoggedOut);
        assert!(!panel.terminology().is_loaded());
    }

    #[tokio::test]
    async fn test_failure_while_executing_pops_command() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();

        // Terminology fetch fails mid-execution
        mock.push_err();
        panel.process().await.unwrap_err();
        assert_eq!(panel.phase(), LoginPhase::LoggedOut);
        // Actively executed commands are popped even on failure
        assert_eq!(panel.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_module_init_stays_put_then_times_out() {
        let mock = MockTransport::new();
        let config = ModuleConfig::builder()
            .hostname("mock")
            .init_timeout_ms(3_600_000)
            .init_poll_delay_ms(0)
            .build();
        let mut panel = ParadoxPanel::new(config, &mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();

        // Not ready: no progression, no failure
        mock.push_ok("var prg=2;");
        panel.process().await.unwrap();
        assert_eq!(panel.phase(), LoginPhase::Authenticated);
        mock.push_ok("var prg=3;");
        panel.process().await.unwrap();
        assert_eq!(panel.phase(), LoginPhase::Authenticated);
    }

    #[tokio::test]
    async fn test_module_init_timeout() {
        let mock = MockTransport::new();
        let config = ModuleConfig::builder()
            .hostname("mock")
            .init_timeout_ms(0)
            .init_poll_delay_ms(0)
            .build();
        let mut panel = ParadoxPanel::new(config, &mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();

        mock.push_ok("var prg=1;");
        let err = panel.process().await.unwrap_err();
        assert!(matches!(
            err,
            ParadoxError::ModuleInitTimeout { last_stage: 1 }
        ));
        assert_eq!(panel.phase(), LoginPhase::LoggedOut);
    }

    #[tokio::test]
    async fn test_terminology_fetched_once_per_session() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::RefreshStatus);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();

        mock.push_ok(&landing_page());
        mock.push_ok(&status_page());
        panel.process().await.unwrap();

        // Second refresh in the same session: no terminology request
        panel.enqueue(CommandItem::RefreshStatus);
        mock.push_ok(&status_page());
        panel.process().await.unwrap();

        let index_fetches = mock
            .requests()
            .iter()
            .filter(|p| p.as_str() == PAGE_INDEX)
            .count();
        assert_eq!(index_fetches, 1);
    }

    #[tokio::test]
    async fn test_arm_area_request_format() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::ArmArea {
            area: "garage".to_string(),
            mode: ArmMode::Stay,
        });

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();

        mock.push_ok(&landing_page());
        mock.push_ok("encoded");
        panel.process().await.unwrap();

        // "Garage" is declared second: zero-based index 1, zero-padded
        let requests = mock.requests();
        assert_eq!(requests.last().unwrap(), "statuslive.html?area=01&value=s");
        assert_eq!(panel.queue_len(), 0);
        assert_eq!(panel.phase(), LoginPhase::LoggedIn);
    }

    #[tokio::test]
    async fn test_arm_unknown_area_fails_without_arm_request() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::ArmArea {
            area: "Cellar".to_string(),
            mode: ArmMode::Regular,
        });

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();

        mock.push_ok(&landing_page());
        let err = panel.process().await.unwrap_err();
        assert!(matches!(err, ParadoxError::UnknownArea { .. }));
        // Popped despite failing, and no arm request was issued
        assert_eq!(panel.queue_len(), 0);
        assert!(
            !mock
                .requests()
                .iter()
                .any(|p| p.contains("area=") && p.contains("value="))
        );
    }

    #[tokio::test]
    async fn test_keep_alive_is_noop_success() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::KeepAlive);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();

        let before = mock.requests().len();
        panel.process().await.unwrap();
        assert_eq!(mock.requests().len(), before);
        assert_eq!(panel.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_triggers_logout() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::KeepAlive);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();
        panel.process().await.unwrap(); // consumes KeepAlive

        mock.push_ok("encoded");
        panel.process().await.unwrap();
        assert_eq!(panel.phase(), LoginPhase::LoggedOut);
        assert_eq!(mock.requests().last().unwrap(), PAGE_LOGOUT);

        // Already logged out + empty queue: nothing happens
        let before = mock.requests().len();
        panel.process().await.unwrap();
        assert_eq!(mock.requests().len(), before);
    }

    #[tokio::test]
    async fn test_logout_failure_still_forces_logged_out() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);
        panel.enqueue(CommandItem::KeepAlive);

        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();
        panel.process().await.unwrap();

        mock.push_err();
        panel.process().await.unwrap();
        assert_eq!(panel.phase(), LoginPhase::LoggedOut);
    }

    #[tokio::test]
    async fn test_relogin_after_reset_refetches_terminology() {
        let mock = MockTransport::new();
        let mut panel = panel(&mock);

        // First cycle up to logged in with terminology loaded
        panel.enqueue(CommandItem::RefreshStatus);
        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();
        mock.push_ok(&landing_page());
        mock.push_ok(&status_page());
        panel.process().await.unwrap();
        assert!(panel.terminology().is_loaded());

        // Failure tears everything down
        panel.enqueue(CommandItem::RefreshStatus);
        mock.push_err();
        panel.process().await.unwrap_err();
        assert!(!panel.terminology().is_loaded());

        // Next cycle fetches terminology again
        panel.enqueue(CommandItem::RefreshStatus);
        mock.push_ok(&login_page(TOKEN));
        panel.process().await.unwrap();
        mock.push_ok("encoded");
        panel.process().await.unwrap();
        mock.push_ok("var prg=4;");
        panel.process().await.unwrap();
        mock.push_ok(&landing_page());
        mock.push_ok(&status_page());
        panel.process().await.unwrap();

        let index_fetches = mock
            .requests()
            .iter()
            .filter(|p| p.as_str() == PAGE_INDEX)
            .count();
        assert_eq!(index_fetches, 2);
    }
}
