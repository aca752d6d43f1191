#![allow(dead_code)]

use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gridproof_common::observability::{LogConfig, LogFormat};
use gridproof_common::wait::{WaitConfig, poll_until};
use gridproof_common::{GridproofError, Result};
use gridproof_drivers::{BrowserDriver, Target};
use gridproof_flow::artifact::PNG_SIGNATURE;
use gridproof_flow::step::BOARD_CELL_SELECTOR;
use url::Url;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "gridproof-tests",
            log_dir: Some(std::env::temp_dir().join("gridproof-tests")),
            emit_stderr: true,
            format: if std::env::var("GRIDPROOF_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
        };

        gridproof_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Fast waits so failure paths finish quickly.
pub fn short_wait() -> WaitConfig {
    WaitConfig::new(Duration::from_millis(150), Duration::from_millis(10))
}

/// How the simulated app behaves.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub has_new_game: bool,
    pub difficulties: Vec<&'static str>,
    /// Delay between starting a puzzle and the board filling; `None` never fills.
    pub fill_after: Option<Duration>,
    pub fail_navigation: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            has_new_game: true,
            difficulties: vec!["Easy", "Medium", "Hard", "Very Hard", "Insane"],
            fill_after: Some(Duration::ZERO),
            fail_navigation: false,
        }
    }
}

#[derive(Debug, Default)]
struct AppState {
    loaded: bool,
    dialog_open: bool,
    difficulty: Option<String>,
    puzzle_started: Option<Instant>,
    closed: bool,
    events: Vec<String>,
    value_probes: usize,
    empty_after_start: usize,
    board_at_start: Option<String>,
}

/// In-memory stand-in for the Sudoku page behind a browser session.
///
/// Puzzle buttons only exist once the New Game dialog is open and a
/// difficulty has been picked, as in the real app.
pub struct FakeSudokuApp {
    behaviour: Behaviour,
    state: Mutex<AppState>,
}

impl FakeSudokuApp {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            state: Mutex::new(AppState::default()),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn value_probes(&self) -> usize {
        self.state.lock().unwrap().value_probes
    }

    /// Board reads after a puzzle was started that still saw an empty cell.
    pub fn empty_reads_after_start(&self) -> usize {
        self.state.lock().unwrap().empty_after_start
    }

    /// First cell value observed just before a puzzle button was clicked.
    pub fn board_at_start(&self) -> Option<String> {
        self.state.lock().unwrap().board_at_start.clone()
    }

    fn log(&self, event: String) {
        self.state.lock().unwrap().events.push(event);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.lock().unwrap().closed {
            return Err(GridproofError::Session("session already closed".into()));
        }
        Ok(())
    }

    fn button_visible(&self, name: &str) -> bool {
        let state = self.state.lock().unwrap();
        if !state.loaded {
            return false;
        }
        match name {
            "New Game" => self.behaviour.has_new_game,
            _ => {
                state.dialog_open
                    && state.difficulty.is_some()
                    && (1..=10).any(|i| name == format!("New Puzzle {i}"))
            }
        }
    }

    fn board_value(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        if !state.loaded {
            return None;
        }
        let filled = match (state.puzzle_started, self.behaviour.fill_after) {
            (Some(started), Some(delay)) => started.elapsed() >= delay,
            _ => false,
        };
        Some(if filled { "7".into() } else { String::new() })
    }
}

#[async_trait]
impl BrowserDriver for FakeSudokuApp {
    async fn navigate(&self, url: &Url) -> Result<()> {
        self.ensure_open()?;
        self.log(format!("navigate {url}"));
        if self.behaviour.fail_navigation {
            return Err(GridproofError::Navigation(format!("{url}: net::ERR_FILE_NOT_FOUND")));
        }
        let mut state = self.state.lock().unwrap();
        state.loaded = true;
        state.dialog_open = false;
        state.difficulty = None;
        state.puzzle_started = None;
        Ok(())
    }

    async fn click(&self, target: &Target, wait: WaitConfig) -> Result<()> {
        self.ensure_open()?;
        let Target::Role { role, name } = target else {
            return Err(GridproofError::ElementNotFound {
                target: target.to_string(),
                timeout_ms: wait.timeout_ms(),
            });
        };
        let found = poll_until(wait, || async move {
            Ok::<_, GridproofError>((role == "button" && self.button_visible(name)).then_some(()))
        })
        .await?;
        if found.is_none() {
            return Err(GridproofError::ElementNotFound {
                target: target.to_string(),
                timeout_ms: wait.timeout_ms(),
            });
        }

        self.log(format!("click {name}"));
        let before = self.board_value();
        let mut state = self.state.lock().unwrap();
        if name == "New Game" {
            state.dialog_open = true;
        } else {
            state.board_at_start = before;
            state.dialog_open = false;
            state.puzzle_started = Some(Instant::now());
        }
        Ok(())
    }

    async fn select_option(&self, target: &Target, option: &str, wait: WaitConfig) -> Result<()> {
        self.ensure_open()?;
        let visible = poll_until(wait, || async move {
            let state = self.state.lock().unwrap();
            let hit = state.dialog_open && *target == Target::label("Difficulty");
            Ok::<_, GridproofError>(hit.then_some(()))
        })
        .await?;
        if visible.is_none() {
            return Err(GridproofError::ElementNotFound {
                target: target.to_string(),
                timeout_ms: wait.timeout_ms(),
            });
        }
        if !self.behaviour.difficulties.iter().any(|d| *d == option) {
            return Err(GridproofError::OptionNotFound {
                target: target.to_string(),
                option: option.to_string(),
            });
        }
        self.log(format!("select {option}"));
        self.state.lock().unwrap().difficulty = Some(option.to_string());
        Ok(())
    }

    async fn read_value(&self, target: &Target) -> Result<Option<String>> {
        self.ensure_open()?;
        self.state.lock().unwrap().value_probes += 1;
        if *target != Target::css(BOARD_CELL_SELECTOR) {
            return Ok(None);
        }
        let value = self.board_value();
        let mut state = self.state.lock().unwrap();
        if state.puzzle_started.is_some() && value.as_deref() == Some("") {
            state.empty_after_start += 1;
        }
        Ok(value)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.log("screenshot".into());
        let state = self.state.lock().unwrap();
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(state.difficulty.as_deref().unwrap_or("none").as_bytes());
        Ok(png)
    }

    async fn close(&self) -> Result<()> {
        self.log("close".into());
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
