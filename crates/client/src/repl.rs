//! Line-oriented front end over the sync engines

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, warn};

use tc_core::app::{AppShell, Screen};
use tc_core::board::BoardSyncEngine;
use tc_core::reminder::ReminderTracker;
use tc_core::sync::{Confirm, LoadStatus};
use tc_core::task::{
    DragReorderController, ProgressGesture, TaskDraft, TaskEvent, TaskStatus, TaskSyncEngine,
    TrackBounds,
};
use tc_core::{Error, Result};

/// Width of the virtual progress track used by `progress`
const TRACK_WIDTH: f64 = 100.0;

const REMINDER_POLL: Duration = Duration::from_secs(1);

/// One line of input
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Input {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with email and password
    Login { email: String, password: String },
    /// Create an account
    Signup {
        email: String,
        password: String,
        confirm: String,
    },
    /// Print the Google sign-in URL
    Google,
    Logout,
    /// Reload and list boards
    Boards,
    NewBoard {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    RenameBoard {
        id: String,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    DeleteBoard { id: String },
    /// Open a board by id
    Open { board_id: String },
    /// Return to the dashboard
    Back,
    /// Reload and list tasks of the open board
    Tasks,
    /// Add a task to the open board. Dates are RFC 3339.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long)]
        finish: Option<DateTime<Utc>>,
        #[arg(long)]
        reminder: Option<DateTime<Utc>>,
    },
    /// Move a task one column right
    Next { id: String },
    /// Move a task one column left
    Prev { id: String },
    /// Drop a task on a column (todo, inprogress, done)
    Drag { id: String, column: TaskStatus },
    /// Replay a pointer drag over a track from 0 to 100
    Progress {
        id: String,
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        track_x: Vec<f64>,
    },
    Delete { id: String },
    /// Dismiss the reminder notice
    Dismiss,
    #[command(alias = "exit")]
    Quit,
}

/// Split a line on whitespace, keeping double-quoted runs together
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    args.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        args.push(current);
    }
    args
}

type Lines = Arc<Mutex<mpsc::UnboundedReceiver<String>>>;

/// Feed stdin lines into a channel so prompts and commands share one reader
fn spawn_stdin_reader() -> Lines {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    Arc::new(Mutex::new(rx))
}

/// Asks `[y/N]` and reads the answer from the next input line
struct LinePrompt {
    lines: Lines,
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl Confirm for LinePrompt {
    async fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        let _ = std::io::stdout().flush();
        match self.lines.lock().await.recv().await {
            Some(answer) => is_yes(&answer),
            None => false,
        }
    }
}

enum Next {
    Line(String),
    Tick,
    Closed,
}

pub struct Repl {
    shell: AppShell,
    boards: BoardSyncEngine,
    tasks: TaskSyncEngine,
    events: broadcast::Receiver<TaskEvent>,
    reminders: ReminderTracker,
    drag: DragReorderController,
    lines: Lines,
}

impl Repl {
    pub fn new(shell: AppShell, boards: BoardSyncEngine, tasks: TaskSyncEngine) -> Self {
        let events = tasks.subscribe();
        Self {
            shell,
            boards,
            tasks,
            events,
            reminders: ReminderTracker::default(),
            drag: DragReorderController::new(),
            lines: spawn_stdin_reader(),
        }
    }

    pub async fn run(mut self) {
        self.enter_screen().await;
        self.render().await;

        let mut ticker = tokio::time::interval(REMINDER_POLL);
        loop {
            print!("> ");
            let _ = std::io::stdout().flush();

            let line = match self.next_input(&mut ticker).await {
                Next::Line(line) => line,
                Next::Tick => {
                    self.poll_reminders().await;
                    continue;
                }
                Next::Closed => break,
            };

            let args = split_args(&line);
            if args.is_empty() {
                continue;
            }
            let command = match Input::try_parse_from(args) {
                Ok(input) => input.command,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };
            if matches!(command, Command::Quit) {
                break;
            }

            if let Err(e) = self.execute(command).await {
                debug!("Command failed: {}", e);
                println!("! {}", e.display_message("Something went wrong."));
            }
            if self.shell.process_signals().await {
                self.end_session().await;
            }
            self.celebrate();
            self.render().await;
        }
    }

    async fn next_input(&self, ticker: &mut tokio::time::Interval) -> Next {
        let lines = Arc::clone(&self.lines);
        let mut lines = lines.lock().await;
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => Next::Line(line),
                None => Next::Closed,
            },
            _ = ticker.tick() => Next::Tick,
        }
    }

    fn prompt(&self) -> LinePrompt {
        LinePrompt {
            lines: Arc::clone(&self.lines),
        }
    }

    fn open_board(&self) -> Result<String> {
        match self.shell.screen() {
            Screen::Board { board_id } => Ok(board_id.clone()),
            _ => Err(Error::Validation("Open a board first.".into())),
        }
    }

    fn require_session(&self) -> Result<()> {
        if *self.shell.screen() == Screen::Auth {
            return Err(Error::Validation("Log in first.".into()));
        }
        Ok(())
    }

    /// Load whatever the current screen shows
    async fn enter_screen(&mut self) {
        let result = match self.shell.screen().clone() {
            Screen::Auth => Ok(()),
            Screen::Dashboard => self.boards.load().await,
            Screen::Board { board_id } => self.tasks.load(&board_id).await,
        };
        if let Err(e) = result {
            debug!("Screen load failed: {}", e);
        }
        if self.shell.process_signals().await {
            self.end_session().await;
        }
    }

    /// Drop everything the previous session loaded
    async fn end_session(&mut self) {
        self.boards.reset().await;
        self.tasks.reset().await;
        self.reminders.reset();
        self.drag.end_drag();
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email, password } => {
                self.shell.login(&email, &password).await?;
                self.enter_screen().await;
            }
            Command::Signup {
                email,
                password,
                confirm,
            } => self.shell.signup(&email, &password, &confirm).await?,
            Command::Google => {
                println!("Open this URL to sign in with Google:");
                println!("  {}", self.shell.google_auth_url());
                println!("Then restart with --callback-url <redirected address>.");
            }
            Command::Logout => {
                self.require_session()?;
                self.shell.logout().await;
                self.end_session().await;
            }
            Command::Boards => {
                self.require_session()?;
                self.boards.load().await?;
            }
            Command::NewBoard { name } => {
                self.require_session()?;
                self.boards.create(&name.join(" ")).await?;
            }
            Command::RenameBoard { id, name } => {
                self.require_session()?;
                self.boards.rename(&id, &name.join(" ")).await?;
            }
            Command::DeleteBoard { id } => {
                self.require_session()?;
                let prompt = self.prompt();
                if !self.boards.delete(&id, &prompt).await? {
                    println!("Kept board.");
                }
            }
            Command::Open { board_id } => {
                self.require_session()?;
                self.shell.open_board(board_id)?;
                self.reminders.dismiss();
                self.enter_screen().await;
            }
            Command::Back => {
                self.shell.back_to_dashboard();
                self.enter_screen().await;
            }
            Command::Tasks => {
                let board_id = self.open_board()?;
                self.tasks.load(&board_id).await?;
            }
            Command::Add {
                title,
                description,
                start,
                finish,
                reminder,
            } => {
                self.open_board()?;
                let mut draft = TaskDraft::new(title.join(" "));
                if let Some(description) = description {
                    draft = draft.with_description(description);
                }
                if let Some(at) = start {
                    draft = draft.with_start_date(at);
                }
                if let Some(at) = finish {
                    draft = draft.with_estimated_finish_date(at);
                }
                if let Some(at) = reminder {
                    draft = draft.with_reminder(at);
                }
                self.tasks.add(draft).await?;
            }
            Command::Next { id } => {
                self.open_board()?;
                if !self.tasks.advance(&id).await? {
                    println!("Already in the last column.");
                }
            }
            Command::Prev { id } => {
                self.open_board()?;
                if !self.tasks.retreat(&id).await? {
                    println!("Already in the first column.");
                }
            }
            Command::Drag { id, column } => {
                self.open_board()?;
                self.drag.begin_drag(id);
                self.drag.hover(column);
                let result = self.drag.drop_on(column, &self.tasks).await;
                self.drag.end_drag();
                result?;
            }
            Command::Progress { id, track_x } => {
                self.open_board()?;
                self.replay_progress(&id, &track_x).await?;
            }
            Command::Delete { id } => {
                self.open_board()?;
                let prompt = self.prompt();
                if !self.tasks.remove(&id, &prompt).await? {
                    println!("Kept task.");
                }
            }
            Command::Dismiss => self.reminders.dismiss(),
            Command::Quit => {}
        }
        Ok(())
    }

    /// Press at the first x, move through the rest, release
    async fn replay_progress(&self, id: &str, xs: &[f64]) -> Result<()> {
        let task = self
            .tasks
            .snapshot()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

        let mut gesture = ProgressGesture::for_task(TrackBounds::new(0.0, TRACK_WIDTH), &task);
        let Some((first, rest)) = xs.split_first() else {
            return Ok(());
        };
        if !gesture.start(*first) {
            println!("Progress can only be changed while a task is in progress.");
            return Ok(());
        }
        for x in rest {
            gesture.move_to(*x);
        }
        let value = gesture.live_value();
        if !self.tasks.commit_gesture(id, &mut gesture).await? {
            println!("Progress unchanged at {}%.", value);
        }
        Ok(())
    }

    fn celebrate(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(TaskEvent::Completed { task_id }) => {
                    println!("*** Task {} is done! ***", task_id);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!("Missed {} task events", skipped);
                }
                Err(_) => break,
            }
        }
    }

    async fn poll_reminders(&mut self) {
        if self.open_board().is_err() {
            return;
        }
        let tasks = self.tasks.snapshot().await.tasks;
        if let Some(notice) = self.reminders.scan(&tasks, Utc::now(), Instant::now()) {
            println!();
            println!("[{}] (dismiss to hide)", notice.message);
            print!("> ");
            let _ = std::io::stdout().flush();
        }
    }

    async fn render(&mut self) {
        println!();
        match self.shell.screen().clone() {
            Screen::Auth => self.render_auth(),
            Screen::Dashboard => self.render_dashboard().await,
            Screen::Board { board_id } => self.render_board(&board_id).await,
        }
    }

    fn render_auth(&self) {
        println!("== Sign in ==");
        if let Some(notice) = self.shell.notice() {
            println!("{}", notice);
        }
        if let Some(error) = self.shell.auth_error() {
            println!("! {}", error);
        }
        println!("login <email> <password> | signup <email> <password> <confirm> | google");
    }

    async fn render_dashboard(&self) {
        let set = self.boards.snapshot().await;
        println!("== Boards ==");
        if set.status == LoadStatus::Loading {
            println!("Loading...");
        }
        if let Some(message) = set.error_message() {
            println!("! {}", message);
        }
        if set.boards.is_empty() && set.status == LoadStatus::Loaded {
            println!("No boards yet. Create one with new-board <name>.");
        }
        for board in &set.boards {
            println!("  {}  {}", board.id, board.name);
        }
    }

    async fn render_board(&mut self, board_id: &str) {
        let set = self.tasks.snapshot().await;
        let name = self
            .boards
            .snapshot()
            .await
            .get(board_id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| board_id.to_string());

        println!("== {} ==", name);
        if let Some(message) = set.error_message() {
            println!("! {}", message);
        }
        for status in TaskStatus::ALL {
            let column = set.column(status);
            println!("{} ({})", status.title(), column.len());
            for task in column {
                let marker = if set.is_pending(&task.id) { " ..." } else { "" };
                println!("  - {} [{}] {}%{}", task.title, task.id, task.progress, marker);
                if let Some(description) = &task.description {
                    println!("      {}", description);
                }
            }
        }
        if let Some(notice) = self.reminders.active(Instant::now()) {
            println!("[{}]", notice.message);
        }
    }
}
