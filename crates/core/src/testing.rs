//! In-memory API fakes for engine tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::board::Board;
use crate::error::Error;
use crate::remote::{BoardApi, TaskApi};
use crate::sync::Confirm;
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::Result;

/// Answers every confirmation prompt the same way
pub struct Always(pub bool);

#[async_trait]
impl Confirm for Always {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[derive(Default)]
struct Failures {
    lists: AtomicBool,
    creates: AtomicBool,
    updates: AtomicBool,
    deletes: AtomicBool,
    network: AtomicBool,
}

impl Failures {
    fn check(&self, flag: &AtomicBool) -> Result<()> {
        if !flag.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.network.load(Ordering::SeqCst) {
            Err(Error::Network("connection refused".into()))
        } else {
            Err(Error::http(500, Some("Database unavailable".into())))
        }
    }
}

#[derive(Default)]
pub struct FakeTaskApi {
    tasks: Mutex<Vec<Task>>,
    calls: Mutex<Vec<String>>,
    failures: Failures,
    next_id: AtomicUsize,
    update_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeTaskApi {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    pub fn fail_lists(&self, fail: bool) {
        self.failures.lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_creates(&self, fail: bool) {
        self.failures.creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.failures.updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.failures.deletes.store(fail, Ordering::SeqCst);
    }

    /// Injected failures come back as network errors instead of HTTP 500
    pub fn fail_with_network(&self, network: bool) {
        self.failures.network.store(network, Ordering::SeqCst);
    }

    /// Hold every update until the returned notify fires
    pub fn gate_updates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.update_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn count_calls(&self, kind: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == kind).count()
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn server_task(&self, id: &str) -> Option<Task> {
        self.server_tasks().into_iter().find(|t| t.id == id)
    }

    fn record(&self, kind: &str) {
        self.calls.lock().unwrap().push(kind.to_string());
    }
}

#[async_trait]
impl TaskApi for FakeTaskApi {
    async fn list_tasks(&self, _board_id: &str) -> Result<Vec<Task>> {
        self.record("list");
        self.failures.check(&self.failures.lists)?;
        Ok(self.server_tasks())
    }

    async fn create_task(&self, board_id: &str, draft: &TaskDraft) -> Result<()> {
        self.record("create");
        self.failures.check(&self.failures.creates)?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut task = Task::new(format!("task-{}", n + 1), draft.title.clone());
        task.board_id = Some(board_id.to_string());
        task.description = draft.description.clone();
        task.progress = draft.progress;
        task.reminder_date_time = draft.reminder_date_time;
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()> {
        self.record("update");
        let gate = self.update_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.failures.check(&self.failures.updates)?;
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::http(404, Some("Task not found".into())))?;
        patch.apply(task);
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.record("delete");
        self.failures.check(&self.failures.deletes)?;
        self.tasks.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBoardApi {
    boards: Mutex<Vec<Board>>,
    calls: Mutex<Vec<String>>,
    failures: Failures,
    next_id: AtomicUsize,
    mutation_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeBoardApi {
    pub fn with_boards(boards: Vec<Board>) -> Self {
        Self {
            boards: Mutex::new(boards),
            ..Self::default()
        }
    }

    pub fn fail_lists(&self, fail: bool) {
        self.failures.lists.store(fail, Ordering::SeqCst);
    }

    /// Fail creates, renames and deletes
    pub fn fail_mutations(&self, fail: bool) {
        self.failures.creates.store(fail, Ordering::SeqCst);
        self.failures.updates.store(fail, Ordering::SeqCst);
        self.failures.deletes.store(fail, Ordering::SeqCst);
    }

    /// Hold every rename and delete until the returned notify fires
    pub fn gate_mutations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.mutation_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn count_calls(&self, kind: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == kind).count()
    }

    fn record(&self, kind: &str) {
        self.calls.lock().unwrap().push(kind.to_string());
    }

    async fn wait_for_gate(&self) {
        let gate = self.mutation_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl BoardApi for FakeBoardApi {
    async fn list_boards(&self) -> Result<Vec<Board>> {
        self.record("list");
        self.failures.check(&self.failures.lists)?;
        Ok(self.boards.lock().unwrap().clone())
    }

    async fn create_board(&self, name: &str) -> Result<()> {
        self.record("create");
        self.failures.check(&self.failures.creates)?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.boards
            .lock()
            .unwrap()
            .push(Board::new(format!("board-{}", n + 1), name));
        Ok(())
    }

    async fn rename_board(&self, id: &str, name: &str) -> Result<()> {
        self.record("rename");
        self.wait_for_gate().await;
        self.failures.check(&self.failures.updates)?;
        let mut boards = self.boards.lock().unwrap();
        let board = boards
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::http(404, Some("Board not found".into())))?;
        board.name = name.to_string();
        Ok(())
    }

    async fn delete_board(&self, id: &str) -> Result<()> {
        self.record("delete");
        self.wait_for_gate().await;
        self.failures.check(&self.failures.deletes)?;
        self.boards.lock().unwrap().retain(|b| b.id != id);
        Ok(())
    }
}
