use std::collections::VecDeque;
use std::sync::{Arc, mpsc};
use std::thread;

use log::debug;

use crate::api::{BackendResult, ReviewBackend};
use crate::event::AppEvent;
use crate::review::history::HistoryMode;
use crate::review::model::{HistoryPage, OverdueEntry, ReviewSession};
use crate::session::completion::{self, Ticket};

/// Queue requests carry the generation handed out by
/// [`ReviewQueues::mark_loading`](crate::review::queue::ReviewQueues::mark_loading)
/// so late responses can be told apart from current ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendRequest {
    Today { generation: u64 },
    Overdue { generation: u64 },
    Completed { size: u32, generation: u64 },
    History { mode: HistoryMode, page: u32, size: u32 },
    Command(Ticket),
}

#[derive(Debug)]
pub enum BackendEvent {
    Today {
        generation: u64,
        result: BackendResult<Vec<ReviewSession>>,
    },
    Overdue {
        generation: u64,
        result: BackendResult<Vec<OverdueEntry>>,
    },
    Completed {
        generation: u64,
        result: BackendResult<HistoryPage>,
    },
    History {
        mode: HistoryMode,
        page: u32,
        result: BackendResult<HistoryPage>,
    },
    Command {
        ticket: Ticket,
        result: BackendResult<()>,
    },
}

pub fn execute(backend: &dyn ReviewBackend, request: BackendRequest) -> BackendEvent {
    debug!("executing {request:?}");
    match request {
        BackendRequest::Today { generation } => BackendEvent::Today {
            generation,
            result: backend.today_queue(),
        },
        BackendRequest::Overdue { generation } => BackendEvent::Overdue {
            generation,
            result: backend.overdue_queue(),
        },
        BackendRequest::Completed { size, generation } => BackendEvent::Completed {
            generation,
            result: backend.history(0, size),
        },
        BackendRequest::History { mode, page, size } => BackendEvent::History {
            mode,
            page,
            result: backend.history(page, size),
        },
        BackendRequest::Command(ticket) => {
            let result = completion::send(backend, &ticket);
            BackendEvent::Command { ticket, result }
        }
    }
}

/// Where backend calls run. `Threaded` keeps the input loop free and posts
/// results through the event channel; `Inline` calls immediately and parks
/// the result until [`Executor::take_ready`].
pub enum Executor {
    Threaded(mpsc::Sender<AppEvent>),
    Inline(VecDeque<BackendEvent>),
}

impl Executor {
    pub fn inline() -> Self {
        Executor::Inline(VecDeque::new())
    }

    pub fn submit(&mut self, backend: &Arc<dyn ReviewBackend>, request: BackendRequest) {
        match self {
            Executor::Threaded(tx) => {
                let backend = Arc::clone(backend);
                let tx = tx.clone();
                thread::spawn(move || {
                    let event = execute(backend.as_ref(), request);
                    let _ = tx.send(AppEvent::Backend(event));
                });
            }
            Executor::Inline(parked) => parked.push_back(execute(backend.as_ref(), request)),
        }
    }

    pub fn take_ready(&mut self) -> Option<BackendEvent> {
        match self {
            Executor::Threaded(_) => None,
            Executor::Inline(parked) => parked.pop_front(),
        }
    }

    pub fn pending(&self) -> usize {
        match self {
            Executor::Threaded(_) => 0,
            Executor::Inline(parked) => parked.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryBackend;

    #[test]
    fn test_inline_parks_results_in_order() {
        let backend: Arc<dyn ReviewBackend> = Arc::new(MemoryBackend::default());
        let mut executor = Executor::inline();
        executor.submit(&backend, BackendRequest::Today { generation: 1 });
        executor.submit(&backend, BackendRequest::Completed { size: 5, generation: 2 });
        assert_eq!(executor.pending(), 2);
        assert!(matches!(
            executor.take_ready(),
            Some(BackendEvent::Today { generation: 1, result: Ok(_) })
        ));
        assert!(matches!(
            executor.take_ready(),
            Some(BackendEvent::Completed { generation: 2, result: Ok(_) })
        ));
        assert!(executor.take_ready().is_none());
    }

    #[test]
    fn test_threaded_posts_backend_event() {
        let backend: Arc<dyn ReviewBackend> = Arc::new(MemoryBackend::default());
        let (tx, rx) = mpsc::channel();
        let mut executor = Executor::Threaded(tx);
        executor.submit(&backend, BackendRequest::Overdue { generation: 7 });
        match rx.recv().unwrap() {
            AppEvent::Backend(BackendEvent::Overdue {
                generation: 7,
                result: Ok(entries),
            }) => assert!(entries.is_empty()),
            _ => panic!("expected overdue result"),
        }
    }
}
