use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use crate::blockstore::BlockStore;
use crate::committer::Committer;
use crate::errors::LedgerResult;
use crate::queue::BlockQueue;
use crate::recovery::Recoverer;
use crate::types::Block;
use crate::validator::BlockValidator;
use crate::worldstate::WorldState;

/// How long one dequeue attempt waits before the worker re-checks the stop
/// flag.
const DEQUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ProcessorConfig {
    pub block_queue: Arc<BlockQueue>,
    pub block_store: Arc<BlockStore>,
    pub worldstate: Arc<WorldState>,
}

/// The single consumer of the block queue: recovers the stores on startup,
/// then validates and commits inbound blocks strictly in order. A terminal
/// error crashes the worker; the process is expected to restart and let
/// recovery repair any one-block divergence.
pub struct BlockProcessor {
    queue: Arc<BlockQueue>,
    validator: BlockValidator,
    committer: Committer,
    recoverer: Recoverer,
    stop: Arc<AtomicBool>,
}

impl BlockProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        let committer = Committer::new(config.block_store.clone(), config.worldstate.clone());
        let recoverer = Recoverer::new(
            config.block_store,
            config.worldstate.clone(),
            committer.clone(),
        );
        Self {
            queue: config.block_queue,
            validator: BlockValidator::new(config.worldstate),
            committer,
            recoverer,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs recovery and then the processing loop until a stop is requested.
    /// Any returned error is terminal.
    pub fn run(&self) -> LedgerResult<()> {
        self.recoverer.recover()?;

        loop {
            if self.stop.load(Ordering::Acquire) {
                info!("block processor stopped");
                return Ok(());
            }
            let Some(block) = self.queue.dequeue_timeout(DEQUEUE_POLL_INTERVAL) else {
                continue;
            };
            self.process_block(block)?;
        }
    }

    fn process_block(&self, mut block: Block) -> LedgerResult<()> {
        let number = block.number();
        debug!(number, tx_count = block.tx_count(), "validating block");
        self.validator.validate(&mut block)?;
        self.committer.commit_block(&block)?;
        info!(number, "committed block");
        Ok(())
    }

    /// Spawns the worker thread and hands back its controls. The thread
    /// panics on a terminal error so that the process dies rather than limp
    /// on with diverged stores.
    pub fn start(self) -> LedgerResult<ProcessorHandle> {
        let queue = self.queue.clone();
        let stop = self.stop.clone();
        let thread = thread::Builder::new()
            .name("block-processor".to_string())
            .spawn(move || {
                if let Err(err) = self.run() {
                    panic!("{err}");
                }
            })?;
        Ok(ProcessorHandle {
            queue,
            stop,
            thread,
        })
    }
}

/// Owner handle for a running processor: enqueue blocks, observe the queue,
/// and stop cooperatively. Restarting after a stop means building a fresh
/// `BlockProcessor` (with a fresh queue) over the same stores.
pub struct ProcessorHandle {
    queue: Arc<BlockQueue>,
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl ProcessorHandle {
    /// Hands a block to the worker, waiting if the queue is full. Returns
    /// `false` once the queue has been closed by `stop`.
    pub fn enqueue(&self, block: Block) -> bool {
        self.queue.enqueue(block)
    }

    /// Whether the inbound queue has been fully drained. A drained queue
    /// does not imply the last block finished committing; poll the stores
    /// for that.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Signals the worker and waits for it to acknowledge by terminating. A
    /// block mid-commit is finished first; a worker that died on a terminal
    /// error re-raises its panic here.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Release);
        self.queue.close();
        if let Err(panic) = self.thread.join() {
            std::panic::resume_unwind(panic);
        }
    }
}
