//! The concurrency substrate under every integrator: a Go-style bounded
//! channel, a wait-group with blocking and spinning flavors, and the
//! persistent worker pool that ties them together.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::debug;

// ─── Bounded Channel ────────────────────────────────────────────────────────

/// A fixed-capacity blocking channel.
///
/// `push` blocks while the buffer is full and the channel is open; `get`
/// blocks while it is empty and open. Closing wakes every waiter: pushes
/// start failing and gets start returning `None`, which is how pool
/// threads learn to exit.
pub struct BufChan<T> {
    inner: Mutex<ChanInner<T>>,
    capacity: usize,
    /// Signaled when data arrives.
    input_cv: Condvar,
    /// Signaled when space frees up.
    output_cv: Condvar,
}

struct ChanInner<T> {
    buffer: VecDeque<T>,
    closed: bool,
}

impl<T> BufChan<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(ChanInner {
                buffer: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            input_cv: Condvar::new(),
            output_cv: Condvar::new(),
        }
    }

    /// Blocks until the value is buffered; returns `false` if the channel
    /// closed instead.
    pub fn push(&self, value: T) -> bool {
        let mut inner = self.inner.lock().unwrap();
        while inner.buffer.len() >= self.capacity && !inner.closed {
            inner = self.output_cv.wait(inner).unwrap();
        }
        if inner.closed {
            return false;
        }

        inner.buffer.push_back(value);
        self.input_cv.notify_one();
        true
    }

    /// Blocks until a value is available; returns `None` once the channel
    /// is closed.
    pub fn get(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        while inner.buffer.is_empty() && !inner.closed {
            inner = self.input_cv.wait(inner).unwrap();
        }
        if inner.closed {
            return None;
        }

        let value = inner.buffer.pop_front();
        self.output_cv.notify_one();
        value
    }

    /// Idempotent; queued items are dropped with the channel.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.input_cv.notify_all();
        self.output_cv.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── Wait Group ─────────────────────────────────────────────────────────────

/// Counts outstanding work items; `wait` returns once the counter hits
/// zero.
///
/// The blocking flavor parks the waiter on a condition variable; the spin
/// flavor busy-waits with a CPU pause hint, which wins when items finish
/// in microseconds.
pub struct WaitGroup {
    count: AtomicIsize,
    mutex: Mutex<()>,
    cv: Condvar,
    spin: bool,
}

impl WaitGroup {
    pub fn new(spin: bool) -> Self {
        Self {
            count: AtomicIsize::new(0),
            mutex: Mutex::new(()),
            cv: Condvar::new(),
            spin,
        }
    }

    pub fn add(&self, delta: usize) {
        self.count.fetch_add(delta as isize, Ordering::SeqCst);
    }

    pub fn done(&self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
        if !self.spin {
            // The lock orders the decrement against a waiter's check, so
            // the notify cannot land between check and sleep.
            let _guard = self.mutex.lock().unwrap();
            self.cv.notify_all();
        }
    }

    pub fn wait(&self) {
        if self.spin {
            while self.count.load(Ordering::SeqCst) > 0 {
                std::hint::spin_loop();
            }
        } else {
            let mut guard = self.mutex.lock().unwrap();
            while self.count.load(Ordering::SeqCst) > 0 {
                guard = self.cv.wait(guard).unwrap();
            }
        }
    }

    pub fn pending(&self) -> isize {
        self.count.load(Ordering::SeqCst)
    }
}

// ─── Worker Pool ────────────────────────────────────────────────────────────

/// Persistent threads draining a bounded channel of work items.
///
/// `split_work` slices an index range into contiguous chunks and registers
/// them with the wait-group before queueing, so a following
/// [`WorkerPool::wait`] returns only after every queued chunk has been
/// processed. `close` is idempotent and dropping the pool closes and
/// joins.
pub struct WorkerPool<T: Send + 'static> {
    worker_fn: Arc<dyn Fn(T) + Send + Sync>,
    channel: Arc<BufChan<T>>,
    wait_group: Arc<WaitGroup>,
    threads: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(worker_fn: impl Fn(T) + Send + Sync + 'static, buffer_size: usize) -> Self {
        Self::with_spin(worker_fn, buffer_size, crate::config::DEFAULT_SPIN)
    }

    pub fn with_spin(
        worker_fn: impl Fn(T) + Send + Sync + 'static,
        buffer_size: usize,
        spin: bool,
    ) -> Self {
        Self {
            worker_fn: Arc::new(worker_fn),
            channel: Arc::new(BufChan::new(buffer_size)),
            wait_group: Arc::new(WaitGroup::new(spin)),
            threads: Vec::new(),
        }
    }

    /// Spawns `n_threads` workers that loop on the channel until it is
    /// closed.
    pub fn do_work(&mut self, n_threads: usize) {
        for _ in 0..n_threads {
            let channel = Arc::clone(&self.channel);
            let wait_group = Arc::clone(&self.wait_group);
            let worker_fn = Arc::clone(&self.worker_fn);

            self.threads.push(thread::spawn(move || {
                while let Some(item) = channel.get() {
                    worker_fn(item);
                    wait_group.done();
                }
            }));
        }
    }

    /// Queues one pre-registered work item. The caller must have accounted
    /// for it via [`WorkerPool::add_pending`] (or use `split_work`).
    pub fn queue_work(&self, item: T) {
        let _ = self.channel.push(item);
    }

    pub fn add_pending(&self, count: usize) {
        self.wait_group.add(count);
    }

    /// Divides `[0, total)` into chunks of `divide` (the last chunk takes
    /// the remainder; a total smaller than one chunk still yields one
    /// item) and queues `make_item(start, end)` for each.
    pub fn split_work(&self, total: usize, divide: usize, make_item: impl Fn(usize, usize) -> T) {
        if total == 0 {
            return;
        }

        let divide = divide.max(1);
        let segments = total / divide;
        if segments == 0 {
            self.add_pending(1);
            self.queue_work(make_item(0, total));
            return;
        }

        let excess = total % divide;
        self.add_pending(segments);
        for i in 0..segments {
            let start = i * divide;
            let mut end = start + divide;
            if i + 1 == segments {
                end += excess;
            }
            self.queue_work(make_item(start, end));
        }
    }

    /// Blocks until every registered item has completed.
    pub fn wait(&self) {
        self.wait_group.wait();
    }

    pub fn close(&self) {
        self.channel.close();
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.close();
        let workers = self.threads.len();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        if workers > 0 {
            debug!(workers, "worker pool drained");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn channel_is_fifo() {
        let chan = BufChan::new(4);
        for i in 0..4 {
            assert!(chan.push(i));
        }
        for i in 0..4 {
            assert_eq!(chan.get(), Some(i));
        }
    }

    #[test]
    fn closed_channel_rejects_both_ends() {
        let chan: BufChan<u32> = BufChan::new(2);
        chan.close();
        chan.close();
        assert!(!chan.push(1));
        assert_eq!(chan.get(), None);
        assert!(chan.is_closed());
    }

    #[test]
    fn full_channel_blocks_until_drained() {
        let chan = Arc::new(BufChan::new(1));
        assert!(chan.push(0));

        let producer = {
            let chan = Arc::clone(&chan);
            thread::spawn(move || chan.push(1))
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(chan.get(), Some(0));
        assert!(producer.join().unwrap());
        assert_eq!(chan.get(), Some(1));
    }

    #[test]
    fn close_wakes_blocked_getter() {
        let chan: Arc<BufChan<u32>> = Arc::new(BufChan::new(1));
        let getter = {
            let chan = Arc::clone(&chan);
            thread::spawn(move || chan.get())
        };

        thread::sleep(Duration::from_millis(20));
        chan.close();
        assert_eq!(getter.join().unwrap(), None);
    }

    #[test]
    fn wait_group_blocking_mode() {
        let wg = Arc::new(WaitGroup::new(false));
        wg.add(2);

        let worker = {
            let wg = Arc::clone(&wg);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                wg.done();
                wg.done();
            })
        };

        wg.wait();
        assert_eq!(wg.pending(), 0);
        worker.join().unwrap();
    }

    #[test]
    fn wait_group_spin_mode() {
        let wg = Arc::new(WaitGroup::new(true));
        wg.add(1);

        let worker = {
            let wg = Arc::clone(&wg);
            thread::spawn(move || wg.done())
        };

        wg.wait();
        worker.join().unwrap();
    }

    #[test]
    fn pool_processes_every_chunk() {
        let sum = Arc::new(AtomicUsize::new(0));
        let mut pool = {
            let sum = Arc::clone(&sum);
            WorkerPool::new(
                move |(start, end): (usize, usize)| {
                    sum.fetch_add((start..end).sum::<usize>(), Ordering::SeqCst);
                },
                4,
            )
        };
        pool.do_work(4);

        pool.split_work(1000, 16, |start, end| (start, end));
        pool.wait();
        assert_eq!(sum.load(Ordering::SeqCst), (0..1000).sum::<usize>());
    }

    #[test]
    fn split_smaller_than_one_chunk_still_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut pool = {
            let hits = Arc::clone(&hits);
            WorkerPool::new(
                move |(start, end): (usize, usize)| {
                    hits.fetch_add(end - start, Ordering::SeqCst);
                },
                2,
            )
        };
        pool.do_work(2);

        pool.split_work(3, 8, |start, end| (start, end));
        pool.wait();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn remainder_lands_in_the_last_chunk() {
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let mut pool = {
            let chunks = Arc::clone(&chunks);
            WorkerPool::new(
                move |range: (usize, usize)| chunks.lock().unwrap().push(range),
                8,
            )
        };
        pool.do_work(1);

        pool.split_work(10, 4, |start, end| (start, end));
        pool.wait();

        let mut seen = chunks.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![(0, 4), (4, 10)]);
    }

    #[test]
    fn drop_joins_idle_workers() {
        let mut pool = WorkerPool::new(|_: ()| {}, 2);
        pool.do_work(3);
        pool.close();
        // Dropping joins the (already exiting) threads without hanging.
        drop(pool);
    }
}
