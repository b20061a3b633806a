use std::time::Duration;

use clap::{Parser, Subcommand};

use koan::pool::{partition, stealing};
use koan::sync::counter::{self, AtomicCounter, MutexCounter, RacyCounter, SharedCounter};
use koan::sync::deadlock::{self, LockOrder};
use koan::sync::rendezvous;
use koan::{
    klog, klog_error, klog_warn, Config, FailurePolicy, Result, TaskContext, TaskStatus,
    WorkerPool,
};

/// Koan - worker-pool task dispatcher and concurrency pattern demos
#[derive(Parser, Debug)]
#[command(name = "koan")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    KOAN_DEBUG=1    Enable debug logging (alternative to --debug)")]
struct Cli {
    /// Enable debug logging (writes to ~/.koan/koan.log)
    #[arg(short = 'd', long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dispatch a batch of tasks through the shared-queue worker pool
    Pool {
        /// Number of tasks to dispatch
        #[arg(long, default_value_t = 16)]
        tasks: usize,

        /// Worker threads (defaults to config, then hardware parallelism)
        #[arg(long)]
        workers: Option<usize>,

        /// Cancel remaining tasks on the first failure
        #[arg(long)]
        fail_fast: bool,
    },

    /// Split work into contiguous chunks, one per worker
    Partition {
        /// Number of items to process
        #[arg(long, default_value_t = 1000)]
        items: usize,

        /// Worker threads
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },

    /// Run the work-stealing demo with all work seeded on worker 0
    Steal {
        /// Number of tasks
        #[arg(long, default_value_t = 100)]
        tasks: usize,

        /// Worker threads
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },

    /// Demonstrate the unsynchronized increment race
    Race {
        /// Worker threads
        #[arg(long, default_value_t = 10)]
        workers: usize,

        /// Increments per worker
        #[arg(long, default_value_t = 1000)]
        increments: usize,

        /// How many times to repeat the experiment
        #[arg(long, default_value_t = 10)]
        trials: usize,
    },

    /// Run the same increments with mutex and atomic counters
    Counter {
        /// Worker threads
        #[arg(long, default_value_t = 10)]
        workers: usize,

        /// Increments per worker
        #[arg(long, default_value_t = 1000)]
        increments: usize,
    },

    /// Deadlock two transfer workers, then fix them with a global order
    Deadlock {
        /// Seconds to wait before declaring the run deadlocked
        #[arg(long, default_value_t = 2)]
        timeout: u64,
    },

    /// Barrier rendezvous: staggered workers, all-or-none release
    Barrier {
        /// Worker threads
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    koan::log::init_with_debug(cli.debug);

    let result = match cli.command {
        Command::Pool {
            tasks,
            workers,
            fail_fast,
        } => run_pool(tasks, workers, fail_fast),
        Command::Partition { items, workers } => run_partition(items, workers),
        Command::Steal { tasks, workers } => run_steal(tasks, workers),
        Command::Race {
            workers,
            increments,
            trials,
        } => run_race(workers, increments, trials),
        Command::Counter {
            workers,
            increments,
        } => run_counter(workers, increments),
        Command::Deadlock { timeout } => run_deadlock(Duration::from_secs(timeout)),
        Command::Barrier { workers } => run_barrier(workers),
    };

    if let Err(error) = &result {
        klog_error!("demo failed: {}", error);
    }
    result
}

fn run_pool(tasks: usize, workers: Option<usize>, fail_fast: bool) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(workers) = workers {
        config.workers = Some(workers);
    }
    if fail_fast {
        config.failure_policy = FailurePolicy::FailFast;
    }

    let (mut pool, events): (WorkerPool<String>, _) = WorkerPool::from_config_with_events(&config)?;
    klog!(
        "pool demo: {} tasks, {} workers, policy={}",
        tasks,
        pool.worker_count(),
        pool.policy()
    );
    println!(
        "dispatching {} tasks across {} workers (policy: {})",
        tasks,
        pool.worker_count(),
        pool.policy()
    );

    let batch: Vec<_> = (0..tasks)
        .map(|i| {
            move |ctx: &TaskContext| {
                // Simulated work; a real task would do something useful.
                std::thread::sleep(Duration::from_millis(5));
                Ok(format!("task {} ran on worker {}", i, ctx.worker()))
            }
        })
        .collect();

    for outcome in pool.dispatch_all(batch)? {
        match outcome {
            Ok(line) => println!("  {}", line),
            Err(error) => println!("  {}", error),
        }
    }

    pool.shutdown()?;
    let mut completed = 0;
    let mut failed = 0;
    for event in events.try_iter() {
        match event.status() {
            Some(TaskStatus::Completed) => completed += 1,
            Some(TaskStatus::Failed { .. }) => failed += 1,
            _ => {}
        }
    }
    println!("events: {} completed, {} failed", completed, failed);
    Ok(())
}

fn run_partition(items: usize, workers: usize) -> Result<()> {
    klog!("partition demo: {} items, {} workers", items, workers);
    let ranges = partition::partition(items, workers)?;
    println!("{} items over {} workers:", items, workers);
    for (worker, range) in ranges.iter().enumerate() {
        println!("  worker {} gets [{}, {})", worker, range.start, range.end);
    }

    let input: Vec<u64> = (0..items as u64).collect();
    let doubled = partition::dispatch_chunked(&input, workers, |x| x * 2)?;
    println!(
        "processed {} items, first={:?}, last={:?}",
        doubled.len(),
        doubled.first(),
        doubled.last()
    );
    Ok(())
}

fn run_steal(tasks: usize, workers: usize) -> Result<()> {
    klog!("steal demo: {} tasks seeded on worker 0, {} workers", tasks, workers);
    println!(
        "seeding all {} tasks on worker 0; {} workers will balance by stealing",
        tasks, workers
    );
    let batch: Vec<_> = (0..tasks)
        .map(|i| {
            move || {
                std::thread::sleep(Duration::from_millis(2));
                i
            }
        })
        .collect();

    let report = stealing::run_seeded_first(batch, workers)?;
    for (worker, count) in report.completed.iter().enumerate() {
        println!("  worker {} completed {} tasks", worker, count);
    }
    println!("total completed: {}", report.total_completed());
    Ok(())
}

fn run_race(workers: usize, increments: usize, trials: usize) -> Result<()> {
    let expected = (workers * increments) as u64;
    klog!(
        "race demo: {} workers x {} increments, {} trials",
        workers,
        increments,
        trials
    );
    println!(
        "{} workers x {} unsynchronized increments, expected {} if no race",
        workers, increments, expected
    );

    let mut lost_trials = 0;
    for trial in 0..trials {
        let counter = RacyCounter::new();
        counter::run_increments(&counter, workers, increments)?;
        let value = counter.value();
        let lost = expected - value;
        if lost > 0 {
            lost_trials += 1;
        }
        println!("  trial {}: final={} lost={}", trial, value, lost);
    }
    if lost_trials == 0 {
        klog_warn!("no trial lost an update; try more workers or increments");
    }
    println!(
        "{} of {} trials lost updates; that nondeterminism is the race",
        lost_trials, trials
    );
    Ok(())
}

fn run_counter(workers: usize, increments: usize) -> Result<()> {
    let expected = (workers * increments) as u64;
    klog!("counter demo: {} workers x {} increments", workers, increments);

    let mutexed = MutexCounter::new();
    counter::run_increments(&mutexed, workers, increments)?;
    println!("mutex counter:  {} (expected {})", mutexed.value(), expected);

    let atomic = AtomicCounter::new();
    counter::run_increments(&atomic, workers, increments)?;
    println!("atomic counter: {} (expected {})", atomic.value(), expected);
    Ok(())
}

fn run_deadlock(timeout: Duration) -> Result<()> {
    klog!("deadlock demo: {:?} budget", timeout);
    println!("two workers, opposite lock order, {:?} budget...", timeout);
    match deadlock::run_transfers(LockOrder::Inconsistent, timeout) {
        Err(koan::Error::Timeout(_)) => {
            println!("  deadlocked as expected (timed out)");
        }
        Err(other) => return Err(other),
        Ok(()) => {
            klog_warn!("inconsistent lock order completed without deadlocking");
            println!("  unexpectedly completed; the scheduler got lucky");
        }
    }

    println!("same transfers, single global lock order...");
    deadlock::run_transfers(LockOrder::Global, timeout)?;
    println!("  completed");
    Ok(())
}

fn run_barrier(workers: usize) -> Result<()> {
    klog!("barrier demo: {} workers", workers);
    let durations = staggered_durations(workers, 50);
    println!("{} workers sleeping up to 50ms before the barrier", workers);

    let report = rendezvous::rendezvous(&durations)?;
    let release = report.max_arrival();
    for w in 0..report.workers() {
        println!(
            "  worker {}: arrived {:>5}us before release, resumed {:>5}us after",
            w,
            release.duration_since(report.arrival(w)).as_micros(),
            report.resume(w).duration_since(release).as_micros(),
        );
    }
    println!(
        "invariant max(arrival) <= min(resume): {}",
        if report.holds() { "holds" } else { "VIOLATED" }
    );
    Ok(())
}

/// Pseudo-random per-worker sleep durations from a tiny LCG; good enough
/// to stagger barrier arrivals.
fn staggered_durations(workers: usize, max_ms: u64) -> Vec<Duration> {
    let mut seed = chrono::Utc::now().timestamp_millis() as u64 | 1;
    (0..workers)
        .map(|_| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            Duration::from_millis((seed >> 33) % max_ms.max(1))
        })
        .collect()
}
