//! Example: Driving unreliable operations through a retry loop
//!
//! This example demonstrates:
//! 1. Message-matched retry with a constant backoff
//! 2. Self-classifying operations (only retry network errors)
//! 3. Jitter impact (run multiple times to see variance)
//! 4. Cancelling a loop that would otherwise retry forever
//!
//! Run with:
//! ```bash
//! cargo run -p retrykit --example retry_example
//! ```

use retrykit::prelude::*;
use std::error::Error;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// A simulated API that fails the first few times
struct UnreliableApi {
    attempts: AtomicU32,
    fail_count: u32,
}

impl UnreliableApi {
    fn new(fail_count: u32) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicU32::new(0),
            fail_count,
        })
    }

    async fn call(&self) -> Result<String, io::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        if attempt < self.fail_count {
            println!("  Attempt {}: FAILED (connection reset)", attempt + 1);
            Err(io::Error::other("connection reset"))
        } else {
            println!("  Attempt {}: SUCCESS", attempt + 1);
            Ok("API response data".to_string())
        }
    }

    fn total_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Example 1: Errors listed by message are retried
async fn example_message_matching() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Retry Errors Matched by Message ===\n");

    let config = default_config().merged(&Config {
        initial_delay: Duration::from_millis(100),
        ..Config::default()
    });

    let api = UnreliableApi::new(2);
    let start = Instant::now();

    let result = run(
        &Context::new(),
        &config,
        |_ctx| {
            let api = Arc::clone(&api);
            async move { api.call().await.map_err(Classified::terminal) }
        },
        &["connection reset"],
    )
    .await?;

    println!("\nResult: {}", result);
    println!("Total attempts: {}", api.total_attempts());
    println!("Total time: {:?}", start.elapsed());
    println!("Expected delays: 2 x (100ms +/- 200ms jitter, never below 0)");

    Ok(())
}

/// Example 2: The operation decides which errors are transient
async fn example_self_classifying() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: Self-Classifying Operation (Network Errors Only) ===\n");

    let config = Config::builder()
        .backoff_type(BackoffType::Exponential)
        .initial_delay(Duration::from_millis(10))
        .jitter(Duration::ZERO)
        .build();

    fn classify(err: io::Error) -> Classified<io::Error> {
        if err.to_string().to_lowercase().contains("network") {
            println!("  Error is retryable: {}", err);
            retryable(err)
        } else {
            println!("  Error is NOT retryable: {}", err);
            Classified::terminal(err)
        }
    }

    println!("Test 1: Auth error (should NOT retry)");
    let result: Result<(), _> = run_classified(&Context::new(), &config, |_ctx| async {
        Err(classify(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "auth failed",
        )))
    })
    .await;
    assert!(matches!(result, Err(RetryError::Permanent(_))));

    println!("\nTest 2: Network error (should retry)");
    let attempts = AtomicU32::new(0);
    let result = run_classified(&Context::new(), &config, |_ctx| {
        let current = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
            if current < 2 {
                Err(classify(io::Error::other("network timeout")))
            } else {
                println!("  Attempt {}: Success!", current + 1);
                Ok("success")
            }
        }
    })
    .await;
    assert!(result.is_ok());
    println!("Total attempts: {}", attempts.load(Ordering::SeqCst));

    Ok(())
}

/// Example 3: Jitter demonstration
async fn example_jitter_impact() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 3: Jitter Impact (Run 10 Times) ===\n");

    let base = Config::builder()
        .initial_delay(Duration::from_millis(100))
        .max_retries(1)
        .jitter(Duration::ZERO)
        .build();
    let jittered = Config {
        jitter: Duration::from_millis(30),
        ..base.clone()
    };

    for (label, config) in [("Without jitter", &base), ("With 30ms jitter", &jittered)] {
        println!("{} (10 runs):", label);
        let mut total = Duration::ZERO;
        for i in 0..10 {
            let api = UnreliableApi::new(1);
            let start = Instant::now();

            let _ = run(
                &Context::new(),
                config,
                |_ctx| {
                    let api = Arc::clone(&api);
                    async move { api.call().await.map_err(Classified::terminal) }
                },
                &["connection reset"],
            )
            .await;

            let elapsed = start.elapsed();
            total += elapsed;
            println!("  Run {}: {:?}", i + 1, elapsed);
        }
        println!("  Average: {:?}\n", total / 10);
    }

    println!("Analysis:");
    println!("  No jitter: All delays should be very similar (~100ms)");
    println!("  With jitter: Delays should vary (70-130ms range)");

    Ok(())
}

/// Example 4: Unlimited retry stopped by the caller
async fn example_cancellation() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 4: Cancel an Unlimited Retry Loop ===\n");

    let config = Config::builder()
        .initial_delay(Duration::from_millis(50))
        .jitter(Duration::ZERO)
        .unlimited()
        .build();
    let ctx = Context::new().with_timeout(Duration::from_millis(275));
    let api = UnreliableApi::new(u32::MAX);

    let result = run_classified(&ctx, &config, |_ctx| {
        let api = Arc::clone(&api);
        async move { api.call().await.map_err(retryable) }
    })
    .await;

    match result {
        Err(RetryError::Context(cause)) => println!("\nStopped: {}", cause),
        other => println!("\nUnexpected outcome: {:?}", other),
    }
    println!("Total attempts: {}", api.total_attempts());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("==============================================");
    println!("        retrykit: Retry Loop Examples");
    println!("==============================================");

    example_message_matching().await?;
    example_self_classifying().await?;
    example_jitter_impact().await?;
    example_cancellation().await?;

    println!("\n==============================================");
    println!("   All examples completed successfully!");
    println!("==============================================\n");

    Ok(())
}
