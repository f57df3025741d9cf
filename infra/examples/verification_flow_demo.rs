//! Example: Verification code flow on Redis
//!
//! Walks through the pre-send check, issuing a code, a failed attempt and a
//! successful verification, printing the abuse check outcome at each step.
//!
//! Run with: cargo run --example verification_flow_demo -p vc_infra

use rand::Rng;
use tracing_subscriber::EnvFilter;
use vc_infra::InfrastructureError;

/// Generate a 6-digit verification code
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let code: u32 = rng.gen_range(100000..1000000);
    code.to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Verification Code Flow Demo ===\n");

    let service = match vc_infra::initialize().await {
        Ok(service) => service,
        Err(InfrastructureError::Cache(e)) => {
            eprintln!("Redis is not reachable: {}", e);
            eprintln!("Start one with: docker run -d -p 6379:6379 redis:7");
            return Ok(());
        }
        Err(InfrastructureError::Domain(e)) if e.is_store_error() => {
            eprintln!("Redis did not answer PING: {}", e);
            eprintln!("Start one with: docker run -d -p 6379:6379 redis:7");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let policy = service.policy().snapshot();
    println!("Namespace: {}", service.namespace());
    println!(
        "Policy: validity {}s, interval {}s, unused ceiling {}, failure ceiling {}, bans {:?}\n",
        policy.validity_seconds,
        policy.request_interval_seconds,
        policy.unused_code_ceiling,
        policy.failure_ceiling,
        policy.ban_rules
    );

    let subject = "+8613800138000";

    println!("1. Pre-send check");
    let outcome = service.pre_check_before_send(subject).await?;
    println!("   Outcome: {:?}", outcome);
    if !outcome.is_valid() {
        println!("   Subject is throttled, stopping here");
        return Ok(());
    }

    println!("\n2. Issuing a code");
    let code = generate_code();
    service.issue_code(subject, &code).await?;
    println!("   Code {} issued, TTL {}s", code, service.code_ttl(subject).await?);

    println!("\n3. Requesting another code right away");
    println!("   Outcome: {:?}", service.pre_check_before_send(subject).await?);

    println!("\n4. Verifying with a wrong code");
    println!("   Pre-verify: {:?}", service.pre_check_before_verify(subject).await?);
    let attempt = service.consume_code(subject, "000000").await?;
    println!("   Found: {}, success: {}", attempt.found, attempt.success);
    println!("   Failures today: {}", service.failure_count_today(subject).await?);

    println!("\n5. Verifying with the right code");
    let period = service.registered_period(subject).await?;
    println!("   Code pending for {}s", period.elapsed_seconds);
    let attempt = service.consume_code(subject, &code).await?;
    println!("   Found: {}, success: {}", attempt.found, attempt.success);

    println!("\n6. Verifying the same code again");
    let attempt = service.consume_code(subject, &code).await?;
    println!("   Found: {}, success: {}", attempt.found, attempt.success);
    println!("   Unconsumed codes today: {}", service.unconsumed_count(subject).await?);

    println!("\n=== Demo Complete ===");
    Ok(())
}
