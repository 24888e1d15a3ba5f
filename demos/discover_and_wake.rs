//! Discover all LIFX lights on the network and wake them up gently.
//!
//! This example demonstrates:
//! - Discovery and classification of LIFX devices on the local network
//! - Running a wake-up animation on every light and waiting for it to end
//!
//! Run with: cargo run --example discover_and_wake

use std::time::Duration;

use futures::future::join_all;
use lifx_lan_rs::{AnimationOutcome, Color, LanClient, LanConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Discovering LIFX devices on the network...");

    let client = LanClient::bind(LanConfig::default()).await?;
    let devices = client.retrieve_device_information().await?;

    if devices.is_empty() {
        println!("No devices found on the network.");
        return Ok(());
    }

    println!("Found {} device(s):", devices.len());
    for device in &devices {
        let device_ref = device.device();
        println!(
            "  - {} at {} ({}, {})",
            device_ref.label().unwrap_or_default(),
            device_ref.address(),
            device_ref.target(),
            device.kind()
        );
    }

    let daylight = Color::new(0, 0, u16::MAX, 5000);
    println!("\nWaking up every light over 10 seconds...");

    let mut handles = Vec::new();
    for light in devices.iter().filter_map(|d| d.as_light()) {
        handles.push(light.wakeup(Duration::from_secs(10), daylight).await);
    }

    let outcomes = join_all(handles.into_iter().map(|handle| async move {
        let target = handle.target();
        (target, handle.wait().await)
    }))
    .await;

    for (target, outcome) in outcomes {
        match outcome {
            AnimationOutcome::Completed { .. } => println!("  ✓ {} is awake", target),
            AnimationOutcome::Failed(e) => eprintln!("  ✗ {} failed: {}", target, e),
        }
    }

    println!("\nDone!");
    Ok(())
}
