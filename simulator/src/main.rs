mod telemetry;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use telemetry::{Device, NewDevice, Telemetry};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

const BURST_SIZE: usize = 50;

/// Registers a fleet of devices and streams random telemetry to the API
#[derive(Debug, Parser)]
#[command(name = "simulator")]
struct Args {
    /// Base URL of the device API
    #[arg(long, env = "API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Bearer token for private routes
    #[arg(long, env = "AUTH_TOKEN", default_value = "secret-token-123")]
    token: String,

    /// Number of devices to register
    #[arg(long, env = "DEVICES", default_value_t = 20)]
    devices: usize,

    /// Target readings per second
    #[arg(long, env = "RATE", default_value_t = 200)]
    rate: u64,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!("Starting IoT Simulator");
    info!(
        "API: {}, Rate: {} req/s, Devices: {}",
        args.api_url, args.rate, args.devices
    );

    if let Err(e) = run(args).await {
        error!("Simulator failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    if args.rate == 0 {
        bail!("RATE must be greater than zero");
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("Failed to build HTTP client")?;

    let devices = register_devices(&client, &args).await?;
    if devices.is_empty() {
        bail!("no devices could be registered");
    }
    info!("Registered {} devices, starting to send telemetry", devices.len());

    let burst_interval = burst_interval(args.rate);
    info!(
        "Sending in bursts of {} readings every {:?}",
        BURST_SIZE, burst_interval
    );

    let url = format!("{}/telemetries", args.api_url);
    let mut counter = 0u64;

    loop {
        let burst_start = Instant::now();
        let mut burst = JoinSet::new();

        for _ in 0..BURST_SIZE {
            let device = &devices[(counter % devices.len() as u64) as usize];
            let reading = generate_telemetry(&mut rand::thread_rng(), device.id);
            counter += 1;

            let request = client.post(&url).bearer_auth(&args.token).json(&reading);
            burst.spawn(async move { request.send().await });
        }

        while let Some(joined) = burst.join_next().await {
            match joined {
                Ok(Ok(response)) if response.status() == StatusCode::CREATED => {}
                Ok(Ok(response)) => warn!("Telemetry rejected with {}", response.status()),
                Ok(Err(e)) => warn!("Failed to send telemetry: {}", e),
                Err(e) => error!("Send task failed: {}", e),
            }
        }

        if counter % 10_000 < BURST_SIZE as u64 {
            info!("Sent {} readings", counter);
        }

        let elapsed = burst_start.elapsed();
        if elapsed < burst_interval {
            tokio::time::sleep(burst_interval - elapsed).await;
        } else if elapsed > burst_interval * 2 {
            warn!(
                "Burst took {:?}, target was {:?} - API may be overloaded",
                elapsed, burst_interval
            );
        }
    }
}

async fn register_devices(client: &Client, args: &Args) -> Result<Vec<Device>> {
    let url = format!("{}/devices", args.api_url);
    let mut devices = Vec::with_capacity(args.devices);

    for i in 0..args.devices {
        let device = NewDevice {
            name: format!("sim-dev-{}", i),
            device_type: "Sensor".to_string(),
            mac_address: random_mac(&mut rand::thread_rng()),
            is_active: true,
        };

        let response = client
            .post(&url)
            .bearer_auth(&args.token)
            .json(&device)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        match response.status() {
            StatusCode::CREATED => {
                let created: Device = response
                    .json()
                    .await
                    .context("Malformed device response")?;
                info!("Registered device {} ({})", created.id, created.mac_address);
                devices.push(created);
            }
            StatusCode::UNAUTHORIZED => bail!("API rejected the bearer token"),
            status => warn!("Device {} not registered: {}", device.name, status),
        }
    }

    Ok(devices)
}

/// Pause between bursts needed to hit `rate` readings per second, never
/// shorter than a millisecond
fn burst_interval(rate: u64) -> Duration {
    Duration::from_millis(((BURST_SIZE as u64 * 1000) / rate).max(1))
}

fn random_mac(rng: &mut impl Rng) -> String {
    let bytes: [u8; 6] = rng.gen();
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn generate_telemetry(rng: &mut impl Rng, device_id: i64) -> Telemetry {
    let (data_type, value) = match rng.gen_range(0..3) {
        0 => {
            let temperature = if rng.gen_bool(0.05) {
                rng.gen_range(-50.0..100.0) // 5% outliers
            } else {
                rng.gen_range(15.0..35.0)
            };
            ("Temperature", temperature)
        }
        1 => {
            let humidity = if rng.gen_bool(0.05) {
                rng.gen_range(0.0..100.0) // 5% outliers
            } else {
                rng.gen_range(30.0..80.0)
            };
            ("Humidity", humidity)
        }
        _ => {
            let battery = if rng.gen_bool(0.02) {
                rng.gen_range(0.0..20.0) // 2% low battery
            } else {
                rng.gen_range(20.0..100.0)
            };
            ("Battery", battery)
        }
    };

    Telemetry {
        device_id,
        data_type,
        value,
        recorded_at: Utc::now().to_rfc3339(),
    }
}
