//! CLI application for controlling LIFX lights.
//!
//! This example demonstrates a command-line interface for controlling LIFX
//! devices using various commands.
//!
//! Run with: cargo run --example lifx_cli -- --help

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::{Parser, Subcommand};
use lifx_lan_rs::{
    Color, Device, DeviceKind, Kelvin, LanClient, LanConfig, Light, MultiZoneLight, MultizoneColors,
    TargetAddress, TileChain, TileChainColors,
};

#[derive(Parser)]
#[command(name = "lifx-cli")]
#[command(about = "Control LIFX lights from the command line", long_about = None)]
struct Cli {
    /// MAC address of the device (not required for discover command)
    #[arg(short, long, global = true)]
    target: Option<TargetAddress>,

    /// IP address of the device; located by broadcast when omitted
    #[arg(short, long, global = true)]
    ip: Option<IpAddr>,

    /// Transition duration in milliseconds
    #[arg(short, long, global = true, default_value = "0")]
    duration: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover all LIFX devices on the network
    Discover,

    /// Get the current status of the device
    Status,

    /// Turn the device on
    On,

    /// Turn the device off
    Off,

    /// Set RGB color (0-255 for each component)
    Color {
        /// Red component (0-255)
        red: u8,
        /// Green component (0-255)
        green: u8,
        /// Blue component (0-255)
        blue: u8,
    },

    /// Set white at a color temperature in Kelvin (1500-9000)
    Temperature {
        #[arg(value_parser = clap::value_parser!(u16).range(1500..=9000))]
        kelvin: u16,
    },

    /// Spread a rainbow over the zones of a strip
    Rainbow,

    /// Roll a rainbow across a strip or tile chain
    Roll {
        /// Seconds per full cycle
        #[arg(short, long, default_value = "5")]
        cycle: u64,
        /// Stop after this many seconds
        #[arg(short, long, default_value = "30")]
        seconds: u64,
    },

    /// Wake the light up over the transition duration
    Wakeup,

    /// Get detailed diagnostics
    Diagnostics,
}

fn rainbow() -> MultizoneColors {
    MultizoneColors::interpolated(
        true,
        [Color::RED, Color::YELLOW, Color::GREEN, Color::CYAN, Color::BLUE, Color::MAGENTA],
    )
}

async fn locate(client: &LanClient, cli: &Cli) -> Result<Device, Box<dyn std::error::Error>> {
    let target = cli
        .target
        .ok_or("MAC address is required for this command. Use --target <MAC>")?;
    let device = match cli.ip {
        Some(ip) => Device::new(
            client,
            target,
            SocketAddr::new(ip, LanConfig::DEFAULT_PORT),
        ),
        None => client.device_by_target(target).await?,
    };
    device.get_version().await?;
    Ok(device)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = LanClient::bind(LanConfig::default()).await?;
    let duration = Duration::from_millis(cli.duration);

    if let Commands::Discover = cli.command {
        println!("Discovering LIFX devices on the network...");
        let devices = client.retrieve_device_information().await?;
        if devices.is_empty() {
            println!("No devices found on the network.");
        }
        for device in devices {
            let d = device.device();
            println!(
                "  {}  {:21}  {:10}  {}",
                d.target(),
                d.address().to_string(),
                device.kind().to_string(),
                d.label().unwrap_or_default()
            );
        }
        return Ok(());
    }

    let device = locate(&client, &cli).await?;
    let light = Light::from(device.clone());

    match cli.command {
        Commands::Discover => unreachable!(),

        Commands::Status => {
            let color = light.get_color().await?;
            let (r, g, b) = color.to_rgb();
            println!("{} ({})", device.label().unwrap_or_default(), device.kind());
            println!("  Power: {:?}", light.status().power());
            println!("  Color: RGB({}, {}, {}) at {}K", r, g, b, color.kelvin());
            if let Some(product) = device.product() {
                println!("  Product: {}", product.name);
            }
        }

        Commands::On => {
            device.set_power(true, duration).await?;
            println!("Device turned ON");
        }

        Commands::Off => {
            device.set_power(false, duration).await?;
            println!("Device turned OFF");
        }

        Commands::Color { red, green, blue } => {
            let color = Color::from_rgb(red, green, blue, Color::WHITE_TEMPERATURE);
            light.set_color(color, duration, false).await?;
            println!("Color set successfully");
        }

        Commands::Temperature { kelvin } => {
            let kelvin = Kelvin::create(kelvin).ok_or("unsupported color temperature")?;
            let white = Color::WHITE.with_kelvin(kelvin.kelvin());
            light.set_color(white, duration, false).await?;
            println!("Temperature set successfully");
        }

        Commands::Rainbow => {
            let strip = MultiZoneLight::from(light);
            strip.set_colors(&rainbow(), duration, false).await?;
            println!("Rainbow set on {} zones", strip.zone_count().unwrap_or_default());
        }

        Commands::Roll { cycle, seconds } => {
            let cycle = Duration::from_secs(cycle);
            let animation = if device.kind() == DeviceKind::TileChain {
                TileChain::from(light)
                    .rolling_animation(cycle, TileChainColors::Horizontal(rainbow()))
                    .await?
            } else {
                MultiZoneLight::from(light)
                    .rolling_animation(cycle, rainbow())
                    .await?
            };
            let outcome = animation
                .limit(Duration::from_secs(seconds))
                .start()
                .await
                .wait()
                .await;
            println!("Animation ended: {:?}", outcome);
        }

        Commands::Wakeup => {
            let outcome = light.wakeup(duration, Color::WHITE).await.wait().await;
            println!("Wake-up ended: {:?}", outcome);
        }

        Commands::Diagnostics => {
            let diagnostics = device.diagnostics().await;
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        }
    }

    Ok(())
}
