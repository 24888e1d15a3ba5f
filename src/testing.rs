//! Simulated devices on a loopback socket for tests.
//!
//! A [`FakeNetwork`] answers requests for several devices from one address,
//! so a "broadcast" to it reaches all of them.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::config::LanConfig;
use crate::header::Header;
use crate::message::{
    ApplicationRequest, EXTENDED_ZONES, MULTIZONE_BATCH, RequestMessage, ResponseMessage,
    TILE_PIXELS, decode, encode,
};
use crate::types::{Color, FirmwareVersion, Power, TargetAddress, TileInfo};

/// A device's state as the fake sees it.
#[derive(Debug, Clone)]
pub(crate) struct FakeState {
    pub target: TargetAddress,
    pub label: String,
    pub power: Power,
    pub color: Color,
    pub product: u32,
    pub firmware: FirmwareVersion,
    pub zones: Vec<Color>,
    pub pending_zones: Option<Vec<Color>>,
    pub tiles: Vec<TileInfo>,
    pub tile_colors: Vec<Vec<Color>>,
    /// Port announced in `StateService` instead of the fake's own.
    pub service_port: Option<u32>,
}

impl FakeState {
    pub fn light(n: u8) -> Self {
        FakeState {
            target: TargetAddress::new([0xd0, 0x73, 0xd5, 0x00, 0x00, n]),
            label: format!("Light {n}"),
            power: Power::Off,
            color: Color::OFF,
            product: 27,
            firmware: FirmwareVersion::new(3, 70),
            zones: Vec::new(),
            pending_zones: None,
            tiles: Vec::new(),
            tile_colors: Vec::new(),
            service_port: None,
        }
    }

    pub fn multizone(n: u8, zone_count: usize, product: u32, firmware: FirmwareVersion) -> Self {
        FakeState {
            label: format!("Strip {n}"),
            product,
            firmware,
            zones: vec![Color::OFF; zone_count],
            ..Self::light(n)
        }
    }

    pub fn tilechain(n: u8, tiles: Vec<TileInfo>) -> Self {
        let tile_colors = tiles
            .iter()
            .map(|t| vec![Color::OFF; t.pixel_count()])
            .collect();
        FakeState {
            label: format!("Tiles {n}"),
            product: 55,
            tiles,
            tile_colors,
            ..Self::light(n)
        }
    }

    fn respond(&mut self, request: &RequestMessage, port: u16) -> Vec<ResponseMessage> {
        use RequestMessage as Req;
        use ResponseMessage as Res;

        match request {
            Req::GetService => vec![Res::StateService {
                service: 1,
                port: self.service_port.unwrap_or(port as u32),
            }],
            Req::GetHostFirmware => vec![Res::StateHostFirmware {
                build: 0,
                version: self.firmware,
            }],
            Req::GetWifiInfo => vec![Res::StateWifiInfo {
                signal: 1e-5,
                tx: 0,
                rx: 0,
            }],
            Req::GetPower => vec![Res::StatePower { level: self.power }],
            Req::SetPower { level } | Req::LightSetPower { level, .. } => {
                self.power = *level;
                vec![Res::Acknowledgement]
            }
            Req::GetLabel => vec![Res::StateLabel {
                label: self.label.clone(),
            }],
            Req::SetLabel { label } => {
                self.label = label.clone();
                vec![Res::Acknowledgement]
            }
            Req::GetVersion => vec![Res::StateVersion {
                vendor: 1,
                product: self.product,
                version: 0,
            }],
            Req::LightGet => vec![Res::LightState {
                color: self.color,
                power: self.power,
                label: self.label.clone(),
            }],
            Req::LightSetColor { color, .. } => {
                self.color = *color;
                vec![Res::Acknowledgement]
            }
            Req::LightGetPower => vec![Res::LightStatePower { level: self.power }],
            Req::SetColorZones {
                start,
                end,
                color,
                apply,
                ..
            } => {
                if self.zones.is_empty() {
                    return vec![Res::Acknowledgement];
                }
                let mut pending = self
                    .pending_zones
                    .take()
                    .unwrap_or_else(|| self.zones.clone());
                if *apply != ApplicationRequest::ApplyOnly {
                    for zone in *start as usize..=(*end as usize).min(pending.len().saturating_sub(1)) {
                        pending[zone] = *color;
                    }
                }
                if *apply == ApplicationRequest::NoApply {
                    self.pending_zones = Some(pending);
                } else {
                    self.zones = pending;
                }
                vec![Res::Acknowledgement]
            }
            Req::GetColorZones { start, end } => {
                if self.zones.is_empty() {
                    return Vec::new();
                }
                let count = self.zones.len();
                let last = (*end as usize).min(count - 1);
                (*start as usize..=last)
                    .step_by(MULTIZONE_BATCH)
                    .map(|index| {
                        let mut colors: Vec<Color> = self.zones
                            [index..(index + MULTIZONE_BATCH).min(count)]
                            .to_vec();
                        colors.resize(MULTIZONE_BATCH, Color::NONE);
                        Res::StateMultiZone {
                            count: count as u8,
                            index: index as u8,
                            colors,
                        }
                    })
                    .collect()
            }
            Req::SetExtendedColorZones { index, colors, .. } => {
                for (zone, color) in self.zones.iter_mut().skip(*index as usize).zip(colors) {
                    *zone = *color;
                }
                vec![Res::Acknowledgement]
            }
            Req::GetExtendedColorZones => self
                .zones
                .chunks(EXTENDED_ZONES)
                .enumerate()
                .map(|(i, chunk)| Res::StateExtendedColorZones {
                    count: self.zones.len() as u16,
                    index: (i * EXTENDED_ZONES) as u16,
                    colors: chunk.to_vec(),
                })
                .collect(),
            Req::GetDeviceChain => {
                if self.tiles.is_empty() {
                    return Vec::new();
                }
                vec![Res::StateDeviceChain {
                    start_index: 0,
                    tiles: self.tiles.clone(),
                    total_count: self.tiles.len() as u8,
                }]
            }
            Req::Get64 {
                tile_index,
                length,
                width,
                ..
            } => (*tile_index as usize..(*tile_index as usize + *length as usize))
                .filter_map(|i| self.tile_colors.get(i).map(|c| (i, c)))
                .map(|(i, colors)| {
                    let mut colors = colors.clone();
                    colors.resize(TILE_PIXELS, Color::NONE);
                    Res::State64 {
                        tile_index: i as u8,
                        x: 0,
                        y: 0,
                        width: *width,
                        colors,
                    }
                })
                .collect(),
            Req::Set64 {
                tile_index, colors, ..
            } => {
                if let Some(tile) = self.tile_colors.get_mut(*tile_index as usize) {
                    let n = tile.len();
                    tile.copy_from_slice(&colors[..n.min(colors.len())]);
                }
                vec![Res::Acknowledgement]
            }
        }
    }
}

/// Ways the fake misbehaves.
#[derive(Debug, Clone, Default)]
pub(crate) struct Behavior {
    pub silent: bool,
    /// Drop this many datagrams before answering.
    pub ignore_first: usize,
    /// Send an undecodable datagram before the first reply.
    pub garbage_first: bool,
    /// Reply with this source instead of the request's.
    pub source_override: Option<u32>,
}

impl Behavior {
    pub fn silent() -> Self {
        Behavior {
            silent: true,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Recorded {
    headers: Vec<Header>,
    requests: Vec<RequestMessage>,
}

pub(crate) struct FakeNetwork {
    address: SocketAddr,
    states: Arc<Mutex<Vec<FakeState>>>,
    recorded: Arc<Mutex<Recorded>>,
    task: tokio::task::JoinHandle<()>,
}

impl FakeNetwork {
    pub async fn spawn(devices: Vec<FakeState>) -> Self {
        Self::spawn_with(devices, Behavior::default()).await
    }

    pub async fn spawn_with(devices: Vec<FakeState>, behavior: Behavior) -> Self {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let address = socket.local_addr().unwrap();
        let states = Arc::new(Mutex::new(devices));
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let task = tokio::spawn(serve(
            socket,
            states.clone(),
            recorded.clone(),
            behavior,
        ));
        FakeNetwork {
            address,
            states,
            recorded,
            task,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn target(&self, index: usize) -> TargetAddress {
        self.states.lock().unwrap()[index].target
    }

    pub fn state(&self, index: usize) -> FakeState {
        self.states.lock().unwrap()[index].clone()
    }

    /// Decoded datagrams received so far.
    pub fn datagrams(&self) -> usize {
        self.recorded.lock().unwrap().headers.len()
    }

    pub fn headers(&self) -> Vec<Header> {
        self.recorded.lock().unwrap().headers.clone()
    }

    pub fn requests(&self) -> Vec<RequestMessage> {
        self.recorded.lock().unwrap().requests.clone()
    }

    pub async fn wait_for_datagrams(&self, count: usize) {
        for _ in 0..200 {
            if self.datagrams() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} datagrams, got {}", self.datagrams());
    }
}

impl Drop for FakeNetwork {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    socket: UdpSocket,
    states: Arc<Mutex<Vec<FakeState>>>,
    recorded: Arc<Mutex<Recorded>>,
    behavior: Behavior,
) {
    let port = socket.local_addr().unwrap().port();
    let mut buf = vec![0u8; 2048];
    let mut garbage_sent = false;

    loop {
        let Ok((len, from)) = socket.recv_from(&mut buf).await else {
            continue;
        };
        let Ok((header, request)) = decode::<RequestMessage>(&buf[..len]) else {
            continue;
        };
        let seen = {
            let mut recorded = recorded.lock().unwrap();
            recorded.headers.push(header);
            recorded.requests.push(request.clone());
            recorded.headers.len()
        };
        if behavior.silent || seen <= behavior.ignore_first {
            continue;
        }

        let replies: Vec<Vec<u8>> = {
            let mut states = states.lock().unwrap();
            states
                .iter_mut()
                .filter(|s| header.target.is_broadcast() || s.target == header.target)
                .flat_map(|state| {
                    let target = state.target;
                    state
                        .respond(&request, port)
                        .into_iter()
                        .map(move |message| {
                            let reply = Header {
                                source: behavior.source_override.unwrap_or(header.source),
                                ..Header::for_target(0, target, header.sequence)
                            };
                            encode(&reply, &message).unwrap()
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        if behavior.garbage_first && !garbage_sent && !replies.is_empty() {
            garbage_sent = true;
            socket.send_to(b"not a lifx datagram", from).await.unwrap();
        }
        for reply in replies {
            socket.send_to(&reply, from).await.unwrap();
        }
    }
}

/// Client settings pointing at `network` with short timeouts.
pub(crate) fn test_config(network: &FakeNetwork) -> LanConfig {
    LanConfig {
        port: network.address().port(),
        bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        broadcast_address: network.address().ip(),
        request_attempts: 2,
        request_timeout: Duration::from_millis(200),
        discovery_attempts: 1,
        discovery_timeout: Duration::from_millis(150),
        animation_tick: Duration::from_millis(20),
        ..Default::default()
    }
}
