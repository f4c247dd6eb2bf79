use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use padlink::{BridgeConfig, Device, DeviceManager, ObjectKind};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::load(&path).unwrap_or_else(|err| {
            eprintln!("Failed to load {path}: {err}; using defaults");
            BridgeConfig::default()
        }),
        None => BridgeConfig::default(),
    };

    let mut manager = DeviceManager::new(config);
    let found = manager.discover();
    println!("Discovered {} gamepad(s)", found.len());
    if found.is_empty() {
        return;
    }

    let index = match manager.open_gamepad() {
        Ok(index) => index,
        Err(err) => {
            eprintln!("Cannot open gamepad: {err}");
            return;
        }
    };

    if let Some(device) = manager.device(index) {
        println!("== {} ({}) layout={:?} ==", device.name(), device.id(), device.layout());
        for (i, o) in device.objects().iter().enumerate() {
            let range = device
                .object_properties(i)
                .map(|p| format!(" range=[{}..{}]", p.range_min, p.range_max))
                .unwrap_or_default();
            println!("  #{i:02} {:?} {:<10} offset={}{range}", o.id.kind, o.name, o.offset);
        }
    }

    if manager.acquire_all() == 0 {
        eprintln!("Gamepad did not acquire");
        return;
    }

    // Print a compact summary of the latest value per object every window.
    let flush_every = Duration::from_millis(40);
    let mut last_flush = Instant::now();
    let mut latest: BTreeMap<usize, (ObjectKind, i32)> = BTreeMap::new();

    loop {
        manager.poll();
        for event in manager.drain_events() {
            latest.insert(event.index, (event.object.kind, event.value));
        }

        if last_flush.elapsed() >= flush_every && !latest.is_empty() {
            let line: Vec<String> = latest
                .iter()
                .map(|(index, (kind, value))| match kind {
                    ObjectKind::Axis => format!("A{index}={value}"),
                    ObjectKind::Button => format!("B{index}={}", if *value != 0 { "down" } else { "up" }),
                    ObjectKind::Hat => format!("H{index}={value}"),
                })
                .collect();
            println!("{}", line.join(" "));
            latest.clear();
            last_flush = Instant::now();
        }
    }
}
