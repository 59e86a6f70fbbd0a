use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use va_accel::{
    AccelConfig, AccelContext, CapabilityRegistry, CodecDescriptor, DecoderProfile, DriverService,
    Entrypoint, FilterDescriptor, LibVaDriver, Profile,
};

struct Args {
    device: Option<PathBuf>,
    config: Option<PathBuf>,
    smoke: Option<(u32, u32)>,
    verbose: bool,
}

fn usage() {
    println!("va-caps - report VA-API decode capabilities");
    println!();
    println!("Usage: va-caps [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --device <PATH>   DRM render node (default: from config, /dev/dri/renderD128)");
    println!("  -c, --config <FILE>   JSON file with accelerator settings");
    println!("  -s, --smoke <WxH>     Bind every supported codec at WxH and cycle one surface");
    println!("  -v, --verbose         Enable debug logging");
    println!("  -h, --help            Show this help");
}

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once(['x', 'X'])?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn parse_args() -> Args {
    let mut parsed = Args {
        device: None,
        config: None,
        smoke: None,
        verbose: false,
    };

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--device" | "-d" => {
                if let Some(v) = value {
                    parsed.device = Some(PathBuf::from(v));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if let Some(v) = value {
                    parsed.config = Some(PathBuf::from(v));
                    i += 1;
                }
            }
            "--smoke" | "-s" => {
                match value.and_then(|v| parse_size(v)) {
                    Some(size) => parsed.smoke = Some(size),
                    None => {
                        eprintln!("--smoke expects WIDTHxHEIGHT, e.g. 1920x1080");
                        std::process::exit(2);
                    }
                }
                i += 1;
            }
            "--verbose" | "-v" => {
                parsed.verbose = true;
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("unknown argument: {other}");
            }
        }
        i += 1;
    }
    parsed
}

fn load_config(path: Option<&Path>) -> Result<AccelConfig, String> {
    let Some(path) = path else {
        return Ok(AccelConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
}

#[derive(Serialize)]
struct ProfileReport {
    profile: Profile,
    name: &'static str,
    entrypoints: Vec<Entrypoint>,
}

#[derive(Serialize)]
struct Report<'a> {
    device: &'a Path,
    version: Option<(i32, i32)>,
    profiles: Vec<ProfileReport>,
    codecs: Vec<&'a CodecDescriptor>,
    filters: Vec<&'a FilterDescriptor>,
}

/// Bind each supported codec and push one surface through the pool.
/// Returns the number of codecs that failed.
fn smoke(registry: &Arc<CapabilityRegistry>, config: &AccelConfig, width: u32, height: u32) -> usize {
    let mut failures = 0;
    for desc in registry.codecs() {
        let codec = desc.codec();
        let mut ctx = AccelContext::new(Arc::clone(registry), config.clone());
        let result = ctx
            .bind(codec, DecoderProfile::UNKNOWN, width, height)
            .and_then(|()| ctx.get_surface())
            .and_then(|lease| {
                let surface = lease.id();
                lease.release().map(|()| surface)
            });
        match result {
            Ok(surface) => info!(
                codec = codec.name(),
                profile = ?ctx.profile(),
                format = ?ctx.surface_format(),
                surfaces = ctx.pool().stats().capacity,
                first_surface = surface.0,
                "smoke bind ok"
            ),
            Err(e) => {
                warn!(codec = codec.name(), %e, "smoke bind failed");
                failures += 1;
            }
        }
    }
    failures
}

fn main() {
    let args = parse_args();

    let filter = if args.verbose {
        "va_accel=debug,va_caps=debug"
    } else {
        "va_accel=info,va_caps=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(%e, "failed to load configuration");
            std::process::exit(1);
        }
    };
    let device = args.device.unwrap_or_else(|| config.render_node.clone());

    let driver = match LibVaDriver::open_drm(&device) {
        Ok(driver) => driver,
        Err(e) => {
            error!(%e, device = %device.display(), "failed to open VA display");
            std::process::exit(1);
        }
    };
    let service = DriverService::new(Arc::new(driver));
    let registry = Arc::new(CapabilityRegistry::initialize(Arc::clone(&service)));
    if !registry.is_available() {
        error!(device = %device.display(), "VA-API unavailable");
        std::process::exit(1);
    }

    let report = Report {
        device: &device,
        version: service.version(),
        profiles: registry
            .profiles()
            .map(|(profile, entrypoints)| ProfileReport {
                profile,
                name: profile.name(),
                entrypoints: entrypoints.to_vec(),
            })
            .collect(),
        codecs: registry.codecs().collect(),
        filters: registry.filters().collect(),
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!(%e, "failed to serialize report");
            std::process::exit(1);
        }
    }

    let failures = match args.smoke {
        Some((width, height)) => smoke(&registry, &config, width, height),
        None => 0,
    };

    match Arc::try_unwrap(registry) {
        Ok(mut registry) => registry.finalize(),
        Err(_) => service.shutdown(),
    }

    if failures > 0 {
        error!(failures, "smoke test failed");
        std::process::exit(1);
    }
}
